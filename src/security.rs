//! Password hashing and registration input checks.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use password_hash::{PasswordHash, SaltString};
use regex::Regex;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 5;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").expect("email regex")
});

/// PHC-format hash with a random 16-byte salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Hash used to burn comparable CPU time when the account does not exist.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| hash_password("not-a-real-password").unwrap_or_default());

pub fn burn_verify(password: &str) {
    let _ = verify_password(&DUMMY_HASH, password);
}

pub fn is_valid_email(email: &str) -> bool { EMAIL_RE.is_match(email.trim()) }

/// Registration field checks, reported one field at a time in form order.
pub fn validate_registration(email: &str, first_name: &str, last_name: &str, password: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::validation("email", "email address is not valid"));
    }
    if first_name.trim().is_empty() {
        return Err(AppError::validation("firstName", "first name must not be empty"));
    }
    if last_name.trim().is_empty() {
        return Err(AppError::validation("lastName", "last name must not be empty"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("password".to_string(), format!("password must be at least {} characters", MIN_PASSWORD_LEN)));
    }
    Ok(())
}
