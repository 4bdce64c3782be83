use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Principal, TokenService};
use crate::error::{AppError, AppResult};
use crate::security;
use crate::storage::{NewUser, Store, UserRecord, ROLE_STAFF};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub jwt: String,
    pub first_name: String,
    pub last_name: String,
    pub house_code: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub house_code: Vec<String>,
}

fn bad_credentials() -> AppError {
    AppError::forbidden("bad_credentials", "invalid email or password")
}

/// Password login. Unknown email, wrong password and deleted account all
/// produce the same 403; the password is always run through argon2 first so
/// the three cases take comparable time.
pub fn login(store: &Store, tokens: &TokenService, req: &LoginRequest) -> AppResult<LoginResponse> {
    let Some(user) = store.find_user_by_email(&req.email) else {
        security::burn_verify(&req.password);
        info!(target: "careadmin::auth", "login failed: unknown email");
        return Err(bad_credentials());
    };
    if !security::verify_password(&user.password_hash, &req.password) {
        info!(target: "careadmin::auth", user_id = user.id, "login failed: wrong password");
        return Err(bad_credentials());
    }
    if user.deleted {
        info!(target: "careadmin::auth", user_id = user.id, "login failed: account deleted");
        return Err(bad_credentials());
    }
    let jwt = tokens.issue(&user)?;
    info!(target: "careadmin::auth", user_id = user.id, "login ok");
    Ok(LoginResponse {
        jwt,
        first_name: user.first_name,
        last_name: user.last_name,
        house_code: user.house_codes.into_iter().collect(),
    })
}

fn clean_optional(v: &Option<String>) -> Option<String> {
    v.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Create an account. Self-registration always yields a `STAFF` user with no
/// house memberships; requested roles and houses are honoured only when the
/// caller is an authenticated admin.
pub fn register(store: &Store, req: &RegisterRequest, caller: Option<&Principal>) -> AppResult<UserRecord> {
    security::validate_registration(&req.email, &req.first_name, &req.last_name, &req.password)?;

    let admin_caller = caller.map(|p| p.is_admin()).unwrap_or(false);
    let mut roles: BTreeSet<String> = BTreeSet::new();
    let mut house_codes: BTreeSet<String> = BTreeSet::new();
    if admin_caller {
        for r in &req.roles {
            let r = r.trim().to_ascii_uppercase();
            if !store.role_exists(&r) {
                return Err(AppError::validation("roles".to_string(), format!("unknown role '{}'", r)));
            }
            roles.insert(r);
        }
        house_codes.extend(req.house_code.iter().map(|h| h.trim().to_string()).filter(|h| !h.is_empty()));
    }
    if roles.is_empty() {
        roles.insert(ROLE_STAFF.to_string());
    }

    let password_hash = security::hash_password(&req.password)?;
    let user = store.insert_user(NewUser {
        email: req.email.trim().to_string(),
        password_hash,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        phone: clean_optional(&req.phone),
        mobile: clean_optional(&req.mobile),
        roles,
        house_codes,
    })?;
    info!(target: "careadmin::auth", user_id = user.id, by_admin = admin_caller, "user registered");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::storage::ROLE_ADMIN;
    use chrono::Duration;
    use std::sync::Arc;

    fn setup() -> (Store, TokenService) {
        let store = Store::in_memory();
        store.ensure_default_roles().unwrap();
        (store, TokenService::new(b"k", Duration::hours(1), Arc::new(SystemClock)))
    }

    fn req(email: &str, pw: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: pw.into(),
            first_name: "Jo".into(),
            last_name: "Bloggs".into(),
            phone: Some("  ".into()),
            mobile: None,
            roles: vec![ROLE_ADMIN.into()],
            house_code: vec!["H1".into()],
        }
    }

    #[test]
    fn self_registration_is_staff_only() {
        let (store, _) = setup();
        let u = register(&store, &req("jo@example.com", "12345"), None).unwrap();
        assert!(u.roles.contains(ROLE_STAFF));
        assert!(!u.roles.contains(ROLE_ADMIN));
        assert!(u.house_codes.is_empty());
        assert_eq!(u.phone, None);
    }

    #[test]
    fn admin_registration_honours_roles() {
        let (store, _) = setup();
        store.ensure_default_admin("root@example.com", security::hash_password("rootpw").unwrap()).unwrap();
        let admin = Principal::from_user(&store.find_user_by_email("root@example.com").unwrap());
        let u = register(&store, &req("mgr@example.com", "12345"), Some(&admin)).unwrap();
        assert!(u.roles.contains(ROLE_ADMIN));
        assert!(u.house_codes.contains("H1"));
    }

    #[test]
    fn login_paths() {
        let (store, tokens) = setup();
        register(&store, &req("jo@example.com", "right-pw"), None).unwrap();
        let ok = login(&store, &tokens, &LoginRequest { email: "jo@example.com".into(), password: "right-pw".into() }).unwrap();
        assert_eq!(ok.first_name, "Jo");
        assert!(tokens.validate(&ok.jwt, "jo@example.com"));

        let bad = login(&store, &tokens, &LoginRequest { email: "jo@example.com".into(), password: "nope".into() }).unwrap_err();
        assert_eq!(bad.http_status(), 403);
        let unknown = login(&store, &tokens, &LoginRequest { email: "x@example.com".into(), password: "right-pw".into() }).unwrap_err();
        assert_eq!(unknown, bad);
    }

    #[test]
    fn deleted_user_cannot_login_even_with_right_password() {
        let (store, tokens) = setup();
        let u = register(&store, &req("jo@example.com", "right-pw"), None).unwrap();
        store.soft_delete_user(u.id).unwrap();
        let err = login(&store, &tokens, &LoginRequest { email: "jo@example.com".into(), password: "right-pw".into() }).unwrap_err();
        assert_eq!(err, bad_credentials());
    }
}
