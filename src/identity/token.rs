//! HS256 bearer tokens.
//!
//! Tokens carry only `sub` (the user's email), `iat` and `exp`. Nothing is
//! persisted: validity is signature + expiry against the server secret, and
//! there is no server-side revocation. Expiry is checked here against the
//! injected clock rather than inside `jsonwebtoken`, so tests can move time.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::AuthError;
use crate::clock::Clock;
use crate::storage::UserRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            clock,
        }
    }

    /// Sign a token for `user` expiring `ttl` from now.
    pub fn issue(&self, user: &UserRecord) -> Result<String> {
        let now = self.clock.now().timestamp();
        let claims = Claims { sub: user.email.clone(), iat: now, exp: now + self.ttl.num_seconds() };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        trace!(target: "careadmin::auth", user_id = user.id, exp = claims.exp, "token issued");
        Ok(token)
    }

    /// Verify the signature and structure; expiry is deliberately left to `validate`.
    fn decode_verified(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::Malformed)
    }

    /// Subject of a structurally valid, correctly signed token.
    pub fn extract_subject(&self, token: &str) -> Result<String, AuthError> {
        let claims = self.decode_verified(token)?;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::Malformed);
        }
        Ok(claims.sub)
    }

    /// True only for a correctly signed, unexpired token whose subject matches.
    /// Never errors.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        match self.decode_verified(token) {
            Ok(claims) => {
                claims.sub.eq_ignore_ascii_case(expected_subject.trim())
                    && claims.exp > self.clock.now().timestamp()
            }
            Err(_) => false,
        }
    }
}
