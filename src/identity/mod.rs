//! Central identity handling: bearer tokens, the per-request authenticator,
//! role/house authorization and the login/registration flows.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod token;
mod request_context;
mod authorizer;
pub mod authenticator;
mod provider;

use thiserror::Error;

pub use principal::Principal;
pub use token::{Claims, TokenService};
pub use request_context::RequestContext;
pub use authenticator::{AuthOutcome, PUBLIC_ROUTES};
pub use authorizer::{require_any_role, require_house_access};
pub use provider::{login, register, LoginRequest, LoginResponse, RegisterRequest};

/// Reasons a request fails authentication. Detail stays server-side; clients
/// only see the code.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer token supplied")]
    Missing,
    #[error("token is malformed or its signature does not verify")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token subject is not an active user")]
    Unknown,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Missing => "auth_required",
            AuthError::Malformed => "token_malformed",
            AuthError::Expired => "token_expired",
            AuthError::Unknown => "unknown_principal",
        }
    }
}
