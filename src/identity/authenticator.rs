//! Per-request bearer-token authentication.
//!
//! Each request starts `Unauthenticated` and ends either `Authenticated`, with
//! a `RequestContext` inserted into its extensions, or `Rejected`. Routes on
//! the public allow-list are never rejected: a missing or bad token there just
//! leaves the request unauthenticated.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, Principal, RequestContext, TokenService};
use crate::error::AppError;
use crate::server::AppState;
use crate::storage::Store;

pub const PUBLIC_ROUTES: &[&str] = &["/login", "/register", "/health"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Unauthenticated,
    Authenticated(Principal),
    Rejected(AuthError),
}

pub fn is_public_route(path: &str) -> bool {
    let trimmed = if path.len() > 1 { path.trim_end_matches('/') } else { path };
    PUBLIC_ROUTES.contains(&trimmed)
}

fn bearer_token(headers: &HeaderMap) -> Option<Result<&str, AuthError>> {
    let raw = headers.get(header::AUTHORIZATION)?;
    let Ok(value) = raw.to_str() else { return Some(Err(AuthError::Malformed)); };
    let value = value.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => return Some(Err(AuthError::Malformed)),
    };
    if token.is_empty() { return Some(Err(AuthError::Malformed)); }
    Some(Ok(token))
}

/// Resolve the identity carried by `headers`, without consulting the allow-list.
pub fn authenticate_headers(store: &Store, tokens: &TokenService, headers: &HeaderMap) -> AuthOutcome {
    let token = match bearer_token(headers) {
        None => return AuthOutcome::Unauthenticated,
        Some(Err(e)) => return AuthOutcome::Rejected(e),
        Some(Ok(t)) => t,
    };
    let subject = match tokens.extract_subject(token) {
        Ok(s) => s,
        Err(e) => return AuthOutcome::Rejected(e),
    };
    let user = match store.find_user_by_email(&subject) {
        Some(u) if !u.deleted => u,
        _ => return AuthOutcome::Rejected(AuthError::Unknown),
    };
    if !tokens.validate(token, &user.email) {
        return AuthOutcome::Rejected(AuthError::Expired);
    }
    AuthOutcome::Authenticated(Principal::from_user(&user))
}

/// Axum middleware wrapping every route.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let path = req.uri().path().to_string();
    let public = is_public_route(&path);

    match authenticate_headers(&state.store, &state.tokens, req.headers()) {
        AuthOutcome::Authenticated(principal) => {
            debug!(target: "careadmin::auth", %request_id, user_id = principal.user_id, path = %path, "authenticated");
            req.extensions_mut().insert(RequestContext { principal, request_id });
        }
        AuthOutcome::Unauthenticated if public => {}
        AuthOutcome::Unauthenticated => {
            debug!(target: "careadmin::auth", %request_id, path = %path, "rejected: no bearer token");
            return AppError::from(AuthError::Missing).into_response();
        }
        AuthOutcome::Rejected(reason) if public => {
            debug!(target: "careadmin::auth", %request_id, path = %path, %reason, "ignoring bad token on public route");
        }
        AuthOutcome::Rejected(reason) => {
            debug!(target: "careadmin::auth", %request_id, path = %path, %reason, "rejected");
            return AppError::from(reason).into_response();
        }
    }
    next.run(req).await
}
