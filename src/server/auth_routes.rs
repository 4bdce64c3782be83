//! Public endpoints: health, login, registration.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::{AppJson, AppState};
use crate::error::AppResult;
use crate::identity::{self, LoginRequest, LoginResponse, RegisterRequest, RequestContext};

pub async fn health() -> &'static str { "ok" }

pub async fn login(State(state): State<AppState>, AppJson(req): AppJson<LoginRequest>) -> AppResult<Json<LoginResponse>> {
    let resp = tokio::task::spawn_blocking(move || identity::login(&state.store, &state.tokens, &req))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(Json(resp))
}

/// Anonymous callers self-register as staff; an authenticated admin may
/// assign roles and houses in the same call.
pub async fn register(
    State(state): State<AppState>,
    ctx: Option<RequestContext>,
    AppJson(req): AppJson<RegisterRequest>,
) -> AppResult<Json<Value>> {
    let caller = ctx.map(|c| c.principal);
    let user = tokio::task::spawn_blocking(move || identity::register(&state.store, &req, caller.as_ref()))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(Json(json!({ "success": true, "id": user.id })))
}
