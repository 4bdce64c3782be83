//! Profile and admin user management.

use std::collections::BTreeSet;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{AppJson, AppState};
use crate::error::{AppError, AppResult};
use crate::identity::{require_any_role, RequestContext};
use crate::storage::{UserRecord, ROLE_ADMIN, ROLE_MANAGER};

/// Client-facing view of a user; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub roles: BTreeSet<String>,
    pub house_code: BTreeSet<String>,
}

impl From<UserRecord> for UserView {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            mobile: u.mobile,
            roles: u.roles,
            house_code: u.house_codes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolesRequest {
    pub user_id: i64,
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    pub user_id: i64,
}

pub async fn profile(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<UserView>> {
    let user = state.store.get_user(ctx.principal.user_id)
        .ok_or_else(|| AppError::not_found("user_not_found", "no such user"))?;
    Ok(Json(user.into()))
}

pub async fn list_users(State(state): State<AppState>, ctx: RequestContext) -> AppResult<Json<Vec<UserView>>> {
    require_any_role(&ctx.principal, &[ROLE_ADMIN, ROLE_MANAGER])?;
    Ok(Json(state.store.list_users().into_iter().map(UserView::from).collect()))
}

pub async fn update_roles(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(req): AppJson<UpdateRolesRequest>,
) -> AppResult<Json<Value>> {
    require_any_role(&ctx.principal, &[ROLE_ADMIN])?;
    let roles: BTreeSet<String> = req.roles.iter().map(|r| r.trim().to_ascii_uppercase()).filter(|r| !r.is_empty()).collect();
    if roles.is_empty() {
        return Err(AppError::validation("roles", "at least one role is required"));
    }
    if req.user_id == ctx.principal.user_id && !roles.contains(ROLE_ADMIN) {
        return Err(AppError::user("cannot_demote_self", "admins cannot remove their own admin role"));
    }
    let user = state.store.set_user_roles(req.user_id, roles)?;
    info!(target: "careadmin::auth", by = ctx.principal.user_id, user_id = user.id, roles = ?user.roles, "roles updated");
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(req): AppJson<DeleteUserRequest>,
) -> AppResult<Json<Value>> {
    require_any_role(&ctx.principal, &[ROLE_ADMIN])?;
    if req.user_id == ctx.principal.user_id {
        return Err(AppError::user("cannot_delete_self", "admins cannot delete their own account"));
    }
    state.store.soft_delete_user(req.user_id)?;
    info!(target: "careadmin::auth", by = ctx.principal.user_id, user_id = req.user_id, "user deleted");
    Ok(Json(json!({ "success": true })))
}
