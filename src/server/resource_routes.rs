//! Signed blob URLs for emergency plans, handouts and house images.
//!
//! Every handler resolves the owning house first and checks tenancy before
//! touching the blob records, so a foreign house is a 403 whether or not
//! anything is stored for it.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{AppJson, AppState};
use crate::blob::{Permissions, ResourceKey, ResourceKind, ResourceLocator};
use crate::error::{AppError, AppResult};
use crate::identity::{require_any_role, require_house_access, RequestContext};
use crate::storage::{ResourceOwner, ROLE_ADMIN, ROLE_MANAGER};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceRequest {
    pub client_id: Option<i64>,
    pub house_code: Option<String>,
    pub kind: Option<ResourceKind>,
}

impl ResourceRequest {
    /// `clientId` wins when both identifiers are present.
    fn owner(&self) -> AppResult<ResourceOwner> {
        if let Some(id) = self.client_id {
            return Ok(ResourceOwner::Client(id));
        }
        match self.house_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Ok(ResourceOwner::House(code.to_string())),
            _ => Err(AppError::validation("houseCode", "either clientId or houseCode is required")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

fn authorize_key(state: &AppState, ctx: &RequestContext, key: &ResourceKey) -> AppResult<()> {
    let house = ResourceLocator::new(&state.store).house_code_of(&key.owner)?;
    require_house_access(&ctx.principal, &house)
}

fn signed_read(state: &AppState, ctx: &RequestContext, key: ResourceKey) -> AppResult<Json<SignedUrlResponse>> {
    authorize_key(state, ctx, &key)?;
    let location = ResourceLocator::new(&state.store).locate(&key)?;
    let grant = state.signer.sign(&location, Permissions::READ, state.sas_ttl)?;
    info!(
        target: "careadmin::blob",
        request_id = %ctx.request_id, user_id = ctx.principal.user_id,
        owner = %key.owner, kind = ?key.kind, "issued read url"
    );
    Ok(Json(SignedUrlResponse { success: true, url: grant.url, blob_name: None, expires_at: grant.expires_at }))
}

pub async fn get_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(req): AppJson<ResourceRequest>,
) -> AppResult<Json<SignedUrlResponse>> {
    let key = ResourceKey::new(req.owner()?, req.kind.unwrap_or(ResourceKind::EmergencyPlan));
    signed_read(&state, &ctx, key)
}

pub async fn get_image(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(req): AppJson<ResourceRequest>,
) -> AppResult<Json<SignedUrlResponse>> {
    let code = match req.house_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => return Err(AppError::validation("houseCode", "houseCode is required")),
    };
    signed_read(&state, &ctx, ResourceKey::new(ResourceOwner::House(code), ResourceKind::HouseImage))
}

pub async fn upload_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(req): AppJson<ResourceRequest>,
) -> AppResult<Json<SignedUrlResponse>> {
    require_any_role(&ctx.principal, &[ROLE_ADMIN, ROLE_MANAGER])?;
    let kind = req.kind.ok_or_else(|| AppError::validation("kind", "kind is required"))?;
    let key = ResourceKey::new(req.owner()?, kind);
    authorize_key(&state, &ctx, &key)?;
    let location = ResourceLocator::new(&state.store).upload_target(&key)?;
    let grant = state.signer.sign(&location, Permissions::WRITE, state.sas_ttl)?;
    info!(
        target: "careadmin::blob",
        request_id = %ctx.request_id, user_id = ctx.principal.user_id,
        owner = %key.owner, kind = ?key.kind, blob = %location.blob_name, "issued upload url"
    );
    Ok(Json(SignedUrlResponse {
        success: true,
        url: grant.url,
        blob_name: Some(location.blob_name),
        expires_at: grant.expires_at,
    }))
}
