//! Per-client report toggles.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{AppJson, AppState};
use crate::error::{AppError, AppResult};
use crate::identity::{require_any_role, require_house_access, RequestContext};
use crate::storage::{ROLE_ADMIN, ROLE_MANAGER};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientReportView {
    pub lookup_id: i64,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub client_id: i64,
    pub lookup_id: i64,
    pub enabled: bool,
}

fn client_house(state: &AppState, client_id: i64) -> AppResult<String> {
    state.store.get_client(client_id)
        .map(|c| c.house_code)
        .ok_or_else(|| AppError::not_found("client_not_found", format!("no client with id {}", client_id)))
}

pub async fn client_reports(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(client_id): Path<i64>,
) -> AppResult<Json<Vec<ClientReportView>>> {
    require_house_access(&ctx.principal, &client_house(&state, client_id)?)?;
    let rows = state.store.client_reports(client_id)
        .into_iter()
        .map(|(lookup, enabled)| ClientReportView { lookup_id: lookup.id, name: lookup.name, enabled })
        .collect();
    Ok(Json(rows))
}

pub async fn toggle_report(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(req): AppJson<ToggleRequest>,
) -> AppResult<Json<Value>> {
    require_any_role(&ctx.principal, &[ROLE_ADMIN, ROLE_MANAGER])?;
    require_house_access(&ctx.principal, &client_house(&state, req.client_id)?)?;
    let row = state.store.set_report_toggle(req.client_id, req.lookup_id, req.enabled)?;
    info!(
        target: "careadmin::storage",
        request_id = %ctx.request_id, user_id = ctx.principal.user_id,
        client_id = row.client_id, lookup_id = row.lookup_id, enabled = row.enabled,
        "report toggled"
    );
    Ok(Json(json!({ "success": true, "enabled": row.enabled })))
}
