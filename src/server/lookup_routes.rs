use axum::extract::{Path, State};
use axum::Json;

use super::AppState;
use crate::error::AppResult;
use crate::storage::{LookupCategory, LookupEntry, RoleRecord};

pub async fn list_roles(State(state): State<AppState>) -> Json<Vec<RoleRecord>> {
    Json(state.store.list_roles())
}

/// Active entries of one category; unknown categories are a 400.
pub async fn list_lookups(State(state): State<AppState>, Path(category): Path<String>) -> AppResult<Json<Vec<LookupEntry>>> {
    let category: LookupCategory = category.parse()?;
    Ok(Json(state.store.list_lookups(category)))
}
