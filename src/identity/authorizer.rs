use tracing::debug;

use super::Principal;
use crate::error::{AppError, AppResult};

/// Capability gate declared by each handler: the principal needs at least one
/// of `roles`.
pub fn require_any_role(principal: &Principal, roles: &[&str]) -> AppResult<()> {
    if roles.iter().any(|r| principal.has_role(r)) {
        return Ok(());
    }
    debug!(target: "careadmin::auth", user_id = principal.user_id, required = ?roles, "role check failed");
    Err(AppError::forbidden("insufficient_role", "you do not have permission to perform this action"))
}

/// Tenancy gate: non-admins only reach houses they are a member of.
pub fn require_house_access(principal: &Principal, house_code: &str) -> AppResult<()> {
    if principal.can_access_house(house_code) {
        return Ok(());
    }
    debug!(target: "careadmin::auth", user_id = principal.user_id, house = house_code, "house access denied");
    Err(AppError::forbidden("house_access_denied", "you are not a member of this house"))
}
