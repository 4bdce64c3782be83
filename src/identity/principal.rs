use std::collections::BTreeSet;
use std::sync::Arc;

use crate::storage::{UserRecord, ROLE_ADMIN};

/// Authenticated identity bound to a single request. Role and house sets are
/// fixed at authentication time and shared, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    roles: Arc<BTreeSet<String>>,
    house_codes: Arc<BTreeSet<String>>,
}

impl Principal {
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles: Arc::new(user.roles.clone()),
            house_codes: Arc::new(user.house_codes.clone()),
        }
    }

    pub fn roles(&self) -> &BTreeSet<String> { &self.roles }

    pub fn house_codes(&self) -> &BTreeSet<String> { &self.house_codes }

    pub fn has_role(&self, role: &str) -> bool { self.roles.contains(role) }

    pub fn is_admin(&self) -> bool { self.has_role(ROLE_ADMIN) }

    /// Admins reach every house; everyone else only their memberships.
    pub fn can_access_house(&self, house_code: &str) -> bool {
        self.is_admin() || self.house_codes.contains(house_code)
    }
}
