//! Credential store: users, role memberships and house memberships.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Store, Tables};
use crate::error::AppError;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_MANAGER: &str = "MANAGER";
pub const ROLE_STAFF: &str = "STAFF";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub house_codes: BTreeSet<String>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a user. The password must already be hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub roles: BTreeSet<String>,
    pub house_codes: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn email_key(email: &str) -> String { email.trim().to_ascii_lowercase() }

fn find_by_email<'a>(t: &'a Tables, email: &str) -> Option<&'a UserRecord> {
    let key = email_key(email);
    t.users.values().find(|u| email_key(&u.email) == key)
}

impl Store {
    pub fn find_user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.read(|t| find_by_email(t, email).cloned())
    }

    pub fn get_user(&self, id: i64) -> Option<UserRecord> {
        self.read(|t| t.users.get(&id).cloned())
    }

    pub fn list_users(&self) -> Vec<UserRecord> {
        self.read(|t| t.users.values().filter(|u| !u.deleted).cloned().collect())
    }

    /// Insert a new user. Emails are unique ignoring case, deleted users included.
    pub fn insert_user(&self, new: NewUser) -> Result<UserRecord> {
        self.write(|t| {
            if find_by_email(t, &new.email).is_some() {
                return Err(AppError::conflict("duplicate_email", "email is already registered").into());
            }
            let now = Utc::now();
            let rec = UserRecord {
                id: t.next_id(),
                email: new.email.trim().to_string(),
                password_hash: new.password_hash,
                first_name: new.first_name,
                last_name: new.last_name,
                phone: new.phone,
                mobile: new.mobile,
                roles: new.roles,
                house_codes: new.house_codes,
                deleted: false,
                created_at: now,
                updated_at: now,
            };
            t.users.insert(rec.id, rec.clone());
            Ok(rec)
        })
    }

    pub fn set_user_roles(&self, id: i64, roles: BTreeSet<String>) -> Result<UserRecord> {
        self.write(|t| {
            let known: BTreeSet<&str> = t.roles.values().map(|r| r.name.as_str()).collect();
            if let Some(bad) = roles.iter().find(|r| !known.contains(r.as_str())) {
                return Err(AppError::validation("roles".to_string(), format!("unknown role '{}'", bad)).into());
            }
            let user = t.users.get_mut(&id).filter(|u| !u.deleted)
                .ok_or_else(|| AppError::not_found("user_not_found", "no such user"))?;
            user.roles = roles;
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }

    pub fn soft_delete_user(&self, id: i64) -> Result<()> {
        self.write(|t| {
            let user = t.users.get_mut(&id).filter(|u| !u.deleted)
                .ok_or_else(|| AppError::not_found("user_not_found", "no such user"))?;
            user.deleted = true;
            user.updated_at = Utc::now();
            info!(target: "careadmin::storage", user_id = id, "user soft-deleted");
            Ok(())
        })
    }

    pub fn list_roles(&self) -> Vec<RoleRecord> {
        self.read(|t| t.roles.values().cloned().collect())
    }

    pub fn role_exists(&self, name: &str) -> bool {
        self.read(|t| t.roles.values().any(|r| r.name == name))
    }

    /// Seed the built-in roles if the roles table is empty.
    pub fn ensure_default_roles(&self) -> Result<()> {
        if self.read(|t| !t.roles.is_empty()) { return Ok(()); }
        self.write(|t| {
            for (name, description) in [
                (ROLE_ADMIN, "Full administrative access across all houses"),
                (ROLE_MANAGER, "Manages staff, reports and plans for assigned houses"),
                (ROLE_STAFF, "Care staff with read access to assigned houses"),
            ] {
                let id = t.next_id();
                t.roles.insert(id, RoleRecord { id, name: name.to_string(), description: description.to_string() });
            }
            Ok(())
        })
    }

    /// Create the bootstrap admin account unless any admin already exists.
    pub fn ensure_default_admin(&self, email: &str, password_hash: String) -> Result<()> {
        let has_admin = self.read(|t| t.users.values().any(|u| !u.deleted && u.roles.contains(ROLE_ADMIN)));
        if has_admin { return Ok(()); }
        let mut roles = BTreeSet::new();
        roles.insert(ROLE_ADMIN.to_string());
        self.insert_user(NewUser {
            email: email.to_string(),
            password_hash,
            first_name: "System".into(),
            last_name: "Administrator".into(),
            roles,
            ..Default::default()
        })?;
        info!(target: "startup", "created bootstrap admin account {}", email);
        Ok(())
    }
}
