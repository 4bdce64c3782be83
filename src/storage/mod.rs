//!
//! careadmin storage module
//! ------------------------
//! Typed, in-process record store for users, roles, clients, lookups, report
//! toggles and blob records. All tables live behind a single `RwLock`; every
//! mutation runs under the write lock and, when the store is rooted at a data
//! directory, is followed by a JSON snapshot written via temp file + rename.
//!
//! Key responsibilities:
//! - Credential lookups (by email, by id) for the authenticator and login.
//! - Atomic single-row upserts for report toggles.
//! - Blob record lookups for the resource locator.
//! - First-run bootstrap (roles, lookups, admin) and optional seed import.
//!
//! The public API centers around the `Store` type, which is usually wrapped in a
//! cloneable `SharedStore` (`Arc<Store>`) elsewhere in the codebase.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

mod snapshot;
pub mod users;
pub mod lookups;
pub mod reports;
pub mod resources;

pub use users::{NewUser, RoleRecord, UserRecord, ROLE_ADMIN, ROLE_MANAGER, ROLE_STAFF};
pub use lookups::{LookupCategory, LookupEntry};
pub use reports::ClientReportToggle;
pub use resources::{ClientRecord, EmergencyPlanRecord, HouseImageRecord, PlanBlobField, ResourceOwner};
pub use snapshot::SeedFile;

/// Every table the service keeps. Serialized as-is for snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub users: BTreeMap<i64, UserRecord>,
    pub roles: BTreeMap<i64, RoleRecord>,
    pub clients: BTreeMap<i64, ClientRecord>,
    pub lookups: BTreeMap<i64, LookupEntry>,
    pub report_toggles: Vec<ClientReportToggle>,
    pub emergency_plans: Vec<EmergencyPlanRecord>,
    pub house_images: BTreeMap<String, HouseImageRecord>,
    next_id: i64,
}

impl Tables {
    pub(crate) fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct Store {
    tables: RwLock<Tables>,
    /// Data directory holding the snapshot; `None` keeps everything in memory.
    root: Option<PathBuf>,
}

impl Store {
    /// Create an empty, purely in-memory store.
    pub fn in_memory() -> Self {
        Self { tables: RwLock::new(Tables::default()), root: None }
    }

    /// Open a store rooted at `root`, loading the snapshot if one exists.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let tables = snapshot::load(&root)?;
        Ok(Self { tables: RwLock::new(tables), root: Some(root) })
    }

    /// Run `f` against a read view of the tables.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let guard = self.tables.read();
        f(&guard)
    }

    /// Run `f` under the write lock against a working copy of the tables.
    /// The copy replaces the live tables only once `f` succeeds and, for a
    /// rooted store, its snapshot is on disk; otherwise nothing changes.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self.tables.write();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(root) = &self.root {
            snapshot::persist(root, &next)?;
        }
        *guard = next;
        Ok(out)
    }
}

#[derive(Clone)]
pub struct SharedStore(pub Arc<Store>);

impl SharedStore {
    pub fn new(store: Store) -> Self { Self(Arc::new(store)) }
}

impl Deref for SharedStore {
    type Target = Store;
    fn deref(&self) -> &Store { &self.0 }
}
