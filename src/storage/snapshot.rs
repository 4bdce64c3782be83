use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ClientRecord, EmergencyPlanRecord, HouseImageRecord, Store, Tables};

const SNAPSHOT_FILE: &str = "careadmin.json";

fn snapshot_path(root: &Path) -> PathBuf { root.join(SNAPSHOT_FILE) }

pub(super) fn load(root: &Path) -> Result<Tables> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create or access data directory: {}", root.display()))?;
    let p = snapshot_path(root);
    if !p.exists() {
        debug!(target: "careadmin::storage", "no snapshot at '{}', starting empty", p.display());
        return Ok(Tables::default());
    }
    let text = fs::read_to_string(&p).with_context(|| format!("reading snapshot {}", p.display()))?;
    let tables: Tables = serde_json::from_str(&text).with_context(|| format!("parsing snapshot {}", p.display()))?;
    info!(target: "careadmin::storage", users = tables.users.len(), clients = tables.clients.len(), "loaded snapshot");
    Ok(tables)
}

pub(super) fn persist(root: &Path, tables: &Tables) -> Result<()> {
    let p = snapshot_path(root);
    let tmp = p.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(tables)?;
    fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &p).with_context(|| format!("replacing {}", p.display()))?;
    Ok(())
}

/// Optional seed data imported at startup (houses' clients, plans, images).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedFile {
    pub clients: Vec<ClientRecord>,
    pub emergency_plans: Vec<EmergencyPlanRecord>,
    pub house_images: Vec<HouseImageRecord>,
}

impl SeedFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing seed file {}", path.display()))
    }
}

impl Store {
    /// Merge seed rows into the store. Clients go first so client-owned plans resolve.
    pub fn import_seed(&self, seed: SeedFile) -> Result<()> {
        let (nc, np, ni) = (seed.clients.len(), seed.emergency_plans.len(), seed.house_images.len());
        for c in seed.clients { self.upsert_client(c)?; }
        for p in seed.emergency_plans { self.upsert_emergency_plan(p)?; }
        for i in seed.house_images { self.upsert_house_image(i)?; }
        info!(target: "startup", clients = nc, plans = np, images = ni, "seed data imported");
        Ok(())
    }
}
