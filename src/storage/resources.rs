//! Clients, emergency plan records and house image records.
//!
//! These rows only name blobs; the blobs themselves live in external storage
//! and are reached through signed URLs.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::Store;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: i64,
    pub house_code: String,
    pub first_name: String,
    pub last_name: String,
}

/// Who a stored blob belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceOwner {
    House(String),
    Client(i64),
}

impl std::fmt::Display for ResourceOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceOwner::House(code) => write!(f, "house {}", code),
            ResourceOwner::Client(id) => write!(f, "client {}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyPlanRecord {
    pub owner: ResourceOwner,
    #[serde(default)]
    pub plan_blob: Option<String>,
    #[serde(default)]
    pub handout_blob: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HouseImageRecord {
    pub house_code: String,
    #[serde(default)]
    pub image_blob: Option<String>,
    #[serde(default)]
    pub thumbnail_blob: Option<String>,
}

/// Which blob field of an `EmergencyPlanRecord` an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanBlobField {
    Plan,
    Handout,
}

impl PlanBlobField {
    fn slot(self, rec: &mut EmergencyPlanRecord) -> &mut Option<String> {
        match self {
            PlanBlobField::Plan => &mut rec.plan_blob,
            PlanBlobField::Handout => &mut rec.handout_blob,
        }
    }
}

fn stored_name(slot: &Option<String>) -> Option<String> {
    slot.as_ref().filter(|s| !s.is_empty()).cloned()
}

impl Store {
    pub fn get_client(&self, id: i64) -> Option<ClientRecord> {
        self.read(|t| t.clients.get(&id).cloned())
    }

    pub fn upsert_client(&self, client: ClientRecord) -> Result<()> {
        self.write(|t| {
            t.clients.insert(client.id, client);
            Ok(())
        })
    }

    pub fn emergency_plan(&self, owner: &ResourceOwner) -> Option<EmergencyPlanRecord> {
        self.read(|t| t.emergency_plans.iter().find(|p| &p.owner == owner).cloned())
    }

    pub fn house_image(&self, house_code: &str) -> Option<HouseImageRecord> {
        self.read(|t| t.house_images.get(house_code).cloned())
    }

    /// Replace or insert the plan record for its owner.
    pub fn upsert_emergency_plan(&self, rec: EmergencyPlanRecord) -> Result<()> {
        if let ResourceOwner::Client(id) = rec.owner {
            if self.get_client(id).is_none() {
                return Err(AppError::not_found("client_not_found".to_string(), format!("no client with id {}", id)).into());
            }
        }
        self.write(|t| {
            match t.emergency_plans.iter_mut().find(|p| p.owner == rec.owner) {
                Some(existing) => *existing = rec,
                None => t.emergency_plans.push(rec),
            }
            Ok(())
        })
    }

    pub fn upsert_house_image(&self, rec: HouseImageRecord) -> Result<()> {
        self.write(|t| {
            t.house_images.insert(rec.house_code.clone(), rec);
            Ok(())
        })
    }

    /// Blob name in `field` of the owner's plan record, recording `derive()`
    /// first if the field is empty. Check and assignment share one write lock,
    /// so concurrent callers see the same name. The flag is true when the
    /// name was newly assigned.
    pub fn claim_plan_blob(
        &self,
        owner: &ResourceOwner,
        field: PlanBlobField,
        derive: impl FnOnce() -> String,
    ) -> Result<(String, bool)> {
        let existing = self.read(|t| {
            t.emergency_plans.iter().find(|p| &p.owner == owner).and_then(|p| match field {
                PlanBlobField::Plan => stored_name(&p.plan_blob),
                PlanBlobField::Handout => stored_name(&p.handout_blob),
            })
        });
        if let Some(name) = existing {
            return Ok((name, false));
        }
        self.write(|t| {
            if let ResourceOwner::Client(id) = owner {
                if !t.clients.contains_key(id) {
                    return Err(AppError::not_found("client_not_found", format!("no client with id {}", id)).into());
                }
            }
            let idx = match t.emergency_plans.iter().position(|p| &p.owner == owner) {
                Some(i) => i,
                None => {
                    t.emergency_plans.push(EmergencyPlanRecord { owner: owner.clone(), plan_blob: None, handout_blob: None });
                    t.emergency_plans.len() - 1
                }
            };
            let slot = field.slot(&mut t.emergency_plans[idx]);
            if let Some(name) = stored_name(slot) {
                return Ok((name, false));
            }
            let name = derive();
            *slot = Some(name.clone());
            Ok((name, true))
        })
    }

    /// House-image counterpart of `claim_plan_blob`, for the main image field.
    pub fn claim_house_image(&self, house_code: &str, derive: impl FnOnce() -> String) -> Result<(String, bool)> {
        if let Some(name) = self.read(|t| t.house_images.get(house_code).and_then(|r| stored_name(&r.image_blob))) {
            return Ok((name, false));
        }
        self.write(|t| {
            let rec = t.house_images.entry(house_code.to_string()).or_insert_with(|| HouseImageRecord {
                house_code: house_code.to_string(),
                image_blob: None,
                thumbnail_blob: None,
            });
            if let Some(name) = stored_name(&rec.image_blob) {
                return Ok((name, false));
            }
            let name = derive();
            rec.image_blob = Some(name.clone());
            Ok((name, true))
        })
    }
}
