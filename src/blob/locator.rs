//! Maps a logical resource key to the blob that backs it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::BlobLocation;
use crate::error::{AppError, AppResult};
use crate::storage::{PlanBlobField, ResourceOwner, Store};

pub const PLAN_CONTAINER: &str = "emergency-plans";
pub const IMAGE_CONTAINER: &str = "house-images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    EmergencyPlan,
    EmergencyHandout,
    HouseImage,
}

impl ResourceKind {
    pub fn container(self) -> &'static str {
        match self {
            ResourceKind::EmergencyPlan | ResourceKind::EmergencyHandout => PLAN_CONTAINER,
            ResourceKind::HouseImage => IMAGE_CONTAINER,
        }
    }

    fn stem_and_ext(self) -> (&'static str, &'static str) {
        match self {
            ResourceKind::EmergencyPlan => ("plan", "pdf"),
            ResourceKind::EmergencyHandout => ("handout", "pdf"),
            ResourceKind::HouseImage => ("image", "jpg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub owner: ResourceOwner,
    pub kind: ResourceKind,
}

impl ResourceKey {
    pub fn new(owner: ResourceOwner, kind: ResourceKind) -> Self { Self { owner, kind } }
}

fn missing(key: &ResourceKey) -> AppError {
    AppError::not_found("resource_not_found", format!("no {:?} stored for {}", key.kind, key.owner))
}

fn house_image_owner(key: &ResourceKey) -> AppResult<&str> {
    match &key.owner {
        ResourceOwner::House(code) => Ok(code.as_str()),
        ResourceOwner::Client(_) => Err(AppError::user("invalid_resource_key", "house images are keyed by house code")),
    }
}

/// Primary field first, then the sibling field. Empty names count as unset.
fn pick(primary: &Option<String>, secondary: &Option<String>) -> Option<String> {
    let set = |f: &Option<String>| f.as_ref().filter(|s| !s.is_empty()).cloned();
    set(primary).or_else(|| set(secondary))
}

fn derive_name(house: &str, key: &ResourceKey) -> String {
    let (stem, ext) = key.kind.stem_and_ext();
    let id = Uuid::new_v4().simple();
    match &key.owner {
        ResourceOwner::House(_) => format!("{}/{}-{}.{}", house, stem, id, ext),
        ResourceOwner::Client(cid) => format!("{}/client-{}/{}-{}.{}", house, cid, stem, id, ext),
    }
}

pub struct ResourceLocator<'a> {
    store: &'a Store,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(store: &'a Store) -> Self { Self { store } }

    /// House a resource owner belongs to; clients resolve through their record.
    pub fn house_code_of(&self, owner: &ResourceOwner) -> AppResult<String> {
        match owner {
            ResourceOwner::House(code) => Ok(code.clone()),
            ResourceOwner::Client(id) => self
                .store
                .get_client(*id)
                .map(|c| c.house_code)
                .ok_or_else(|| AppError::not_found("client_not_found", format!("no client with id {}", id))),
        }
    }

    /// Resolve the blob to read for `key`.
    pub fn locate(&self, key: &ResourceKey) -> AppResult<BlobLocation> {
        let blob_name = match key.kind {
            ResourceKind::EmergencyPlan | ResourceKind::EmergencyHandout => {
                let rec = self.store.emergency_plan(&key.owner).ok_or_else(|| missing(key))?;
                if key.kind == ResourceKind::EmergencyPlan {
                    pick(&rec.plan_blob, &rec.handout_blob)
                } else {
                    pick(&rec.handout_blob, &rec.plan_blob)
                }
            }
            ResourceKind::HouseImage => {
                let code = house_image_owner(key)?;
                let rec = self.store.house_image(code).ok_or_else(|| missing(key))?;
                pick(&rec.image_blob, &rec.thumbnail_blob)
            }
        };
        let blob_name = blob_name.ok_or_else(|| missing(key))?;
        debug!(target: "careadmin::blob", owner = %key.owner, kind = ?key.kind, blob = %blob_name, "located blob");
        Ok(BlobLocation { container: key.kind.container().to_string(), blob_name })
    }

    /// Blob to write for `key`. Uses the stored name for that exact field if
    /// one exists, otherwise derives a fresh name and records it. Lookup and
    /// assignment happen under one store write, so racing uploads agree.
    pub fn upload_target(&self, key: &ResourceKey) -> AppResult<BlobLocation> {
        if key.kind == ResourceKind::HouseImage {
            house_image_owner(key)?;
        }
        let house = self.house_code_of(&key.owner)?;
        let derive = || derive_name(&house, key);
        let (blob_name, assigned) = match key.kind {
            ResourceKind::EmergencyPlan => self.store.claim_plan_blob(&key.owner, PlanBlobField::Plan, derive)?,
            ResourceKind::EmergencyHandout => self.store.claim_plan_blob(&key.owner, PlanBlobField::Handout, derive)?,
            ResourceKind::HouseImage => self.store.claim_house_image(&house, derive)?,
        };
        if assigned {
            info!(target: "careadmin::blob", owner = %key.owner, kind = ?key.kind, blob = %blob_name, "assigned blob name");
        }
        Ok(BlobLocation { container: key.kind.container().to_string(), blob_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ClientRecord, EmergencyPlanRecord, HouseImageRecord};
    use std::sync::Barrier;

    fn store() -> Store {
        let s = Store::in_memory();
        s.upsert_client(ClientRecord { id: 7, house_code: "H1".into(), first_name: "Ann".into(), last_name: "Lee".into() }).unwrap();
        s
    }

    fn plan(owner: ResourceOwner, plan: Option<&str>, handout: Option<&str>) -> EmergencyPlanRecord {
        EmergencyPlanRecord { owner, plan_blob: plan.map(String::from), handout_blob: handout.map(String::from) }
    }

    #[test]
    fn primary_field_wins() {
        let s = store();
        s.upsert_emergency_plan(plan(ResourceOwner::House("H1".into()), Some("h1/plan.pdf"), Some("h1/handout.pdf"))).unwrap();
        let loc = ResourceLocator::new(&s);
        let p = loc.locate(&ResourceKey::new(ResourceOwner::House("H1".into()), ResourceKind::EmergencyPlan)).unwrap();
        assert_eq!(p, BlobLocation { container: PLAN_CONTAINER.into(), blob_name: "h1/plan.pdf".into() });
        let h = loc.locate(&ResourceKey::new(ResourceOwner::House("H1".into()), ResourceKind::EmergencyHandout)).unwrap();
        assert_eq!(h.blob_name, "h1/handout.pdf");
    }

    #[test]
    fn falls_back_to_secondary() {
        let s = store();
        s.upsert_emergency_plan(plan(ResourceOwner::Client(7), None, Some("c7/handout.pdf"))).unwrap();
        let loc = ResourceLocator::new(&s);
        let p = loc.locate(&ResourceKey::new(ResourceOwner::Client(7), ResourceKind::EmergencyPlan)).unwrap();
        assert_eq!(p.blob_name, "c7/handout.pdf");
    }

    #[test]
    fn missing_record_or_fields_is_not_found() {
        let s = store();
        s.upsert_emergency_plan(plan(ResourceOwner::House("H2".into()), None, None)).unwrap();
        let loc = ResourceLocator::new(&s);
        for owner in [ResourceOwner::House("H1".into()), ResourceOwner::House("H2".into())] {
            let err = loc.locate(&ResourceKey::new(owner, ResourceKind::EmergencyPlan)).unwrap_err();
            assert!(matches!(err, AppError::NotFound { .. }));
            assert_eq!(err.http_status(), 400);
        }
    }

    #[test]
    fn house_image_with_thumbnail_fallback() {
        let s = store();
        s.upsert_house_image(HouseImageRecord { house_code: "H1".into(), image_blob: None, thumbnail_blob: Some("h1/thumb.jpg".into()) }).unwrap();
        let loc = ResourceLocator::new(&s);
        let l = loc.locate(&ResourceKey::new(ResourceOwner::House("H1".into()), ResourceKind::HouseImage)).unwrap();
        assert_eq!(l.container, IMAGE_CONTAINER);
        assert_eq!(l.blob_name, "h1/thumb.jpg");
        let err = loc.locate(&ResourceKey::new(ResourceOwner::Client(7), ResourceKind::HouseImage)).unwrap_err();
        assert_eq!(err.code_str(), "invalid_resource_key");
    }

    #[test]
    fn house_of_client() {
        let s = store();
        let loc = ResourceLocator::new(&s);
        assert_eq!(loc.house_code_of(&ResourceOwner::Client(7)).unwrap(), "H1");
        assert!(loc.house_code_of(&ResourceOwner::Client(8)).is_err());
    }

    #[test]
    fn upload_target_assigns_once() {
        let s = store();
        let loc = ResourceLocator::new(&s);
        let key = ResourceKey::new(ResourceOwner::Client(7), ResourceKind::EmergencyHandout);
        let first = loc.upload_target(&key).unwrap();
        assert!(first.blob_name.starts_with("H1/client-7/handout-"));
        assert_eq!(loc.upload_target(&key).unwrap(), first);
        assert_eq!(loc.locate(&key).unwrap(), first);
        // the plan field stays empty, so reading the plan falls back to the handout
        assert_eq!(s.emergency_plan(&ResourceOwner::Client(7)).unwrap().plan_blob, None);
    }

    #[test]
    fn empty_primary_falls_back_to_secondary() {
        let s = store();
        s.upsert_emergency_plan(plan(ResourceOwner::Client(7), Some(""), Some("c7/handout.pdf"))).unwrap();
        s.upsert_house_image(HouseImageRecord { house_code: "H1".into(), image_blob: Some(String::new()), thumbnail_blob: Some("h1/thumb.jpg".into()) }).unwrap();
        let loc = ResourceLocator::new(&s);
        let p = loc.locate(&ResourceKey::new(ResourceOwner::Client(7), ResourceKind::EmergencyPlan)).unwrap();
        assert_eq!(p.blob_name, "c7/handout.pdf");
        let i = loc.locate(&ResourceKey::new(ResourceOwner::House("H1".into()), ResourceKind::HouseImage)).unwrap();
        assert_eq!(i.blob_name, "h1/thumb.jpg");
    }

    #[test]
    fn upload_target_fills_an_empty_name() {
        let s = store();
        s.upsert_emergency_plan(plan(ResourceOwner::Client(7), Some(""), None)).unwrap();
        let loc = ResourceLocator::new(&s);
        let got = loc.upload_target(&ResourceKey::new(ResourceOwner::Client(7), ResourceKind::EmergencyPlan)).unwrap();
        assert!(got.blob_name.starts_with("H1/client-7/plan-"));
        assert_eq!(s.emergency_plan(&ResourceOwner::Client(7)).unwrap().plan_blob, Some(got.blob_name));
    }

    #[test]
    fn concurrent_uploads_to_both_fields_keep_both_names() {
        for _ in 0..20 {
            let s = store();
            let barrier = Barrier::new(2);
            let (p, h) = std::thread::scope(|scope| {
                let plan_thread = scope.spawn(|| {
                    barrier.wait();
                    ResourceLocator::new(&s).upload_target(&ResourceKey::new(ResourceOwner::Client(7), ResourceKind::EmergencyPlan)).unwrap()
                });
                let handout_thread = scope.spawn(|| {
                    barrier.wait();
                    ResourceLocator::new(&s).upload_target(&ResourceKey::new(ResourceOwner::Client(7), ResourceKind::EmergencyHandout)).unwrap()
                });
                (plan_thread.join().unwrap(), handout_thread.join().unwrap())
            });
            let rec = s.emergency_plan(&ResourceOwner::Client(7)).unwrap();
            assert_eq!(rec.plan_blob, Some(p.blob_name));
            assert_eq!(rec.handout_blob, Some(h.blob_name));
        }
    }

    #[test]
    fn concurrent_uploads_to_one_field_agree_on_the_name() {
        let s = store();
        let barrier = Barrier::new(8);
        let (s_ref, barrier_ref) = (&s, &barrier);
        let names: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        let (s, barrier) = (s_ref, barrier_ref);
                        barrier.wait();
                        ResourceLocator::new(s).upload_target(&ResourceKey::new(ResourceOwner::House("H1".into()), ResourceKind::HouseImage)).unwrap().blob_name
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let stored = s.house_image("H1").unwrap().image_blob.unwrap();
        assert!(names.iter().all(|n| *n == stored));
    }
}
