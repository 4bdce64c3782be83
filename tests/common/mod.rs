//! Shared harness for the HTTP integration tests: an in-memory store with a
//! small seeded estate, the real router on an ephemeral port, and a recording
//! signer standing in for blob storage.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use careadmin::blob::{AccessSigner, BlobLocation, Permissions, SignedAccessGrant};
use careadmin::clock::SystemClock;
use careadmin::config::ServerConfig;
use careadmin::identity::TokenService;
use careadmin::server::{bootstrap, build_router, AppState};
use careadmin::storage::{ClientRecord, EmergencyPlanRecord, HouseImageRecord, ResourceOwner, SeedFile, SharedStore, Store};

/// Deterministic signer that remembers every request.
#[derive(Default)]
pub struct FakeSigner {
    pub calls: Mutex<Vec<(BlobLocation, Permissions)>>,
}

impl AccessSigner for FakeSigner {
    fn sign(&self, location: &BlobLocation, permissions: Permissions, ttl: Duration) -> anyhow::Result<SignedAccessGrant> {
        self.calls.lock().push((location.clone(), permissions));
        let blob_uri = format!("https://fake.blob/{}/{}", location.container, location.blob_name);
        Ok(SignedAccessGrant {
            url: format!("{}?sp={}&sig=fake", blob_uri, permissions.as_sas()),
            blob_uri,
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap() + ttl,
            permissions,
        })
    }
}

struct AbortOnDrop(JoinHandle<()>);
impl Drop for AbortOnDrop { fn drop(&mut self) { self.0.abort(); } }

pub struct TestApp {
    pub base: String,
    pub client: reqwest::Client,
    pub store: SharedStore,
    pub admin_email: String,
    pub admin_password: String,
    _server: AbortOnDrop,
}

/// Clients 1 and 2 live in H1, client 3 in H2. H1 has a plan and an image;
/// client 1 only has a handout; H2 has a record with no blobs at all.
pub fn seed() -> SeedFile {
    let client = |id, house: &str| ClientRecord { id, house_code: house.into(), first_name: format!("Client{}", id), last_name: "Test".into() };
    SeedFile {
        clients: vec![client(1, "H1"), client(2, "H1"), client(3, "H2")],
        emergency_plans: vec![
            EmergencyPlanRecord { owner: ResourceOwner::House("H1".into()), plan_blob: Some("H1/plan.pdf".into()), handout_blob: None },
            EmergencyPlanRecord { owner: ResourceOwner::Client(1), plan_blob: None, handout_blob: Some("H1/client-1/handout.pdf".into()) },
            EmergencyPlanRecord { owner: ResourceOwner::House("H2".into()), plan_blob: None, handout_blob: None },
        ],
        house_images: vec![HouseImageRecord { house_code: "H1".into(), image_blob: Some("H1/front.jpg".into()), thumbnail_blob: None }],
    }
}

pub async fn spawn_app(signer: Arc<dyn AccessSigner>) -> TestApp {
    let cfg = ServerConfig::development().expect("dev config");
    let store = Store::in_memory();
    bootstrap(&store, &cfg).expect("bootstrap");
    store.import_seed(seed()).expect("seed");
    let store = SharedStore::new(store);

    let tokens = Arc::new(TokenService::new(&cfg.jwt_secret, Duration::seconds(cfg.token_ttl_secs), Arc::new(SystemClock)));
    let state = AppState::new(store.clone(), tokens, signer, Duration::minutes(10));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, build_router(state)).await;
    });

    TestApp {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        store,
        admin_email: cfg.admin_email,
        admin_password: cfg.admin_password,
        _server: AbortOnDrop(handle),
    }
}

async fn decode(resp: reqwest::Response) -> (u16, Value) {
    let status = resp.status().as_u16();
    let text = resp.text().await.expect("body");
    (status, serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

impl TestApp {
    pub async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        let mut req = self.client.get(format!("{}{}", self.base, path));
        if let Some(t) = token { req = req.bearer_auth(t); }
        decode(req.send().await.expect("send")).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        let mut req = self.client.post(format!("{}{}", self.base, path)).json(&body);
        if let Some(t) = token { req = req.bearer_auth(t); }
        decode(req.send().await.expect("send")).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self.post("/login", None, json!({ "email": email, "password": password })).await;
        assert_eq!(status, 200, "login failed: {}", body);
        body["jwt"].as_str().expect("jwt").to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(&self.admin_email, &self.admin_password).await
    }

    /// Create a user through the admin registration path and return its token.
    pub async fn user_with(&self, email: &str, roles: &[&str], houses: &[&str]) -> String {
        let admin = self.admin_token().await;
        let (status, body) = self.post("/register", Some(&admin), json!({
            "email": email,
            "password": "secret-pw",
            "firstName": "Test",
            "lastName": "User",
            "roles": roles,
            "houseCode": houses,
        })).await;
        assert_eq!(status, 200, "register failed: {}", body);
        self.login(email, "secret-pw").await
    }
}
