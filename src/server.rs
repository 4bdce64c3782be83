//!
//! careadmin HTTP server
//! ---------------------
//! This module defines the Axum-based HTTP API for careadmin.
//!
//! Responsibilities:
//! - Shared application state (store, token service, access signer).
//! - First-run bootstrap: default roles, lookup entries, admin account, seed data.
//! - Route table, with the bearer-token authenticator wrapped around every route.
//! - Startup logging of the resolved configuration (secrets redacted).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRequest;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use crate::blob::{AccessSigner, SharedKeySigner};
use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::identity::{authenticator, TokenService};
use crate::security;
use crate::storage::{SeedFile, SharedStore, Store};

pub mod auth_routes;
pub mod lookup_routes;
pub mod report_routes;
pub mod resource_routes;
pub mod user_routes;

/// Shared server state injected into all handlers and the authenticator.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub tokens: Arc<TokenService>,
    /// Mints SAS URLs; swapped for a fake in tests.
    pub signer: Arc<dyn AccessSigner>,
    pub sas_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(store: SharedStore, tokens: Arc<TokenService>, signer: Arc<dyn AccessSigner>, sas_ttl: chrono::Duration) -> Self {
        Self { store, tokens, signer, sas_ttl }
    }

    /// Build state from configuration using the wall clock and the shared-key signer.
    pub fn from_config(cfg: &ServerConfig, store: SharedStore) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = TokenService::new(&cfg.jwt_secret, chrono::Duration::seconds(cfg.token_ttl_secs), clock.clone());
        let signer = SharedKeySigner::new(cfg.storage_account.clone(), cfg.storage_key.clone(), clock);
        Self::new(store, Arc::new(tokens), Arc::new(signer), chrono::Duration::seconds(cfg.sas_ttl_secs))
    }
}

/// JSON body extractor whose rejection uses the `{success:false}` envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Seed defaults into a fresh store. Every step is a no-op when already done.
pub fn bootstrap(store: &Store, cfg: &ServerConfig) -> anyhow::Result<()> {
    store.ensure_default_roles().context("While seeding default roles")?;
    store.ensure_default_lookups().context("While seeding default lookups")?;
    if store.find_user_by_email(&cfg.admin_email).is_none() {
        let hash = security::hash_password(&cfg.admin_password)?;
        store.ensure_default_admin(&cfg.admin_email, hash)
            .with_context(|| format!("While ensuring bootstrap admin {}", cfg.admin_email))?;
    }
    if let Some(seed_path) = &cfg.seed_file {
        let seed = SeedFile::from_path(seed_path)?;
        store.import_seed(seed).with_context(|| format!("While importing seed {}", seed_path.display()))?;
    }
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(auth_routes::health))
        .route("/login", post(auth_routes::login))
        .route("/register", post(auth_routes::register))
        .route("/roles/list", get(lookup_routes::list_roles))
        .route("/lookup/{category}", get(lookup_routes::list_lookups))
        .route("/clientReport/get/{client_id}", get(report_routes::client_reports))
        .route("/clientReport/toggle-report", post(report_routes::toggle_report))
        .route("/url/get", post(resource_routes::get_url))
        .route("/url/upload", post(resource_routes::upload_url))
        .route("/get-image", post(resource_routes::get_image))
        .route("/users/profile", get(user_routes::profile))
        .route("/users/list", get(user_routes::list_users))
        .route("/users/update-roles", post(user_routes::update_roles))
        .route("/users/delete", post(user_routes::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), authenticator::authenticate))
        .with_state(state)
}

fn log_startup(cfg: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    let exe = std::env::current_exe().ok();
    info!(target: "startup", "careadmin starting. cwd={:?}, exe={:?}", cwd, exe);
    info!(target: "startup", "{}", cfg.redacted());
    if cfg.data_dir.is_none() {
        warn!(target: "startup", "no data directory configured; state is in memory only");
    }
}

/// Open the store, bootstrap it and serve HTTP until interrupted.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    log_startup(&cfg);

    let store = match &cfg.data_dir {
        Some(dir) => Store::open(dir).with_context(|| format!("While opening store at {}", dir.display()))?,
        None => Store::in_memory(),
    };
    bootstrap(&store, &cfg)?;
    let store = SharedStore::new(store);
    let app = build_router(AppState::from_config(&cfg, store));

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!(target: "startup", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("While binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target: "startup", "shutdown requested");
        })
        .await?;
    Ok(())
}
