//!
//! careadmin server binary
//! -----------------------
//! Command-line entry point for the careadmin HTTP API. Configuration comes
//! from CLI flags and environment variables; see `careadmin::config`.

use anyhow::Result;
use std::env;

use careadmin::config::{has_flag, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("careadmin Server\n\nUSAGE:\n  careadmin_server [--http-port N] [--data-dir PATH] [--seed FILE] [--dev]\n\nOPTIONS:\n  --http-port N     HTTP API port (env: CAREADMIN_HTTP_PORT, default 7878)\n  --data-dir PATH   Snapshot folder (env: CAREADMIN_DATA_DIR, default data)\n  --seed FILE       JSON seed of clients, plans and images (env: CAREADMIN_SEED_FILE)\n  --dev             Generate throwaway secrets instead of requiring\n                    CAREADMIN_JWT_SECRET, CAREADMIN_STORAGE_KEY and CAREADMIN_ADMIN_PASSWORD\n");
        return Ok(());
    }

    let cfg = ServerConfig::from_env_and_args(&args)?;
    if has_flag(&args, "--dev") {
        tracing::warn!(target: "startup", "running with --dev: secrets are generated and not stable across restarts");
    }
    careadmin::server::run_with_config(cfg).await
}
