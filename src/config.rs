//!
//! careadmin configuration
//! -----------------------
//! Resolves `ServerConfig` from CLI flags, environment variables and defaults,
//! in that order of precedence. Secrets are never printed; `redacted()` gives a
//! loggable summary.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 5 * 60 * 60;
pub const DEFAULT_SAS_TTL_SECS: i64 = 10 * 60;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@careadmin.local";

#[derive(Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub data_dir: Option<PathBuf>,
    pub seed_file: Option<PathBuf>,
    pub jwt_secret: Vec<u8>,
    pub token_ttl_secs: i64,
    pub storage_account: String,
    /// Raw (base64-decoded) storage account key.
    pub storage_key: Vec<u8>,
    pub sas_ttl_secs: i64,
    pub admin_email: String,
    pub admin_password: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl ServerConfig {
    /// Defaults with every secret left empty.
    fn defaults() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            data_dir: None,
            seed_file: None,
            jwt_secret: Vec::new(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            storage_account: "devstoreaccount1".to_string(),
            storage_key: Vec::new(),
            sas_ttl_secs: DEFAULT_SAS_TTL_SECS,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: String::new(),
        }
    }

    /// In-memory configuration with throwaway secrets. Used by tests and `--dev`.
    pub fn development() -> Result<Self> {
        Ok(Self {
            jwt_secret: random_bytes(32)?,
            storage_key: random_bytes(64)?,
            admin_password: "changeme".to_string(),
            ..Self::defaults()
        })
    }

    /// Resolve configuration from process arguments and environment.
    pub fn from_env_and_args(args: &[String]) -> Result<Self> {
        let dev = has_flag(args, "--dev");
        let mut cfg = if dev { Self::development()? } else { Self::defaults() };

        cfg.http_port = parse_port_arg(args, "--http-port")
            .or_else(|| parse_env::<u16>("CAREADMIN_HTTP_PORT"))
            .unwrap_or(DEFAULT_HTTP_PORT);
        let data_dir = parse_str_arg(args, "--data-dir")
            .or_else(|| env::var("CAREADMIN_DATA_DIR").ok())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        cfg.data_dir = Some(PathBuf::from(data_dir));
        cfg.seed_file = parse_str_arg(args, "--seed")
            .or_else(|| env::var("CAREADMIN_SEED_FILE").ok())
            .map(PathBuf::from);

        if let Ok(secret) = env::var("CAREADMIN_JWT_SECRET") {
            cfg.jwt_secret = secret.into_bytes();
        } else if !dev {
            return Err(anyhow!("CAREADMIN_JWT_SECRET must be set (or pass --dev)"));
        }
        if let Some(ttl) = parse_env::<i64>("CAREADMIN_TOKEN_TTL_SECS") { cfg.token_ttl_secs = ttl; }

        if let Ok(account) = env::var("CAREADMIN_STORAGE_ACCOUNT") { cfg.storage_account = account; }
        if let Ok(key) = env::var("CAREADMIN_STORAGE_KEY") {
            cfg.storage_key = base64::engine::general_purpose::STANDARD
                .decode(key.trim())
                .context("CAREADMIN_STORAGE_KEY is not valid base64")?;
        } else if !dev {
            return Err(anyhow!("CAREADMIN_STORAGE_KEY must be set (or pass --dev)"));
        }
        if let Some(ttl) = parse_env::<i64>("CAREADMIN_SAS_TTL_SECS") { cfg.sas_ttl_secs = ttl; }

        if let Ok(email) = env::var("CAREADMIN_ADMIN_EMAIL") { cfg.admin_email = email; }
        if let Ok(pw) = env::var("CAREADMIN_ADMIN_PASSWORD") {
            cfg.admin_password = pw;
        } else if !dev {
            return Err(anyhow!("CAREADMIN_ADMIN_PASSWORD must be set (or pass --dev)"));
        }

        if cfg.token_ttl_secs <= 0 || cfg.sas_ttl_secs <= 0 {
            return Err(anyhow!("token and SAS lifetimes must be positive"));
        }
        Ok(cfg)
    }

    pub fn redacted(&self) -> String {
        format!(
            "ServerConfig {{ http_port: {}, data_dir: {:?}, seed_file: {:?}, token_ttl_secs: {}, storage_account: {}, sas_ttl_secs: {}, admin_email: {}, secrets: <redacted> }}",
            self.http_port, self.data_dir, self.seed_file, self.token_ttl_secs, self.storage_account, self.sas_ttl_secs, self.admin_email
        )
    }
}

fn random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("failed to generate random secret: {}", e))?;
    Ok(buf)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    parse_str_arg(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).filter(|v| !v.starts_with("--")).cloned()
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
