//! Shared-key service SAS for blob reads and writes.
//!
//! The string-to-sign follows the blob service SAS layout for version
//! `2021-08-06`: permissions, start, expiry, canonical resource, identifier,
//! IP, protocol, version, resource type, snapshot time, encryption scope and
//! the five response-header overrides, newline-joined. Unused fields are empty.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;

use crate::clock::Clock;

pub const SAS_VERSION: &str = "2021-08-06";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub list: bool,
}

impl Permissions {
    pub const READ: Permissions = Permissions { read: true, write: false, list: false };
    pub const WRITE: Permissions = Permissions { read: false, write: true, list: false };

    /// Canonical `sp` value: letters in service order.
    pub fn as_sas(&self) -> String {
        let mut s = String::with_capacity(3);
        if self.read { s.push('r'); }
        if self.write { s.push('w'); }
        if self.list { s.push('l'); }
        s
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.as_sas()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub container: String,
    pub blob_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAccessGrant {
    /// Unsigned blob URI.
    pub blob_uri: String,
    /// `blob_uri` with the SAS query appended.
    pub url: String,
    pub expires_at: DateTime<Utc>,
    pub permissions: Permissions,
}

/// Mints access grants. Kept object-safe so tests can substitute a fake.
pub trait AccessSigner: Send + Sync {
    fn sign(&self, location: &BlobLocation, permissions: Permissions, ttl: Duration) -> Result<SignedAccessGrant>;
}

pub struct SharedKeySigner {
    account: String,
    key: Vec<u8>,
    endpoint: String,
    clock: Arc<dyn Clock>,
}

fn encode_blob_path(name: &str) -> String {
    name.split('/').map(|seg| urlencoding::encode(seg).into_owned()).collect::<Vec<_>>().join("/")
}

impl SharedKeySigner {
    pub fn new(account: impl Into<String>, key: Vec<u8>, clock: Arc<dyn Clock>) -> Self {
        let account = account.into();
        let endpoint = format!("https://{}.blob.core.windows.net", account);
        Self { account, key, endpoint, clock }
    }

    /// Point at a non-default endpoint (emulator, sovereign cloud).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn string_to_sign(&self, location: &BlobLocation, sp: &str, se: &str) -> String {
        let canonical = format!("/blob/{}/{}/{}", self.account, location.container, location.blob_name);
        [
            sp, "", se, canonical.as_str(), "", "", "https", SAS_VERSION, "b", "", "", "", "", "", "", "",
        ]
        .join("\n")
    }

    fn signature(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| anyhow!("invalid storage key: {}", e))?;
        mac.update(payload.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl AccessSigner for SharedKeySigner {
    fn sign(&self, location: &BlobLocation, permissions: Permissions, ttl: Duration) -> Result<SignedAccessGrant> {
        if location.blob_name.is_empty() {
            return Err(anyhow!("cannot sign an empty blob name"));
        }
        let sp = permissions.as_sas();
        if sp.is_empty() {
            return Err(anyhow!("at least one permission is required"));
        }
        let expires_at = self.clock.now() + ttl;
        let se = expires_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let sig = self.signature(&self.string_to_sign(location, &sp, &se))?;

        let blob_uri = format!("{}/{}/{}", self.endpoint, location.container, encode_blob_path(&location.blob_name));
        let url = format!(
            "{}?sv={}&se={}&sr=b&sp={}&spr=https&sig={}",
            blob_uri,
            SAS_VERSION,
            urlencoding::encode(&se),
            sp,
            urlencoding::encode(&sig)
        );
        debug!(target: "careadmin::blob", container = %location.container, blob = %location.blob_name, sp = %sp, se = %se, "signed access url");
        Ok(SignedAccessGrant { blob_uri, url, expires_at, permissions })
    }
}
