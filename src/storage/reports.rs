//! Per-client report toggles keyed by (client id, lookup id).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LookupCategory, Store};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientReportToggle {
    pub client_id: i64,
    pub lookup_id: i64,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Upsert the toggle for `(client_id, lookup_id)`; the latest write wins.
    ///
    /// The client must exist and the lookup must be an active report type.
    pub fn set_report_toggle(&self, client_id: i64, lookup_id: i64, enabled: bool) -> Result<ClientReportToggle> {
        self.write(|t| {
            if !t.clients.contains_key(&client_id) {
                return Err(AppError::not_found("client_not_found".to_string(), format!("no client with id {}", client_id)).into());
            }
            match t.lookups.get(&lookup_id) {
                Some(l) if l.category == LookupCategory::ReportType && l.active => {}
                _ => return Err(AppError::validation("lookupId".to_string(), format!("{} is not a report type", lookup_id)).into()),
            }
            let now = Utc::now();
            if let Some(row) = t.report_toggles.iter_mut().find(|r| r.client_id == client_id && r.lookup_id == lookup_id) {
                row.enabled = enabled;
                row.updated_at = now;
                return Ok(row.clone());
            }
            let row = ClientReportToggle { client_id, lookup_id, enabled, updated_at: now };
            t.report_toggles.push(row.clone());
            Ok(row)
        })
    }

    #[cfg(test)]
    pub fn report_toggle(&self, client_id: i64, lookup_id: i64) -> Option<bool> {
        self.read(|t| {
            t.report_toggles
                .iter()
                .find(|r| r.client_id == client_id && r.lookup_id == lookup_id)
                .map(|r| r.enabled)
        })
    }

    /// Every report type paired with this client's flag (default off).
    pub fn client_reports(&self, client_id: i64) -> Vec<(super::LookupEntry, bool)> {
        self.read(|t| {
            t.lookups
                .values()
                .filter(|l| l.category == LookupCategory::ReportType && l.active)
                .map(|l| {
                    let enabled = t.report_toggles
                        .iter()
                        .find(|r| r.client_id == client_id && r.lookup_id == l.id)
                        .map(|r| r.enabled)
                        .unwrap_or(false);
                    (l.clone(), enabled)
                })
                .collect()
        })
    }
}
