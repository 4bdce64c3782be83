//! Static reference data grouped by category.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::Store;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupCategory {
    Classification,
    Category,
    Factor,
    ReportType,
}

impl LookupCategory {
    pub const ALL: [LookupCategory; 4] = [
        LookupCategory::Classification,
        LookupCategory::Category,
        LookupCategory::Factor,
        LookupCategory::ReportType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupCategory::Classification => "classification",
            LookupCategory::Category => "category",
            LookupCategory::Factor => "factor",
            LookupCategory::ReportType => "report-type",
        }
    }
}

impl fmt::Display for LookupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for LookupCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        LookupCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == norm)
            .ok_or_else(|| AppError::user("unknown_lookup_category".to_string(), format!("unknown lookup category '{}'", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
    pub id: i64,
    pub category: LookupCategory,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

const DEFAULT_LOOKUPS: &[(LookupCategory, &str, &str)] = &[
    (LookupCategory::Classification, "Low", "Low support needs"),
    (LookupCategory::Classification, "Medium", "Moderate support needs"),
    (LookupCategory::Classification, "High", "High or complex support needs"),
    (LookupCategory::Category, "Behavioural", "Behaviour support incident"),
    (LookupCategory::Category, "Medical", "Medical or medication incident"),
    (LookupCategory::Category, "Environmental", "Property or environment incident"),
    (LookupCategory::Factor, "Mobility", "Reduced mobility"),
    (LookupCategory::Factor, "Sensory", "Vision or hearing impairment"),
    (LookupCategory::Factor, "Cognitive", "Cognitive impairment"),
    (LookupCategory::ReportType, "Incident Report", "Incident reports for this client"),
    (LookupCategory::ReportType, "Medication Report", "Medication administration records"),
    (LookupCategory::ReportType, "Progress Notes", "Daily progress notes"),
    (LookupCategory::ReportType, "Behaviour Support", "Behaviour support plan reviews"),
];

impl Store {
    /// Active entries of one category, ordered by id.
    pub fn list_lookups(&self, category: LookupCategory) -> Vec<LookupEntry> {
        self.read(|t| t.lookups.values().filter(|l| l.category == category && l.active).cloned().collect())
    }

    pub fn ensure_default_lookups(&self) -> Result<()> {
        if self.read(|t| !t.lookups.is_empty()) { return Ok(()); }
        self.write(|t| {
            for (category, name, description) in DEFAULT_LOOKUPS {
                let id = t.next_id();
                t.lookups.insert(id, LookupEntry {
                    id,
                    category: *category,
                    name: name.to_string(),
                    description: description.to_string(),
                    active: true,
                });
            }
            Ok(())
        })
    }
}
