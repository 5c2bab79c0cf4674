//! Contact directory lookups.
//!
//! The directory itself is an external system; this module owns only the
//! seam the map service and the picker need: resolving contact IDs into
//! display summaries, and a paginated search feeding the picker. The
//! in-memory implementation is seeded from a JSON file and stands in for the
//! real directory in local runs and tests.

pub mod handlers;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::contact::{ContactPage, ContactQuery, ContactSummary};

const DEFAULT_PAGE_SIZE: u32 = 25;
const MAX_PAGE_SIZE: u32 = 100;

/// A full directory row. `service_area` is searchable but not part of the
/// `ContactSummary` projection shipped to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub trade: Option<String>,
    #[serde(default)]
    pub service_area: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl ContactRecord {
    pub fn summary(&self) -> ContactSummary {
        ContactSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            company: self.company.clone(),
            trade: self.trade.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Resolves IDs into display summaries. Unknown IDs are simply absent
    /// from the result; the caller renders the bare ID in that case.
    async fn resolve(&self, ids: &[String]) -> Result<BTreeMap<String, ContactSummary>>;

    /// Paginated lookup by trade/name/service-area for the contact picker.
    async fn search(&self, query: &ContactQuery) -> Result<ContactPage>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    records: Vec<ContactRecord>,
}

impl InMemoryDirectory {
    pub fn new(records: Vec<ContactRecord>) -> Self {
        Self { records }
    }

    /// Loads a directory from a JSON array of contact records.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading contacts file {}", path.display()))?;
        let records: Vec<ContactRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("decoding contacts file {}", path.display()))?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn matches_filter(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(n) if n.trim().is_empty() => true,
        Some(n) => haystack
            .map(|h| h.to_lowercase().contains(&n.trim().to_lowercase()))
            .unwrap_or(false),
    }
}

#[async_trait]
impl ContactDirectory for InMemoryDirectory {
    async fn resolve(&self, ids: &[String]) -> Result<BTreeMap<String, ContactSummary>> {
        let mut out = BTreeMap::new();
        for record in &self.records {
            if ids.iter().any(|id| id == &record.id) {
                out.insert(record.id.clone(), record.summary());
            }
        }
        Ok(out)
    }

    async fn search(&self, query: &ContactQuery) -> Result<ContactPage> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);

        let matched: Vec<&ContactRecord> = self
            .records
            .iter()
            .filter(|r| {
                matches_filter(r.trade.as_deref(), query.trade.as_deref())
                    && matches_filter(Some(r.name.as_str()), query.name.as_deref())
                    && matches_filter(r.service_area.as_deref(), query.service_area.as_deref())
            })
            .collect();

        let start = (page as u64 - 1).saturating_mul(limit as u64) as usize;
        let items: Vec<ContactSummary> = matched
            .iter()
            .skip(start)
            .take(limit as usize)
            .map(|r| r.summary())
            .collect();
        let count = items.len() as u32;

        Ok(ContactPage {
            items,
            limit,
            page,
            count,
        })
    }
}
