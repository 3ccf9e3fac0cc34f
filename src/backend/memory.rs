//! In-memory store loaded from a JSON fixture.
//!
//! Applies the same filter, ordering and limit semantics as the REST store,
//! which makes it usable for offline runs and as a test double.

use super::{BackendError, ReferralStore};
use crate::models::{ClickType, ReferredUser};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A row of the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    /// Referrer's partner code.
    #[serde(default)]
    pub referred_by: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// A row of the `clicks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickRecord {
    pub user_id: String,
    #[serde(rename = "type")]
    pub click_type: ClickType,
}

/// Fixture file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub clicks: Vec<ClickRecord>,
}

/// Store answering queries from a [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dataset: Dataset,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    /// Load a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;

        let dataset: Dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture file: {}", path.display()))?;

        info!(
            "Loaded fixture with {} users and {} clicks",
            dataset.users.len(),
            dataset.clicks.len()
        );

        Ok(Self::new(dataset))
    }
}

#[async_trait]
impl ReferralStore for MemoryStore {
    async fn referred_users(
        &self,
        partner_code: &str,
        limit: usize,
    ) -> Result<Vec<ReferredUser>, BackendError> {
        let mut matching: Vec<&UserRecord> = self
            .dataset
            .users
            .iter()
            .filter(|u| u.referred_by.as_deref() == Some(partner_code))
            .collect();

        matching.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        matching.truncate(limit);

        Ok(matching
            .into_iter()
            .map(|u| ReferredUser {
                id: u.id.clone(),
                username: u.username.clone(),
            })
            .collect())
    }

    async fn count_clicks(
        &self,
        user_id: &str,
        click_type: ClickType,
    ) -> Result<Option<u64>, BackendError> {
        let count = self
            .dataset
            .clicks
            .iter()
            .filter(|c| c.user_id == user_id && c.click_type == click_type)
            .count();

        Ok(Some(count as u64))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
