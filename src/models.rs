//! Data models for the sub-partner dashboard.
//!
//! This module contains the core data structures shared by the backends,
//! the statistics aggregation and the report renderers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of sub-partners shown when no limit is given.
pub const DEFAULT_LIMIT: usize = 5;

/// Share of a sub-partner's direct clicks credited to the referring partner.
pub const BONUS_SHARE: f64 = 0.2;

/// Invalid aggregation input, rejected before any query is issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("partner code must not be empty")]
    EmptyPartnerCode,

    #[error("limit must be at least 1")]
    ZeroLimit,
}

/// The `(partner_code, limit)` pair an aggregation runs for.
///
/// Two queries compare equal exactly when a re-fetch is required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    partner_code: String,
    limit: usize,
}

impl StatsQuery {
    /// Creates a validated query. `None` falls back to [`DEFAULT_LIMIT`].
    pub fn new(partner_code: impl Into<String>, limit: Option<usize>) -> Result<Self, QueryError> {
        let partner_code = partner_code.into();
        if partner_code.trim().is_empty() {
            return Err(QueryError::EmptyPartnerCode);
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(QueryError::ZeroLimit);
        }

        Ok(Self {
            partner_code,
            limit,
        })
    }

    pub fn partner_code(&self) -> &str {
        &self.partner_code
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl fmt::Display for StatsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (limit {})", self.partner_code, self.limit)
    }
}

/// A user whose referrer code matches the partner being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferredUser {
    /// Unique user identifier.
    pub id: String,
    /// Display username (rendered with a leading `@`).
    pub username: String,
}

/// Type tag of a click event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    /// Click attributed directly to the acting user.
    Direct,
    /// Credit passed up to a referrer.
    Bonus,
}

impl ClickType {
    /// Value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickType::Direct => "direct",
            ClickType::Bonus => "bonus",
        }
    }
}

impl fmt::Display for ClickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw click counts fetched for one user.
///
/// `None` means the service answered without a count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickCounts {
    pub direct: Option<u64>,
    /// Fetched alongside `direct` but not used by the derived stats.
    pub bonus: Option<u64>,
}

/// Per-sub-partner statistics, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubPartnerStat {
    pub id: String,
    pub username: String,
    /// Direct clicks generated by the sub-partner.
    pub total_clicks: u64,
    /// `round(total_clicks * BONUS_SHARE)`.
    pub bonus_clicks_earned: u64,
}

/// Observable state of a [`crate::stats::SubPartnersView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// Query the current state belongs to (`None` before the first trigger).
    pub query: Option<StatsQuery>,
    pub sub_partners: Vec<SubPartnerStat>,
    pub is_loading: bool,
    /// Generation of the trigger that produced this state.
    pub generation: u64,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self {
            query: None,
            sub_partners: Vec::new(),
            is_loading: true,
            generation: 0,
        }
    }
}
