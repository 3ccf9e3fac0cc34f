//! Read-only access to the hosted data service.
//!
//! The aggregation only ever talks to a [`ReferralStore`]; the concrete
//! store is chosen in `main` and passed in explicitly.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::{RestConfig, RestStore};

use crate::models::{ClickType, ReferredUser};
use async_trait::async_trait;

/// Failure of a single read against a store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to data service at {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    /// Error object returned by the service.
    #[error("data service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// The two filtered reads the dashboard needs.
#[async_trait]
pub trait ReferralStore: Send + Sync {
    /// Users whose `referred_by` equals `partner_code`, newest join first,
    /// at most `limit` rows.
    async fn referred_users(
        &self,
        partner_code: &str,
        limit: usize,
    ) -> Result<Vec<ReferredUser>, BackendError>;

    /// Number of click events of `click_type` generated by `user_id`.
    async fn count_clicks(
        &self,
        user_id: &str,
        click_type: ClickType,
    ) -> Result<Option<u64>, BackendError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
