//! PostgREST-compatible store (Supabase REST API).
//!
//! Reads go to `{url}/rest/v1/{table}` with the filter, ordering and limit
//! encoded as query parameters. Counts come back in the `Content-Range`
//! header when `Prefer: count=exact` is sent.

use super::{BackendError, ReferralStore};
use crate::models::{ClickType, ReferredUser};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`RestStore`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Anonymous or service key, sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub users_table: String,
    pub clicks_table: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: None,
            timeout_seconds: 30,
            users_table: "users".to_string(),
            clicks_table: "clicks".to_string(),
        }
    }
}

/// Error object returned by PostgREST on failed requests.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// Store backed by a remote PostgREST endpoint.
pub struct RestStore {
    config: RestConfig,
    http_client: reqwest::Client,
}

impl RestStore {
    /// Create a store with a client-wide request timeout.
    pub fn new(config: RestConfig) -> Result<Self> {
        debug!(
            "Initializing REST store at {} (timeout {}s)",
            config.url, config.timeout_seconds
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table)
    }

    fn get(&self, table: &str) -> RequestBuilder {
        let request = self.http_client.get(self.table_url(table));
        match self.config.api_key {
            Some(ref key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            BackendError::Connect(self.config.url.clone())
        } else {
            BackendError::Request(e.to_string())
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl ReferralStore for RestStore {
    async fn referred_users(
        &self,
        partner_code: &str,
        limit: usize,
    ) -> Result<Vec<ReferredUser>, BackendError> {
        let request = self.get(&self.config.users_table).query(&[
            ("select", "id,username".to_string()),
            ("referred_by", format!("eq.{}", partner_code)),
            ("order", "joined_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);

        let response = self.send(request).await?;
        let users: Vec<ReferredUser> = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        debug!("Fetched {} referred users for {}", users.len(), partner_code);
        Ok(users)
    }

    async fn count_clicks(
        &self,
        user_id: &str,
        click_type: ClickType,
    ) -> Result<Option<u64>, BackendError> {
        let request = self
            .get(&self.config.clicks_table)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("type", format!("eq.{}", click_type)),
            ])
            .header("Prefer", "count=exact");

        let response = self.send(request).await?;
        let count = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);

        debug!("User {} has {:?} {} clicks", user_id, count, click_type);
        Ok(count)
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

/// Extract the total from a `Content-Range` value such as `0-24/310` or `*/0`.
///
/// Returns `None` when the total is unknown (`*/*`) or the value is malformed.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

/// Build a [`BackendError::Api`] from a failed response body.
fn api_error(status: u16, body: &str) -> BackendError {
    let message = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let mut message = parsed.message;
            if let Some(code) = parsed.code {
                message = format!("{} ({})", message, code);
            }
            if let Some(hint) = parsed.hint {
                message = format!("{}; hint: {}", message, hint);
            }
            message
        }
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown error")
            .to_string(),
    };

    BackendError::Api { status, message }
}
