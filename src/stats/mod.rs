//! Sub-partner statistics.
//!
//! - [`aggregator`]: pure derivation of the stat rows
//! - [`fetcher`]: the query sequence against a store
//! - [`view`]: loading state and stale-result protection

pub mod aggregator;
pub mod fetcher;
pub mod view;

pub use view::SubPartnersView;

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable store for exercising the fetch paths.

    use crate::backend::{BackendError, ReferralStore};
    use crate::models::{ClickType, ReferredUser};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    pub struct ScriptedStore {
        /// `(partner_code, user)` in join-time-descending order.
        users: Vec<(String, ReferredUser)>,
        counts: HashMap<(String, ClickType), Option<u64>>,
        user_delays: HashMap<String, Duration>,
        partner_delays: HashMap<String, Duration>,
        fail_users: bool,
        fail_clicks: HashSet<(String, ClickType)>,
        queries: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_user(mut self, partner_code: &str, id: &str, username: &str) -> Self {
            self.users.push((
                partner_code.to_string(),
                ReferredUser {
                    id: id.to_string(),
                    username: username.to_string(),
                },
            ));
            self
        }

        pub fn with_counts(mut self, user_id: &str, direct: Option<u64>, bonus: Option<u64>) -> Self {
            self.counts
                .insert((user_id.to_string(), ClickType::Direct), direct);
            self.counts.insert((user_id.to_string(), ClickType::Bonus), bonus);
            self
        }

        /// Delay every click query for `user_id`.
        pub fn with_delay(mut self, user_id: &str, delay: Duration) -> Self {
            self.user_delays.insert(user_id.to_string(), delay);
            self
        }

        /// Delay the user-list query for `partner_code`.
        pub fn with_users_delay(mut self, partner_code: &str, delay: Duration) -> Self {
            self.partner_delays.insert(partner_code.to_string(), delay);
            self
        }

        pub fn failing_users(mut self) -> Self {
            self.fail_users = true;
            self
        }

        pub fn failing_clicks_for(mut self, user_id: &str, click_type: ClickType) -> Self {
            self.fail_clicks.insert((user_id.to_string(), click_type));
            self
        }

        pub fn query_count(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReferralStore for ScriptedStore {
        async fn referred_users(
            &self,
            partner_code: &str,
            limit: usize,
        ) -> Result<Vec<ReferredUser>, BackendError> {
            self.queries.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.partner_delays.get(partner_code) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail_users {
                return Err(BackendError::Api {
                    status: 500,
                    message: "users unavailable".to_string(),
                });
            }

            Ok(self
                .users
                .iter()
                .filter(|(code, _)| code == partner_code)
                .map(|(_, user)| user.clone())
                .take(limit)
                .collect())
        }

        async fn count_clicks(
            &self,
            user_id: &str,
            click_type: ClickType,
        ) -> Result<Option<u64>, BackendError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.user_delays.get(user_id) {
                tokio::time::sleep(*delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_clicks.contains(&(user_id.to_string(), click_type)) {
                return Err(BackendError::Request("connection reset".to_string()));
            }

            Ok(self
                .counts
                .get(&(user_id.to_string(), click_type))
                .copied()
                .unwrap_or(Some(0)))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }
}
