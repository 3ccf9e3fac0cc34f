//! Stateful dashboard view over the statistics fetch.
//!
//! A [`SubPartnersView`] owns the rendered state (`sub_partners`,
//! `is_loading`) and publishes it through a `watch` channel. Each trigger
//! takes a new generation number; a finished fetch only writes its result
//! while its generation is still the current one, so a slow response for an
//! old query can never overwrite the state of a newer one.

use super::fetcher::fetch_sub_partner_stats;
use crate::backend::ReferralStore;
use crate::models::{StatsQuery, ViewSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Loading state and latest sub-partner list for one partner query.
pub struct SubPartnersView<S: ?Sized> {
    store: Arc<S>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<ViewSnapshot>>,
}

impl<S> SubPartnersView<S>
where
    S: ReferralStore + ?Sized + 'static,
{
    /// Create a view in the initial loading state.
    pub fn new(store: Arc<S>) -> Self {
        let (state, _) = watch::channel(ViewSnapshot::default());

        Self {
            store,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.state.subscribe()
    }

    /// Point the view at `query`.
    ///
    /// Starts a fetch on the first call and whenever the partner code or
    /// limit differs from the previous query; returns `None` otherwise.
    pub fn set_query(&self, query: StatsQuery) -> Option<JoinHandle<()>> {
        let unchanged = {
            let current = self.state.borrow();
            current.generation > 0 && current.query.as_ref() == Some(&query)
        };

        if unchanged {
            debug!("Query {} unchanged, not refetching", query);
            return None;
        }

        Some(self.trigger(query))
    }

    /// Fetch again for the current query, if there is one.
    pub fn reload(&self) -> Option<JoinHandle<()>> {
        let query = self.state.borrow().query.clone()?;
        Some(self.trigger(query))
    }

    /// Wait until the latest trigger has finished and return its state.
    pub async fn ready(&self) -> ViewSnapshot {
        let mut rx = self.subscribe();
        let result = match rx.wait_for(|s| !s.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        result
    }

    fn trigger(&self, query: StatsQuery) -> JoinHandle<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Fetching sub-partners for {} (generation {})", query, generation);

        self.state.send_modify(|s| {
            s.query = Some(query.clone());
            s.is_loading = true;
            s.generation = generation;
        });

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let sub_partners = match fetch_sub_partner_stats(&*store, &query).await {
                Ok(stats) => {
                    debug!("Fetched {} sub-partners for {}", stats.len(), query);
                    stats
                }
                Err(e) => {
                    error!("Error fetching sub-partners: {}", e);
                    Vec::new()
                }
            };

            state.send_if_modified(|s| {
                if s.generation != generation {
                    debug!(
                        "Discarding stale result for {} (generation {}, current {})",
                        query, generation, s.generation
                    );
                    return false;
                }
                s.sub_partners = sub_partners;
                s.is_loading = false;
                true
            });
        })
    }
}
