//! Fetch orchestration for the sub-partner statistics.
//!
//! One query lists the referred users, then every user gets its pair of
//! click counts in a single concurrent batch. The batch is all-or-nothing:
//! the first failure drops the remaining futures and fails the whole fetch.

use super::aggregator::compute_stats;
use crate::backend::{BackendError, ReferralStore};
use crate::models::{ClickCounts, ClickType, ReferredUser, StatsQuery, SubPartnerStat};
use futures::future::try_join_all;
use tracing::debug;

/// Any failure while gathering the statistics.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DataFetchError {
    #[error("failed to list users referred by {partner_code}: {source}")]
    ReferredUsers {
        partner_code: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to count {click_type} clicks for user {user_id}: {source}")]
    ClickCount {
        user_id: String,
        click_type: ClickType,
        #[source]
        source: BackendError,
    },
}

/// Run the full aggregation for `query` against `store`.
///
/// Issues `1 + 2 * N` reads for `N` referred users and returns the stats in
/// the order the users were listed (newest join first).
pub async fn fetch_sub_partner_stats<S>(
    store: &S,
    query: &StatsQuery,
) -> Result<Vec<SubPartnerStat>, DataFetchError>
where
    S: ReferralStore + ?Sized,
{
    let users = store
        .referred_users(query.partner_code(), query.limit())
        .await
        .map_err(|source| DataFetchError::ReferredUsers {
            partner_code: query.partner_code().to_string(),
            source,
        })?;

    if users.is_empty() {
        debug!("No users referred by {}", query.partner_code());
        return Ok(Vec::new());
    }

    debug!(
        "Fetching click counts for {} sub-partners of {} via {}",
        users.len(),
        query.partner_code(),
        store.name()
    );

    let counts = try_join_all(users.iter().map(|user| fetch_click_counts(store, user))).await?;

    Ok(compute_stats(&users, &counts))
}

/// Both click counts for one user, direct first.
async fn fetch_click_counts<S>(store: &S, user: &ReferredUser) -> Result<ClickCounts, DataFetchError>
where
    S: ReferralStore + ?Sized,
{
    let direct = count(store, &user.id, ClickType::Direct).await?;
    let bonus = count(store, &user.id, ClickType::Bonus).await?;

    let counts = ClickCounts { direct, bonus };
    debug!(
        "Counts for {}: direct={:?}, bonus={:?} (bonus not used)",
        user.id, counts.direct, counts.bonus
    );

    Ok(counts)
}

async fn count<S>(store: &S, user_id: &str, click_type: ClickType) -> Result<Option<u64>, DataFetchError>
where
    S: ReferralStore + ?Sized,
{
    store
        .count_clicks(user_id, click_type)
        .await
        .map_err(|source| DataFetchError::ClickCount {
            user_id: user_id.to_string(),
            click_type,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::testing::ScriptedStore;
    use std::time::Duration;

    fn query(limit: usize) -> StatsQuery {
        StatsQuery::new("P123", Some(limit)).unwrap()
    }

    #[tokio::test]
    async fn test_scenario_two_users() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "alice")
            .with_user("P123", "u2", "bob")
            .with_counts("u1", Some(10), Some(3))
            .with_counts("u2", Some(5), Some(1));

        let stats = fetch_sub_partner_stats(&store, &query(2)).await.unwrap();

        assert_eq!(
            stats,
            vec![
                SubPartnerStat {
                    id: "u1".to_string(),
                    username: "alice".to_string(),
                    total_clicks: 10,
                    bonus_clicks_earned: 2,
                },
                SubPartnerStat {
                    id: "u2".to_string(),
                    username: "bob".to_string(),
                    total_clicks: 5,
                    bonus_clicks_earned: 1,
                },
            ]
        );
        assert_eq!(store.query_count(), 1 + 2 * 2);
    }

    #[tokio::test]
    async fn test_no_users_issues_no_click_queries() {
        let store = ScriptedStore::new().with_user("OTHER", "u9", "zed");

        let stats = fetch_sub_partner_stats(&store, &query(5)).await.unwrap();

        assert!(stats.is_empty());
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_limit_is_passed_to_store() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "a")
            .with_user("P123", "u2", "b")
            .with_user("P123", "u3", "c");

        let stats = fetch_sub_partner_stats(&store, &query(2)).await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(store.query_count(), 1 + 2 * 2);
    }

    #[tokio::test]
    async fn test_user_query_failure() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "alice")
            .failing_users();

        let err = fetch_sub_partner_stats(&store, &query(5)).await.unwrap_err();

        assert!(matches!(err, DataFetchError::ReferredUsers { .. }));
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_any_click_failure_fails_whole_batch() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "alice")
            .with_user("P123", "u2", "bob")
            .with_counts("u1", Some(10), Some(0))
            .failing_clicks_for("u2", ClickType::Bonus);

        let err = fetch_sub_partner_stats(&store, &query(5)).await.unwrap_err();

        match err {
            DataFetchError::ClickCount {
                user_id,
                click_type,
                ..
            } => {
                assert_eq!(user_id, "u2");
                assert_eq!(click_type, ClickType::Bonus);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_order_preserved_when_completion_is_reversed() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "slow")
            .with_user("P123", "u2", "medium")
            .with_user("P123", "u3", "fast")
            .with_counts("u1", Some(1), None)
            .with_counts("u2", Some(2), None)
            .with_counts("u3", Some(3), None)
            .with_delay("u1", Duration::from_millis(60))
            .with_delay("u2", Duration::from_millis(30));

        let stats = fetch_sub_partner_stats(&store, &query(5)).await.unwrap();

        let ids: Vec<&str> = stats.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3"]);
        let totals: Vec<u64> = stats.iter().map(|s| s.total_clicks).collect();
        assert_eq!(totals, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_per_user_queries_run_concurrently() {
        let mut store = ScriptedStore::new();
        for i in 0..5 {
            let id = format!("u{}", i);
            store = store
                .with_user("P123", &id, &id)
                .with_delay(&id, Duration::from_millis(20));
        }

        fetch_sub_partner_stats(&store, &query(5)).await.unwrap();

        assert!(store.max_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_idempotent() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "alice")
            .with_user("P123", "u2", "bob")
            .with_counts("u1", Some(42), Some(8))
            .with_counts("u2", Some(7), None);

        let first = fetch_sub_partner_stats(&store, &query(5)).await.unwrap();
        let second = fetch_sub_partner_stats(&store, &query(5)).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_click_counts_include_bonus() {
        let store = ScriptedStore::new()
            .with_user("P123", "u1", "alice")
            .with_counts("u1", Some(10), Some(7));
        let user = ReferredUser {
            id: "u1".to_string(),
            username: "alice".to_string(),
        };

        let counts = fetch_click_counts(&store, &user).await.unwrap();

        assert_eq!(
            counts,
            ClickCounts {
                direct: Some(10),
                bonus: Some(7),
            }
        );
        assert_eq!(store.query_count(), 2);
    }
}
