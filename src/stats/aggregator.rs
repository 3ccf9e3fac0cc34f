//! Derivation of per-sub-partner statistics.
//!
//! Everything here is pure; fetching lives in [`super::fetcher`].

use crate::models::{ClickCounts, ReferredUser, SubPartnerStat, BONUS_SHARE};

/// Bonus clicks a partner earns from `total_clicks` direct clicks.
pub fn bonus_clicks_earned(total_clicks: u64) -> u64 {
    (total_clicks as f64 * BONUS_SHARE).round() as u64
}

/// Build the stat row for one user from its raw counts.
///
/// Only the direct count contributes; the bonus count is ignored.
pub fn stat_for(user: &ReferredUser, counts: &ClickCounts) -> SubPartnerStat {
    let total_clicks = counts.direct.unwrap_or(0);

    SubPartnerStat {
        id: user.id.clone(),
        username: user.username.clone(),
        total_clicks,
        bonus_clicks_earned: bonus_clicks_earned(total_clicks),
    }
}

/// Pair each user with its counts, keeping the order of `users`.
///
/// `counts[i]` belongs to `users[i]`.
pub fn compute_stats(users: &[ReferredUser], counts: &[ClickCounts]) -> Vec<SubPartnerStat> {
    debug_assert_eq!(users.len(), counts.len());

    users
        .iter()
        .zip(counts)
        .map(|(user, counts)| stat_for(user, counts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, username: &str) -> ReferredUser {
        ReferredUser {
            id: id.to_string(),
            username: username.to_string(),
        }
    }

    fn counts(direct: Option<u64>, bonus: Option<u64>) -> ClickCounts {
        ClickCounts { direct, bonus }
    }

    #[test]
    fn test_bonus_clicks_earned_rounds() {
        assert_eq!(bonus_clicks_earned(0), 0);
        assert_eq!(bonus_clicks_earned(2), 0);
        assert_eq!(bonus_clicks_earned(3), 1);
        assert_eq!(bonus_clicks_earned(5), 1);
        assert_eq!(bonus_clicks_earned(10), 2);
        assert_eq!(bonus_clicks_earned(12), 2);
        assert_eq!(bonus_clicks_earned(13), 3);
        assert_eq!(bonus_clicks_earned(1_000_003), 200_001);
    }

    #[test]
    fn test_compute_stats_scenario() {
        let users = vec![user("u1", "alice"), user("u2", "bob")];
        let counts = vec![counts(Some(10), Some(4)), counts(Some(5), Some(0))];

        let stats = compute_stats(&users, &counts);

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
    }

    #[test]
    fn test_bonus_count_does_not_affect_output() {
        let u = user("u1", "alice");
        let without = stat_for(&u, &counts(Some(7), None));
        let with = stat_for(&u, &counts(Some(7), Some(999)));
        assert_eq!(without, with);
    }

    #[test]
    fn test_missing_direct_count_is_zero() {
        let stat = stat_for(&user("u1", "alice"), &counts(None, Some(3)));
        assert_eq!(stat.total_clicks, 0);
        assert_eq!(stat.bonus_clicks_earned, 0);
    }

    #[test]
    fn test_compute_stats_preserves_order_and_length() {
        let users: Vec<ReferredUser> = (0..8)
            .map(|i| user(&format!("u{}", i), &format!("user{}", i)))
            .collect();
        let counts: Vec<ClickCounts> = (0..8).map(|i| counts(Some(i * 3), None)).collect();

        let stats = compute_stats(&users, &counts);

        assert_eq!(stats.len(), users.len());
        for (i, stat) in stats.iter().enumerate() {
            assert_eq!(stat.id, users[i].id);
            assert_eq!(stat.total_clicks, i as u64 * 3);
        }
    }

    #[test]
    fn test_compute_stats_empty() {
        assert!(compute_stats(&[], &[]).is_empty());
    }
}
