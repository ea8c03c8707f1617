//! Daily digest, weekly ranking, and achievement thresholds.
//!
//! Everything here except [`collect_progress`] is pure and works on one
//! snapshot of fetched profiles.

use chrono::{DateTime, Duration, Utc};
use pwnyaa_sites::{Profile, SolvedInfo};
use pwnyaa_storage::{Contest, State, User};
use tracing::{debug, warn};

use crate::registry::SiteRegistry;

/// Window of the daily digest.
pub fn daily_window() -> Duration {
    Duration::days(1)
}

/// Window of the weekly ranking.
pub fn weekly_window() -> Duration {
    Duration::days(7)
}

/// A linked member together with their freshly fetched profile.
#[derive(Debug, Clone)]
pub struct MemberProgress {
    pub contest: Contest,
    pub user: User,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyEntry {
    pub slack_id: String,
    pub contest_title: String,
    pub solved: Vec<SolvedInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub slack_id: String,
    pub contest_title: String,
    pub solved: usize,
}

/// Fetch the profile of every linked member of every contest.
///
/// Members whose profile cannot be fetched are left out.
pub async fn collect_progress(state: &State, sites: &SiteRegistry) -> Vec<MemberProgress> {
    let mut progress = Vec::new();

    for contest in &state.contests {
        let Some(site) = sites.for_contest(contest) else {
            debug!(contest = %contest.title, "No site for contest");
            continue;
        };

        for user in contest.joining_users.iter().filter(|u| u.is_linked()) {
            match site.fetch_profile(&user.id_ctf).await {
                Some(profile) => progress.push(MemberProgress {
                    contest: contest.clone(),
                    user: user.clone(),
                    profile,
                }),
                None => warn!(
                    contest = %contest.title,
                    user = %user.id_ctf,
                    "Profile unavailable, leaving member out"
                ),
            }
        }
    }

    progress
}

/// Members who solved at least one challenge in the last day.
pub fn daily_entries(progress: &[MemberProgress], now: DateTime<Utc>) -> Vec<DailyEntry> {
    progress
        .iter()
        .filter_map(|member| {
            let solved: Vec<SolvedInfo> = member
                .profile
                .solved_since(now, daily_window())
                .into_iter()
                .cloned()
                .collect();
            (!solved.is_empty()).then(|| DailyEntry {
                slack_id: member.user.slack_id.clone(),
                contest_title: member.contest.title.clone(),
                solved,
            })
        })
        .collect()
}

/// Members ranked by solves in the last week, most first.
pub fn weekly_ranking(progress: &[MemberProgress], now: DateTime<Utc>) -> Vec<RankEntry> {
    rank(
        progress
            .iter()
            .map(|member| RankEntry {
                slack_id: member.user.slack_id.clone(),
                contest_title: member.contest.title.clone(),
                solved: member.profile.solved_since(now, weekly_window()).len(),
            })
            .collect(),
    )
}

/// Sort descending by solve count. Ties keep their input order.
pub fn rank(mut entries: Vec<RankEntry>) -> Vec<RankEntry> {
    entries.sort_by(|a, b| b.solved.cmp(&a.solved));
    entries
}

/// Achievements a member has reached in `contest` with `solved` solves.
pub fn achievements(contest: &Contest, solved: usize) -> Vec<String> {
    let total = contest.num_challs;
    if total == 0 {
        return Vec::new();
    }

    let alias = contest.short_name();
    let mut reached = Vec::new();
    if solved >= total {
        reached.push(format!("pwnyaa-{alias}-complete"));
    }
    if solved * 2 >= total {
        reached.push(format!("pwnyaa-{alias}-half"));
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile, solves};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn contest(num_challs: usize) -> Contest {
        Contest {
            id: 0,
            url: "https://pwnable.tw".into(),
            title: "pwnable.tw".into(),
            alias: vec!["tw".into()],
            num_challs,
            joining_users: Vec::new(),
        }
    }

    fn member(slack_id: &str, solved: Vec<SolvedInfo>) -> MemberProgress {
        MemberProgress {
            contest: contest(10),
            user: User::new(slack_id, slack_id.to_lowercase()),
            profile: profile(slack_id, solved),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 12, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_weekly_ranking_is_descending() {
        let now = now();
        let progress = vec![
            member("A", solves(3, now, 30)),
            member("B", solves(5, now, 2)),
            member("C", Vec::new()),
        ];

        let ranking = weekly_ranking(&progress, now);

        let order: Vec<(&str, usize)> = ranking
            .iter()
            .map(|e| (e.slack_id.as_str(), e.solved))
            .collect();
        assert_eq!(order, vec![("B", 5), ("A", 3), ("C", 0)]);
    }

    #[test]
    fn test_weekly_ranking_ignores_old_solves() {
        let now = now();
        let mut old = solves(4, now, 24 * 8);
        old.extend(solves(1, now, 1));
        let ranking = weekly_ranking(&[member("A", old)], now);
        assert_eq!(ranking[0].solved, 1);
    }

    #[test]
    fn test_rank_keeps_ties_in_input_order() {
        let entry = |id: &str, solved| RankEntry {
            slack_id: id.into(),
            contest_title: "pwnable.tw".into(),
            solved,
        };
        let ranked = rank(vec![entry("X", 2), entry("Y", 4), entry("Z", 2)]);
        let ids: Vec<&str> = ranked.iter().map(|e| e.slack_id.as_str()).collect();
        assert_eq!(ids, vec!["Y", "X", "Z"]);
    }

    #[test]
    fn test_daily_entries_only_recent_solvers() {
        let now = now();
        let progress = vec![
            member("A", solves(2, now, 3)),
            member("B", solves(2, now, 30)),
        ];

        let entries = daily_entries(&progress, now);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].slack_id, "A");
        assert_eq!(entries[0].solved.len(), 2);
    }

    #[test]
    fn test_half_without_completion() {
        assert_eq!(achievements(&contest(10), 5), vec!["pwnyaa-tw-half".to_string()]);
    }

    #[test]
    fn test_completion_also_reaches_half() {
        assert_eq!(
            achievements(&contest(10), 10),
            vec!["pwnyaa-tw-complete".to_string(), "pwnyaa-tw-half".to_string()]
        );
    }

    #[test]
    fn test_thresholds_below_half_and_empty_contest() {
        assert!(achievements(&contest(10), 4).is_empty());
        assert_eq!(achievements(&contest(7), 4), vec!["pwnyaa-tw-half".to_string()]);
        assert!(achievements(&contest(7), 3).is_empty());
        assert!(achievements(&contest(0), 0).is_empty());
    }
}
