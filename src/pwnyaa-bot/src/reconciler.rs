//! Folds fetched challenge lists into the state store.

use pwnyaa_sites::{Challenge, SiteDescriptor};
use pwnyaa_storage::{ContestSeed, StateStore, Upserted};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::registry::SiteRegistry;

/// Outcome of refreshing every tracked site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub inserted: usize,
    pub updated: usize,
    /// Sites skipped because of a fetch or storage failure.
    pub skipped: usize,
}

/// Merge one site's challenge list into the store.
///
/// A new contest is created with the site's id and default alias. An
/// existing contest keeps its aliases and members and has its challenge
/// count overwritten with the fetched count, even when that is zero.
pub async fn merge_challenge_snapshot(
    store: &StateStore,
    site: &SiteDescriptor,
    challenges: &[Challenge],
) -> Result<Upserted> {
    if challenges.is_empty() {
        warn!(contest = %site.title, "Fetched no challenges");
    }

    let seed = ContestSeed::new(
        site.id,
        &site.title,
        &site.url,
        &site.default_alias,
        challenges.len(),
    );
    let outcome = store.upsert_contest(&seed).await?;
    info!(contest = %site.title, num_challs = challenges.len(), ?outcome, "Contest refreshed");
    Ok(outcome)
}

/// Fetch and merge every site. Failures are logged and skipped.
pub async fn refresh_all(store: &StateStore, sites: &SiteRegistry) -> RefreshSummary {
    let mut summary = RefreshSummary::default();

    for site in sites.iter() {
        let descriptor = site.descriptor();
        let challenges = match site.fetch_challenges().await {
            Ok(challenges) => challenges,
            Err(e) => {
                warn!(contest = %descriptor.title, error = %e, "Challenge fetch failed");
                summary.skipped += 1;
                continue;
            }
        };

        match merge_challenge_snapshot(store, descriptor, &challenges).await {
            Ok(Upserted::Inserted) => summary.inserted += 1,
            Ok(Upserted::Updated) => summary.updated += 1,
            Err(e) => {
                error!(contest = %descriptor.title, error = %e, "Failed to store contest");
                summary.skipped += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSite, challenges};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_first_merge_creates_contest_with_fetched_count() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        let site = FakeSite::tw();

        let outcome = merge_challenge_snapshot(&store, &site.descriptor, &challenges(48))
            .await
            .unwrap();

        assert_eq!(outcome, Upserted::Inserted);
        let state = store.snapshot().await;
        assert_eq!(state.contests.len(), 1);
        assert_eq!(state.contests[0].num_challs, 48);
        assert_eq!(state.contests[0].alias, vec!["tw".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_keeps_members_and_updates_count() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        let site = FakeSite::tw();

        merge_challenge_snapshot(&store, &site.descriptor, &challenges(48))
            .await
            .unwrap();
        store.link_user(0, "U1", "alice").await.unwrap();

        let outcome = merge_challenge_snapshot(&store, &site.descriptor, &challenges(50))
            .await
            .unwrap();

        assert_eq!(outcome, Upserted::Updated);
        let contest = &store.snapshot().await.contests[0];
        assert_eq!(contest.num_challs, 50);
        assert_eq!(contest.joining_users.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_list_overwrites_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::open(&path).await.unwrap();
        let site = FakeSite::tw();

        merge_challenge_snapshot(&store, &site.descriptor, &challenges(48))
            .await
            .unwrap();
        store.link_user(0, "U1", "alice").await.unwrap();
        let outcome = merge_challenge_snapshot(&store, &site.descriptor, &[])
            .await
            .unwrap();

        assert_eq!(outcome, Upserted::Updated);
        let contest = &store.snapshot().await.contests[0];
        assert_eq!(contest.num_challs, 0);
        assert_eq!(contest.joining_users.len(), 1);
        drop(store);

        let reloaded = StateStore::open(&path).await.unwrap();
        assert_eq!(reloaded.snapshot().await.contests[0].num_challs, 0);
    }

    #[tokio::test]
    async fn test_refresh_all_counts_updates() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        let registry = SiteRegistry::new(vec![
            Arc::new(FakeSite::tw().with_challenges(challenges(10))),
            Arc::new(FakeSite::xyz()),
        ]);

        refresh_all(&store, &registry).await;
        let summary = refresh_all(&store, &registry).await;

        assert_eq!(
            summary,
            RefreshSummary {
                inserted: 0,
                updated: 2,
                skipped: 0
            }
        );
        let state = store.snapshot().await;
        assert_eq!(state.contests[0].num_challs, 10);
        assert_eq!(state.contests[1].num_challs, 0);
    }

    #[tokio::test]
    async fn test_refresh_all_skips_failing_site() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().join("state.json")).await.unwrap();
        let tw = FakeSite::tw().with_challenges(challenges(10));
        let xyz = FakeSite::xyz().failing();
        let registry = SiteRegistry::new(vec![Arc::new(tw), Arc::new(xyz)]);

        let summary = refresh_all(&store, &registry).await;

        assert_eq!(
            summary,
            RefreshSummary {
                inserted: 1,
                updated: 0,
                skipped: 1
            }
        );
        let state = store.snapshot().await;
        assert_eq!(state.contests.len(), 1);
        assert_eq!(state.contests[0].title, "pwnable.tw");
    }
}
