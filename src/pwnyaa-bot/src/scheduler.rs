//! Periodic refresh and the daily/weekly calendar jobs.
//!
//! All three jobs run through [`Jobs`], whose lock guarantees that at most
//! one of them executes at a time. Chat commands do not take this lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveTime, TimeZone, Utc, Weekday};
use pwnyaa_slack::ChatPoster;
use pwnyaa_storage::StateStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

use crate::achievements::AchievementUnlocker;
use crate::config::PostingIdentity;
use crate::digest::{achievements, collect_progress, daily_entries, weekly_ranking};
use crate::error::Result;
use crate::format;
use crate::reconciler::{RefreshSummary, refresh_all};
use crate::registry::SiteRegistry;

/// When the jobs run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub refresh_every: Duration,
    /// Local time of the daily digest.
    pub daily_at: NaiveTime,
    /// Local time of the weekly ranking.
    pub weekly_at: NaiveTime,
    pub weekly_day: Weekday,
}

/// The scheduled jobs and the lock that serializes them.
pub struct Jobs {
    store: Arc<StateStore>,
    sites: SiteRegistry,
    chat: Arc<dyn ChatPoster>,
    unlocker: Arc<dyn AchievementUnlocker>,
    channel: String,
    identity: PostingIdentity,
    lock: Mutex<()>,
}

impl Jobs {
    pub fn new(
        store: Arc<StateStore>,
        sites: SiteRegistry,
        chat: Arc<dyn ChatPoster>,
        unlocker: Arc<dyn AchievementUnlocker>,
        channel: impl Into<String>,
        identity: PostingIdentity,
    ) -> Self {
        Self {
            store,
            sites,
            chat,
            unlocker,
            channel: channel.into(),
            identity,
            lock: Mutex::new(()),
        }
    }

    /// Re-fetch every site's challenge list and reconcile.
    pub async fn refresh(&self) -> RefreshSummary {
        let _guard = self.lock.lock().await;
        let summary = refresh_all(&self.store, &self.sites).await;
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            "Refresh finished"
        );
        summary
    }

    /// Post who solved something in the last day and fire achievements.
    pub async fn daily(&self, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let state = self.store.snapshot().await;
        let progress = collect_progress(&state, &self.sites).await;

        match format::daily_digest(&daily_entries(&progress, now)) {
            Some(text) => self.post(text).await?,
            None => debug!("Nobody solved anything today"),
        }

        for member in &progress {
            for achievement in achievements(&member.contest, member.profile.solved.len()) {
                if let Err(e) = self
                    .unlocker
                    .unlock(&member.user.slack_id, &achievement)
                    .await
                {
                    warn!(
                        slack_id = %member.user.slack_id,
                        achievement = %achievement,
                        error = %e,
                        "Failed to unlock achievement"
                    );
                }
            }
        }
        Ok(())
    }

    /// Post the ranking of solves in the last week.
    pub async fn weekly(&self, now: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let state = self.store.snapshot().await;
        let progress = collect_progress(&state, &self.sites).await;
        self.post(format::weekly_digest(&weekly_ranking(&progress, now)))
            .await
    }

    async fn post(&self, text: String) -> Result<()> {
        self.chat
            .post_message(&self.channel, self.identity.message(text))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalendarJob {
    Daily,
    Weekly,
}

impl CalendarJob {
    fn name(self) -> &'static str {
        match self {
            CalendarJob::Daily => "daily",
            CalendarJob::Weekly => "weekly",
        }
    }
}

/// Drives [`Jobs`] on the configured schedule.
pub struct Scheduler {
    jobs: Arc<Jobs>,
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(jobs: Arc<Jobs>, config: ScheduleConfig) -> Self {
        Self { jobs, config }
    }

    /// Start the refresh loop and both calendar loops.
    ///
    /// The first refresh runs immediately.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let Scheduler { jobs, config } = self;
        vec![
            tokio::spawn(refresh_loop(jobs.clone(), config.refresh_every)),
            tokio::spawn(calendar_loop(
                jobs.clone(),
                CalendarJob::Daily,
                config.daily_at,
                None,
            )),
            tokio::spawn(calendar_loop(
                jobs,
                CalendarJob::Weekly,
                config.weekly_at,
                Some(config.weekly_day),
            )),
        ]
    }
}

async fn refresh_loop(jobs: Arc<Jobs>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        jobs.refresh().await;
    }
}

async fn calendar_loop(jobs: Arc<Jobs>, job: CalendarJob, at: NaiveTime, day: Option<Weekday>) {
    let mut next = next_occurrence(&Local::now(), at, day);
    loop {
        info!(job = job.name(), next = %next, "Next run scheduled");
        sleep((next - Local::now()).to_std().unwrap_or_default()).await;

        let result = match job {
            CalendarJob::Daily => jobs.daily(Utc::now()).await,
            CalendarJob::Weekly => jobs.weekly(Utc::now()).await,
        };
        if let Err(e) = result {
            error!(job = job.name(), error = %e, "Scheduled job failed");
        }
        next = following_run(&next, &Local::now(), at, day);
    }
}

/// The run after the one scheduled at `fired`.
///
/// Never earlier than the slot after `fired`, so a wall clock stepped back
/// cannot replay it. Slots already behind `now` are skipped.
pub fn following_run<Tz: TimeZone>(
    fired: &DateTime<Tz>,
    now: &DateTime<Tz>,
    at: NaiveTime,
    day: Option<Weekday>,
) -> DateTime<Tz> {
    next_occurrence(fired.max(now), at, day)
}

/// First instant strictly after `now` at local time `at`, on `day` if given.
pub fn next_occurrence<Tz: TimeZone>(
    now: &DateTime<Tz>,
    at: NaiveTime,
    day: Option<Weekday>,
) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..=7 {
        let Some(date) = today.checked_add_days(chrono::Days::new(offset)) else {
            break;
        };
        if day.is_some_and(|d| date.weekday() != d) {
            continue;
        }
        // Local times skipped by a DST change have no instant.
        let candidate = tz.from_local_datetime(&date.and_time(at)).earliest();
        if let Some(candidate) = candidate.filter(|c| c > now) {
            return candidate;
        }
    }

    now.clone() + chrono::Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChat, FakeSite, FakeUnlocker, profile, solves};
    use pretty_assertions::assert_eq;
    use pwnyaa_storage::ContestSeed;
    use tempfile::{TempDir, tempdir};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_daily_occurrence() {
        // 2024-05-12 is a Sunday.
        let now = Utc.with_ymd_and_hms(2024, 5, 12, 10, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(&now, at(9, 0), None),
            Utc.with_ymd_and_hms(2024, 5, 13, 9, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(&now, at(21, 0), None),
            Utc.with_ymd_and_hms(2024, 5, 12, 21, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(&now, at(10, 0), None),
            Utc.with_ymd_and_hms(2024, 5, 13, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_weekly_occurrence() {
        let sunday_late = Utc.with_ymd_and_hms(2024, 5, 12, 22, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(&sunday_late, at(21, 0), Some(Weekday::Sun)),
            Utc.with_ymd_and_hms(2024, 5, 19, 21, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(&sunday_late, at(21, 0), Some(Weekday::Wed)),
            Utc.with_ymd_and_hms(2024, 5, 15, 21, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_following_run_ignores_clock_stepping_back() {
        let fired = Utc.with_ymd_and_hms(2024, 5, 12, 9, 0, 0).unwrap();
        let stepped_back = Utc.with_ymd_and_hms(2024, 5, 12, 8, 59, 30).unwrap();

        assert_eq!(
            following_run(&fired, &stepped_back, at(9, 0), None),
            Utc.with_ymd_and_hms(2024, 5, 13, 9, 0, 0).unwrap()
        );
        assert_eq!(
            following_run(&fired, &stepped_back, at(21, 0), Some(Weekday::Sun)),
            Utc.with_ymd_and_hms(2024, 5, 12, 21, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_following_run_skips_missed_slots() {
        let fired = Utc.with_ymd_and_hms(2024, 5, 12, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap();

        assert_eq!(
            following_run(&fired, &late, at(9, 0), None),
            Utc.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap()
        );
    }

    struct Fixture {
        _dir: TempDir,
        chat: Arc<FakeChat>,
        unlocker: Arc<FakeUnlocker>,
        jobs: Arc<Jobs>,
    }

    /// pwnable.tw with 10 challenges and three members A, B, C.
    async fn fixture(a: usize, b: usize, c: usize) -> Fixture {
        let dir = tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path().join("state.json")).await.unwrap());
        store
            .upsert_contest(&ContestSeed::new(0, "pwnable.tw", "https://pwnable.tw", "tw", 10))
            .await
            .unwrap();
        for (slack_id, id_ctf) in [("A", "a"), ("B", "b"), ("C", "c")] {
            store.link_user(0, slack_id, id_ctf).await.unwrap();
        }

        let now = Utc::now();
        let site = FakeSite::tw()
            .with_profile("a", profile("a", solves(a, now, 2)))
            .with_profile("b", profile("b", solves(b, now, 30)))
            .with_profile("c", profile("c", solves(c, now, 2)));

        let chat = Arc::new(FakeChat::default());
        let unlocker = Arc::new(FakeUnlocker::default());
        let jobs = Arc::new(Jobs::new(
            store,
            SiteRegistry::new(vec![Arc::new(site)]),
            chat.clone(),
            unlocker.clone(),
            "C_DIGEST",
            PostingIdentity::default(),
        ));

        Fixture {
            _dir: dir,
            chat,
            unlocker,
            jobs,
        }
    }

    #[tokio::test]
    async fn test_weekly_ranking_order() {
        let f = fixture(3, 5, 0).await;

        f.jobs.weekly(Utc::now()).await.unwrap();

        let posts = f.chat.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel, "C_DIGEST");
        let text = &posts[0].content.text;
        let b = text.find("<@B>").unwrap();
        let a = text.find("<@A>").unwrap();
        let c = text.find("<@C>").unwrap();
        assert!(b < a && a < c);
        assert!(text.contains("1位 <@B>"));
    }

    #[tokio::test]
    async fn test_weekly_empty_week() {
        let f = fixture(0, 0, 0).await;

        f.jobs.weekly(Utc::now()).await.unwrap();

        assert_eq!(f.chat.texts(), vec![format::NOBODY_SOLVED.to_string()]);
    }

    #[tokio::test]
    async fn test_daily_digest_and_achievements() {
        // A solved 5 of 10 today, B solved 10 yesterday, C nothing.
        let f = fixture(5, 10, 0).await;

        f.jobs.daily(Utc::now()).await.unwrap();

        let texts = f.chat.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("<@A>"));
        assert!(!texts[0].contains("<@B>"));
        assert!(!texts[0].contains("<@C>"));

        assert_eq!(
            f.unlocker.unlocked(),
            vec![
                ("A".to_string(), "pwnyaa-tw-half".to_string()),
                ("B".to_string(), "pwnyaa-tw-complete".to_string()),
                ("B".to_string(), "pwnyaa-tw-half".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_daily_without_solvers_posts_nothing() {
        let f = fixture(0, 0, 0).await;

        f.jobs.daily(Utc::now()).await.unwrap();

        assert!(f.chat.texts().is_empty());
        assert!(f.unlocker.unlocked().is_empty());
    }

    #[tokio::test]
    async fn test_jobs_are_serialized() {
        let f = fixture(1, 1, 1).await;
        let guard = f.jobs.lock.lock().await;

        let jobs = f.jobs.clone();
        let weekly = tokio::spawn(async move { jobs.weekly(Utc::now()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!weekly.is_finished());
        assert!(f.chat.texts().is_empty());

        drop(guard);
        weekly.await.unwrap().unwrap();
        assert_eq!(f.chat.texts().len(), 1);
    }
}
