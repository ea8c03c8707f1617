//! Data scraped from CTF sites.

use chrono::{DateTime, Duration, Utc};

/// Static identity of a tracked site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDescriptor {
    /// Contest id in the state document.
    pub id: u32,
    /// Contest title, also the upsert lookup key.
    pub title: String,
    /// Public URL shown in summaries.
    pub url: String,
    /// Alias given to a newly created contest.
    pub default_alias: String,
}

/// A challenge listed on a site. Only the count is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub id: u32,
    pub name: String,
    pub score: u32,
}

/// A challenge a user has solved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedInfo {
    pub name: String,
    pub score: u32,
    pub solved_at: DateTime<Utc>,
}

impl SolvedInfo {
    /// Whether the solve happened within `window` before `now`.
    pub fn solved_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.solved_at <= now && now - self.solved_at <= window
    }
}

/// A user's public profile on a site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub country: String,
    pub rank: String,
    pub score: String,
    pub comment: String,
    pub registered_at: String,
    pub solved: Vec<SolvedInfo>,
}

impl Profile {
    /// Solves within `window` before `now`.
    pub fn solved_since(&self, now: DateTime<Utc>, window: Duration) -> Vec<&SolvedInfo> {
        self.solved
            .iter()
            .filter(|s| s.solved_within(now, window))
            .collect()
    }
}
