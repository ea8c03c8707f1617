//! In-memory fakes for the site, chat, and achievement seams.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pwnyaa_sites::{Challenge, CtfSite, Profile, SiteDescriptor, SiteError, SiteResult, SolvedInfo};
use pwnyaa_slack::{ChatPoster, SlackMessageContent, SlackResult};

use crate::achievements::AchievementUnlocker;
use crate::error::Result;

pub fn challenges(n: usize) -> Vec<Challenge> {
    (0..n)
        .map(|i| Challenge {
            id: i as u32,
            name: format!("chall-{i}"),
            score: 100,
        })
        .collect()
}

/// `n` solves, each `hours_ago` before `now`.
pub fn solves(n: usize, now: DateTime<Utc>, hours_ago: i64) -> Vec<SolvedInfo> {
    (0..n)
        .map(|i| SolvedInfo {
            name: format!("chall-{i}"),
            score: 100,
            solved_at: now - Duration::hours(hours_ago),
        })
        .collect()
}

pub fn profile(username: &str, solved: Vec<SolvedInfo>) -> Profile {
    Profile {
        username: username.to_string(),
        country: "Japan".to_string(),
        rank: "42".to_string(),
        score: "1200".to_string(),
        comment: "meow".to_string(),
        registered_at: "2020-01-01".to_string(),
        solved,
    }
}

pub struct FakeSite {
    pub descriptor: SiteDescriptor,
    challenges: Vec<Challenge>,
    failing: bool,
    profiles: HashMap<String, Profile>,
    pub profile_requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(id: u32, title: &str, alias: &str) -> Self {
        Self {
            descriptor: SiteDescriptor {
                id,
                title: title.to_string(),
                url: format!("https://{title}"),
                default_alias: alias.to_string(),
            },
            challenges: Vec::new(),
            failing: false,
            profiles: HashMap::new(),
            profile_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn tw() -> Self {
        Self::new(0, "pwnable.tw", "tw")
    }

    pub fn xyz() -> Self {
        Self::new(1, "pwnable.xyz", "xyz")
    }

    pub fn with_challenges(mut self, challenges: Vec<Challenge>) -> Self {
        self.challenges = challenges;
        self
    }

    pub fn with_profile(mut self, id_ctf: &str, profile: Profile) -> Self {
        self.profiles.insert(id_ctf.to_string(), profile);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl CtfSite for FakeSite {
    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    async fn fetch_challenges(&self) -> SiteResult<Vec<Challenge>> {
        if self.failing {
            return Err(SiteError::Network("connection reset".into()));
        }
        Ok(self.challenges.clone())
    }

    async fn fetch_profile(&self, id_ctf: &str) -> Option<Profile> {
        self.profile_requests.lock().unwrap().push(id_ctf.to_string());
        self.profiles.get(id_ctf).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posted {
    pub channel: String,
    pub content: SlackMessageContent,
}

#[derive(Default)]
pub struct FakeChat {
    pub posted: Mutex<Vec<Posted>>,
    pub reactions: Mutex<Vec<(String, String, String)>>,
}

impl FakeChat {
    pub fn texts(&self) -> Vec<String> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.content.text.clone())
            .collect()
    }

    pub fn posts(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPoster for FakeChat {
    async fn post_message(&self, channel: &str, content: SlackMessageContent) -> SlackResult<String> {
        let mut posted = self.posted.lock().unwrap();
        posted.push(Posted {
            channel: channel.to_string(),
            content,
        });
        Ok(format!("1700000000.{:06}", posted.len()))
    }

    async fn add_reaction(&self, channel: &str, ts: &str, emoji: &str) -> SlackResult<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((channel.to_string(), ts.to_string(), emoji.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUnlocker {
    pub unlocked: Mutex<Vec<(String, String)>>,
}

impl FakeUnlocker {
    pub fn unlocked(&self) -> Vec<(String, String)> {
        self.unlocked.lock().unwrap().clone()
    }
}

#[async_trait]
impl AchievementUnlocker for FakeUnlocker {
    async fn unlock(&self, slack_id: &str, achievement: &str) -> Result<()> {
        self.unlocked
            .lock()
            .unwrap()
            .push((slack_id.to_string(), achievement.to_string()));
        Ok(())
    }
}
