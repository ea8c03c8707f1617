//! State document types.
//!
//! Field names serialize in camelCase so documents written by earlier
//! versions of the bot load unchanged.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A Slack user's link to a CTF-site account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Slack user id.
    pub slack_id: String,
    /// Account id on the CTF site; empty means registered but not linked.
    #[serde(default)]
    pub id_ctf: String,
}

impl User {
    /// Create a membership record.
    pub fn new(slack_id: impl Into<String>, id_ctf: impl Into<String>) -> Self {
        Self {
            slack_id: slack_id.into(),
            id_ctf: id_ctf.into(),
        }
    }

    /// Whether this record points at a CTF-site account.
    pub fn is_linked(&self) -> bool {
        !self.id_ctf.is_empty()
    }
}

/// A tracked CTF site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: u32,
    #[serde(default)]
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub alias: Vec<String>,
    /// Challenge count observed on the last refresh.
    #[serde(default)]
    pub num_challs: usize,
    #[serde(default)]
    pub joining_users: Vec<User>,
}

impl Contest {
    /// Whether one of the aliases matches `name`.
    pub fn has_alias(&self, name: &str, mode: AliasMatch) -> bool {
        self.alias.iter().any(|alias| mode.matches(alias, name))
    }

    /// Whether `name` matches an alias or the title.
    pub fn is_named(&self, name: &str, mode: AliasMatch) -> bool {
        self.has_alias(name, mode) || mode.matches(&self.title, name)
    }

    /// Membership record of a Slack user, if any.
    pub fn member(&self, slack_id: &str) -> Option<&User> {
        self.joining_users.iter().find(|u| u.slack_id == slack_id)
    }

    /// First alias, falling back to the title.
    pub fn short_name(&self) -> &str {
        self.alias.first().map(String::as_str).unwrap_or(&self.title)
    }
}

/// Root aggregate persisted as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Every Slack user that ever issued a resolvable `join`.
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub contests: Vec<Contest>,
}

/// Fresh snapshot of a site used to create or refresh its contest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContestSeed {
    pub id: u32,
    pub title: String,
    pub url: String,
    /// Alias given to a contest created from this seed.
    pub default_alias: String,
    pub num_challs: usize,
}

impl ContestSeed {
    pub fn new(
        id: u32,
        title: impl Into<String>,
        url: impl Into<String>,
        default_alias: impl Into<String>,
        num_challs: usize,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            default_alias: default_alias.into(),
            num_challs,
        }
    }
}

/// Outcome of [`State::upsert_contest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Updated,
}

/// Outcome of [`State::link_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linked {
    /// A new membership record was appended.
    Added,
    /// The existing record's `idCtf` was overwritten.
    Updated,
}

/// How contest names given in chat are compared with aliases and titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AliasMatch {
    /// Byte-for-byte equality.
    #[default]
    Exact,
    /// Equality after trimming and Unicode lowercasing.
    CaseInsensitive,
}

impl AliasMatch {
    pub fn matches(self, candidate: &str, query: &str) -> bool {
        match self {
            AliasMatch::Exact => candidate == query,
            AliasMatch::CaseInsensitive => {
                candidate.trim().to_lowercase() == query.trim().to_lowercase()
            }
        }
    }
}

impl FromStr for AliasMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(AliasMatch::Exact),
            "case-insensitive" | "case_insensitive" | "insensitive" => {
                Ok(AliasMatch::CaseInsensitive)
            }
            other => Err(format!(
                "unknown alias match mode '{}', expected 'exact' or 'case-insensitive'",
                other
            )),
        }
    }
}

impl State {
    /// Insert a contest for the seed, or refresh the existing one's count.
    ///
    /// Lookup is by title. An existing record keeps its id, aliases and
    /// members; only `url` and `num_challs` are written back.
    pub fn upsert_contest(&mut self, seed: &ContestSeed) -> Upserted {
        match self.contests.iter_mut().find(|c| c.title == seed.title) {
            Some(contest) => {
                contest.num_challs = seed.num_challs;
                contest.url = seed.url.clone();
                Upserted::Updated
            }
            None => {
                self.contests.push(Contest {
                    id: seed.id,
                    url: seed.url.clone(),
                    title: seed.title.clone(),
                    alias: vec![seed.default_alias.clone()],
                    num_challs: seed.num_challs,
                    joining_users: Vec::new(),
                });
                Upserted::Inserted
            }
        }
    }

    /// Link `slack_id` to `id_ctf` in contest `contest_id`.
    ///
    /// Overwrites the existing record for the user or appends a new one, so
    /// there is at most one record per (contest, user). Returns `None` when
    /// the contest is not tracked.
    pub fn link_user(&mut self, contest_id: u32, slack_id: &str, id_ctf: &str) -> Option<Linked> {
        let contest = self.contests.iter_mut().find(|c| c.id == contest_id)?;

        match contest
            .joining_users
            .iter_mut()
            .find(|u| u.slack_id == slack_id)
        {
            Some(user) => {
                user.id_ctf = id_ctf.to_string();
                Some(Linked::Updated)
            }
            None => {
                contest.joining_users.push(User::new(slack_id, id_ctf));
                Some(Linked::Added)
            }
        }
    }

    /// Add the user to the global registry; `false` if already present.
    pub fn register_user(&mut self, slack_id: &str) -> bool {
        if self.users.iter().any(|u| u.slack_id == slack_id) {
            return false;
        }
        self.users.push(User::new(slack_id, ""));
        true
    }

    /// Contest whose alias or title matches `name`.
    pub fn find_contest(&self, name: &str, mode: AliasMatch) -> Option<&Contest> {
        self.contests.iter().find(|c| c.is_named(name, mode))
    }

    /// The caller's membership in a contest whose alias matches `name`.
    pub fn find_membership(
        &self,
        slack_id: &str,
        name: &str,
        mode: AliasMatch,
    ) -> Option<(&Contest, &User)> {
        self.contests
            .iter()
            .filter(|c| c.has_alias(name, mode))
            .find_map(|c| c.member(slack_id).map(|u| (c, u)))
    }
}
