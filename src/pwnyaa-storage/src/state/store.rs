//! Persistent state store.
//!
//! `StateStore` owns the single in-memory [`State`] behind an async
//! `RwLock` and rewrites the whole document after every mutation while
//! still holding the write lock, so in-process writers are serialized.
//! Mutations are applied to a copy and only committed in memory once the
//! copy is on disk.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, StorageError};

use super::types::{AliasMatch, Contest, ContestSeed, Linked, State, Upserted, User};

/// JSON-file-backed owner of the state document.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl StateStore {
    /// Load the document at `path`, defaulting to an empty state.
    ///
    /// The loaded (or default) document is written back immediately so the
    /// file exists from startup on.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(StorageError::InvalidPath(path));
        }

        let state = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            State::default()
        };

        info!(
            path = %path.display(),
            contests = state.contests.len(),
            users = state.users.len(),
            "State loaded"
        );

        write_document(&path, &state).await?;

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clone of the current document.
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Insert or refresh the contest described by `seed` and persist.
    pub async fn upsert_contest(&self, seed: &ContestSeed) -> Result<Upserted> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let outcome = next.upsert_contest(seed);
        write_document(&self.path, &next).await?;
        *state = next;
        debug!(title = %seed.title, num_challs = seed.num_challs, ?outcome, "Contest upserted");
        Ok(outcome)
    }

    /// Link a Slack user to a CTF account in a contest and persist.
    pub async fn link_user(&self, contest_id: u32, slack_id: &str, id_ctf: &str) -> Result<Linked> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let outcome = next
            .link_user(contest_id, slack_id, id_ctf)
            .ok_or(StorageError::ContestNotFound(contest_id))?;
        write_document(&self.path, &next).await?;
        *state = next;
        info!(contest_id, slack_id, id_ctf, ?outcome, "User linked");
        Ok(outcome)
    }

    /// Add a Slack user to the global registry, persisting only on change.
    pub async fn register_user(&self, slack_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let added = next.register_user(slack_id);
        if added {
            write_document(&self.path, &next).await?;
            *state = next;
            debug!(slack_id, "User registered");
        }
        Ok(added)
    }

    /// Contest whose alias or title matches `name`.
    pub async fn find_contest(&self, name: &str, mode: AliasMatch) -> Option<Contest> {
        self.state.read().await.find_contest(name, mode).cloned()
    }

    /// The caller's membership in a contest whose alias matches `name`.
    pub async fn find_membership(
        &self,
        slack_id: &str,
        name: &str,
        mode: AliasMatch,
    ) -> Option<(Contest, User)> {
        self.state
            .read()
            .await
            .find_membership(slack_id, name, mode)
            .map(|(c, u)| (c.clone(), u.clone()))
    }
}

/// Write the document to a sibling temp file, fsync, then rename over `path`.
async fn write_document(path: &Path, state: &State) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(state)?;
    let tmp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, path).await?;
    Ok(())
}
