//! Default location of the state document.
//!
//! - **Linux**: `~/.local/share/pwnyaa/state.json`
//! - **macOS**: `~/Library/Application Support/pwnyaa/state.json`
//! - **Windows**: `%APPDATA%\pwnyaa\state.json`

use std::path::PathBuf;

use tracing::debug;

use crate::error::{Result, StorageError};

/// Application name used for the storage directory.
pub const APP_NAME: &str = "pwnyaa";

/// File name of the state document.
pub const STATE_FILE: &str = "state.json";

/// Platform data directory path of the state document.
pub fn default_state_path() -> Result<PathBuf> {
    let path = dirs::data_dir()
        .ok_or(StorageError::HomeDirNotFound)?
        .join(APP_NAME)
        .join(STATE_FILE);
    debug!(path = %path.display(), "Resolved default state path");
    Ok(path)
}
