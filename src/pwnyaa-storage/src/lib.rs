//! pwnyaa Storage - the single JSON document behind the CTF tracker.
//!
//! The document holds every tracked contest, its last observed challenge
//! count, and which Slack users are linked to which CTF-site accounts:
//!
//! ```json
//! {
//!   "users": [{"slackId": "U123", "idCtf": ""}],
//!   "contests": [{
//!     "id": 0, "url": "https://pwnable.tw", "title": "pwnable.tw",
//!     "alias": ["tw"], "numChalls": 48,
//!     "joiningUsers": [{"slackId": "U123", "idCtf": "12345"}]
//!   }]
//! }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use pwnyaa_storage::{AliasMatch, ContestSeed, StateStore};
//!
//! #[tokio::main]
//! async fn main() -> pwnyaa_storage::Result<()> {
//!     let store = StateStore::open(pwnyaa_storage::default_state_path()?).await?;
//!
//!     let seed = ContestSeed::new(0, "pwnable.tw", "https://pwnable.tw", "tw", 48);
//!     store.upsert_contest(&seed).await?;
//!     store.link_user(0, "U123", "12345").await?;
//!
//!     let found = store.find_membership("U123", "tw", AliasMatch::Exact).await;
//!     println!("{:?}", found);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod paths;
pub mod state;

// Re-export main types at crate root
pub use error::{Result, StorageError};
pub use paths::default_state_path;
pub use state::{AliasMatch, Contest, ContestSeed, Linked, State, StateStore, Upserted, User};
