//! Remote data fetchers for the CTF sites pwnyaa tracks.
//!
//! Each site is split in two:
//! - a [`SiteParser`] that turns fetched HTML into [`Challenge`] lists and
//!   [`Profile`]s by fixed CSS selectors, and
//! - a [`CtfSite`] client that performs the HTTP requests (including the
//!   pwnable.tw login) and hands the pages to its parser.
//!
//! Transport failures are retried with exponential backoff. A page that does
//! not match the expected structure yields an empty list or `None`, never an
//! error; callers treat absence as "not present".

pub mod error;
mod http;
pub mod parser;
pub mod retry;
pub mod site;
pub mod tw;
pub mod types;
pub mod xyz;

pub use error::{SiteError, SiteResult};
pub use parser::SiteParser;
pub use retry::{Retry, RetryConfig};
pub use site::CtfSite;
pub use tw::{PwnableTw, TwCredentials, TwParser};
pub use types::{Challenge, Profile, SiteDescriptor, SolvedInfo};
pub use xyz::{PwnableXyz, XyzParser};
