//! The site client seam.

use async_trait::async_trait;

use crate::error::SiteResult;
use crate::types::{Challenge, Profile, SiteDescriptor};

/// A tracked CTF site.
#[async_trait]
pub trait CtfSite: Send + Sync {
    /// Static identity of this site.
    fn descriptor(&self) -> &SiteDescriptor;

    /// Fetch the current challenge list.
    ///
    /// Transport failures surface as errors after retries. An unrecognized
    /// page is an empty list.
    async fn fetch_challenges(&self) -> SiteResult<Vec<Challenge>>;

    /// Fetch a user's profile. `None` when the user does not exist or the
    /// profile could not be retrieved.
    async fn fetch_profile(&self, id_ctf: &str) -> Option<Profile>;
}
