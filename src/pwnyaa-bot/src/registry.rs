//! The set of tracked sites.

use std::sync::Arc;

use pwnyaa_sites::CtfSite;
use pwnyaa_storage::Contest;

/// Tracked sites, looked up by the contest they back.
#[derive(Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<Arc<dyn CtfSite>>,
}

impl SiteRegistry {
    pub fn new(sites: Vec<Arc<dyn CtfSite>>) -> Self {
        Self { sites }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CtfSite>> {
        self.sites.iter()
    }

    /// Site backing `contest`, matched by id and then by title.
    pub fn for_contest(&self, contest: &Contest) -> Option<Arc<dyn CtfSite>> {
        self.sites
            .iter()
            .find(|s| s.descriptor().id == contest.id)
            .or_else(|| {
                self.sites
                    .iter()
                    .find(|s| s.descriptor().title == contest.title)
            })
            .cloned()
    }
}

impl std::fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sites.iter().map(|s| &s.descriptor().title))
            .finish()
    }
}
