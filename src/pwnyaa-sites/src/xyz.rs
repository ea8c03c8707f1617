//! pwnable.xyz: challenge list and user pages. No login required.

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::error::SiteResult;
use crate::http::{self, DEFAULT_TIMEOUT};
use crate::parser::{
    SiteParser, element_text, first, nth_text, parse_affixed, parse_timestamp, selector,
};
use crate::retry::{Retry, RetryConfig};
use crate::site::CtfSite;
use crate::types::{Challenge, Profile, SiteDescriptor, SolvedInfo};

/// Public address of pwnable.xyz.
pub const BASE_URL: &str = "https://pwnable.xyz";

/// Selector-based parser for pwnable.xyz pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct XyzParser;

impl SiteParser for XyzParser {
    fn parse_challenges(&self, html: &str) -> Vec<Challenge> {
        let document = Html::parse_document(html);
        let (Some(card), Some(name_sel), Some(score_sel), Some(link_sel)) = (
            selector("div.col-lg-2"),
            selector("div.challenge > i"),
            selector("div.challenge > p"),
            selector("a[data-target]"),
        ) else {
            return Vec::new();
        };

        document
            .select(&card)
            .filter_map(|item| {
                let target = item.select(&link_sel).next()?.value().attr("data-target")?;
                let id = parse_affixed(target, "#chalModal", "")?;
                let name = item.select(&name_sel).next().map(element_text)?;
                let score = item
                    .select(&score_sel)
                    .next()
                    .map(element_text)
                    .and_then(|s| parse_affixed(&s, "", ""))?;
                Some(Challenge { id, name, score })
            })
            .collect()
    }

    /// The user page has a heading with the name and a table of solves.
    /// It carries no rank or country; the score is the sum of solves.
    fn parse_profile(&self, html: &str) -> Option<Profile> {
        let document = Html::parse_document(html);
        let username = element_text(first(&document, "h2")?);
        if username.is_empty() {
            return None;
        }

        let rows = selector("table.table > tbody > tr")?;
        let cell = selector("td")?;
        let solved: Vec<SolvedInfo> = document
            .select(&rows)
            .filter_map(|row| {
                Some(SolvedInfo {
                    name: nth_text(row, &cell, 0)?,
                    score: parse_affixed(&nth_text(row, &cell, 1)?, "", "")?,
                    solved_at: parse_timestamp(&nth_text(row, &cell, 2)?)?,
                })
            })
            .collect();

        let score: u32 = solved.iter().map(|s| s.score).sum();
        Some(Profile {
            username,
            score: score.to_string(),
            solved,
            ..Default::default()
        })
    }
}

/// pwnable.xyz client.
pub struct PwnableXyz {
    descriptor: SiteDescriptor,
    base_url: String,
    parser: XyzParser,
    client: Client,
    retry: Retry,
}

impl PwnableXyz {
    pub fn new() -> SiteResult<Self> {
        Ok(Self {
            descriptor: SiteDescriptor {
                id: 1,
                title: "pwnable.xyz".to_string(),
                url: BASE_URL.to_string(),
                default_alias: "xyz".to_string(),
            },
            base_url: BASE_URL.to_string(),
            parser: XyzParser,
            client: http::plain_client(DEFAULT_TIMEOUT)?,
            retry: Retry::default(),
        })
    }

    /// Point requests at another host. The descriptor URL is unchanged.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = Retry::new(config);
        self
    }
}

#[async_trait]
impl CtfSite for PwnableXyz {
    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    async fn fetch_challenges(&self) -> SiteResult<Vec<Challenge>> {
        let url = format!("{}/challenges", self.base_url);
        let page = http::get_text(&self.client, &self.retry, &url).await?;
        let challenges = self.parser.parse_challenges(&page);
        info!(site = "pwnable.xyz", count = challenges.len(), "Fetched challenges");
        Ok(challenges)
    }

    async fn fetch_profile(&self, id_ctf: &str) -> Option<Profile> {
        let url = format!("{}/user/{}/", self.base_url, id_ctf);
        match http::get_text(&self.client, &self.retry, &url).await {
            Ok(page) => {
                let profile = self.parser.parse_profile(&page);
                if profile.is_none() {
                    debug!(user = id_ctf, "pwnable.xyz profile page did not match");
                }
                profile
            }
            Err(e) => {
                warn!(user = id_ctf, error = %e, "pwnable.xyz profile lookup failed");
                None
            }
        }
    }
}
