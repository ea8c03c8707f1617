//! pwnable.tw: challenge list, login, and user profiles.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{REFERER, SET_COOKIE};
use scraper::Html;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::{SiteError, SiteResult};
use crate::http::{self, DEFAULT_TIMEOUT};
use crate::parser::{
    SiteParser, element_text, first, nth_text, parse_affixed, parse_timestamp, selector,
};
use crate::retry::{Retry, RetryConfig};
use crate::site::CtfSite;
use crate::types::{Challenge, Profile, SiteDescriptor, SolvedInfo};

/// Public address of pwnable.tw.
pub const BASE_URL: &str = "https://pwnable.tw";

const SESSION_COOKIE: &str = "sessionid=";

/// Login credentials for pwnable.tw.
#[derive(Clone)]
pub struct TwCredentials {
    username: String,
    password: SecretString,
}

impl TwCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for TwCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Selector-based parser for pwnable.tw pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwParser;

impl TwParser {
    fn parse_solved(document: &Html) -> Vec<SolvedInfo> {
        let (Some(rows), Some(cell)) = (
            selector("table#solved-challenges > tbody > tr"),
            selector("td"),
        ) else {
            return Vec::new();
        };

        document
            .select(&rows)
            .filter_map(|row| {
                let name = nth_text(row, &cell, 0)?;
                let score = parse_affixed(&nth_text(row, &cell, 1)?, "", " pts")?;
                let solved_at = parse_timestamp(&nth_text(row, &cell, 2)?)?;
                Some(SolvedInfo {
                    name,
                    score,
                    solved_at,
                })
            })
            .collect()
    }
}

impl SiteParser for TwParser {
    fn parse_challenges(&self, html: &str) -> Vec<Challenge> {
        let document = Html::parse_document(html);
        let (Some(entry), Some(name_sel), Some(score_sel)) = (
            selector("li.challenge-entry"),
            selector("div.challenge-info > .title > p > .tititle"),
            selector("div.challenge-info > .title > p > .score"),
        ) else {
            return Vec::new();
        };

        document
            .select(&entry)
            .filter_map(|item| {
                let id = parse_affixed(item.value().attr("id")?, "challenge-id-", "")?;
                let name = item.select(&name_sel).next().map(element_text)?;
                let score = item
                    .select(&score_sel)
                    .next()
                    .map(element_text)
                    .and_then(|s| parse_affixed(&s, "", " pts"))?;
                Some(Challenge { id, name, score })
            })
            .collect()
    }

    fn parse_profile(&self, html: &str) -> Option<Profile> {
        let document = Html::parse_document(html);
        let card = first(&document, "div.col-md-8 > div.row > div.col-md-9")?;
        let field = selector("div.row > div.col-md-10")?;
        let at = |nth| nth_text(card, &field, nth).unwrap_or_default();

        let username = at(0);
        if username.is_empty() {
            return None;
        }

        Some(Profile {
            username,
            country: at(1),
            rank: at(2),
            score: at(3),
            comment: at(4),
            registered_at: at(5),
            solved: Self::parse_solved(&document),
        })
    }
}

/// pwnable.tw client.
///
/// Profile pages need a session, so every profile lookup performs a fresh
/// login with its own cookie jar.
pub struct PwnableTw {
    descriptor: SiteDescriptor,
    base_url: String,
    credentials: Option<TwCredentials>,
    parser: TwParser,
    client: Client,
    retry: Retry,
    timeout: Duration,
}

impl PwnableTw {
    /// Create a client against the public site.
    pub fn new(credentials: Option<TwCredentials>) -> SiteResult<Self> {
        Ok(Self {
            descriptor: SiteDescriptor {
                id: 0,
                title: "pwnable.tw".to_string(),
                url: BASE_URL.to_string(),
                default_alias: "tw".to_string(),
            },
            base_url: BASE_URL.to_string(),
            credentials,
            parser: TwParser,
            client: http::plain_client(DEFAULT_TIMEOUT)?,
            retry: Retry::default(),
            timeout: DEFAULT_TIMEOUT,
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

    /// Log in on `session` and confirm a session cookie was issued.
    async fn login(&self, session: &Client, credentials: &TwCredentials) -> SiteResult<()> {
        let login_url = format!("{}/user/login", self.base_url);

        let page = http::get_text(session, &self.retry, &login_url).await?;
        let token = csrf_token(&page)
            .ok_or_else(|| SiteError::Login("csrfmiddlewaretoken not found on login page".into()))?;

        let form = [
            ("csrfmiddlewaretoken", token.as_str()),
            ("username", credentials.username()),
            ("password", credentials.password.expose_secret()),
        ];
        let response = session
            .post(&login_url)
            .header(REFERER, format!("{}/", self.base_url))
            .form(&form)
            .send()
            .await?;

        let has_session = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.trim_start().starts_with(SESSION_COOKIE));

        if has_session {
            debug!(user = credentials.username(), "Logged in to pwnable.tw");
            Ok(())
        } else {
            Err(SiteError::Login(format!(
                "no session cookie (HTTP {})",
                response.status().as_u16()
            )))
        }
    }

    async fn try_fetch_profile(&self, id_ctf: &str) -> SiteResult<Option<Profile>> {
        let session = http::session_client(self.timeout)?;
        match &self.credentials {
            Some(credentials) => self.login(&session, credentials).await?,
            None => warn!("No pwnable.tw credentials configured, fetching profile anonymously"),
        }

        let url = format!("{}/user/{}", self.base_url, id_ctf);
        let page = http::get_text(&session, &self.retry, &url).await?;
        Ok(self.parser.parse_profile(&page))
    }
}

/// Value of the hidden anti-forgery input on a login form.
fn csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first(&document, "input[name=csrfmiddlewaretoken]")?
        .value()
        .attr("value")
        .map(str::to_string)
}

#[async_trait]
impl CtfSite for PwnableTw {
    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    async fn fetch_challenges(&self) -> SiteResult<Vec<Challenge>> {
        let url = format!("{}/challenge/", self.base_url);
        let page = http::get_text(&self.client, &self.retry, &url).await?;
        let challenges = self.parser.parse_challenges(&page);
        info!(site = "pwnable.tw", count = challenges.len(), "Fetched challenges");
        Ok(challenges)
    }

    async fn fetch_profile(&self, id_ctf: &str) -> Option<Profile> {
        match self.try_fetch_profile(id_ctf).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                debug!(user = id_ctf, "pwnable.tw profile page did not match");
                None
            }
            Err(e) => {
                warn!(user = id_ctf, error = %e, "pwnable.tw profile lookup failed");
                None
            }
        }
    }
}
