//! HTTP plumbing shared by the site clients.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};
use tracing::debug;

use crate::error::{SiteError, SiteResult};
use crate::retry::Retry;

/// Default request timeout.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("pwnyaa/", env!("CARGO_PKG_VERSION"));

/// Builder with the timeout and user agent every site request uses.
pub(crate) fn client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
}

/// Client with its own cookie jar and no redirect following.
///
/// Each login gets one of these so sessions never leak between requests.
pub(crate) fn session_client(timeout: Duration) -> SiteResult<Client> {
    client_builder(timeout)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| SiteError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Client for anonymous page fetches.
pub(crate) fn plain_client(timeout: Duration) -> SiteResult<Client> {
    client_builder(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SiteError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into [`SiteError::Status`].
pub(crate) fn check_status(response: Response) -> SiteResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SiteError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// GET `url` and return the body, retrying transient failures.
pub(crate) async fn get_text(client: &Client, retry: &Retry, url: &str) -> SiteResult<String> {
    retry
        .execute(move || async move {
            debug!(url, "Fetching page");
            let response = check_status(client.get(url).send().await?)?;
            Ok(response.text().await?)
        })
        .await
}
