//! HTML parsing contract and shared scraping helpers.

use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::types::{Challenge, Profile};

/// Site-specific HTML extraction.
///
/// Implementations never fail: a page that does not have the expected
/// structure yields an empty list or `None`.
pub trait SiteParser: Send + Sync {
    /// Extract the challenge list from the challenges page.
    fn parse_challenges(&self, html: &str) -> Vec<Challenge>;

    /// Extract a user profile from a user page.
    fn parse_profile(&self, html: &str) -> Option<Profile>;
}

/// Compile a selector, logging instead of failing on a bad pattern.
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = css, error = %e, "Invalid CSS selector");
            None
        }
    }
}

/// Whitespace-normalized text content of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the `nth` match of `sel` under `scope`.
pub(crate) fn nth_text(scope: ElementRef<'_>, sel: &Selector, nth: usize) -> Option<String> {
    scope.select(sel).nth(nth).map(element_text)
}

/// First element of the document matching `css`.
pub(crate) fn first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    document.select(&sel).next()
}

/// Parse a number after removing a fixed prefix and suffix.
///
/// `parse_affixed("300 pts", "", " pts")` is `Some(300)`.
pub(crate) fn parse_affixed(text: &str, prefix: &str, suffix: &str) -> Option<u32> {
    let text = text.trim();
    let text = text.strip_prefix(prefix).unwrap_or(text);
    let text = text.strip_suffix(suffix).unwrap_or(text);
    text.trim().parse().ok()
}

/// Parse a solve timestamp; naive timestamps are taken as UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
