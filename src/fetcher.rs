//! News provider client with bounded pagination.
//!
//! The provider ([newsdata.io](https://newsdata.io)) returns one page of
//! results per request plus an optional `nextPage` token. [`fetch_all`]
//! follows that token for at most `max_pages` requests and combines the
//! pages into a single [`NewsResponse`].
//!
//! # Architecture
//!
//! - [`PageSource`]: trait for anything that can return one provider page
//! - [`NewsDataClient`]: HTTP implementation backed by `reqwest`
//! - [`fetch_all`]: the pagination loop, generic over [`PageSource`]

use crate::config::AppConfig;
use crate::models::{NewsResponse, RawArticle};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Failures talking to the news provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to news provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("news provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("news provider reported an error: {0}")]
    Provider(String),

    #[error("could not decode news provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid news provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// A source of provider result pages.
pub trait PageSource {
    /// Fetch one page; `page` is the `nextPage` token of the previous page.
    async fn fetch_page(&self, page: Option<&str>) -> Result<NewsResponse, FetchError>;
}

/// HTTP client for the newsdata.io `news` endpoint.
pub struct NewsDataClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl NewsDataClient {
    /// Build the client with the API key, query and language baked into the endpoint.
    pub fn new(config: &AppConfig) -> Result<Self, FetchError> {
        let endpoint = Url::parse_with_params(
            &config.news_api_url,
            [
                ("apikey", config.news_api_key.as_str()),
                ("q", config.query.as_str()),
                ("language", config.language.as_str()),
            ],
        )?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    fn page_url(&self, page: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(token) = page {
            url.query_pairs_mut().append_pair("page", token);
        }
        url
    }
}

impl std::fmt::Debug for NewsDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut redacted = self.endpoint.clone();
        redacted.set_query(None);
        f.debug_struct("NewsDataClient")
            .field("endpoint", &redacted.as_str())
            .finish()
    }
}

impl PageSource for NewsDataClient {
    #[instrument(level = "info", skip_all, fields(page = ?page))]
    async fn fetch_page(&self, page: Option<&str>) -> Result<NewsResponse, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(self.page_url(page)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u128,
            "Provider responded"
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        parse_page(&body)
    }
}

/// Decode one provider page, surfacing provider-reported errors.
///
/// On failure newsdata.io answers `{"status": "error", "results": {"message": ...}}`.
pub fn parse_page(body: &str) -> Result<NewsResponse, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.get("status").and_then(|s| s.as_str()) == Some("error") {
        let message = value
            .pointer("/results/message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error")
            .to_string();
        return Err(FetchError::Provider(message));
    }
    Ok(serde_json::from_value(value)?)
}

/// Fetch up to `max_pages` pages and combine their results.
///
/// Stops early once a page carries no (or an empty) `nextPage` token.
/// Articles repeated across pages (same non-empty `link`) are kept once.
#[instrument(level = "info", skip_all, fields(max_pages = max_pages))]
pub async fn fetch_all<S: PageSource>(
    source: &S,
    max_pages: usize,
) -> Result<NewsResponse, FetchError> {
    let mut results: Vec<RawArticle> = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    for _ in 0..max_pages {
        let page = source.fetch_page(token.as_deref()).await?;
        pages += 1;
        debug!(page = pages, count = page.results.len(), "Fetched provider page");
        results.extend(page.results);

        match page.next_page.filter(|t| !t.is_empty()) {
            Some(next) => token = Some(next),
            None => {
                token = None;
                break;
            }
        }
    }

    if token.is_some() {
        warn!(max_pages, "Stopped paging at the page limit; more results were available");
    }

    let fetched = results.len();
    let results: Vec<RawArticle> = results
        .into_iter()
        .enumerate()
        .unique_by(|(i, article)| article.link.clone().filter(|l| !l.is_empty()).ok_or(*i))
        .map(|(_, article)| article)
        .collect();

    info!(
        pages,
        fetched,
        unique = results.len(),
        "Fetched news from provider"
    );

    Ok(NewsResponse {
        status: Some("ok".to_string()),
        total_results: Some(results.len() as u64),
        results,
        next_page: None,
    })
}
