use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Path of the feed-list endpoint on the WordPress site.
const FEED_LIST_PATH: &str = "/wp-json/ribbonline/v1/get-feeds";

#[derive(Debug, Error)]
pub enum FeedListError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Malformed feed-list response: {0}")]
    Malformed(String),
}

/// Wire shape of `GET {site}/wp-json/ribbonline/v1/get-feeds`.
#[derive(Debug, Deserialize)]
struct FeedListResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    feeds: Vec<String>,
}

/// Fetches the list of RSS source URLs from the WordPress site.
///
/// The endpoint returns `{status, feeds: [url, ...]}`. A non-success
/// `status` field or a missing `feeds` array is treated as malformed;
/// an empty list is passed through as-is (the producer reports the
/// resulting empty collection, not this client).
pub async fn fetch_feed_list(
    client: &reqwest::Client,
    site_url: &str,
    timeout: Duration,
) -> Result<Vec<String>, FeedListError> {
    let url = format!("{}{}", site_url.trim_end_matches('/'), FEED_LIST_PATH);

    let response = tokio::time::timeout(timeout, client.get(&url).send())
        .await
        .map_err(|_| FeedListError::Timeout)?
        .map_err(FeedListError::Network)?;

    if !response.status().is_success() {
        return Err(FeedListError::HttpStatus(response.status().as_u16()));
    }

    let body = tokio::time::timeout(timeout, response.text())
        .await
        .map_err(|_| FeedListError::Timeout)?
        .map_err(FeedListError::Network)?;

    let parsed: FeedListResponse =
        serde_json::from_str(&body).map_err(|e| FeedListError::Malformed(e.to_string()))?;

    if let Some(status) = &parsed.status {
        if status != "success" && status != "ok" {
            return Err(FeedListError::Malformed(format!(
                "feed-list endpoint reported status {:?}",
                status
            )));
        }
    }

    tracing::debug!(feeds = parsed.feeds.len(), "Fetched feed list");
    Ok(parsed.feeds)
}
