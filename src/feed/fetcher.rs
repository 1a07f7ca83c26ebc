use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching one feed.
///
/// These are data, not control flow: the collector logs and discards
/// them, so a single broken feed can never abort a collection cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the per-feed timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Feed parsed but contained no entries
    #[error("Feed has no entries")]
    EmptyFeed,
}

/// Fetches one feed and formats its newest entries.
///
/// Issues a single GET (no retries — every scheduled run is a fresh
/// attempt), parses the body as RSS/Atom, and returns up to
/// `max_entries` of the newest entries formatted as
/// `"제목: <title>\n요약: <summary>"`.
///
/// # Errors
///
/// - [`FetchError::Timeout`] - Request exceeded `timeout`
/// - [`FetchError::Network`] - Connection or TLS errors
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Body exceeded 10MB
/// - [`FetchError::Parse`] - Invalid RSS/Atom XML
/// - [`FetchError::EmptyFeed`] - Valid feed with zero entries
pub async fn fetch_latest(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    max_entries: usize,
) -> Result<Vec<String>, FetchError> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = tokio::time::timeout(timeout, read_limited_bytes(response, MAX_FEED_SIZE))
        .await
        .map_err(|_| FetchError::Timeout)??;

    let feed = feed_rs::parser::parse(bytes.as_slice())
        .map_err(|e| FetchError::Parse(e.to_string()))?;

    if feed.entries.is_empty() {
        return Err(FetchError::EmptyFeed);
    }

    let summaries: Vec<String> = feed
        .entries
        .into_iter()
        .take(max_entries)
        .map(|entry| {
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "(제목 없음)".to_string());
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            format!("제목: {}\n요약: {}", title.trim(), summary.trim())
        })
        .collect();

    Ok(summaries)
}

/// Fetches all feeds concurrently and collects the available summaries.
///
/// Fans [`fetch_latest`] out over a bounded worker pool of
/// `concurrency` tasks; completed results are appended in completion
/// order (ordering is not significant downstream). Failures are logged
/// and discarded, so the output only shrinks — an empty `Vec` means
/// every feed failed and is the caller's signal to report an error.
///
/// Wall-clock time is bounded by `ceil(urls / concurrency) × timeout`,
/// not by the feed count alone.
pub async fn collect_latest(
    client: &reqwest::Client,
    urls: &[String],
    concurrency: usize,
    timeout: Duration,
    max_entries: usize,
) -> Vec<String> {
    if urls.is_empty() {
        return Vec::new();
    }

    let results: Vec<(String, Result<Vec<String>, FetchError>)> = stream::iter(urls.iter().cloned())
        .map(|url| {
            let client = client.clone();
            async move {
                let result = fetch_latest(&client, &url, timeout, max_entries).await;
                (url, result)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let total = results.len();
    let mut summaries = Vec::new();
    let mut failed = 0usize;
    for (url, result) in results {
        match result {
            Ok(entries) => summaries.extend(entries),
            Err(e) => {
                failed += 1;
                tracing::warn!(feed = %url, error = %e, "Feed fetch failed, excluding from batch");
            }
        }
    }

    tracing::info!(
        feeds = total,
        failed = failed,
        summaries = summaries.len(),
        "Feed collection finished"
    );

    summaries
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
