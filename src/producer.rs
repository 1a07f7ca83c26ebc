//! The scheduled write path: refresh the cached analysis.
//!
//! One linear pass — feed list, collection, scoring, persist — with no
//! retries between steps. A failing step short-circuits into an error
//! record that is persisted in place of a result, so the schedule
//! always completes and the caller always receives a definite outcome.

use crate::analysis::{self, AnalysisOutcome, ErrorKind, ScoreError};
use crate::config::Config;
use crate::feed;
use crate::storage::AnalysisCache;

/// Runs one producer pass and persists its outcome.
///
/// Never returns an `Err`: every failure mode becomes an
/// [`AnalysisOutcome::Error`] that is written to the cache (except a
/// cache failure itself, which can only be logged and returned). The
/// returned value is exactly what was persisted, so the cron route can
/// echo it to the caller.
pub async fn run(
    config: &Config,
    client: &reqwest::Client,
    cache: &AnalysisCache,
) -> AnalysisOutcome {
    let outcome = run_pipeline(config, client).await;

    match &outcome {
        AnalysisOutcome::Success(result) => {
            tracing::info!(total_score = result.total_score, "Producer run succeeded");
        }
        AnalysisOutcome::Error(record) => {
            tracing::warn!(kind = ?record.kind, message = %record.message, "Producer run failed");
        }
    }

    if let Err(e) = cache.put(&outcome).await {
        tracing::error!(error = %e, "Failed to persist producer outcome");
        return AnalysisOutcome::error(
            ErrorKind::CacheFailure,
            format!("분석 결과를 저장하지 못했습니다: {}", e),
        );
    }

    outcome
}

async fn run_pipeline(config: &Config, client: &reqwest::Client) -> AnalysisOutcome {
    // Step 1: feed list from the WordPress site
    let urls = match feed::fetch_feed_list(client, &config.wordpress_site_url, config.feed_timeout)
        .await
    {
        Ok(urls) => urls,
        Err(e) => {
            return AnalysisOutcome::error(
                ErrorKind::UpstreamFetchFailure,
                format!("피드 목록을 가져오지 못했습니다: {}", e),
            );
        }
    };

    // Step 2: concurrent collection; individual failures already dropped
    let summaries = feed::collect_latest(
        client,
        &urls,
        config.feed_concurrency,
        config.feed_timeout,
        config.articles_per_feed,
    )
    .await;

    if summaries.is_empty() {
        return AnalysisOutcome::error(
            ErrorKind::AllFeedsFailure,
            format!("피드 {}개 중 수집에 성공한 기사가 없습니다.", urls.len()),
        );
    }

    // Step 3: one scoring request
    match analysis::request_score(client, config, &summaries).await {
        Ok(result) => AnalysisOutcome::Success(result),
        Err(ScoreError::MalformedReply { raw }) => AnalysisOutcome::error_with_detail(
            ErrorKind::ResponseParseFailure,
            "AI 응답이 유효한 JSON이 아닙니다.",
            raw,
        ),
        Err(e) => AnalysisOutcome::error(
            ErrorKind::ScoringServiceFailure,
            format!("AI 분석 요청이 실패했습니다: {}", e),
        ),
    }
}
