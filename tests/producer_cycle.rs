//! Producer-to-consumer cycle tests: partial feed failure tolerance,
//! last-write-wins overwrites, and what actually reaches the scoring
//! service. Upstreams are wiremock; the cache is in-memory SQLite.

use ribbonline_engine::analysis::AnalysisOutcome;
use ribbonline_engine::config::Config;
use ribbonline_engine::producer;
use ribbonline_engine::storage::AnalysisCache;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss_item(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel>
            <item><guid>1</guid><title>{}</title><description>{}</description></item>
        </channel></rss>"#,
        title, body
    )
}

fn test_config(server: &MockServer) -> Config {
    let vars = HashMap::from([
        ("ENGINE_API_KEY", "sekrit".to_string()),
        ("WORDPRESS_SITE_URL", server.uri()),
        ("GEMINI_API_KEY", "gemini-test-key".to_string()),
        ("GEMINI_BASE_URL", server.uri()),
        ("FEED_TIMEOUT_SECS", "1".to_string()),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned()).unwrap()
}

async fn mount_feed_list(server: &MockServer, feeds: Vec<String>) {
    Mock::given(method("GET"))
        .and(path("/wp-json/ribbonline/v1/get-feeds"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "success", "feeds": feeds})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partial_failure_sends_surviving_summaries_to_scoring() {
    let server = MockServer::start().await;
    mount_feed_list(
        &server,
        vec![
            format!("{}/feed-a", server.uri()),
            format!("{}/feed-slow", server.uri()),
            format!("{}/feed-b", server.uri()),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/feed-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_item("침수 경보", "중부 집중호우")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed-b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_item("금리 동결", "기준금리 유지")))
        .mount(&server)
        .await;
    // This one exceeds the 1s per-feed timeout and must be dropped
    Mock::given(method("GET"))
        .and(path("/feed-slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss_item("느린 피드", "나오면 안 됨"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    // The scoring request must contain both surviving headlines; the
    // mock only matches when they are present in the prompt.
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(body_string_contains("침수 경보"))
        .and(body_string_contains("금리 동결"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{
                "text": r#"{"total_score": 24, "category_scores": {}, "summary": "두 건 분석"}"#
            }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server);
    let cache = AnalysisCache::open(":memory:").await.unwrap();
    let client = reqwest::Client::new();

    let outcome = producer::run(&config, &client, &cache).await;
    match outcome {
        AnalysisOutcome::Success(result) => assert_eq!(result.total_score, 24),
        other => panic!("Expected success despite one slow feed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_successive_runs_overwrite_not_merge() {
    let server = MockServer::start().await;
    mount_feed_list(&server, vec![format!("{}/feed", server.uri())]).await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_item("헤드라인", "본문")))
        .mount(&server)
        .await;

    // First run succeeds
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{
                "text": r#"{"total_score": 40, "category_scores": {}, "summary": "첫 번째 실행"}"#
            }] } }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Second run hits a scoring outage
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "temporarily unavailable" }
        })))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let cache = AnalysisCache::open(":memory:").await.unwrap();
    let client = reqwest::Client::new();

    let first = producer::run(&config, &client, &cache).await;
    assert!(matches!(first, AnalysisOutcome::Success(_)));
    assert_eq!(cache.get().await.unwrap(), Some(first));

    let second = producer::run(&config, &client, &cache).await;
    assert!(matches!(second, AnalysisOutcome::Error(_)));
    // The error record replaced the success wholesale
    assert_eq!(cache.get().await.unwrap(), Some(second));
}
