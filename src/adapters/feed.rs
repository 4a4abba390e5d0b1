//! Upstream result feed client.
//!
//! `GET {base_url}?gameId=..&size=..&tableId=..&curPage=1` returns
//! `{ "data": { "resultList": [ { "gameNum", "facesList", "score" }, .. ] } }`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::domain::RawOutcome;
use crate::error::{Result, SicboError};

/// Source of raw history rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Most recent results, in whatever order the source returns them
    async fn fetch_history(&self) -> Result<Vec<RawOutcome>>;
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    data: Option<FeedData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedData {
    #[serde(default)]
    result_list: Vec<RawOutcome>,
}

/// Parse a feed response body into raw rows.
pub fn parse_feed_body(body: &str) -> Result<Vec<RawOutcome>> {
    let envelope: FeedEnvelope = serde_json::from_str(body)
        .map_err(|e| SicboError::InvalidFeedData(format!("unparsable feed body: {}", e)))?;
    envelope
        .data
        .map(|data| data.result_list)
        .ok_or_else(|| SicboError::InvalidFeedData("response has no data object".to_string()))
}

/// HTTP client for the upstream history endpoint
pub struct FeedClient {
    http: Client,
    config: FeedConfig,
    next_agent: AtomicUsize,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SicboError::Internal(format!("failed to build feed HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            next_agent: AtomicUsize::new(0),
        })
    }

    /// User-Agent for the next request, round-robin over the configured list
    fn user_agent(&self) -> &str {
        if self.config.user_agents.is_empty() {
            return "sicbo/0.1";
        }
        let idx = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.config.user_agents.len();
        &self.config.user_agents[idx]
    }

    async fn fetch_once(&self) -> Result<Vec<RawOutcome>> {
        let size = self.config.page_size.to_string();
        let resp = self
            .http
            .get(&self.config.base_url)
            .query(&[
                ("gameId", self.config.game_id.as_str()),
                ("size", size.as_str()),
                ("tableId", self.config.table_id.as_str()),
                ("curPage", "1"),
            ])
            .header(USER_AGENT, self.user_agent())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SicboError::RateLimited(format!(
                "feed rate limited: status={}",
                status
            )));
        }

        if status.is_server_error() {
            return Err(SicboError::FeedUnavailable(format!(
                "feed returned status={}",
                status
            )));
        }

        if !status.is_success() {
            return Err(SicboError::InvalidFeedData(format!(
                "feed request failed: status={} body={}",
                status, text
            )));
        }

        parse_feed_body(&text)
    }
}

#[async_trait]
impl HistorySource for FeedClient {
    async fn fetch_history(&self) -> Result<Vec<RawOutcome>> {
        let attempts = self.config.max_retries.max(1) as u64;
        let mut attempt = 1u64;

        loop {
            match self.fetch_once().await {
                Ok(rows) => {
                    debug!(rows = rows.len(), attempt, "fetched feed history");
                    return Ok(rows);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = Duration::from_millis(self.config.retry_backoff_ms * attempt);
                    warn!(attempt, error = %e, ?delay, "feed fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{extract::Query, http::StatusCode as AxumStatus, routing::get, Router};
    use std::collections::HashMap;
    use std::sync::Arc;

    const BODY: &str = r##"{
        "code": 0,
        "data": {
            "resultList": [
                { "gameNum": "#1002", "facesList": [6, 5, 4], "score": 15 },
                { "gameNum": "#1001", "facesList": [1, 2, 2], "score": 5 }
            ]
        }
    }"##;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v2/history/getLastResult", addr)
    }

    fn feed_config(base_url: String) -> FeedConfig {
        let mut config = AppConfig::default_config().feed;
        config.base_url = base_url;
        config.retry_backoff_ms = 1;
        config
    }

    #[test]
    fn parses_result_list() {
        let rows = parse_feed_body(BODY).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].game_num, "#1002");
        assert_eq!(rows[0].faces_list, Some(vec![6, 5, 4]));
        assert_eq!(rows[1].score, Some(5));
    }

    #[test]
    fn missing_data_is_invalid() {
        let err = parse_feed_body(r#"{"code": 500, "msg": "busy"}"#).unwrap_err();
        assert!(matches!(err, SicboError::InvalidFeedData(_)));
        assert!(parse_feed_body("<html>").is_err());
    }

    #[test]
    fn user_agents_rotate() {
        let mut config = AppConfig::default_config().feed;
        config.user_agents = vec!["a".into(), "b".into()];
        let client = FeedClient::new(config).unwrap();
        assert_eq!(client.user_agent(), "a");
        assert_eq!(client.user_agent(), "b");
        assert_eq!(client.user_agent(), "a");
    }

    #[tokio::test]
    async fn sends_query_parameters() {
        let router = Router::new().route(
            "/v2/history/getLastResult",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("gameId").map(String::as_str) == Some("ktrng_3979")
                    && params.get("size").map(String::as_str) == Some("100")
                    && params.get("curPage").map(String::as_str) == Some("1")
                {
                    (AxumStatus::OK, BODY.to_string())
                } else {
                    (AxumStatus::BAD_REQUEST, String::new())
                }
            }),
        );
        let client = FeedClient::new(feed_config(serve(router).await)).unwrap();
        let rows = client.fetch_history().await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v2/history/getLastResult",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (AxumStatus::BAD_GATEWAY, String::new())
                    } else {
                        (AxumStatus::OK, BODY.to_string())
                    }
                }
            }),
        );
        let client = FeedClient::new(feed_config(serve(router).await)).unwrap();
        let rows = client.fetch_history().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v2/history/getLastResult",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::TOO_MANY_REQUESTS
                }
            }),
        );
        let client = FeedClient::new(feed_config(serve(router).await)).unwrap();
        let err = client.fetch_history().await.unwrap_err();
        assert!(matches!(err, SicboError::RateLimited(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/v2/history/getLastResult",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::NOT_FOUND
                }
            }),
        );
        let client = FeedClient::new(feed_config(serve(router).await)).unwrap();
        assert!(client.fetch_history().await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
