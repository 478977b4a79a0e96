use std::time::Instant;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use productresearch_core::{SearchConfig, SecretValue};
use reqwest::Client;
use serde_json::json;

use super::{snippet, SearchResponse, SearchTool};

/// Client for the Serper Google search API.
#[derive(Clone)]
pub struct SerperClient {
    http: Client,
    base_url: String,
    api_key: SecretValue,
}

impl SerperClient {
    pub fn new(config: &SearchConfig, api_key: SecretValue) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build serper http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchTool for SerperClient {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let started = Instant::now();
        tracing::info!(target: "tools.serper", query = %query, "serper.search.start");

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", self.api_key.expose())
            .json(&json!({ "q": query }))
            .send()
            .await
            .context("serper search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                target: "tools.serper",
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "serper.search.error"
            );
            bail!("serper returned {status}: {}", snippet(&body, 200));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("failed to decode serper response")?;

        tracing::info!(
            target: "tools.serper",
            hits = parsed.organic.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "serper.search.success"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SearchConfig {
        SearchConfig {
            base_url: server.uri(),
            ..SearchConfig::default()
        }
    }

    #[tokio::test]
    async fn posts_query_with_api_key_header() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "serper-test-key"))
            .and(body_json(json!({ "q": "Pixel 9 product specifications reviews" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic": [
                    { "title": "Pixel 9", "link": "https://store.google.com/pixel_9", "position": 1 },
                    { "title": "Review", "link": "https://example.com/review", "snippet": "Great", "position": 2 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SerperClient::new(&config_for(&server), SecretValue::new("serper-test-key"))?;
        let response = client
            .search("Pixel 9 product specifications reviews")
            .await?;

        assert_eq!(response.organic.len(), 2);
        assert_eq!(
            response.organic[1].link.as_deref(),
            Some("https://example.com/review")
        );
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Unauthorized."))
            .mount(&server)
            .await;

        let client = SerperClient::new(&config_for(&server), SecretValue::new("bad"))?;
        let err = client.search("anything").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("403"), "unexpected error: {message}");
        assert!(message.contains("Unauthorized."), "unexpected error: {message}");
        Ok(())
    }

    #[tokio::test]
    async fn missing_organic_section_is_empty() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "searchParameters": {} })))
            .mount(&server)
            .await;

        let client = SerperClient::new(&config_for(&server), SecretValue::new("key"))?;
        assert!(client.search("nothing").await?.organic.is_empty());
        Ok(())
    }
}
