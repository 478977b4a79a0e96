//! External capabilities the agents delegate to.
//!
//! Each capability sits behind a trait so the crew can run against fakes in
//! tests and against the real HTTP services in production.

mod llm;
mod scrape;
mod serper;

pub use llm::OpenAiChatClient;
pub use scrape::{html_to_text, HttpScraper};
pub use serper::SerperClient;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Search response in the shape returned by the Serper API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
}

#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse>;
}

/// Text content extracted from one page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-turn completion with a system prompt.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Shorten an error body for log and error messages.
pub(crate) fn snippet(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
