//! Scraper agent: fetches the selected pages and consolidates their text.

use std::sync::Arc;

use anyhow::bail;
use productresearch_core::{Agent, AgentContext, AgentResult, PersonaConfig, SourceReference};
use serde_json::{json, Value};

use crate::personas::scraper_persona;
use crate::tools::PageFetcher;

/// Agent that extracts and consolidates product information from web pages.
pub struct WebScraperAgent {
    persona: PersonaConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl WebScraperAgent {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            persona: scraper_persona(),
            fetcher,
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// URLs from the task's own context, falling back to what the previous task found.
fn resolve_urls(context: &AgentContext) -> Vec<String> {
    let own = string_list(context.get_param("urls"));
    if !own.is_empty() {
        return own;
    }
    string_list(context.previous_field("urls"))
}

#[async_trait::async_trait]
impl Agent for WebScraperAgent {
    fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    async fn execute(&self, context: &AgentContext) -> Result<AgentResult, anyhow::Error> {
        let urls = resolve_urls(context);
        tracing::info!(task = %context.task.name, url_count = urls.len(), "scraper agent executing");

        if urls.is_empty() {
            bail!("no URLs to scrape");
        }

        let mut blocks = Vec::new();
        let mut pages = Vec::new();
        let mut sources = Vec::new();
        let mut failed = Vec::new();

        for url in &urls {
            match self.fetcher.fetch(url).await {
                Ok(page) if page.text.is_empty() => {
                    tracing::warn!(url = %url, "page had no readable text; skipping");
                    failed.push(url.clone());
                }
                Ok(page) => {
                    blocks.push(format!("Source: {}\n{}", page.url, page.text));
                    pages.push(json!({
                        "url": &page.url,
                        "title": &page.title,
                        "chars": page.text.chars().count(),
                    }));
                    sources.push(SourceReference {
                        uri: page.url,
                        title: page.title,
                        snippet: None,
                    });
                }
                Err(err) => {
                    tracing::warn!(url = %url, error = %format!("{err:#}"), "failed to scrape page; skipping");
                    failed.push(url.clone());
                }
            }
        }

        if blocks.is_empty() {
            bail!("failed to extract content from any of {} URLs", urls.len());
        }

        let fetched: Vec<String> = sources.iter().map(|s| s.uri.clone()).collect();
        let confidence = fetched.len() as f64 / urls.len() as f64;
        tracing::debug!(fetched = fetched.len(), failed = failed.len(), "scrape consolidated");

        Ok(AgentResult::new(
            blocks.join("\n\n"),
            json!({
                "urls": fetched,
                "pages": pages,
                "failed": failed,
            }),
        )
        .with_sources(sources)
        .with_confidence(confidence))
    }
}
