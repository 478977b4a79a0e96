//! Search agent: turns a product name into a short list of source URLs.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use productresearch_core::{
    Agent, AgentContext, AgentResult, PersonaConfig, SearchConfig, SourceReference,
};
use serde_json::json;

use crate::personas::search_persona;
use crate::tools::SearchTool;

/// Agent that asks the search service for the most relevant product pages.
pub struct ProductSearchAgent {
    persona: PersonaConfig,
    tool: Arc<dyn SearchTool>,
    result_limit: usize,
    query_suffix: String,
}

impl ProductSearchAgent {
    pub fn new(tool: Arc<dyn SearchTool>, config: &SearchConfig) -> Self {
        Self {
            persona: search_persona(),
            tool,
            result_limit: config.result_limit,
            query_suffix: config.query_suffix.clone(),
        }
    }

    fn search_query(&self, query: &str) -> String {
        format!("{} {}", query.trim(), self.query_suffix.trim())
            .trim()
            .to_string()
    }
}

#[async_trait::async_trait]
impl Agent for ProductSearchAgent {
    fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    async fn execute(&self, context: &AgentContext) -> Result<AgentResult, anyhow::Error> {
        let query = context
            .get_param("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| anyhow!("search task has no `query` in its context"))?;

        let search_query = self.search_query(query);
        tracing::info!(task = %context.task.name, query = %search_query, "search agent executing");

        let response = match self.tool.search(&search_query).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "error in search execution");
                return Err(err).context("search stage failed");
            }
        };

        let sources: Vec<SourceReference> = response
            .organic
            .into_iter()
            .filter_map(|hit| {
                let uri = hit.link?.trim().to_string();
                (!uri.is_empty()).then_some(SourceReference {
                    uri,
                    title: hit.title,
                    snippet: hit.snippet,
                })
            })
            .take(self.result_limit)
            .collect();

        let urls: Vec<String> = sources.iter().map(|s| s.uri.clone()).collect();
        if urls.is_empty() {
            tracing::warn!(query = %search_query, "search returned no usable links");
        } else {
            tracing::debug!(urls = ?urls, "search selected sources");
        }

        let confidence = urls.len() as f64 / self.result_limit.max(1) as f64;
        Ok(AgentResult::new(
            urls.join("\n"),
            json!({
                "query": query,
                "search_query": search_query,
                "urls": urls,
            }),
        )
        .with_sources(sources)
        .with_confidence(confidence))
    }
}
