//! Analyst agent for turning consolidated product data into a summary.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, Context};
use productresearch_core::{Agent, AgentContext, AgentResult, MemoryItem, PersonaConfig};
use serde_json::{json, Value};

use crate::personas::analysis_persona;
use crate::tools::LlmClient;

/// Analyst agent that asks the language model for a product summary
pub struct ProductAnalysisAgent {
    persona: PersonaConfig,
    llm: Arc<dyn LlmClient>,
}

impl ProductAnalysisAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            persona: analysis_persona(),
            llm,
        }
    }
}

fn product_data(context: &AgentContext) -> Option<String> {
    if let Some(Value::Object(map)) = context.get_param("product_data") {
        if !map.is_empty() {
            return serde_json::to_string_pretty(map).ok();
        }
    }
    context
        .previous
        .as_ref()
        .map(|previous| previous.raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn build_prompt(context: &AgentContext, data: &str) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Task: {}", context.task.description);
    let _ = writeln!(
        prompt,
        "Expected output: {}",
        context.task.expected_output
    );
    let _ = writeln!(prompt, "\nProduct data:\n{data}");

    let insights = memory_insights(&context.memories);
    if !insights.is_empty() {
        let _ = writeln!(prompt, "\nInsights from earlier research runs:");
        for insight in insights {
            let _ = writeln!(prompt, "- {insight}");
        }
    }

    let _ = write!(
        prompt,
        "\nCover key features, specifications, pricing, and the overall reception in reviews. \
         Only use the information above."
    );
    prompt
}

fn memory_insights(memories: &[MemoryItem]) -> Vec<&str> {
    memories
        .iter()
        .filter_map(|item| item.metadata.get("excerpt").and_then(Value::as_str))
        .filter(|excerpt| !excerpt.trim().is_empty())
        .collect()
}

#[async_trait::async_trait]
impl Agent for ProductAnalysisAgent {
    fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    async fn execute(&self, context: &AgentContext) -> Result<AgentResult, anyhow::Error> {
        tracing::info!(task = %context.task.name, model = %self.llm.model_name(), "analyst agent executing");

        let Some(data) = product_data(context) else {
            bail!("no product data to analyze");
        };

        let prompt = build_prompt(context, &data);
        tracing::debug!(
            prompt_chars = prompt.len(),
            memories = context.memories.len(),
            "requesting product summary"
        );

        let summary = self
            .llm
            .complete(&self.persona.system_prompt(), &prompt)
            .await
            .context("analysis stage failed")?;

        let summary = summary.trim().to_string();
        if summary.is_empty() {
            bail!("language model returned an empty summary");
        }

        Ok(AgentResult::new(
            summary.clone(),
            json!({
                "summary": summary,
                "model": self.llm.model_name(),
                "memories_used": memory_insights(&context.memories).len(),
            }),
        ))
    }
}
