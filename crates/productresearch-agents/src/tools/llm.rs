use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use productresearch_core::{LlmConfig, SecretValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{snippet, LlmClient};

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiChatClient {
    http: Client,
    base_url: String,
    api_key: SecretValue,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig, api_key: SecretValue) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build llm http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        tracing::debug!(target: "tools.llm", model = %self.model, prompt_chars = prompt.len(), "llm.complete.start");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .context("llm request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("llm endpoint returned {status}: {}", snippet(&body, 200));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to decode llm response")?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("llm response contained no message content"))?;

        tracing::info!(
            target: "tools.llm",
            model = %parsed.model.as_deref().unwrap_or(&self.model),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "llm.complete.success"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
