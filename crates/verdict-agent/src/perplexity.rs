use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use verdict_core::llm::LlmBackend;

/// Hosted chat-completions endpoint authenticated with a bearer key.
///
/// The key is held only for the `Authorization` header. It never appears in
/// logs or in the `Debug` output of this type.
pub struct PerplexityBackend {
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for PerplexityBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerplexityBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl PerplexityBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs: 120,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl LlmBackend for PerplexityBackend {
    fn name(&self) -> &str {
        "perplexity"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("PERPLEXITY_API_KEY is not configured"));
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        info!(
            model = %self.model,
            base_url = %self.base_url,
            prompt_chars = prompt.len(),
            "calling chat completions API"
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let response = match client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!(timeout_secs = self.timeout_secs, "chat completions request timed out");
                return Err(anyhow!("request timed out after {}s", self.timeout_secs));
            }
            Err(e) => {
                let e = e.without_url();
                warn!(error = %e, "chat completions request failed");
                return Err(anyhow!("request failed: {e}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "chat completions returned non-200: {}", body);
            return Err(anyhow!("chat completions error {status}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to parse chat completions response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat completions response had no choices"))?;

        info!(model = %self.model, chars = content.len(), "chat completions responded");
        Ok(content)
    }
}
