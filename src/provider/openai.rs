use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{endpoint, excerpt, Provider, TEMPERATURE};

/// OpenAI chat-completions provider. Each prompt goes out as a single user
/// message with no system scaffolding.
pub struct OpenAIProvider {
    client: Client,
    model: String,
    api_base: String,
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(client: Client, model: String, api_base: String, api_key: String) -> Self {
        Self {
            client,
            model,
            api_base,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessageOut<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessageOut<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = endpoint(&self.api_base, "/v1/chat/completions");
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessageOut {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        };

        debug!(%url, model = %self.model, "openai request");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("openai request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("openai read body failed")?;
        debug!(%status, "openai response");
        trace!(body = %text, "openai raw body");

        if !status.is_success() {
            return Err(anyhow!("OpenAI API error ({}): {}", status, excerpt(&text)));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("failed to parse OpenAI response: {e}"))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("openai: empty content"))
    }
}
