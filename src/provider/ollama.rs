use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{endpoint, excerpt, Provider, TEMPERATURE};

pub struct Ollama {
    client: Client,
    model: String,
    url: String,
}

impl Ollama {
    pub fn new(client: Client, model: String, url: String) -> Self {
        Self { client, model, url }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = endpoint(&self.url, "/api/chat");
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: OllamaOptions {
                temperature: TEMPERATURE,
            },
        };

        debug!(%url, model = %self.model, "ollama request");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("ollama request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("ollama read body failed")?;
        debug!(%status, "ollama response");
        trace!(body = %text, "ollama raw body");

        if !status.is_success() {
            return Err(anyhow!("Ollama error ({}): {}", status, excerpt(&text)));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("ollama response parse error: {}", e))?;
        Ok(parsed.message.content)
    }
}
