use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{endpoint, excerpt, Provider, TEMPERATURE};

const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    client: Client,
    model: String,
    api_base: String,
    api_key: String,
    max_tokens: u32,
}

impl Anthropic {
    pub fn new(
        client: Client,
        model: String,
        api_base: String,
        api_key: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            model,
            api_base,
            api_key,
            max_tokens,
        }
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

#[async_trait]
impl Provider for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = endpoint(&self.api_base, "/v1/messages");
        let body = MsgRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        debug!(%url, model = %self.model, "anthropic request");
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("anthropic request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("anthropic read body failed")?;
        debug!(%status, "anthropic response");
        trace!(body = %text, "anthropic raw body");

        if !status.is_success() {
            return Err(anyhow!("Anthropic API error ({}): {}", status, excerpt(&text)));
        }

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("anthropic response parse error: {}", e))?;

        let content: String = parsed
            .content
            .into_iter()
            .filter(|b| b.r#type == "text")
            .map(|b| b.text)
            .collect();

        if content.is_empty() {
            return Err(anyhow!("anthropic: empty content"));
        }
        Ok(content)
    }
}
