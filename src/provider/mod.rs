use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::MentorError;

pub mod anthropic;
pub mod ollama;
pub mod openai;

/// Every completion is requested with this sampling temperature.
pub const TEMPERATURE: f32 = 0.0;

/// One plain-text completion per call.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

/// Builds the single client used for the whole run. Credentials come from the
/// environment only.
pub fn make_provider(cfg: &Config) -> Result<DynProvider, MentorError> {
    let client = http_client(cfg.timeout_secs)?;
    let model = cfg.model().to_string();
    let api_base = cfg.api_base().to_string();
    match cfg.provider {
        ProviderKind::OpenAI => Ok(Box::new(openai::OpenAIProvider::new(
            client,
            model,
            api_base,
            credential("OPENAI_API_KEY")?,
        ))),
        ProviderKind::Anthropic => Ok(Box::new(anthropic::Anthropic::new(
            client,
            model,
            api_base,
            credential("ANTHROPIC_API_KEY")?,
            cfg.max_tokens,
        ))),
        ProviderKind::Ollama => Ok(Box::new(ollama::Ollama::new(client, model, api_base))),
    }
}

pub fn http_client(timeout_secs: u64) -> Result<Client, MentorError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MentorError::Config(format!("cannot build HTTP client: {e}")))
}

fn credential(var: &str) -> Result<String, MentorError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MentorError::Config(format!("{var} env var is not set"))),
    }
}

pub(crate) fn endpoint(api_base: &str, path: &str) -> String {
    format!("{}{}", api_base.trim_end_matches('/'), path)
}

/// Short excerpt of an error body for messages.
pub(crate) fn excerpt(body: &str) -> &str {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
