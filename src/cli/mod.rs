use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Ollama => "llama3.1",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "mobile-mentor",
    version,
    about = "Turns a mobile-app idea into a planning bundle: context, names, stack, integration, resources, features and advice"
)]
pub struct Args {
    /// App idea to evaluate. Reads stdin when omitted or `-`.
    pub description: Option<String>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub api_base: Option<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// TOML or YAML config file. Defaults to ./mentor.toml when present.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(long, default_value_t = false)]
    pub save_transcript: bool,

    #[arg(long)]
    pub transcript_dir: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl Args {
    pub fn show_progress(&self) -> bool {
        !self.no_progress && self.format == OutputFormat::Text
    }
}
