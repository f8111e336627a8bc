use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::{Args, ProviderKind};
use crate::errors::MentorError;

pub const DEFAULT_CONFIG_FILE: &str = "mentor.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub classifier: ClassifierConfig,
    pub transcript: TranscriptConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Lexicon file replacing the built-in one.
    pub lexicon: Option<String>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub enabled: bool,
    pub dir: String,
    pub save_request: bool,
    pub save_response: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            model: None,
            api_base: None,
            timeout_secs: 120,
            max_tokens: 1024,
            classifier: ClassifierConfig::default(),
            transcript: TranscriptConfig::default(),
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: ".mentor/runs".into(),
            save_request: true,
            save_response: true,
        }
    }
}

impl Config {
    /// Loads `path`, or `mentor.toml` from the working directory when no path
    /// is given. A missing default file yields the built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Self, MentorError> {
        match path {
            Some(p) => Self::from_file(Path::new(p)),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, MentorError> {
        let raw = fs::read_to_string(path).map_err(|e| MentorError::Config(e.to_string()))?;
        let cfg: Config = if is_yaml(path) {
            serde_yaml::from_str(&raw)
                .map_err(|e| MentorError::Config(format!("{}: {e}", path.display())))?
        } else {
            toml::from_str(&raw)
                .map_err(|e| MentorError::Config(format!("{}: {e}", path.display())))?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(p) = args.provider {
            if p != self.provider {
                // A model or endpoint chosen for another provider makes no sense here.
                self.model = None;
                self.api_base = None;
            }
            self.provider = p;
        }
        if let Some(m) = &args.model {
            self.model = Some(m.clone());
        }
        if let Some(b) = &args.api_base {
            self.api_base = Some(b.clone());
        }
        if let Some(t) = args.timeout_secs {
            self.timeout_secs = t;
        }
        if args.save_transcript {
            self.transcript.enabled = true;
        }
        if let Some(d) = &args.transcript_dir {
            self.transcript.dir = d.clone();
        }
    }

    pub fn validate(&self) -> Result<(), MentorError> {
        if self.timeout_secs == 0 {
            return Err(MentorError::Config("timeout_secs must be positive".into()));
        }
        if self.max_tokens == 0 {
            return Err(MentorError::Config("max_tokens must be positive".into()));
        }
        if let Some(t) = self.classifier.threshold {
            if !(t > 0.0 && t < 1.0) {
                return Err(MentorError::Config(format!(
                    "classifier.threshold must lie strictly between 0 and 1, got {t}"
                )));
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
