use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MentorError;

/// ========================================
/// Request/response data shared by the gate, the pipeline and the renderer
/// ========================================

/// The user's app idea. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description(String);

impl Description {
    pub fn new(raw: impl Into<String>) -> Result<Self, MentorError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MentorError::EmptyDescription);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Flag,
}

impl Verdict {
    /// Either signal alone is enough to reject.
    pub fn combine(classifier_flagged: bool, model_flagged: bool) -> Self {
        if classifier_flagged || model_flagged {
            Verdict::Flag
        } else {
            Verdict::Accept
        }
    }
}

/// Everything the gate learned about one description.
#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub verdict: Verdict,
    pub classifier_flagged: bool,
    pub model_flagged: bool,
    pub exchange: Exchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKey {
    Context,
    Names,
    Stack,
    Integration,
    Resources,
    Features,
    Advice,
}

impl ArtifactKey {
    pub const ALL: [ArtifactKey; 7] = [
        ArtifactKey::Context,
        ArtifactKey::Names,
        ArtifactKey::Stack,
        ArtifactKey::Integration,
        ArtifactKey::Resources,
        ArtifactKey::Features,
        ArtifactKey::Advice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKey::Context => "context",
            ArtifactKey::Names => "names",
            ArtifactKey::Stack => "stack",
            ArtifactKey::Integration => "integration",
            ArtifactKey::Resources => "resources",
            ArtifactKey::Features => "features",
            ArtifactKey::Advice => "advice",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            ArtifactKey::Context => "🧠 Context",
            ArtifactKey::Names => "💡 Name ideas",
            ArtifactKey::Stack => "🍔 Tech stack",
            ArtifactKey::Integration => "🧩 Integration",
            ArtifactKey::Resources => "📚 Resources",
            ArtifactKey::Features => "✨ Features",
            ArtifactKey::Advice => "🔮 Advice",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven generated artifacts. Only constructible with every field set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub context: String,
    pub names: String,
    pub stack: String,
    pub integration: String,
    pub resources: String,
    pub features: String,
    pub advice: String,
}

impl ArtifactBundle {
    pub fn get(&self, key: ArtifactKey) -> &str {
        match key {
            ArtifactKey::Context => &self.context,
            ArtifactKey::Names => &self.names,
            ArtifactKey::Stack => &self.stack,
            ArtifactKey::Integration => &self.integration,
            ArtifactKey::Resources => &self.resources,
            ArtifactKey::Features => &self.features,
            ArtifactKey::Advice => &self.advice,
        }
    }

    /// Sections in display order.
    pub fn sections(&self) -> impl Iterator<Item = (ArtifactKey, &str)> {
        ArtifactKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// One prompt sent to the model and the text that came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub stage: String,
    pub prompt: String,
    pub response: String,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
}
