use thiserror::Error;

#[derive(Error, Debug)]
pub enum MentorError {
    #[error("provider error during {stage}: {message}")]
    Provider { stage: String, message: String },
    #[error("classifier error: {0}")]
    Classifier(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("template '{template}' is missing input variable '{variable}'")]
    Template { template: String, variable: String },
    #[error("pipeline error: {0}")]
    Pipeline(String),
    #[error("description is empty; nothing to evaluate")]
    EmptyDescription,
}

impl MentorError {
    /// Wraps an adapter error raised while running `stage`.
    pub fn provider(stage: &str, err: anyhow::Error) -> Self {
        MentorError::Provider {
            stage: stage.to_string(),
            message: format!("{err:#}"),
        }
    }
}
