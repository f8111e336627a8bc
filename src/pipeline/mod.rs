//! The derivation pipeline: seven templated completions run strictly in
//! order, each fed by the description or by artifacts produced earlier.
//!
//! | step | depends on |
//! |------|------------|
//! | context | description |
//! | names | context |
//! | stack | context |
//! | integration | context, stack |
//! | resources | stack |
//! | features | context |
//! | advice | context |

use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::errors::MentorError;
use crate::prompt::{self, PromptTemplate, DESCRIPTION_VAR};
use crate::provider::Provider;
use crate::wire::{ArtifactBundle, ArtifactKey, Description, Exchange};

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub output: ArtifactKey,
    pub template: PromptTemplate,
}

impl Step {
    pub fn inputs(&self) -> &'static [&'static str] {
        self.template.input_variables
    }
}

pub const STEPS: [Step; 7] = [
    Step { output: ArtifactKey::Context, template: prompt::CONTEXT },
    Step { output: ArtifactKey::Names, template: prompt::NAMES },
    Step { output: ArtifactKey::Stack, template: prompt::STACK },
    Step { output: ArtifactKey::Integration, template: prompt::INTEGRATION },
    Step { output: ArtifactKey::Resources, template: prompt::RESOURCES },
    Step { output: ArtifactKey::Features, template: prompt::FEATURES },
    Step { output: ArtifactKey::Advice, template: prompt::ADVICE },
];

/// Result of a completed run: the bundle plus every exchange, in order.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub bundle: ArtifactBundle,
    pub exchanges: Vec<Exchange>,
}

pub struct Pipeline<'a> {
    provider: &'a dyn Provider,
    steps: Vec<Step>,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn Provider) -> Result<Self, MentorError> {
        Self::with_steps(provider, STEPS.to_vec())
    }

    /// Accepts a custom step table if it is a valid chain; see [`validate_steps`].
    pub fn with_steps(provider: &'a dyn Provider, steps: Vec<Step>) -> Result<Self, MentorError> {
        validate_steps(&steps)?;
        Ok(Self { provider, steps })
    }

    /// Executes every step in table order. The first failure aborts the run
    /// and no bundle is returned. Each exchange goes to `on_exchange` as soon
    /// as its step succeeds, so finished steps are seen even when a later one fails.
    pub async fn run(
        &self,
        description: &Description,
        mut on_exchange: impl FnMut(&Exchange),
    ) -> Result<PipelineRun, MentorError> {
        let mut produced: HashMap<ArtifactKey, String> = HashMap::new();
        let mut exchanges = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let stage = step.output.as_str();
            let prompt_text = {
                let mut vars: HashMap<&str, &str> = HashMap::new();
                for input in step.inputs() {
                    let value = if *input == DESCRIPTION_VAR {
                        description.as_str()
                    } else {
                        ArtifactKey::from_name(input)
                            .and_then(|k| produced.get(&k))
                            .map(String::as_str)
                            .ok_or_else(|| {
                                MentorError::Pipeline(format!(
                                    "step '{stage}' needs '{input}' before it was produced"
                                ))
                            })?
                    };
                    vars.insert(*input, value);
                }
                step.template.render(&vars)?
            };
            trace!(stage, prompt = %prompt_text, "step prompt");

            debug!(stage, "step started");
            let started = Instant::now();
            let timestamp = Utc::now();
            let raw = self
                .provider
                .complete(&prompt_text)
                .await
                .map_err(|e| MentorError::provider(stage, e))?;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let text = raw.trim().to_string();
            if text.is_empty() {
                return Err(MentorError::Provider {
                    stage: stage.to_string(),
                    message: "model returned an empty completion".into(),
                });
            }
            info!(stage, elapsed_ms, chars = text.len(), "step finished");

            let exchange = Exchange {
                stage: stage.to_string(),
                prompt: prompt_text,
                response: text.clone(),
                elapsed_ms,
                timestamp,
            };
            on_exchange(&exchange);
            exchanges.push(exchange);
            produced.insert(step.output, text);
        }

        let bundle = assemble(produced)?;
        Ok(PipelineRun { bundle, exchanges })
    }
}

/// Every input must be the description or an earlier step's output, outputs
/// must be unique, and all seven artifacts must be produced.
pub fn validate_steps(steps: &[Step]) -> Result<(), MentorError> {
    let mut available: Vec<ArtifactKey> = Vec::new();
    for step in steps {
        for input in step.inputs() {
            if *input == DESCRIPTION_VAR {
                continue;
            }
            match ArtifactKey::from_name(input) {
                Some(k) if available.contains(&k) => {}
                Some(_) => {
                    return Err(MentorError::Pipeline(format!(
                        "step '{}' depends on '{input}', which is not produced before it",
                        step.output
                    )))
                }
                None => {
                    return Err(MentorError::Pipeline(format!(
                        "step '{}' depends on unknown input '{input}'",
                        step.output
                    )))
                }
            }
        }
        if available.contains(&step.output) {
            return Err(MentorError::Pipeline(format!(
                "artifact '{}' is produced twice",
                step.output
            )));
        }
        available.push(step.output);
    }
    if let Some(missing) = ArtifactKey::ALL.iter().find(|k| !available.contains(k)) {
        return Err(MentorError::Pipeline(format!(
            "no step produces artifact '{missing}'"
        )));
    }
    Ok(())
}

fn assemble(mut produced: HashMap<ArtifactKey, String>) -> Result<ArtifactBundle, MentorError> {
    let mut take = |k: ArtifactKey| {
        produced
            .remove(&k)
            .ok_or_else(|| MentorError::Pipeline(format!("artifact '{k}' missing")))
    };
    Ok(ArtifactBundle {
        context: take(ArtifactKey::Context)?,
        names: take(ArtifactKey::Names)?,
        stack: take(ArtifactKey::Stack)?,
        integration: take(ArtifactKey::Integration)?,
        resources: take(ArtifactKey::Resources)?,
        features: take(ArtifactKey::Features)?,
        advice: take(ArtifactKey::Advice)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedProvider;
    use anyhow::anyhow;

    const STACK_TEXT: &str = "1. Flutter\n2. Firebase Auth\n3. Cloud Firestore";

    /// Answers each template with a recognisable text; the integration
    /// answer echoes the first stack item found in its prompt.
    fn fake_model(prompt: &str) -> anyhow::Result<String> {
        let answer = if prompt.starts_with("Give me a very brief summary") {
            "A meditation app that sends daily reminders with a calm interface.".to_string()
        } else if prompt.starts_with("Give me a list of name ideas") {
            "CalmCue, Stillpoint, DailyZen".to_string()
        } else if prompt.starts_with("Give me a full and ordered tech stack") {
            STACK_TEXT.to_string()
        } else if prompt.starts_with("Give me details on how to integrate") {
            let item = ["Flutter", "Firebase Auth"]
                .into_iter()
                .find(|i| prompt.contains(i))
                .unwrap_or("nothing");
            format!("Start by wiring {item} into the app shell.")
        } else if prompt.starts_with("Give me a list of documentation URLs") {
            "https://docs.flutter.dev".to_string()
        } else if prompt.starts_with("Give me a list of features") {
            "Reminders, streaks, ambient sounds".to_string()
        } else if prompt.starts_with("Give me some advice") {
            "Ship a small MVP first.".to_string()
        } else {
            return Err(anyhow!("unexpected prompt: {prompt}"));
        };
        Ok(format!("\n{answer}\n"))
    }

    fn description() -> Description {
        Description::new("A meditation app with daily reminders and a calm UI").unwrap()
    }

    #[test]
    fn default_table_is_valid() {
        validate_steps(&STEPS).unwrap();
        let outputs: Vec<_> = STEPS.iter().map(|s| s.output).collect();
        assert_eq!(outputs, ArtifactKey::ALL.to_vec());
    }

    #[tokio::test]
    async fn produces_all_seven_artifacts_in_order() {
        let provider = ScriptedProvider::new(fake_model);
        let run = Pipeline::new(&provider).unwrap().run(&description(), |_| {}).await.unwrap();

        for (key, text) in run.bundle.sections() {
            assert!(!text.is_empty(), "{key} empty");
            assert_eq!(text, text.trim(), "{key} not trimmed");
        }
        let stages: Vec<_> = run.exchanges.iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(
            stages,
            ["context", "names", "stack", "integration", "resources", "features", "advice"]
        );
        assert_eq!(provider.calls().len(), 7);
    }

    #[tokio::test]
    async fn later_steps_see_context_not_raw_description() {
        let provider = ScriptedProvider::new(fake_model);
        let run = Pipeline::new(&provider).unwrap().run(&description(), |_| {}).await.unwrap();
        let calls = provider.calls();

        assert!(calls[0].contains("DESCRIPTION: A meditation app with daily reminders"));
        for call in &calls[1..] {
            assert!(!call.contains("DESCRIPTION:"));
        }
        for i in [1, 2, 3, 5, 6] {
            assert!(calls[i].contains(&format!("CONTEXT: {}", run.bundle.context)));
        }
    }

    #[tokio::test]
    async fn integration_and_resources_receive_stack() {
        let provider = ScriptedProvider::new(fake_model);
        let run = Pipeline::new(&provider).unwrap().run(&description(), |_| {}).await.unwrap();
        let calls = provider.calls();

        let stack_at = calls.iter().position(|c| c.contains("full and ordered tech stack")).unwrap();
        let integration_at = calls.iter().position(|c| c.contains("how to integrate")).unwrap();
        let resources_at = calls.iter().position(|c| c.contains("documentation URLs")).unwrap();
        assert!(stack_at < integration_at);
        assert!(stack_at < resources_at);

        assert!(calls[integration_at].contains(&format!("STACK: {STACK_TEXT}")));
        assert!(calls[resources_at].contains(&format!("STACK: {STACK_TEXT}")));
        assert!(!calls[resources_at].contains("CONTEXT:"));

        // Integration text references an item from the stack text.
        assert!(run.bundle.integration.contains("Flutter"));
        assert!(run.bundle.stack.contains("Flutter"));
    }

    #[tokio::test]
    async fn step_failure_aborts_and_stops_calling() {
        let provider = ScriptedProvider::new(|prompt| {
            if prompt.contains("how to integrate") {
                Err(anyhow!("429 Too Many Requests"))
            } else {
                fake_model(prompt)
            }
        });
        let err = Pipeline::new(&provider)
            .unwrap()
            .run(&description(), |_| {})
            .await
            .unwrap_err();
        match err {
            MentorError::Provider { stage, message } => {
                assert_eq!(stage, "integration");
                assert!(message.contains("429"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // context, names, stack, integration; nothing after the failure
        assert_eq!(provider.calls().len(), 4);
    }

    #[tokio::test]
    async fn finished_steps_are_reported_before_a_failure() {
        let provider = ScriptedProvider::new(|prompt| {
            if prompt.contains("how to integrate") {
                Err(anyhow!("upstream timeout"))
            } else {
                fake_model(prompt)
            }
        });
        let mut seen = Vec::new();
        let result = Pipeline::new(&provider)
            .unwrap()
            .run(&description(), |e| seen.push(e.stage.clone()))
            .await;
        assert!(result.is_err());
        assert_eq!(seen, ["context", "names", "stack"]);
    }

    #[tokio::test]
    async fn blank_completion_is_a_provider_failure() {
        let provider = ScriptedProvider::always("   \n");
        let err = Pipeline::new(&provider)
            .unwrap()
            .run(&description(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, MentorError::Provider { ref stage, .. } if stage == "context"));
        assert_eq!(provider.calls().len(), 1);
    }

    #[test]
    fn rejects_dependency_on_later_step() {
        let mut steps = STEPS.to_vec();
        // integration moved ahead of stack
        steps.swap(2, 3);
        let provider = ScriptedProvider::always("x");
        let err = Pipeline::with_steps(&provider, steps).err().unwrap();
        assert!(err.to_string().contains("integration"));
    }

    #[test]
    fn rejects_duplicate_and_missing_outputs() {
        let mut dup = STEPS.to_vec();
        dup[6] = Step { output: ArtifactKey::Features, template: prompt::ADVICE };
        assert!(matches!(validate_steps(&dup), Err(MentorError::Pipeline(_))));

        let short = STEPS[..6].to_vec();
        let err = validate_steps(&short).unwrap_err();
        assert!(err.to_string().contains("advice"));
    }

    #[test]
    fn rejects_unknown_input() {
        let mut steps = STEPS.to_vec();
        steps[1].template = PromptTemplate {
            name: "names",
            input_variables: &["audience"],
            template: "Names for {audience}",
        };
        let err = validate_steps(&steps).unwrap_err();
        assert!(err.to_string().contains("audience"));
    }
}
