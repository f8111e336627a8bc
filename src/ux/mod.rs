use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::IndexedRandom;
use serde_json::json;
use std::time::Duration;

use crate::errors::MentorError;
use crate::wire::ArtifactBundle;

const SUCCESS_PHRASES: &[&str] = &[
    "I've got just the information you need!🫰",
    "Voila! Your answer is right here. 🎩",
    "Here's what you're looking for. ✅",
    "Take a look at this. 👀",
    "Ta-da! Your answer is right in front of you. 🎉",
    "Your answer has materialized. 🧞‍♂️",
    "Your wish is my command! Check this out. 💫",
    "I've got your back! Here's some useful information. 🤝",
    "Let me help you with that. 🙌",
    "I'm on it! Here's the information you need. 📝",
    "Take a peek at this. 🔍",
];

const ERROR_PHRASES: &[&str] = &[
    "I can't help you with that. 😶",
    "I don't have an answer for that. 🥴",
    "I don't have the answer you're looking for. 🙃",
    "I'm unable to assist with that. 🧐",
    "I don't have the information you need. 😣",
    "I can't provide a response for that. 🚫",
    "I'm not able to answer that at the moment. 🤔",
    "I'm unable to help with that. ❌",
    "I don't have the knowledge for that. 🤕",
    "I don't have a suitable answer for that. 😕",
];

pub const REJECTION_NOTE: &str = "Your description may not have enough context, be inappropriate, sensitive, or offensive. Please provide another prompt";

pub fn success_phrase() -> &'static str {
    SUCCESS_PHRASES.choose(&mut rand::rng()).copied().unwrap_or("Here you go.")
}

pub fn error_phrase() -> &'static str {
    ERROR_PHRASES.choose(&mut rand::rng()).copied().unwrap_or("I can't help you with that.")
}

/// Stderr spinner, or nothing when progress output is off.
pub struct Spinner(Option<ProgressBar>);

impl Spinner {
    pub fn start(message: &'static str, enabled: bool) -> Self {
        if !enabled {
            return Self(None);
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        Self(Some(pb))
    }

    pub fn finish(self) {
        if let Some(pb) = self.0 {
            pb.finish_and_clear();
        }
    }
}

pub fn render_bundle(bundle: &ArtifactBundle, phrase: &str) -> String {
    let mut out = format!("{}\n", phrase.bold());
    for (key, text) in bundle.sections() {
        out.push('\n');
        out.push_str(&format!("{}\n", key.heading().bold()));
        out.push_str(&indent(text, 2));
        out.push('\n');
    }
    out
}

pub fn render_rejection(phrase: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n",
        phrase.bold(),
        "🚨 Warning".yellow().bold(),
        indent(REJECTION_NOTE, 2)
    )
}

pub fn render_failure(err: &MentorError) -> String {
    format!(
        "{}\n{}\n",
        "Something went wrong while generating your plan.".red().bold(),
        indent(&err.to_string(), 2)
    )
}

pub fn bundle_json(bundle: &ArtifactBundle, phrase: &str) -> serde_json::Value {
    json!({ "status": "accepted", "phrase": phrase, "bundle": bundle })
}

pub fn rejection_json(phrase: &str, classifier_flagged: bool, model_flagged: bool) -> serde_json::Value {
    json!({
        "status": "rejected",
        "phrase": phrase,
        "message": REJECTION_NOTE,
        "signals": { "classifier": classifier_flagged, "model": model_flagged },
    })
}

pub fn failure_json(err: &MentorError) -> serde_json::Value {
    json!({ "status": "failed", "error": err.to_string() })
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.lines()
        .map(|l| format!("{}{}", pad, l))
        .collect::<Vec<_>>()
        .join("\n")
}
