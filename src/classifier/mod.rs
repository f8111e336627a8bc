//! Local profanity/sensitivity classifier.
//!
//! A logistic bag-of-words model: every distinct token found in the lexicon
//! adds its weight to the bias, and the text is flagged when the sigmoid of
//! that score reaches the threshold.

use fs_err as fs;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::ClassifierConfig;
use crate::errors::MentorError;

pub trait Classifier: Send + Sync {
    fn is_sensitive(&self, text: &str) -> Result<bool, MentorError>;
}

const DEFAULT_BIAS: f64 = -4.0;
const DEFAULT_THRESHOLD: f64 = 0.5;

/// Strong terms push a single occurrence over the default threshold; mild
/// ones need company.
const BUILTIN_WEIGHTS: &[(&str, f64)] = &[
    ("fuck", 6.0),
    ("fucking", 6.0),
    ("fucker", 6.0),
    ("motherfucker", 7.0),
    ("shit", 5.0),
    ("shitty", 4.5),
    ("bullshit", 5.0),
    ("bitch", 5.5),
    ("bastard", 4.5),
    ("asshole", 5.5),
    ("dickhead", 5.0),
    ("cunt", 7.0),
    ("whore", 5.5),
    ("slut", 5.5),
    ("porn", 5.0),
    ("porno", 5.0),
    ("nude", 4.5),
    ("nudes", 4.5),
    ("rape", 6.0),
    ("kill", 2.5),
    ("murder", 3.0),
    ("suicide", 3.0),
    ("bomb", 3.0),
    ("terrorist", 3.0),
    ("drugs", 2.0),
    ("cocaine", 3.5),
    ("heroin", 3.5),
    ("meth", 3.0),
    ("weapon", 2.0),
    ("gun", 2.0),
    ("hate", 1.5),
    ("stupid", 1.5),
    ("idiot", 2.0),
    ("damn", 2.0),
    ("crap", 2.0),
    ("piss", 2.5),
    ("dick", 3.0),
    ("sexy", 2.5),
    ("sex", 3.0),
];

/// On-disk lexicon, TOML or YAML.
#[derive(Debug, Deserialize)]
struct LexiconFile {
    #[serde(default = "default_bias")]
    bias: f64,
    #[serde(default)]
    threshold: Option<f64>,
    weights: HashMap<String, f64>,
}

fn default_bias() -> f64 {
    DEFAULT_BIAS
}

#[derive(Debug)]
pub struct LexiconClassifier {
    weights: HashMap<String, f64>,
    bias: f64,
    threshold: f64,
    tokenizer: Regex,
}

impl LexiconClassifier {
    pub fn new(
        weights: HashMap<String, f64>,
        bias: f64,
        threshold: f64,
    ) -> Result<Self, MentorError> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(MentorError::Classifier(format!(
                "threshold must lie strictly between 0 and 1, got {threshold}"
            )));
        }
        if !bias.is_finite() || weights.values().any(|w| !w.is_finite()) {
            return Err(MentorError::Classifier("weights must be finite".into()));
        }
        let tokenizer =
            Regex::new(r"[a-z']+").map_err(|e| MentorError::Classifier(e.to_string()))?;
        let weights = weights
            .into_iter()
            .map(|(k, v)| (fold(&k), v))
            .collect();
        Ok(Self {
            weights,
            bias,
            threshold,
            tokenizer,
        })
    }

    pub fn builtin() -> Result<Self, MentorError> {
        let weights = BUILTIN_WEIGHTS
            .iter()
            .map(|(w, s)| (w.to_string(), *s))
            .collect();
        Self::new(weights, DEFAULT_BIAS, DEFAULT_THRESHOLD)
    }

    pub fn from_file(path: &Path) -> Result<Self, MentorError> {
        let raw = fs::read_to_string(path).map_err(|e| MentorError::Classifier(e.to_string()))?;
        let parsed: LexiconFile = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| MentorError::Classifier(format!("{}: {e}", path.display())))?,
            _ => toml::from_str(&raw)
                .map_err(|e| MentorError::Classifier(format!("{}: {e}", path.display())))?,
        };
        Self::new(
            parsed.weights,
            parsed.bias,
            parsed.threshold.unwrap_or(DEFAULT_THRESHOLD),
        )
    }

    /// Built-in lexicon unless the config names a file; a configured threshold
    /// wins over both.
    pub fn from_config(cfg: &ClassifierConfig) -> Result<Self, MentorError> {
        let base = match &cfg.lexicon {
            Some(p) => Self::from_file(Path::new(p))?,
            None => Self::builtin()?,
        };
        match cfg.threshold {
            Some(t) => Self::new(base.weights, base.bias, t),
            None => Ok(base),
        }
    }

    /// Probability that `text` is profane or sensitive.
    pub fn score(&self, text: &str) -> f64 {
        let folded = fold(text);
        let tokens: HashSet<&str> = self
            .tokenizer
            .find_iter(&folded)
            .map(|m| m.as_str().trim_matches('\''))
            .collect();
        let z = tokens
            .iter()
            .filter_map(|t| self.weights.get(*t))
            .fold(self.bias, |acc, w| acc + w);
        sigmoid(z)
    }
}

impl Classifier for LexiconClassifier {
    fn is_sensitive(&self, text: &str) -> Result<bool, MentorError> {
        Ok(self.score(text) >= self.threshold)
    }
}

fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'i',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            other => other,
        })
        .collect()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn clean_description_passes() {
        let c = LexiconClassifier::builtin().unwrap();
        assert!(!c
            .is_sensitive("A meditation app with daily reminders and a calm UI")
            .unwrap());
    }

    #[test]
    fn strong_term_flags_on_its_own() {
        let c = LexiconClassifier::builtin().unwrap();
        assert!(c.is_sensitive("an app that rates your shit").unwrap());
    }

    #[test]
    fn mild_terms_need_company() {
        let c = LexiconClassifier::builtin().unwrap();
        assert!(!c.is_sensitive("a game where you kill zombies").unwrap());
        assert!(c
            .is_sensitive("a game where you kill people with a gun and a bomb")
            .unwrap());
    }

    #[test]
    fn substitutions_are_folded() {
        let c = LexiconClassifier::builtin().unwrap();
        assert!(c.is_sensitive("B1TCH tracker").unwrap());
        assert!(c.is_sensitive("$h1t list").unwrap());
    }

    #[test]
    fn custom_keys_are_folded_like_text() {
        let weights = HashMap::from([("Sh1t".to_string(), 5.0), ("$pam".to_string(), 5.0)]);
        let c = LexiconClassifier::new(weights, DEFAULT_BIAS, DEFAULT_THRESHOLD).unwrap();
        assert!(c.is_sensitive("sh1t list").unwrap());
        assert!(c.is_sensitive("shit list").unwrap());
        assert!(c.is_sensitive("spam bot").unwrap());
        assert!(!c.is_sensitive("grocery list").unwrap());
    }

    #[test]
    fn repeated_token_counts_once() {
        let c = LexiconClassifier::builtin().unwrap();
        assert_eq!(c.score("crap"), c.score("crap crap crap"));
    }

    #[test]
    fn substrings_do_not_match() {
        let c = LexiconClassifier::builtin().unwrap();
        assert!(!c.is_sensitive("Scunthorpe classic cars and grasshopper sightings").unwrap());
    }

    #[test]
    fn loads_yaml_lexicon_and_config_threshold_wins() {
        let mut f = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(f, "bias: -1.0\nthreshold: 0.9\nweights:\n  Spoiler: 2.0").unwrap();

        let from_file = LexiconClassifier::from_file(f.path()).unwrap();
        // sigmoid(1.0) ~ 0.73 stays under 0.9
        assert!(!from_file.is_sensitive("no spoiler please").unwrap());

        let cfg = ClassifierConfig {
            lexicon: Some(f.path().to_string_lossy().into_owned()),
            threshold: Some(0.6),
        };
        let tuned = LexiconClassifier::from_config(&cfg).unwrap();
        assert!(tuned.is_sensitive("no spoiler please").unwrap());
    }

    #[test]
    fn missing_lexicon_is_a_classifier_error() {
        let cfg = ClassifierConfig {
            lexicon: Some("/no/such/lexicon.toml".into()),
            threshold: None,
        };
        assert!(matches!(
            LexiconClassifier::from_config(&cfg),
            Err(MentorError::Classifier(_))
        ));
    }

    #[test]
    fn rejects_degenerate_threshold() {
        assert!(LexiconClassifier::new(HashMap::new(), 0.0, 1.0).is_err());
    }
}
