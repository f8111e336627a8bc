use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::process::ExitCode;
use tracing::{info, warn};
use uuid::Uuid;

mod classifier;
mod cli;
mod config;
mod errors;
mod gate;
mod log;
mod pipeline;
mod prompt;
mod provider;
mod ux;
mod wire;

use classifier::{Classifier, LexiconClassifier};
use cli::{Args, OutputFormat};
use config::Config;
use errors::MentorError;
use gate::Gate;
use pipeline::Pipeline;
use provider::Provider;
use wire::{ArtifactBundle, Description, Exchange, Verdict};

enum Outcome {
    Rejected { classifier_flagged: bool, model_flagged: bool },
    Delivered(ArtifactBundle),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    log::init_tracing(args.debug);

    let raw = match args.description.as_deref() {
        Some(d) if d != "-" => d.to_string(),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading description from stdin")?;
            buf
        }
    };

    let result = match prepare(&args, &raw) {
        Ok((cfg, description, provider, classifier)) => {
            evaluate(&args, &cfg, &description, provider.as_ref(), &classifier).await
        }
        Err(e) => empty_as_rejection(e),
    };

    let code = match result {
        Ok(Outcome::Delivered(bundle)) => {
            match args.format {
                OutputFormat::Text => print!("{}", ux::render_bundle(&bundle, ux::success_phrase())),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&ux::bundle_json(&bundle, ux::success_phrase()))?
                ),
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::Rejected { classifier_flagged, model_flagged }) => {
            match args.format {
                OutputFormat::Text => print!("{}", ux::render_rejection(ux::error_phrase())),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&ux::rejection_json(
                        ux::error_phrase(),
                        classifier_flagged,
                        model_flagged
                    ))?
                ),
            }
            ExitCode::from(2)
        }
        Err(e) => {
            match args.format {
                OutputFormat::Text => eprint!("{}", ux::render_failure(&e)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ux::failure_json(&e))?),
            }
            ExitCode::FAILURE
        }
    };
    Ok(code)
}

/// Everything that must exist before the first model call: the validated
/// description, config, the one provider client and the classifier.
fn prepare(
    args: &Args,
    raw: &str,
) -> Result<(Config, Description, provider::DynProvider, LexiconClassifier), MentorError> {
    let description = Description::new(raw)?;

    let mut cfg = Config::load(args.config.as_deref())?;
    cfg.apply_args(args);
    cfg.validate()?;

    let provider = provider::make_provider(&cfg)?;
    let classifier = LexiconClassifier::from_config(&cfg.classifier)?;
    info!(provider = provider.name(), model = cfg.model(), "configured");
    Ok((cfg, description, provider, classifier))
}

/// An empty description is flagged without consulting the classifier or the model.
fn empty_as_rejection(err: MentorError) -> Result<Outcome, MentorError> {
    match err {
        MentorError::EmptyDescription => {
            info!("empty description flagged");
            Ok(Outcome::Rejected {
                classifier_flagged: false,
                model_flagged: false,
            })
        }
        other => Err(other),
    }
}

async fn evaluate(
    args: &Args,
    cfg: &Config,
    description: &Description,
    provider: &dyn Provider,
    classifier: &dyn Classifier,
) -> Result<Outcome, MentorError> {
    let run = Uuid::new_v4();
    info!(%run, "run started");

    let spinner = ux::Spinner::start("Checking prompt...", args.show_progress());
    let outcome = Gate::new(provider, classifier).evaluate(description).await;
    spinner.finish();
    let outcome = outcome?;
    record(cfg, provider, run, &outcome.exchange);

    if outcome.verdict == Verdict::Flag {
        return Ok(Outcome::Rejected {
            classifier_flagged: outcome.classifier_flagged,
            model_flagged: outcome.model_flagged,
        });
    }

    let pipeline = Pipeline::new(provider)?;
    let spinner = ux::Spinner::start("Generating response...", args.show_progress());
    let result = pipeline
        .run(description, |exchange| record(cfg, provider, run, exchange))
        .await;
    spinner.finish();
    let result = result?;

    if cfg.transcript.enabled {
        match log::save_bundle(&result.bundle, run, &cfg.transcript) {
            Ok(p) => info!(path = %p.display(), "bundle saved"),
            Err(e) => warn!("could not save bundle: {e:#}"),
        }
    }
    Ok(Outcome::Delivered(result.bundle))
}

/// Transcript writes never fail the run.
fn record(cfg: &Config, provider: &dyn Provider, run: Uuid, exchange: &Exchange) {
    if !cfg.transcript.enabled {
        return;
    }
    match log::save_stage(exchange, provider.name(), cfg.model(), run, &cfg.transcript) {
        Ok(saved) => info!(
            stage = %exchange.stage,
            dir = %saved.dir.display(),
            request = ?saved.request,
            response = ?saved.response,
            "transcript saved"
        ),
        Err(e) => warn!(stage = %exchange.stage, "could not save transcript: {e:#}"),
    }
}
