use crate::config::TranscriptConfig;
use crate::wire::{ArtifactBundle, Exchange};
use fs_err as fs;
use serde_json::{json, to_string_pretty};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Logs go to stderr; stdout only carries the rendered result.
/// `RUST_LOG` wins over `--debug` when set.
pub fn init_tracing(debug: bool) {
    let default = if debug { "warn,mobile_mentor=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: Option<PathBuf>,
    pub response: Option<PathBuf>,
}

fn run_dir(root: &Path, run: Uuid) -> PathBuf {
    root.join(run.to_string())
}

/// Writes one exchange as `<stage>.request.json` / `<stage>.response.json`.
pub fn save_stage(
    exchange: &Exchange,
    provider: &str,
    model: &str,
    run: Uuid,
    cfg: &TranscriptConfig,
) -> anyhow::Result<SavedPaths> {
    let dir = run_dir(Path::new(&cfg.dir), run);
    fs::create_dir_all(&dir)?;

    let mut request_path = None;
    let mut response_path = None;

    if cfg.save_request {
        let p = dir.join(format!("{}.request.json", exchange.stage));
        let body = json!({
            "run": run,
            "stage": exchange.stage,
            "provider": provider,
            "model": model,
            "temperature": crate::provider::TEMPERATURE,
            "timestamp": exchange.timestamp,
            "prompt": exchange.prompt,
        });
        fs::write(&p, to_string_pretty(&body)?)?;
        request_path = Some(p);
    }

    if cfg.save_response {
        let p = dir.join(format!("{}.response.json", exchange.stage));
        let body = json!({
            "run": run,
            "stage": exchange.stage,
            "elapsed_ms": exchange.elapsed_ms,
            "text": exchange.response,
        });
        fs::write(&p, to_string_pretty(&body)?)?;
        response_path = Some(p);
    }

    Ok(SavedPaths { dir, request: request_path, response: response_path })
}

pub fn save_bundle(bundle: &ArtifactBundle, run: Uuid, cfg: &TranscriptConfig) -> anyhow::Result<PathBuf> {
    let dir = run_dir(Path::new(&cfg.dir), run);
    fs::create_dir_all(&dir)?;
    let p = dir.join("bundle.json");
    fs::write(&p, to_string_pretty(bundle)?)?;
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn exchange() -> Exchange {
        Exchange {
            stage: "stack".into(),
            prompt: "Give me a full and ordered tech stack".into(),
            response: "Flutter".into(),
            elapsed_ms: 42,
            timestamp: Utc::now(),
        }
    }

    fn cfg(dir: &Path) -> TranscriptConfig {
        TranscriptConfig {
            enabled: true,
            dir: dir.to_string_lossy().into_owned(),
            save_request: true,
            save_response: true,
        }
    }

    #[test]
    fn writes_request_and_response_under_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let run = Uuid::new_v4();
        let saved = save_stage(&exchange(), "openai", "gpt-4.1-mini", run, &cfg(tmp.path())).unwrap();

        assert_eq!(saved.dir, tmp.path().join(run.to_string()));
        let req: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(saved.request.unwrap()).unwrap()).unwrap();
        assert_eq!(req["stage"], "stack");
        assert_eq!(req["model"], "gpt-4.1-mini");
        assert_eq!(req["temperature"], 0.0);

        let resp: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(saved.response.unwrap()).unwrap()).unwrap();
        assert_eq!(resp["text"], "Flutter");
        assert_eq!(resp["elapsed_ms"], 42);
    }

    #[test]
    fn respects_save_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let mut c = cfg(tmp.path());
        c.save_request = false;
        let saved = save_stage(&exchange(), "ollama", "llama3.1", Uuid::new_v4(), &c).unwrap();
        assert!(saved.request.is_none());
        assert!(saved.response.unwrap().is_file());
    }

    #[test]
    fn bundle_lands_next_to_exchanges() {
        let tmp = tempfile::tempdir().unwrap();
        let run = Uuid::new_v4();
        let bundle = ArtifactBundle {
            context: "c".into(),
            names: "n".into(),
            stack: "s".into(),
            integration: "i".into(),
            resources: "r".into(),
            features: "f".into(),
            advice: "a".into(),
        };
        let p = save_bundle(&bundle, run, &cfg(tmp.path())).unwrap();
        assert_eq!(p, tmp.path().join(run.to_string()).join("bundle.json"));
        let back: ArtifactBundle = serde_json::from_str(&fs::read_to_string(&p).unwrap()).unwrap();
        assert_eq!(back, bundle);
    }
}
