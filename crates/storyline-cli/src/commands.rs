//! Subcommand implementations

use anyhow::{Context, Result};
use schemars::schema_for;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use storyline_backend::{parse_candidate, FixtureBackend, NarrativeBackend};
use storyline_core::{
    normalize, CreationEvent, ProjectContext, RawCandidate, SynthesisError, SynthesisWarning,
    TimelineResult, TimelineValidator,
};
use storyline_engine::{StorylineConfig, TimelineSynthesizer};

pub(crate) struct SynthesizeArgs {
    pub(crate) events: PathBuf,
    pub(crate) project: String,
    pub(crate) config: Option<PathBuf>,
    pub(crate) fixture: Option<PathBuf>,
    pub(crate) pretty: bool,
}

pub(crate) async fn synthesize(args: &SynthesizeArgs) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let events = read_events(&args.events)?;

    let synthesizer = match &args.fixture {
        Some(path) => {
            let candidate = read_candidate(path)?;
            let backend: Arc<dyn NarrativeBackend> =
                Arc::new(FixtureBackend::from_responses([Ok(candidate)]));
            TimelineSynthesizer::with_backend(&config, backend)
        }
        None => TimelineSynthesizer::from_config(&with_api_key(config))
            .context("failed to initialize narrative backend")?,
    };

    let outcome = synthesizer
        .run_until(&ProjectContext::new(&args.project), &events, interrupted())
        .await;

    match outcome {
        Ok(result) => {
            print_result(&result, args.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_failure(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

pub(crate) fn validate(
    candidate: &Path,
    events: &Path,
    config: Option<&Path>,
    pretty: bool,
) -> Result<ExitCode> {
    let config = load_config(config)?;
    let normalized = normalize(&read_events(events)?);
    let candidate = read_candidate(candidate)?;

    match TimelineValidator::new(config.validation).validate(candidate, &normalized.events) {
        Ok(mut result) => {
            let mut warnings: Vec<SynthesisWarning> =
                normalized.warnings.into_iter().map(Into::into).collect();
            warnings.append(&mut result.warnings);
            result.warnings = warnings;
            print_result(&result, pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("candidate rejected: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub(crate) fn schema_export(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let schemas = [
        ("RawCandidate", schema_for!(RawCandidate)),
        ("CreationEvent", schema_for!(CreationEvent)),
        ("TimelineResult", schema_for!(TimelineResult)),
    ];
    for (name, schema) in schemas {
        let path = out_dir.join(format!("{name}.schema.json"));
        let json = serde_json::to_string_pretty(&schema)?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StorylineConfig> {
    match path {
        Some(path) => StorylineConfig::load(path).context("failed to load configuration"),
        None => Ok(StorylineConfig::default()),
    }
}

/// Resolve the API key from the environment variable named in the config
fn with_api_key(mut config: StorylineConfig) -> StorylineConfig {
    match std::env::var(&config.backend.api_key_env) {
        Ok(key) if !key.trim().is_empty() => config.backend.api_key = Some(key),
        _ => tracing::warn!(
            var = %config.backend.api_key_env,
            "no API key in environment, calling backend unauthenticated"
        ),
    }
    config
}

fn read_events(path: &Path) -> Result<Vec<CreationEvent>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read events from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of creation events", path.display()))
}

fn read_candidate(path: &Path) -> Result<RawCandidate> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read candidate from {}", path.display()))?;
    parse_candidate(&text)
        .with_context(|| format!("{} is not a timeline candidate", path.display()))
}

fn print_result(result: &TimelineResult, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

fn report_failure(error: &SynthesisError) {
    let report = serde_json::json!({
        "error": error.kind(),
        "message": error.to_string(),
        "attempts": error.attempts(),
        "warnings": error
            .warnings()
            .iter()
            .map(|w| serde_json::to_value(w).unwrap_or(Value::Null))
            .collect::<Vec<_>>(),
    });
    eprintln!("{report}");
}

/// Resolves on Ctrl-C, never if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
