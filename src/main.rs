//! Synheart Emotion Engine CLI
//!
//! On-device emotion inference and wellness scoring from heart signals.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use synheart_emotion_engine::{
    config::Config,
    consent::{Capability, ConsentLevel, ConsentManager},
    core::{
        EmotionEngine, EmotionProbabilities, FeatureVector, LinearClassifier, Sample, ScoreEngine,
        ScoreResult, FEATURE_COUNT, FEATURE_NAMES,
    },
    session::SessionStore,
    source::{ReplaySource, SampleSource, SyntheticProfile, SyntheticSource},
    transparency::create_shared_log_with_persistence,
    PRIVACY_DECLARATION, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synheart-emotion")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "On-device emotion inference from heart signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream samples through the engine and print scores each tick
    Run {
        /// Sample source (synthetic or replay)
        #[arg(long, default_value = "synthetic")]
        source: String,

        /// JSON-lines recording to replay (required for --source replay)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Synthetic profile (calm, amused or stressed)
        #[arg(long, default_value = "calm")]
        profile: String,

        /// Samples per second produced by the source (0 = unthrottled)
        #[arg(long, default_value = "1.0")]
        rate: f64,

        /// Stop after this many synthetic samples
        #[arg(long)]
        limit: Option<usize>,

        /// Model artifact overriding the configured one
        #[arg(long)]
        model: Option<PathBuf>,

        /// Confidence threshold overriding the configured one
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Classify a single feature vector
    Classify {
        /// Six comma-separated values: mean_hr,std_hr,min_hr,max_hr,sdnn,rmssd
        features: String,

        /// Model artifact overriding the configured one
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Compute a wellness score from a reading and emotion probabilities
    Score {
        #[arg(long)]
        hr: f64,
        #[arg(long)]
        hrv: f64,
        #[arg(long, default_value = "0.0")]
        motion: f64,
        #[arg(long, default_value = "0.0")]
        amused: f64,
        #[arg(long, default_value = "0.0")]
        calm: f64,
        #[arg(long, default_value = "0.0")]
        stressed: f64,
    },

    /// Show the active model and its provenance
    Model {
        /// Model artifact to inspect instead of the configured one
        #[arg(long)]
        path: Option<PathBuf>,

        /// Print the full artifact as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage consent for biosignal processing
    Consent {
        #[command(subcommand)]
        action: ConsentAction,
    },

    /// List recorded sessions
    Sessions,

    /// Show processing statistics and consent state
    Status,

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config,
}

#[derive(Subcommand)]
enum ConsentAction {
    /// Show the current consent level
    Status,
    /// Grant a consent level (none, basic, biometric)
    Grant { level: String },
    /// Revoke all consent
    Revoke,
    /// Show the consent audit history
    History,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Run {
            source,
            input,
            profile,
            rate,
            limit,
            model,
            threshold,
        } => cmd_run(
            config,
            &source,
            input.as_deref(),
            &profile,
            rate,
            limit,
            model,
            threshold,
        ),
        Commands::Classify { features, model } => cmd_classify(&config, &features, model),
        Commands::Score {
            hr,
            hrv,
            motion,
            amused,
            calm,
            stressed,
        } => cmd_score(
            &config,
            hr,
            hrv,
            motion,
            EmotionProbabilities::new(amused, calm, stressed),
        ),
        Commands::Model { path, json } => cmd_model(&config, path, json),
        Commands::Consent { action } => cmd_consent(&config, action),
        Commands::Sessions => cmd_sessions(&config),
        Commands::Status => cmd_status(&config),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config => cmd_config(&config),
    }
}

/// Load consent state and fail unless `capability` is allowed.
fn require_consent(config: &Config, capability: Capability) -> Result<ConsentManager> {
    let consent = ConsentManager::with_persistence(config.consent_path())
        .context("Could not read consent state")?;
    consent.check(capability).map_err(|e| {
        anyhow::anyhow!(
            "{e}\nRun `synheart-emotion consent grant {}` to allow it.",
            capability.required_level()
        )
    })?;
    Ok(consent)
}

/// Drain queued results and score each against the latest reading.
fn score_ready(
    engine: &EmotionEngine,
    scorer: &ScoreEngine,
    latest: Option<Sample>,
) -> Vec<ScoreResult> {
    let results = engine.consume_ready();
    let Some(sample) = latest else {
        return Vec::new();
    };
    results
        .iter()
        .map(|result| {
            scorer.compute_score(sample.hr, sample.hrv, sample.motion, result.probabilities())
        })
        .collect()
}

fn load_classifier(config: &Config, model: Option<PathBuf>) -> LinearClassifier {
    match model.or_else(|| config.model_path.clone()) {
        Some(path) => LinearClassifier::from_path(&path),
        None => LinearClassifier::with_default_model(),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    mut config: Config,
    source: &str,
    input: Option<&Path>,
    profile: &str,
    rate: f64,
    limit: Option<usize>,
    model: Option<PathBuf>,
    threshold: Option<f64>,
) -> Result<()> {
    config
        .ensure_directories()
        .context("Could not create data directory")?;

    let consent = require_consent(&config, Capability::BiosignalIngest)?;
    let store_sessions = consent.is_allowed(Capability::SessionStorage);

    if let Some(t) = threshold {
        config.engine.confidence_threshold = t;
    }

    let mut sample_source: Box<dyn SampleSource> = match source {
        "synthetic" => {
            let profile = SyntheticProfile::parse(profile)
                .with_context(|| format!("Unknown synthetic profile '{profile}'"))?;
            Box::new(SyntheticSource::new(profile, rate, limit))
        }
        "replay" => {
            let Some(path) = input else {
                bail!("--input is required for --source replay");
            };
            Box::new(ReplaySource::new(path, rate))
        }
        other => bail!("Unknown source '{other}' (expected synthetic or replay)"),
    };

    let transparency_log = create_shared_log_with_persistence(config.transparency_path());
    let classifier = load_classifier(&config, model);
    let engine = EmotionEngine::new(config.engine.clone(), classifier)
        .with_transparency_log(transparency_log.clone());
    let scorer = ScoreEngine::new(config.score.clone());

    let mut sessions = SessionStore::with_persistence(config.sessions_path())
        .context("Could not read session records")?;
    let session_id = sessions.start(sample_source.name());
    if let Some(path) = input {
        sessions.set_metadata(session_id, "input", &path.display().to_string())?;
    }
    sessions.set_metadata(
        session_id,
        "model_version",
        &engine.classifier().artifact().version,
    )?;

    let engine_config = engine.config();
    println!("Synheart Emotion Engine v{VERSION}");
    println!("  Source: {}", sample_source.name());
    println!(
        "  Model: {} {}{}",
        engine.classifier().artifact().model_type,
        engine.classifier().artifact().version,
        if engine.classifier().is_fallback() {
            " (fallback)"
        } else {
            ""
        }
    );
    println!(
        "  Window: {} samples (min {}, cap {})",
        engine_config.window_size, engine_config.min_buffer_size, engine_config.max_buffer_size
    );
    println!(
        "  Confidence threshold: {:.2}",
        engine_config.confidence_threshold
    );
    println!("  Session: {session_id}");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    sample_source
        .start()
        .context("Failed to start sample source")?;
    let receiver = sample_source.receiver().clone();

    let tick = config.tick_interval;
    let mut last_tick = Instant::now();
    let mut latest: Option<Sample> = None;
    let mut pushed_since_tick: u64 = 0;
    let mut exhausted = false;

    while running.load(Ordering::SeqCst) && !exhausted {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(sample) => {
                engine.push_sample(sample);
                latest = Some(sample);
                pushed_since_tick += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => exhausted = true,
        }

        if exhausted || last_tick.elapsed() >= tick {
            sessions.record_samples(session_id, pushed_since_tick)?;
            pushed_since_tick = 0;

            for score in score_ready(&engine, &scorer, latest) {
                transparency_log.record_score();
                sessions.record_score(session_id, score.score)?;
                println!("{}", serde_json::to_string(&score)?);
            }
            last_tick = Instant::now();
        }
    }

    sample_source.stop();

    // Results queued since the last tick are scored before the buffer is purged
    sessions.record_samples(session_id, pushed_since_tick)?;
    for score in score_ready(&engine, &scorer, latest) {
        transparency_log.record_score();
        sessions.record_score(session_id, score.score)?;
        println!("{}", serde_json::to_string(&score)?);
    }
    engine.clear();

    sessions.stop(session_id)?;
    if store_sessions {
        sessions.save().context("Could not save session records")?;
    }
    if let Err(e) = transparency_log.save() {
        tracing::warn!("Could not save transparency stats: {e}");
    }

    println!();
    println!("{}", transparency_log.summary());
    Ok(())
}

fn cmd_classify(config: &Config, features: &str, model: Option<PathBuf>) -> Result<()> {
    require_consent(config, Capability::Inference)?;

    let values = features
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .context("Features must be comma-separated numbers")?;
    let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|v: Vec<f64>| {
        anyhow::anyhow!(
            "Expected {FEATURE_COUNT} features ({}), got {}",
            FEATURE_NAMES.join(","),
            v.len()
        )
    })?;

    let classifier = load_classifier(config, model);
    let prediction = classifier.predict(&FeatureVector::new(values));
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn cmd_score(
    config: &Config,
    hr: f64,
    hrv: f64,
    motion: f64,
    probabilities: EmotionProbabilities,
) -> Result<()> {
    require_consent(config, Capability::Inference)?;

    let scorer = ScoreEngine::new(config.score.clone());
    let result = scorer.compute_score(hr, hrv, motion, &probabilities);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_model(config: &Config, path: Option<PathBuf>, json: bool) -> Result<()> {
    let classifier = load_classifier(config, path);
    let artifact = classifier.artifact();

    if json {
        println!("{}", artifact.to_json()?);
        return Ok(());
    }

    println!("Model");
    println!("=====");
    println!();
    println!("  Type: {}", artifact.model_type);
    println!("  Version: {}", artifact.version);
    if classifier.is_fallback() {
        println!("  (requested model was rejected; embedded default in use)");
    }
    println!("  Classes: {}", artifact.classes.join(", "));
    println!("  Features: {}", artifact.feature_order.join(", "));
    println!();
    println!("Provenance:");
    let show = |name: &str, value: &Option<String>| {
        println!("  {name}: {}", value.as_deref().unwrap_or("-"));
    };
    show("Model hash", &artifact.model_hash);
    show("Exported", &artifact.export_time_utc);
    show("Training commit", &artifact.training_commit);
    show("Data manifest", &artifact.data_manifest_id);
    Ok(())
}

fn cmd_consent(config: &Config, action: ConsentAction) -> Result<()> {
    let mut consent = ConsentManager::with_persistence(config.consent_path())
        .context("Could not read consent state")?;

    match action {
        ConsentAction::Status => {
            println!("Consent level: {}", consent.level());
            for capability in Capability::ALL {
                println!(
                    "  {capability}: {}",
                    if consent.is_allowed(capability) {
                        "allowed ✓"
                    } else {
                        "denied ✗"
                    }
                );
            }
        }
        ConsentAction::Grant { level } => {
            let level = ConsentLevel::parse(&level)
                .with_context(|| format!("Unknown consent level '{level}'"))?;
            consent.grant(level)?;
            println!("Consent level set to '{level}'");
        }
        ConsentAction::Revoke => {
            consent.revoke()?;
            println!("All consent revoked");
        }
        ConsentAction::History => {
            if consent.history().is_empty() {
                println!("No consent changes recorded");
            }
            for event in consent.history() {
                println!(
                    "{}  {} -> {}",
                    event.timestamp.to_rfc3339(),
                    event.from,
                    event.to
                );
            }
        }
    }
    Ok(())
}

fn cmd_sessions(config: &Config) -> Result<()> {
    let store = SessionStore::with_persistence(config.sessions_path())
        .context("Could not read session records")?;

    if store.is_empty() {
        println!("No sessions recorded");
        println!("Run 'synheart-emotion run' to start one.");
        return Ok(());
    }

    for record in store.list() {
        println!(
            "{}  {}  {:<9}  {:>5}s  samples={}  results={}  last_score={}",
            record.id,
            record.started_at.format("%Y-%m-%d %H:%M:%S"),
            record.source,
            record.duration_secs(),
            record.samples,
            record.results,
            record
                .last_score
                .map(|s| format!("{s:.1}"))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("Synheart Emotion Engine Status");
    println!("==============================");
    println!();

    let consent = ConsentManager::with_persistence(config.consent_path())
        .context("Could not read consent state")?;
    println!("Consent level: {}", consent.level());

    let classifier = load_classifier(config, None);
    println!(
        "Model: {} {}{}",
        classifier.artifact().model_type,
        classifier.artifact().version,
        if classifier.is_fallback() {
            " (fallback)"
        } else {
            ""
        }
    );
    println!();

    let log = create_shared_log_with_persistence(config.transparency_path());
    println!("{}", log.summary());
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {e}");
    }
}
