//! FieldGuard - Per-field privacy enforcement for structured data records
//!
//! Thin CLI over the `fieldguard` library: runs the enforcement pipeline on
//! JSON documents from disk, for spot-checking records against a policy and
//! consent document.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldguard::{
    config::EnforcerConfig, Consent, DataRecord, FieldClassifier, NullModel, Policy,
    PrivacyEnforcer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fieldguard")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Per-field privacy enforcement for structured data records")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FIELDGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the enforcement pipeline on a record
    Process {
        /// Record JSON file
        #[arg(long)]
        record: PathBuf,

        /// Policy JSON file
        #[arg(long)]
        policy: PathBuf,

        /// Consent JSON file
        #[arg(long)]
        consent: PathBuf,

        /// Processing purpose (e.g. analytics, marketing)
        #[arg(long)]
        purpose: String,
    },

    /// Classify a record's fields without enforcing a policy
    Classify {
        /// Record JSON file
        #[arg(long)]
        record: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fieldguard={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => EnforcerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EnforcerConfig::default(),
    };

    match cli.command {
        Commands::Process {
            record,
            policy,
            consent,
            purpose,
        } => {
            run_process(&config, &record, &policy, &consent, &purpose).await?;
        }
        Commands::Classify { record } => {
            run_classify(&config, &record).await?;
        }
        Commands::Config { default } => {
            let shown = if default {
                EnforcerConfig::default()
            } else {
                config
            };
            println!("{}", shown.to_toml()?);
        }
    }

    Ok(())
}

async fn run_process(
    config: &EnforcerConfig,
    record_path: &Path,
    policy_path: &Path,
    consent_path: &Path,
    purpose: &str,
) -> Result<()> {
    let record = DataRecord::from_json(&read(record_path)?)
        .with_context(|| format!("invalid record {}", record_path.display()))?;
    let policy = Policy::from_json(&read(policy_path)?)
        .with_context(|| format!("invalid policy {}", policy_path.display()))?;
    let consent: Consent = serde_json::from_str(&read(consent_path)?)
        .with_context(|| format!("invalid consent {}", consent_path.display()))?;

    let enforcer = PrivacyEnforcer::new(config)?;
    let processed = enforcer.process(&record, purpose, &policy, &consent).await;

    println!("{}", serde_json::to_string_pretty(&processed)?);
    Ok(())
}

async fn run_classify(config: &EnforcerConfig, record_path: &Path) -> Result<()> {
    let record = DataRecord::from_json(&read(record_path)?)
        .with_context(|| format!("invalid record {}", record_path.display()))?;

    let classifier = FieldClassifier::new(&config.classifier, Arc::new(NullModel))?;
    let classified = classifier.classify(&record).await;

    println!("{}", serde_json::to_string_pretty(&classified)?);
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
