//! Clashmix CLI
//!
//! Aggregates one scheme's subscription sources into a Clash configuration
//! document and prints it as YAML or JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clashmix::{Aggregator, SchemeStore, Settings};

/// CLI arguments for clashmix
#[derive(Parser, Debug)]
#[command(name = "clashmix")]
#[command(about = "Clash subscription aggregator")]
#[command(version)]
#[command(long_about = "
Aggregates the subscription sources of one scheme into a single Clash
configuration: sources are fetched concurrently (with stale-snapshot
fallback), merged and deduplicated, classified by region, and app routing
rules are expanded into rule sets and policy groups.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Settings file
3. Environment variables
4. Built-in defaults

Environment variables:
  CLASHMIX_DATA_DIR       - Root directory for per-scope state
  CLASHMIX_FETCH_TIMEOUT  - Subscription fetch timeout (e.g., 5s)
  CLASHMIX_CATALOG_TTL    - App catalog staleness threshold (e.g., 1day)
  CLASHMIX_LOG_LEVEL      - Log level (trace, debug, info, warn, error)
")]
struct CliArgs {
    /// Settings file path
    #[arg(short, long, default_value = "clashmix.toml")]
    settings: PathBuf,

    /// Data directory (overrides settings file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Scope whose schemes to read
    #[arg(long, default_value = "default")]
    scope: String,

    /// Name of the scheme to aggregate
    #[arg(long)]
    scheme: Option<String>,

    /// Output format: yaml, json or nodes
    #[arg(long, default_value = "yaml")]
    format: String,

    /// Write the document to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write fetch outcomes back to the scheme store
    #[arg(long)]
    no_persist: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    validate_settings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    let mut settings = Settings::load_from_file(&args.settings)?;
    settings.merge_with_cli_args(args.data_dir.as_deref(), Some(&args.log_level));
    settings
        .validate()
        .context("Final settings validation failed")?;

    if args.validate_settings {
        info!("Settings are valid");
        info!("  Data dir: {}", settings.data_dir.display());
        info!("  Fetch timeout: {:?}", settings.fetch_timeout);
        info!("  Catalog TTL: {:?}", settings.catalog_ttl);
        return Ok(());
    }

    let Some(scheme_name) = args.scheme.as_deref() else {
        bail!("--scheme is required (or use --validate-settings)");
    };

    let store = SchemeStore::new(settings.data_dir.clone());
    let aggregator = Aggregator::new(&settings)?;

    let Some(scheme) = store.get_scheme(&args.scope, scheme_name).await? else {
        bail!("Scheme '{}' does not exist", scheme_name);
    };
    if !scheme.enabled {
        bail!("Scheme '{}' is disabled", scheme_name);
    }

    let outcome = aggregator.aggregate(&args.scope, &scheme).await?;

    if args.no_persist {
        info!("Skipping outcome persistence (--no-persist)");
    } else if let Err(e) = store
        .apply_source_outcomes(&args.scope, scheme_name, &outcome.sources)
        .await
    {
        warn!("Failed to persist fetch outcomes: {:#}", e);
    }

    let rendered = match args.format.as_str() {
        "yaml" => serde_yaml::to_string(&outcome.config)?,
        "json" => serde_json::to_string_pretty(&outcome.config)?,
        "nodes" => serde_json::to_string_pretty(&outcome.config.nodes_view())?,
        other => bail!("Unknown output format: {} (expected yaml, json or nodes)", other),
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            info!("Wrote aggregated configuration to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    Ok(())
}
