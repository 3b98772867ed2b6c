//! Catalog-Sweep main entry point
//!
//! This is the command-line interface for the competitor catalog price sweep.

use anyhow::Context;
use catalog_sweep::catalog::load_catalog_urls;
use catalog_sweep::config::{load_config_with_hash, Config};
use catalog_sweep::output::{load_statistics, print_statistics};
use catalog_sweep::pipeline::{Pipeline, StartPhase};
use catalog_sweep::storage::SqliteStorage;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Sweep: competitor catalog price sweeper
///
/// Fetches every catalog product page through the rendering provider,
/// escalates pages that did not resolve through a fixed retry ladder, and
/// stores one canonical record per URL with its total provider cost.
#[derive(Parser, Debug)]
#[command(name = "catalog-sweep")]
#[command(version)]
#[command(about = "Competitor catalog price sweeper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from a later phase, reading earlier phases from their checkpoints
    #[arg(long, value_enum, default_value_t = Phase::FirstPass)]
    resume_from: Phase,

    /// Validate config and list the catalog without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the stored canonical records and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Phase {
    FirstPass,
    RetryPass,
    Reconcile,
}

impl From<Phase> for StartPhase {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::FirstPass => StartPhase::FirstPass,
            Phase::RetryPass => StartPhase::RetryPass,
            Phase::Reconcile => StartPhase::Reconcile,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_sweep(config, config_hash, cli.resume_from.into()).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_sweep=info,warn"),
            1 => EnvFilter::new("catalog_sweep=debug,info"),
            2 => EnvFilter::new("catalog_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and lists the catalog
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let urls = load_catalog_urls(&config.catalog).context("failed to load catalog URLs")?;

    println!("=== Catalog-Sweep Dry Run ===\n");

    println!("Provider:");
    println!("  Base URL: {}", config.provider.base_url);
    println!(
        "  Country / languages: {} / {}",
        config.provider.country,
        config.provider.languages.join(",")
    );
    println!("  Proxy pool: {}", config.provider.proxy_pool);
    println!("  Cost budget per attempt: {}", config.provider.cost_budget);
    println!(
        "  API key: {}",
        if config.provider.resolve_api_key().is_some() {
            "configured"
        } else {
            "MISSING"
        }
    );

    println!("\nFirst pass:");
    println!(
        "  Max concurrent fetches: {}",
        config.first_pass.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}ms",
        config.first_pass.request_timeout_ms
    );
    println!(
        "  Pacing: {}-{}ms",
        config.first_pass.pacing_min_ms, config.first_pass.pacing_max_ms
    );

    println!("\nRetry pass:");
    println!(
        "  Inter-URL delay: {}ms",
        config.retry_pass.inter_url_delay_ms
    );
    println!(
        "  Request timeout: {}ms",
        config.retry_pass.request_timeout_ms
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Checkpoints: {}", config.output.checkpoint_dir);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nCatalog ({} URLs):", urls.len());
    for url in &urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles a sweep run
async fn handle_sweep(config: Config, config_hash: String, start: StartPhase) -> anyhow::Result<()> {
    let urls = load_catalog_urls(&config.catalog).context("failed to load catalog URLs")?;
    tracing::info!("Catalog URLs: {}", urls.len());

    let mut pipeline = Pipeline::from_config(config, config_hash)?;

    match pipeline.run(&urls, start).await {
        Ok(report) => {
            tracing::info!(
                "Sweep completed: run {}, {} canonical records, {} retried URLs",
                report.run_id,
                report.canonical.len(),
                report.retried_urls
            );
            print_statistics(&report.statistics);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sweep failed: {}", e);
            Err(e.into())
        }
    }
}
