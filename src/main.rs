//! Graph-Harvest main entry point
//!
//! This is the command-line interface for the Graph-Harvest social graph and
//! topic tree harvester.

use anyhow::Context;
use clap::Parser;
use graph_harvest::api::{ApiClient, Endpoints};
use graph_harvest::config::{load_config_with_hash, Config};
use graph_harvest::crawler::{HarvestPlan, TopicStatsScraper};
use graph_harvest::notify::{self, Reporter};
use graph_harvest::storage::SqliteStorage;
use graph_harvest::{CrawlMode, Harvester, Orchestrator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Graph-Harvest: a resumable social graph and topic tree harvester
///
/// Graph-Harvest walks a site's paginated API from a root identifier,
/// recording every user handle or topic id it discovers. Runs can be
/// interrupted at any time and resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "graph-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable social graph and topic tree harvester", long_about = None)]
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

    /// Start from the root, ignoring the latest checkpoint
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "scrape_topic_stats"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "scrape_topic_stats"])]
    stats: bool,

    /// Scrape follower and question counters for every harvested topic
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    scrape_topic_stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.scrape_topic_stats {
        handle_topic_stats(&config).await
    } else {
        handle_harvest(&config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("graph_harvest=info,warn"),
            1 => EnvFilter::new("graph_harvest=debug,info"),
            2 => EnvFilter::new("graph_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let plan = HarvestPlan::from_config(config)?;

    println!("=== Graph-Harvest Dry Run ===\n");

    println!("Harvest Configuration:");
    println!("  Mode: {}", plan.mode);
    println!("  Root: {}", plan.root);
    println!(
        "  Pacing interval: {:?} (requested {}ms)",
        plan.pacing, config.harvest.pause_interval_ms
    );
    println!("  Retry limit: {}", plan.retry_limit);
    println!("  Strict status: {}", config.harvest.strict_status);

    println!("\nSession:");
    println!("  User agent: {}", config.session.user_agent());
    println!(
        "  Cookie pairs: {}",
        config.session.cookie_header()?.split("; ").count()
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nNotifier:");
    match &config.notifier.webhook_url {
        Some(url) => println!("  Webhook: {}", url),
        None => println!("  Log only"),
    }
    println!(
        "  Report interval: {}h",
        config.notifier.report_interval_hours
    );

    println!("\nSeed URLs:");
    for (kind, url) in plan.mode.edge_kinds().iter().zip(plan.root_seeds()) {
        println!("  - {}: {}", kind, url);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use graph_harvest::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.output.database_path), config.harvest.mode)?;

    // Load statistics
    let stats = load_statistics(config.harvest.mode, &storage, &storage, &storage)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let plan = HarvestPlan::from_config(config)?;
    if fresh {
        tracing::info!("Starting fresh {} harvest from {}", plan.mode, plan.root);
    } else {
        tracing::info!("Starting {} harvest (will resume from the latest checkpoint)", plan.mode);
    }

    let storage = Arc::new(
        SqliteStorage::new(Path::new(&config.output.database_path), plan.mode)
            .context("Failed to open harvest database")?,
    );
    let source = Arc::new(ApiClient::from_config(config)?);
    let notifier = notify::from_config(&config.notifier)?;

    let reporter = Reporter::new(
        notifier.clone(),
        storage.clone(),
        plan.mode,
        config.notifier.report_interval(),
    );
    let orchestrator =
        Orchestrator::new(plan, source, storage.clone(), storage.clone(), notifier).fresh(fresh);

    let harvester = Harvester::start(|lifecycle| orchestrator.run(lifecycle), Some(reporter));
    wait_for_interrupt_or_completion(&harvester).await;

    let outcome = harvester.shutdown().await;
    drop(storage);

    let summary = outcome.context("Harvest failed")?;
    tracing::info!(
        "Harvest finished ({:?}): {} identifiers visited, {} discovered",
        summary.halt,
        summary.visited,
        summary.discovered
    );
    Ok(())
}

/// Handles the --scrape-topic-stats mode: records topic page counters
async fn handle_topic_stats(config: &Config) -> anyhow::Result<()> {
    if config.harvest.mode != CrawlMode::HarvestTopicTree {
        tracing::warn!(
            "Config mode is {}, scraping stats for the topic tree frontier anyway",
            config.harvest.mode
        );
    }

    let storage = Arc::new(
        SqliteStorage::new(
            Path::new(&config.output.database_path),
            CrawlMode::HarvestTopicTree,
        )
        .context("Failed to open harvest database")?,
    );
    let source = Arc::new(ApiClient::from_config(config)?);
    let scraper = TopicStatsScraper::new(
        storage.clone(),
        storage.clone(),
        source,
        Endpoints::new(&config.api.base_url)?,
        config.harvest.pause_interval(),
    );

    let harvester = Harvester::start(|lifecycle| scraper.run(lifecycle), None);
    wait_for_interrupt_or_completion(&harvester).await;

    let outcome = harvester.shutdown().await;
    drop(storage);

    let summary = outcome.context("Topic statistics pass failed")?;
    tracing::info!(
        "Topic statistics finished ({:?}): {} topics visited, {} recorded",
        summary.halt,
        summary.visited,
        summary.recorded
    );
    Ok(())
}

/// Blocks until SIGINT/SIGTERM arrives or the background job completes
async fn wait_for_interrupt_or_completion<T: Send + 'static>(harvester: &Harvester<T>) {
    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Interrupt received, stopping at the next safe point");
        }
        _ = harvester.await_completion() => {}
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
