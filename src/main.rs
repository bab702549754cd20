//! Hostwatch main entry point
//!
//! This is the command-line interface for the Hostwatch link hosting mapper.

use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use hostwatch::config::{load_config_with_hash, Config};
use hostwatch::crawler::Pipeline;
use hostwatch::output::{format_crawl_report, load_statistics, print_statistics};
use hostwatch::server::JobServer;
use hostwatch::storage::{open_storage, purge_old_urls, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Hostwatch: where do the links point?
///
/// Hostwatch fetches seed pages, extracts their outbound links, resolves
/// each link's host and keeps a running count of every (domain, ip) pair
/// it has seen.
#[derive(Parser, Debug)]
#[command(name = "hostwatch")]
#[command(version)]
#[command(about = "Maps outbound links to the hosts serving them", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URLs to crawl
    #[arg(value_name = "URLS", conflicts_with_all = ["serve", "purge", "stats"])]
    urls: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the job submission server
    #[arg(long, conflicts_with_all = ["purge", "stats"])]
    serve: bool,

    /// Delete URL rows older than the configured maximum age and exit
    #[arg(long, conflicts_with_all = ["serve", "stats"])]
    purge: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["serve", "purge"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.stats {
        handle_stats(&config)
    } else if cli.purge {
        handle_purge(&config)
    } else if cli.serve {
        handle_serve(config).await
    } else {
        handle_crawl(config, &cli.urls).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hostwatch=info,warn"),
            1 => EnvFilter::new("hostwatch=debug,info"),
            2 => EnvFilter::new("hostwatch=trace,debug"),
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

fn open_shared(config: &Config) -> anyhow::Result<Arc<Mutex<SqliteStorage>>> {
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open {}", config.storage.database_path))?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --purge mode: deletes old URL rows
fn handle_purge(config: &Config) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.storage.database_path))?;
    let max_age = Duration::hours(i64::from(config.housekeeping.max_age_hours));
    let deleted = purge_old_urls(&mut storage, max_age)?;

    println!(
        "Deleted {} url rows older than {} hours",
        deleted, config.housekeeping.max_age_hours
    );
    Ok(())
}

/// Handles the --serve mode: accepts crawl jobs until Ctrl-C
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let store = open_shared(&config)?;
    let server_config = config.server.clone();
    let pipeline = Pipeline::new(config, store)?;

    let listener = JobServer::bind(&server_config.bind).await?;
    let server = JobServer::new(pipeline, &server_config);

    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, urls: &[String]) -> anyhow::Result<()> {
    if urls.is_empty() {
        anyhow::bail!("No seed URLs given (pass URLs, or use --serve, --purge or --stats)");
    }

    tracing::info!("Total seed URLs: {}", urls.len());

    let store = open_shared(&config)?;
    let pipeline = Pipeline::new(config, store)?;

    match pipeline.run(urls).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            print!("{}", format_crawl_report(&report));
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
