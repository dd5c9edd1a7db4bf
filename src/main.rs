//! Linkwatch main entry point
//!
//! This is the command-line interface for the Linkwatch broken-link tracker.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use linkwatch::config::{load_config_with_hash, validate, Config, SiteEntry};
use linkwatch::diff::compare_with_history;
use linkwatch::output::{
    compute_statistics, export_path, load_all, print_statistics, write_changes, write_records,
    DeltaReport, JsonReport, MarkdownReport, ReportWriter,
};
use linkwatch::storage::{open_store, store_snapshot, SnapshotStore};
use linkwatch::{crawl_site, ConfigError, LinkwatchError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Linkwatch: a broken-link tracker
///
/// Linkwatch crawls a site breadth-first, checks every link it finds and
/// keeps one snapshot of broken links per day, so that new breakage and
/// fixes can be reported day over day.
#[derive(Parser, Debug)]
#[command(name = "linkwatch")]
#[command(version = "1.0.0")]
#[command(about = "Crawls a site and tracks broken links day over day", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one or all configured sites and write their CSV exports
    Crawl {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Only crawl the site with this region code
        #[arg(long, value_name = "REGION")]
        site: Option<String>,

        /// Stop tracking new URLs after this many
        #[arg(long, value_name = "N")]
        max_urls: Option<usize>,
    },

    /// Store CSV exports as the day's snapshot and write the delta report
    Snapshot {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// CSV exports to load
        #[arg(value_name = "CSV", required = true)]
        csv: Vec<PathBuf>,

        /// Snapshot date (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        /// Markdown report path (overrides the config)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// JSON delta path (overrides the config)
        #[arg(long, value_name = "PATH")]
        delta: Option<PathBuf>,

        /// Changes CSV path (overrides the config)
        #[arg(long, value_name = "PATH")]
        changes: Option<PathBuf>,
    },

    /// Drop snapshots outside the retention window
    Retention {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Date the window is measured from (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// Validate the configuration and show what would be crawled
    CheckConfig {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Crawl {
            config,
            site,
            max_urls,
        } => handle_crawl(&config, site.as_deref(), max_urls).await,
        Command::Snapshot {
            config,
            csv,
            date,
            output,
            delta,
            changes,
        } => handle_snapshot(&config, &csv, date, output, delta, changes),
        Command::Retention { config, date } => handle_retention(&config, date),
        Command::CheckConfig { config } => handle_check_config(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            exit_code_for(&e)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkwatch=info,warn"),
            1 => EnvFilter::new("linkwatch=debug,info"),
            2 => EnvFilter::new("linkwatch=trace,debug"),
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

/// 2 for configuration and connectivity failures, 1 for everything else
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let configuration = err
        .downcast_ref::<LinkwatchError>()
        .map(LinkwatchError::is_configuration)
        .unwrap_or(false)
        || err.downcast_ref::<ConfigError>().is_some();

    if configuration {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn load(path: &Path) -> Result<Config> {
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .map_err(LinkwatchError::from)
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

/// Handles the crawl command: crawls each selected site and writes its CSV
async fn handle_crawl(config_path: &Path, only: Option<&str>, max_urls: Option<usize>) -> Result<()> {
    let mut config = load(config_path)?;
    if max_urls.is_some() {
        config.crawler.max_urls = max_urls;
        validate(&config)
            .map_err(LinkwatchError::from)
            .context("--max-urls")?;
    }

    let sites: Vec<SiteEntry> = match only {
        Some(region) => vec![config
            .site(region)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownRegion(region.to_string()))
            .map_err(LinkwatchError::from)?],
        None => config.sites.clone(),
    };

    let csv_dir = Path::new(&config.output.csv_dir);
    std::fs::create_dir_all(csv_dir)
        .with_context(|| format!("creating {}", csv_dir.display()))?;

    for site in &sites {
        let outcome = crawl_site(&config, site)
            .await
            .with_context(|| format!("crawling {} ({})", site.region, site.seed))?;

        print_statistics(&compute_statistics(&outcome));

        let path = export_path(csv_dir, &site.region);
        let written = write_records(&path, &outcome.broken_records())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("\n✓ {} broken links written to {}", written, path.display());
        if outcome.is_partial() {
            println!("  (partial crawl: the export covers only the URLs that were checked)");
        }
    }

    Ok(())
}

/// Handles the snapshot command: store, sweep, diff and report
fn handle_snapshot(
    config_path: &Path,
    csv: &[PathBuf],
    date: Option<NaiveDate>,
    output: Option<PathBuf>,
    delta: Option<PathBuf>,
    changes: Option<PathBuf>,
) -> Result<()> {
    let config = load(config_path)?;
    let date = today_or(date);

    let records = load_all(csv)?;

    let mut store = open_store(&config.snapshot)
        .map_err(LinkwatchError::from)
        .with_context(|| format!("opening {}", config.snapshot.database_path))?;
    let handle = store_snapshot(
        &mut store,
        date,
        Local::now().date_naive(),
        &records,
        config.snapshot.retention_days,
    )
    .map_err(LinkwatchError::from)
    .context("writing snapshot")?;
    println!(
        "✓ Snapshot {} written with {} broken links",
        handle.table_name, handle.record_count
    );

    let comparisons = compare_with_history(&store, date, &records)
        .map_err(LinkwatchError::from)
        .context("reading reference snapshots")?;
    let report = DeltaReport::new(
        date,
        &records,
        comparisons,
        handle.dropped,
        config.snapshot.retention_days,
    );

    let report_path = output.unwrap_or_else(|| PathBuf::from(&config.output.report_path));
    MarkdownReport
        .write_to(&report, &report_path)
        .map_err(LinkwatchError::from)
        .with_context(|| format!("writing {}", report_path.display()))?;
    println!("✓ Report written to: {}", report_path.display());

    let delta_path = delta.unwrap_or_else(|| PathBuf::from(&config.output.delta_path));
    JsonReport
        .write_to(&report, &delta_path)
        .map_err(LinkwatchError::from)
        .with_context(|| format!("writing {}", delta_path.display()))?;
    println!("✓ Delta written to: {}", delta_path.display());

    let changes_path = changes.unwrap_or_else(|| PathBuf::from(&config.output.changes_path));
    if let Some(parent) = changes_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let rows = write_changes(&changes_path, &report.comparisons)
        .with_context(|| format!("writing {}", changes_path.display()))?;
    println!("✓ {} changes written to: {}", rows, changes_path.display());

    Ok(())
}

/// Handles the retention command
fn handle_retention(config_path: &Path, date: Option<NaiveDate>) -> Result<()> {
    let config = load(config_path)?;
    let date = today_or(date);

    let mut store = open_store(&config.snapshot).map_err(LinkwatchError::from)?;
    let dropped = store
        .enforce_retention(date, config.snapshot.retention_days)
        .map_err(LinkwatchError::from)
        .context("enforcing retention")?;

    println!(
        "✓ {} snapshots dropped, {} kept",
        dropped.len(),
        store
            .list_snapshot_dates()
            .map_err(LinkwatchError::from)?
            .len()
    );
    Ok(())
}

/// Handles the check-config command: validates config and shows the plan
fn handle_check_config(config_path: &Path) -> Result<()> {
    let config = load(config_path)?;

    println!("=== Linkwatch Configuration ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!(
        "  Max requests per host: {}",
        config.crawler.max_requests_per_host
    );
    println!(
        "  Minimum request interval: {}ms",
        config.crawler.minimum_request_interval
    );
    println!("  Request timeout: {}ms", config.crawler.request_timeout);
    println!("  Max redirects: {}", config.crawler.max_redirects);
    match config.crawler.max_urls {
        Some(n) => println!("  Max URLs: {}", n),
        None => println!("  Max URLs: unbounded"),
    }
    if let Some(deadline) = config.crawler.deadline {
        println!("  Deadline: {}s", deadline);
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Initial backoff: {}ms", config.retry.initial_backoff);
    println!("  Multiplier: {}", config.retry.backoff_multiplier);
    println!("  Max backoff: {}ms", config.retry.max_backoff);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSnapshots:");
    println!("  Database: {}", config.snapshot.database_path);
    println!("  Retention: {} days", config.snapshot.retention_days);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} {}", site.region, site.seed);
        for domain in &site.domains {
            println!("    * domain {}", domain);
        }
        for pattern in &site.exclude {
            println!("    * exclude {}", pattern);
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}
