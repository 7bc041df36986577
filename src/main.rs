//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark posting harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tidemark::config::{load_config_with_hash, validate, Config, Credential};
use tidemark::output::{load_statistics, print_report, print_statistics};
use tidemark::store::CsvStore;
use tracing_subscriber::EnvFilter;

/// Tidemark: an incremental job-posting harvester
///
/// Tidemark pages through the newest job postings, stops once it reaches
/// postings it has already recorded, and appends extracted contract terms
/// for every new posting to a CSV store.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "An incremental job-posting harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the store without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    #[command(flatten)]
    overrides: Overrides,
}

/// Run parameters that override the config file
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Posting store path
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Maximum listing pages per run
    #[arg(long)]
    max_pages: Option<u32>,

    /// Listing page size
    #[arg(long)]
    page_size: Option<u32>,

    /// Classification code
    #[arg(long)]
    classification: Option<String>,

    /// Work-type code
    #[arg(long)]
    work_type: Option<String>,

    /// Locale for listing and detail requests
    #[arg(long)]
    locale: Option<String>,

    #[arg(long)]
    country_code: Option<String>,

    #[arg(long)]
    zone: Option<String>,

    #[arg(long)]
    timezone: Option<String>,

    /// Extraction model identifier
    #[arg(long)]
    model: Option<String>,

    /// Pause after each detail request (milliseconds)
    #[arg(long)]
    detail_delay_ms: Option<u64>,

    /// Pause after each extraction request (milliseconds)
    #[arg(long)]
    extraction_delay_ms: Option<u64>,

    /// Pause between listing pages (milliseconds)
    #[arg(long)]
    page_delay_ms: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(output) = self.output {
            config.output.store_path = output;
        }
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_pages = max_pages;
        }
        if let Some(page_size) = self.page_size {
            config.crawl.page_size = page_size;
        }
        if let Some(classification) = self.classification {
            config.search.classification = classification;
        }
        if let Some(work_type) = self.work_type {
            config.search.work_type = work_type;
        }
        if let Some(locale) = self.locale {
            config.search.locale = locale.clone();
            config.detail.locale = locale;
        }
        if let Some(country_code) = self.country_code {
            config.detail.country_code = country_code;
        }
        if let Some(zone) = self.zone {
            config.detail.zone = zone;
        }
        if let Some(timezone) = self.timezone {
            config.detail.timezone = timezone;
        }
        if let Some(model) = self.model {
            config.extraction.model = model;
        }
        if let Some(delay) = self.detail_delay_ms {
            config.crawl.detail_delay_ms = delay;
        }
        if let Some(delay) = self.extraction_delay_ms {
            config.crawl.extraction_delay_ms = delay;
        }
        if let Some(delay) = self.page_delay_ms {
            config.crawl.page_delay_ms = delay;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // A missing .env is fine; the variable may come from the environment
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    cli.overrides.apply(&mut config);
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Tidemark Dry Run ===\n");

    println!("Crawl:");
    println!("  Max pages: {}", config.crawl.max_pages);
    println!("  Page size: {}", config.crawl.page_size);
    println!(
        "  Delays: detail {}ms, extraction {}ms, page {}ms",
        config.crawl.detail_delay_ms, config.crawl.extraction_delay_ms, config.crawl.page_delay_ms
    );
    println!(
        "  Retries: {} attempts, base delay {}ms",
        config.retry.max_attempts, config.retry.base_delay_ms
    );

    println!("\nSearch:");
    println!("  Listing: {}", config.search.listing_url);
    println!("  Where: {}", config.search.location);
    println!("  Classification: {}", config.search.classification);
    println!("  Work type: {}", config.search.work_type);
    println!("  Sort: {}", config.search.sort_mode);

    println!("\nDetail:");
    println!("  Endpoint: {}", config.detail.url);
    println!(
        "  Zone/locale: {} / {} ({}, {})",
        config.detail.zone, config.detail.locale, config.detail.country_code, config.detail.timezone
    );

    println!("\nExtraction:");
    println!("  Endpoint: {}", config.extraction.endpoint);
    println!("  Model: {}", config.extraction.model);
    println!("  Credential variable: {}", config.extraction.credential_env);

    println!("\nOutput:");
    println!("  Store: {}", config.output.store_path);
    println!(
        "  Record empty descriptions: {}",
        config.output.record_empty_descriptions
    );
    match CsvStore::peek_row_count(&config.output.store_path)? {
        Some(rows) => println!("  Rows stored: {}", rows),
        None => println!("  Rows stored: 0 (store will be created)"),
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Store: {}\n", config.output.store_path);

    match load_statistics(Path::new(&config.output.store_path))? {
        Some(stats) => print_statistics(&stats),
        None => println!("No store yet; nothing to report"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    // Checked before any request is made
    let credential = Credential::from_env(&config.extraction.credential_env)?;

    match tidemark::run_crawl(config, &credential).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
