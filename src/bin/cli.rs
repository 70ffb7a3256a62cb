//! Harvester CLI
//!
//! Local execution entry point.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use harvester::{
    error::Result,
    models::Config,
    pipeline::{self, HarvestOptions, ModeRequest},
    services::{PageParser, RetryingFetcher, WhutParser},
    storage::{Artifact, LocalStorage, SnapshotStorage},
    utils::http::HttpFetchClient,
};

/// harvester - Incremental campus news harvester
#[derive(Parser, Debug)]
#[command(name = "harvester", version, about = "Incremental campus news harvester")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Settings that take precedence over the configuration file.
#[derive(Args, Debug)]
struct Overrides {
    /// Site URL prefix
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Comma-separated category identifiers
    #[arg(long, global = true, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Maximum concurrent requests
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Directory holding the snapshot files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(base_url) = self.base_url {
            config.site.base_url = base_url;
        }
        if let Some(categories) = self.categories {
            config.site.categories = categories;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.max_concurrent = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.crawler.timeout_secs = timeout;
        }
        if let Some(data_dir) = self.data_dir {
            config.paths.data_dir = data_dir;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch post lists and contents (update when snapshots exist)
    Run {
        /// Crawl everything even if snapshots exist
        #[arg(long, conflicts_with = "update")]
        full: bool,

        /// Require existing snapshots and fetch only new posts
        #[arg(long)]
        update: bool,

        /// Delete existing snapshots before crawling
        #[arg(long, conflicts_with = "update")]
        force_refetch: bool,

        /// Do not ask before deleting snapshots
        #[arg(short, long, requires = "force_refetch")]
        yes: bool,
    },

    /// Download attachments of stored posts
    Download {
        /// Output directory (default: paths.files_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,

    /// Show stored snapshot info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Ask before `--force-refetch` deletes the snapshots in `data_dir`.
fn confirm_refetch(data_dir: &Path) -> Result<bool> {
    eprint!(
        "This will delete all snapshots in {}, press Enter to continue: ",
        data_dir.display()
    );
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(accepts(&answer))
}

/// An empty line or a yes continues.
fn accepts(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "" | "y" | "yes"
    )
}

fn build_fetcher(config: &Config) -> Result<RetryingFetcher> {
    let client = HttpFetchClient::from_config(&config.crawler)?;
    Ok(RetryingFetcher::from_config(Arc::new(client), &config.crawler))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config);
    init_logging(cli.verbose, &config.logging.level);
    cli.overrides.apply(&mut config);

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let storage = LocalStorage::new(&config.paths.data_dir);

    match cli.command {
        Command::Run {
            full,
            update,
            force_refetch,
            yes,
        } => {
            if force_refetch && !yes && !confirm_refetch(&config.paths.data_dir)? {
                log::info!("Aborted, snapshots left untouched");
                return Ok(());
            }

            let mode = match (full, update) {
                (true, _) => ModeRequest::Full,
                (_, true) => ModeRequest::Update,
                _ => ModeRequest::Auto,
            };
            let options = HarvestOptions {
                mode,
                force_refetch,
            };

            let fetcher = build_fetcher(&config)?;
            let parser: Arc<dyn PageParser> = Arc::new(WhutParser::new()?);
            pipeline::run_harvest(&config, &storage, fetcher, parser, options).await?;
        }

        Command::Download { output } => {
            let output = output.unwrap_or_else(|| config.paths.files_dir.clone());
            let fetcher = build_fetcher(&config)?;
            pipeline::run_download(&config, &storage, fetcher, &output).await?;
        }

        Command::Validate => {
            log::info!("✓ Config OK");
            log::info!("Base URL: {}", config.site.base_url);
            log::info!("Categories: {}", config.site.categories.join(","));
            log::info!(
                "Concurrency: {}, timeout: {}s, attempts: {}, retry delay: {}s",
                config.crawler.max_concurrent,
                config.crawler.timeout_secs,
                config.crawler.max_attempts,
                config.crawler.retry_delay_secs
            );
            log::info!("Data directory: {}", config.paths.data_dir.display());
        }

        Command::Info => {
            log::info!("Data directory: {}", config.paths.data_dir.display());
            for artifact in [Artifact::PostList, Artifact::PostListDiff] {
                match storage.load_lists(artifact).await? {
                    Some(snapshot) => {
                        log::info!("{}: {} posts", artifact.file_name(), snapshot.total());
                        for (category, refs) in snapshot.iter() {
                            log::info!("    {category}: {}", refs.len());
                        }
                    }
                    None => log::info!("{}: not found", artifact.file_name()),
                }
            }
            for artifact in [Artifact::PostContent, Artifact::PostContentDiff] {
                match storage.load_contents(artifact).await? {
                    Some(snapshot) => {
                        log::info!("{}: {} posts", artifact.file_name(), snapshot.total());
                        for (category, details) in snapshot.iter() {
                            log::info!("    {category}: {}", details.len());
                        }
                    }
                    None => log::info!("{}: not found", artifact.file_name()),
                }
            }
        }
    }

    Ok(())
}
