//! Wikiweave main entry point
//!
//! This is the command-line interface for the Wikiweave link-graph crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wikiweave::config::{load_config, validate_settings, Config, CrawlSettings, SearchAlgo};
use wikiweave::output::{print_summary, summarize};
use wikiweave::state::format_elapsed;
use wikiweave::{CrawlController, CrawlEvent, CrawlStatus, WikiClient};

/// Wikiweave: a live link-graph crawler for online encyclopedias
///
/// Wikiweave follows hyperlinks from a seed article one page at a time and
/// builds a directed graph of everything it discovers. While it runs, type
/// `pause`, `resume` or `stop` (or `p`, `r`, `s`) and press enter.
#[derive(Parser, Debug)]
#[command(name = "wikiweave")]
#[command(version = "1.0.0")]
#[command(about = "A live link-graph crawler for online encyclopedias", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed article title (a random article is picked if unset)
    #[arg(long, value_name = "TITLE")]
    start: Option<String>,

    /// Traversal order: BFS, DFS or RANDOM
    #[arg(long, value_name = "ALGO")]
    algo: Option<SearchAlgo>,

    /// Wiki language code
    #[arg(long, value_name = "CODE")]
    language: Option<String>,

    /// Pause between requests, in seconds
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Skip summaries, categories, references and images
    #[arg(long)]
    no_details: bool,

    /// Stop once this article has been discovered
    #[arg(long, value_name = "TITLE")]
    reach_page: Option<String>,

    /// Stop once the graph holds this many pages
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Stop once a page deeper than this many links is discovered
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Stop after this many seconds of active crawling
    #[arg(long, value_name = "SECONDS")]
    time_limit: Option<f64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the resolved settings without crawling
    #[arg(long)]
    dry_run: bool,
}

/// Interactive commands read from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Stop,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "pause" | "p" => Some(Self::Pause),
            "resume" | "r" => Some(Self::Resume),
            "stop" | "s" | "quit" | "q" => Some(Self::Stop),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    apply_overrides(&cli, &mut config.crawl);
    validate_settings(&config.crawl).context("Invalid crawl settings")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikiweave=info,warn"),
            1 => EnvFilter::new("wikiweave=debug,info"),
            2 => EnvFilter::new("wikiweave=trace,debug"),
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

/// Applies command-line overrides on top of the configured settings
fn apply_overrides(cli: &Cli, settings: &mut CrawlSettings) {
    if let Some(start) = &cli.start {
        settings.start_title = Some(start.clone());
    }
    if let Some(algo) = cli.algo {
        settings.search_algo = algo;
    }
    if let Some(language) = &cli.language {
        settings.language = language.clone();
    }
    if let Some(delay) = cli.delay {
        settings.delay_seconds = delay;
    }
    if cli.no_details {
        settings.load_details = false;
    }
    if let Some(title) = &cli.reach_page {
        settings.stop.reach_page = Some(title.clone());
    }
    if let Some(max) = cli.max_pages {
        settings.stop.max_page = Some(max);
    }
    if let Some(max) = cli.max_depth {
        settings.stop.max_depth = Some(max);
    }
    if let Some(limit) = cli.time_limit {
        settings.stop.time_limit_seconds = Some(limit);
    }
}

/// Handles the --dry-run mode: shows the resolved settings
fn handle_dry_run(config: &Config) {
    let crawl = &config.crawl;
    println!("=== Wikiweave Dry Run ===\n");

    println!("Crawl Settings:");
    println!("  Language: {}", crawl.language);
    println!("  Search algorithm: {}", crawl.search_algo);
    println!("  Delay: {}s", crawl.delay_seconds);
    println!(
        "  Start page: {}",
        crawl.start_title.as_deref().unwrap_or("(random)")
    );
    println!("  Load details: {}", crawl.load_details);

    println!("\nStop Conditions:");
    if crawl.stop.is_empty() {
        println!("  (none, runs until every link is followed)");
    }
    if let Some(title) = &crawl.stop.reach_page {
        println!("  Reach page: {}", title);
    }
    if let Some(max) = crawl.stop.max_page {
        println!("  Max pages: {}", max);
    }
    if let Some(max) = crawl.stop.max_depth {
        println!("  Max depth: {}", max);
    }
    if let Some(limit) = crawl.stop.time_limit_seconds {
        println!("  Time limit: {}s", limit);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let client = WikiClient::new(&config.user_agent).context("Failed to build HTTP client")?;
    let mut controller = CrawlController::new(Arc::new(client));
    let mut events = controller.subscribe();

    controller
        .start(config.crawl)
        .await
        .context("Failed to start crawl")?;

    tracing::info!("Commands: pause (p), resume (r), stop (s); Ctrl-C stops");

    let mut commands = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, stopping");
                break;
            }
            line = commands.recv(), if stdin_open => match line {
                Some(line) => match Command::parse(&line) {
                    Some(Command::Stop) => break,
                    Some(Command::Pause) => {
                        if let Err(e) = controller.pause() {
                            tracing::warn!("{}", e);
                        }
                    }
                    Some(Command::Resume) => {
                        if let Err(e) = controller.resume() {
                            tracing::warn!("{}", e);
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => tracing::warn!("Unknown command '{}'", line.trim()),
                },
                None => stdin_open = false,
            },
            event = events.recv() => {
                if session_ended(event, controller.status()) {
                    break;
                }
            }
        }
    }

    if controller.status().is_active() {
        controller.stop().await.context("Failed to stop crawl")?;
    }

    print_summary(&summarize(&controller));

    if controller.status() == CrawlStatus::Failed {
        bail!("Crawl worker failed");
    }

    Ok(())
}

/// Forwards stdin lines from a dedicated thread
///
/// The thread blocks on stdin and is left behind when the crawl ends.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Handles one receive from the event channel; returns true once the crawl
/// has ended
///
/// Skipped events may include the final one, so after a lag the current
/// status decides.
fn session_ended(received: Result<CrawlEvent, RecvError>, status: CrawlStatus) -> bool {
    match received {
        Ok(event) => log_event(&event),
        Err(RecvError::Lagged(skipped)) => {
            tracing::debug!("Skipped {} progress events", skipped);
            status.is_idle()
        }
        Err(RecvError::Closed) => true,
    }
}

/// Logs a progress event; returns true once the crawl has ended
fn log_event(event: &CrawlEvent) -> bool {
    match event {
        CrawlEvent::StatusChanged(status) => {
            tracing::info!("Status: {}", status);
            *status == CrawlStatus::Failed
        }
        CrawlEvent::ElapsedTimeChanged(elapsed) => {
            tracing::debug!("Elapsed: {}", format_elapsed(*elapsed));
            false
        }
        CrawlEvent::VerticesAdded {
            vertex_count,
            edge_count,
        } => {
            tracing::info!("Graph: {} vertices, {} edges", vertex_count, edge_count);
            false
        }
        CrawlEvent::CrawlDone { reason } => {
            tracing::info!("Crawl finished: {}", reason);
            true
        }
    }
}
