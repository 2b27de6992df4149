//! gofile-relay CLI
//!
//! One invocation is one run; schedule it externally.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use gofile_relay::{
    error::Result,
    models::Config,
    pipeline::{self, RunContext, RunOptions},
    publisher::{DryRunPublisher, Publisher, XPublisher},
    services::{
        BrowserlessRenderer, Collector, HttpLinkProbe, LinkProbe, PageRenderer, Verdict,
    },
    storage::{LocalStateStore, StateStore},
    utils::{Deadline, Fetcher, HttpFetcher},
};

/// gofile-relay - Fresh link relay
#[derive(Parser, Debug)]
#[command(
    name = "gofile-relay",
    version,
    about = "Discovers live gofile links and posts a daily batch"
)]
struct Cli {
    /// Path to storage directory containing config.toml and the state file
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline once
    Run {
        /// Log the post instead of publishing, and leave state untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Collect candidates and print them without probing or saving
    Collect,

    /// Probe links and print their verdicts
    Probe {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show the persisted state
    State,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default(cli.storage_dir.join("config.toml"));
    config.apply_env();
    config
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli);
    let store = LocalStateStore::new(cli.storage_dir.join(&config.run.state_file));

    match cli.command {
        Command::Run { dry_run } => {
            config.validate()?;

            let publisher: Arc<dyn Publisher> = if dry_run {
                Arc::new(DryRunPublisher)
            } else {
                Arc::new(XPublisher::from_env(&config.publisher, &config.http)?)
            };
            let ctx = RunContext::from_config(config, Arc::new(store), publisher)?;
            log::info!("Strategies: {:?}", ctx.collector.kinds());

            let deadline = ctx.deadline();
            match pipeline::run_once(&ctx, Utc::now(), &deadline, RunOptions { dry_run }).await {
                Ok(outcome) => log::info!(
                    "Run finished in {:.1}s: {}",
                    deadline.elapsed().as_secs_f64(),
                    outcome
                ),
                Err(e) => {
                    log::error!("Run failed: {}", e);
                    return Err(e);
                }
            }
        }

        Command::Collect => {
            let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.http)?);
            let renderer =
                BrowserlessRenderer::from_config(&config.http, &config.collector.render)?
                    .map(|r| Arc::new(r) as Arc<dyn PageRenderer>);
            let collector = Collector::from_config(&config, fetcher, renderer)?;

            let seen: HashSet<String> = store.load().await.seen_set();
            let deadline = Deadline::after(Duration::from_secs(config.run.time_budget_secs));
            let collection = collector.collect(&seen, &deadline).await;

            match collection.winner() {
                Some(harvest) => {
                    log::info!(
                        "{:?} found {} candidates",
                        harvest.strategy,
                        harvest.candidates.len()
                    );
                    for candidate in &harvest.candidates {
                        println!("{}", candidate.canonical);
                    }
                }
                None => log::warn!("No strategy found any fresh candidate"),
            }
        }

        Command::Probe { urls } => {
            let probe = HttpLinkProbe::new(&config.http, &config.liveness)?;
            for url in urls {
                let verdict = probe.probe(&url).await;
                println!("{}  {}", url, describe(&verdict));
            }
        }

        Command::State => {
            log::info!("State file: {}", store.path().display());
            match store.try_load().await {
                Ok(Some(state)) => {
                    println!("posted links:    {}", state.posted_urls.len());
                    println!("recent (24h):    {}", state.recent_window.len());
                    println!(
                        "last post date:  {}",
                        state
                            .last_post_date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".into())
                    );
                    println!("posts that day:  {}", state.posts_today);
                    println!("next number:     {}", state.sequence_counter);
                }
                Ok(None) => log::info!("No state yet."),
                Err(e) => log::warn!("State is unreadable: {}", e),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK (strategies: {:?})", config.collector.strategies);
        }
    }

    Ok(())
}

fn describe(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Alive => "alive".to_string(),
        Verdict::Dead(signal) => format!("dead ({signal})"),
        Verdict::Unknown(reason) => format!("unknown ({reason}), postable"),
    }
}
