//! Listing-Resolver main entry point
//!
//! Command-line front end for resolving classified-ad links and messages to
//! broker contacts.

use clap::{Parser, Subcommand};
use listing_resolver::config::{load_config_with_hash, Config};
use listing_resolver::feed::{spawn_scheduler, FeedCache};
use listing_resolver::fetcher::{
    ChromiumRenderer, FetchSettings, Fetcher, RenderContext, Renderer, StealthProfile,
};
use listing_resolver::site::find_url;
use listing_resolver::{Pipeline, ResolverError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Listing-Resolver: from a classified-ad link to the broker's contact
///
/// Loads the ad page in a headless browser, extracts the site's listing code
/// and looks it up in the property feed.
#[derive(Parser, Debug)]
#[command(name = "listing-resolver")]
#[command(version)]
#[command(about = "Resolve real-estate ads to broker contacts", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch an ad page and print its listing code
    Code {
        /// Ad URL, or a message containing one
        input: String,
    },
    /// Extract a listing code from message text
    Message {
        text: String,
    },
    /// Print the feed contact for a listing code
    Contact {
        code: String,
    },
    /// Resolve a URL or message all the way to a contact
    Resolve {
        input: String,
    },
    /// Resolve one input per stdin line, keeping the feed refreshed
    Batch,
}

impl Command {
    fn needs_browser(&self) -> bool {
        match self {
            Self::Code { .. } | Self::Batch => true,
            Self::Resolve { input } => find_url(input).is_ok(),
            Self::Message { .. } | Self::Contact { .. } => false,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return report(&ResolverError::from(e));
        }
    };

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => report(&e),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_resolver=info,warn"),
            1 => EnvFilter::new("listing_resolver=debug,info"),
            2 => EnvFilter::new("listing_resolver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints a structured failure and picks the exit status
fn report(error: &ResolverError) -> ExitCode {
    eprintln!("error[{}]: {}", error.kind(), error);
    ExitCode::FAILURE
}

async fn run(command: Command, config: Config) -> Result<ExitCode, ResolverError> {
    let feed = Arc::new(FeedCache::from_config(&config.feed)?);

    let renderer = if command.needs_browser() {
        let renderer = ChromiumRenderer::launch(&config.fetcher)
            .await
            .map_err(|e| ResolverError::Browser(format!("{e:#}")))?;
        Some(Arc::new(renderer))
    } else {
        None
    };

    let handle: Arc<dyn Renderer> = match &renderer {
        Some(renderer) => Arc::clone(renderer) as Arc<dyn Renderer>,
        None => Arc::new(NoBrowser) as Arc<dyn Renderer>,
    };
    let fetcher = Fetcher::new(handle, FetchSettings::from(&config.fetcher));
    let pipeline = Pipeline::new(fetcher, Arc::clone(&feed));

    let outcome = match command {
        Command::Code { input } => pipeline.resolve_from_url(&input).await.map(|code| {
            println!("{}", code);
            ExitCode::SUCCESS
        }),
        Command::Message { text } => pipeline.resolve_from_message(&text).map(|code| {
            println!("{}", code);
            ExitCode::SUCCESS
        }),
        Command::Contact { code } => pipeline.get_contact(&code).await.map(|contact| {
            print_contact(&code, &contact);
            ExitCode::SUCCESS
        }),
        Command::Resolve { input } => pipeline.resolve_contact(&input).await.map(|(code, contact)| {
            print_contact(code.as_str(), &contact);
            ExitCode::SUCCESS
        }),
        Command::Batch => run_batch(&pipeline, &config).await,
    };

    drop(pipeline);
    if let Some(renderer) = renderer.and_then(|r| Arc::try_unwrap(r).ok()) {
        renderer.shutdown().await;
    }

    outcome
}

fn print_contact(code: &str, contact: &listing_resolver::ContactRecord) {
    println!("code  = {}", code);
    println!("name  = {}", contact.name);
    println!("email = {}", contact.email);
    println!("phone = {}", contact.phone);
}

/// Long-running mode: warm the feed, start the scheduler, then serve stdin
async fn run_batch(pipeline: &Pipeline, config: &Config) -> Result<ExitCode, ResolverError> {
    let times = config.feed.parsed_refresh_times()?;

    if let Err(e) = pipeline.feed().warm_up().await {
        tracing::warn!("Feed warm-up failed, will retry on demand: {}", e);
    }
    let scheduler = spawn_scheduler(Arc::clone(pipeline.feed()), times);

    let mut failures = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match pipeline.resolve_contact(input).await {
            Ok((code, contact)) => println!(
                "{}\t{}\t{}\t{}",
                code, contact.name, contact.email, contact.phone
            ),
            Err(e) => {
                failures += 1;
                println!("error[{}]\t{}", e.kind(), e);
            }
        }
    }

    scheduler.abort();
    tracing::info!("Batch finished with {} failure(s)", failures);

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Renderer for commands that never load pages
struct NoBrowser;

#[async_trait::async_trait]
impl Renderer for NoBrowser {
    async fn new_context(&self, _profile: &StealthProfile) -> anyhow::Result<Box<dyn RenderContext>> {
        anyhow::bail!("browser not started for this command")
    }
}
