//! services/readerbot/src/bin/readerbot.rs
//!
//! Entry point for one scheduled invocation (e.g. an hourly cron job).

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use readerbot_core::Publisher;
use readerbot_lib::{
    adapters::{LogPublisher, MastodonPublisher, SheetSnapshotSource, SqliteHistoryStore},
    config::{Config, StoreConfig},
    error::BotError,
    run::{Bot, CycleOutcome, RunOptions},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "readerbot", version, about = "Posts reading-list progress on a randomized cadence")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Post even if the cadence gate says it is too soon
    #[arg(long)]
    force: bool,

    /// Pick a post and log it without publishing or recording it
    #[arg(long)]
    dry_run: bool,

    /// Only report when the next post becomes eligible
    #[arg(long)]
    timetable: bool,

    /// Where to publish
    #[arg(long, value_enum, default_value_t = PublisherKind::Log)]
    publisher: PublisherKind,
}

#[derive(Subcommand)]
enum Command {
    /// Write the placeholder post into a fresh history store
    Seed,
}

#[derive(Clone, Copy, ValueEnum)]
enum PublisherKind {
    Log,
    Mastodon,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BotError> {
    let cli = Cli::parse();

    // --- 1. Load Store Configuration & Set Up Logging ---
    let store_config = StoreConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(store_config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 2. Open the History Store & Run Migrations ---
    let connect_options =
        SqliteConnectOptions::from_str(&store_config.database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await?;
    let history = Arc::new(SqliteHistoryStore::new(db_pool));
    history.run_migrations().await?;

    if let Some(Command::Seed) = cli.command {
        if history.seed_if_empty().await? {
            info!("Seeded the posting history with a placeholder post.");
        } else {
            info!("Posting history already has posts; nothing to seed.");
        }
        return Ok(());
    }

    // --- 3. Load the Decision Configuration & Initialize Service Adapters ---
    let config = Config::from_env()?;
    info!("Configuration loaded.");

    let http = reqwest::Client::builder()
        .user_agent(concat!("readerbot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BotError::Internal(e.to_string()))?;

    let source = Arc::new(SheetSnapshotSource::new(http.clone(), config.sheet_url.clone()));

    let publisher: Arc<dyn Publisher> = match cli.publisher {
        PublisherKind::Log => Arc::new(LogPublisher),
        PublisherKind::Mastodon => {
            let mastodon = config.require_mastodon()?;
            Arc::new(MastodonPublisher::new(
                http.clone(),
                mastodon.base_url.clone(),
                mastodon.access_token.clone(),
            ))
        }
    };

    // --- 4. Build the Bot ---
    let bot = Bot {
        history,
        source,
        publisher,
        cadence: config.cadence_policy()?,
        summarizer: config.summarizer()?,
    };

    // --- 5. Decide (and maybe Post) ---
    let now = Utc::now().timestamp();
    if cli.timetable {
        println!("{}", bot.timetable(now).await?);
        return Ok(());
    }

    let options = RunOptions {
        force: cli.force,
        dry_run: cli.dry_run,
    };
    let mut rng = StdRng::from_entropy();
    match bot.run_cycle(now, options, &mut rng).await? {
        CycleOutcome::Declined { reason } => println!("READERBOT_DECLINE\n{}", reason),
        CycleOutcome::DryRun(post) => println!("{}", post.text()),
        CycleOutcome::Published { post, .. } => println!("{}", post.text()),
    }

    Ok(())
}
