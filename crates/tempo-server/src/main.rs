use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use tempo_core::TempoConfig;
use tempo_scheduler::Scheduler;
use tempo_store::{FeedConsumer, HttpSearch, HttpStore, ObjectStore, SearchIndex};

/// Change-feed-driven schedule trigger service.
#[derive(Debug, Parser)]
#[command(name = "tempo-server", version, about)]
struct Args {
    /// Path to tempo.toml (defaults to ~/.tempo/tempo.toml).
    #[arg(long)]
    config: Option<String>,

    /// Collapse every cadence to near-immediate firing. Never use this
    /// against production data: one-shot schedules are deleted right
    /// after their accelerated fire.
    #[arg(long)]
    test_mode: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempo_server=info,tempo_scheduler=info,tempo_store=info".into()),
        )
        .init();

    let args = Args::parse();

    // config: explicit flag > TEMPO_CONFIG env > ~/.tempo/tempo.toml
    let config_path = args
        .config
        .or_else(|| std::env::var("TEMPO_CONFIG").ok());
    let config = TempoConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        TempoConfig::default()
    });
    let fast_mode = args.test_mode || config.test_mode;

    let store: Arc<dyn ObjectStore> =
        Arc::new(HttpStore::new(&config.store).context("object store client")?);
    let search: Arc<dyn SearchIndex> = Arc::new(HttpSearch::new(config.search_base_url()));
    let scheduler = Arc::new(Scheduler::new(store, search, fast_mode));

    // The feed subscription is the only fatal bootstrap step: without
    // it the registry would silently drift from the stored schedules.
    let mut feed = FeedConsumer::new(config.feed_base_url(), &config.feed);
    feed.connect()
        .await
        .context("change feed subscription failed — not starting")?;

    let (feed_tx, feed_rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(feed.run(feed_tx));
    let bridge = Arc::clone(&scheduler);
    tokio::spawn(async move { bridge.run_bridge(feed_rx).await });

    info!("scheduler started");
    if fast_mode {
        warn!("scheduler started in test mode");
    }

    // Rebuild the registry from stored state. The bridge is already
    // live; its events win over reconciliation because the shared
    // pipeline treats id ownership as exclusive.
    scheduler.reconcile_all().await;

    tokio::signal::ctrl_c().await?;
    info!("shutting down — stopping all triggers");
    scheduler.clear();
    Ok(())
}
