use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use updown_bot::config::Config;
use updown_bot::exchange::CandleFeed;
use updown_bot::persistence::Store;
use updown_bot::scheduler::Scheduler;
use updown_bot::venue::gamma::GammaClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let store = Store::open(&cfg.database_url, cfg.initial_bankroll)?;
    let candles = Arc::new(CandleFeed::with_default_sources());
    let venue = Arc::new(GammaClient::new());
    let shared_config = cfg.shared();

    tracing::info!(
        bankroll = shared_config.initial_bankroll,
        scan_interval = shared_config.scan_interval_seconds,
        "starting up-down bot"
    );

    let scheduler = Arc::new(Scheduler::new(shared_config, store, candles, venue));
    scheduler.run().await;

    Ok(())
}
