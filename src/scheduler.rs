use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::SharedConfig;
use crate::core::engine::generate_signals;
use crate::exchange::CandleFeed;
use crate::models::{BotState, Direction, EventKind, Signal, Trade, TradeResult};
use crate::persistence::Store;
use crate::settlement::run_settlement_cycle;
use crate::venue::window_catalog::fetch_active_windows;
use crate::venue::VenueClient;

const EVENT_LOG_CAPACITY: usize = 200;
const CANDLE_LOOKBACK: usize = 60;

#[derive(Debug, Clone)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub message: String,
    pub data: Option<Value>,
}

/// Owns the three recurring jobs (scan-and-trade, settle, heartbeat),
/// enforcing at-most-one-in-flight per job via a per-job `AtomicBool`
/// guard rather than a queue: a tick that finds its job still running
/// is skipped, not buffered.
pub struct Scheduler {
    config: SharedConfig,
    store: Store,
    candles: Arc<CandleFeed>,
    venue: Arc<dyn VenueClient>,
    events: Mutex<VecDeque<Event>>,
    scan_busy: AtomicBool,
    settle_busy: AtomicBool,
    heartbeat_busy: AtomicBool,
}

impl Scheduler {
    pub fn new(config: SharedConfig, store: Store, candles: Arc<CandleFeed>, venue: Arc<dyn VenueClient>) -> Self {
        Self {
            config,
            store,
            candles,
            venue,
            events: Mutex::new(VecDeque::with_capacity(EVENT_LOG_CAPACITY)),
            scan_busy: AtomicBool::new(false),
            settle_busy: AtomicBool::new(false),
            heartbeat_busy: AtomicBool::new(false),
        }
    }

    async fn push_event(&self, kind: EventKind, message: impl Into<String>, data: Option<Value>) {
        let mut events = self.events.lock().await;
        if events.len() == EVENT_LOG_CAPACITY {
            events.pop_front();
        }
        events.push_back(Event {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            data,
        });
    }

    pub async fn recent_events(&self, limit: usize) -> Vec<Event> {
        let events = self.events.lock().await;
        events.iter().rev().take(limit).cloned().collect()
    }

    pub async fn state_snapshot(&self) -> anyhow::Result<BotState> {
        Ok(self.store.get_state().await?)
    }

    /// Main run loop: a single immediate scan dispatched at startup, then
    /// three independently-ticking intervals plus a `ctrl_c` shutdown branch.
    pub async fn run(self: Arc<Self>) {
        self.push_event(EventKind::Info, "scheduler starting", None).await;

        let this = self.clone();
        tokio::spawn(async move { this.run_scan_and_trade().await });

        let mut scan_tick = interval(Duration::from_secs(self.config.scan_interval_seconds));
        scan_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut settle_tick = interval(Duration::from_secs(self.config.settlement_interval_seconds));
        settle_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut heartbeat_tick = interval(Duration::from_secs(self.config.heartbeat_interval_seconds));
        heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.shutdown().await;
                    return;
                }
                _ = scan_tick.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move { this.run_scan_and_trade().await });
                }
                _ = settle_tick.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move { this.run_settle().await });
                }
                _ = heartbeat_tick.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move { this.run_heartbeat().await });
                }
            }
        }
    }

    async fn shutdown(&self) {
        tracing::info!("shutdown signal received");
        if let Err(e) = self.store.set_running(false, Utc::now()).await {
            tracing::error!(error = %e, "failed to persist shutdown state");
        }
        if let Ok(state) = self.store.get_state().await {
            tracing::info!(
                bankroll = state.bankroll,
                total_trades = state.total_trades,
                total_pnl = state.total_pnl,
                "final state"
            );
        }
        self.push_event(EventKind::Info, "scheduler stopped", None).await;
    }

    async fn run_heartbeat(&self) {
        if self.heartbeat_busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            tracing::debug!("heartbeat already in flight, skipping tick");
            return;
        }

        self.push_event(EventKind::Info, "heartbeat", None).await;
        tracing::debug!("heartbeat");

        self.heartbeat_busy.store(false, Ordering::SeqCst);
    }

    async fn run_settle(&self) {
        if self.settle_busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            tracing::debug!("settlement already in flight, skipping tick");
            return;
        }

        match run_settlement_cycle(&self.store, self.venue.as_ref()).await {
            Ok(count) if count > 0 => {
                self.push_event(EventKind::Trade, format!("settled {count} trades"), None).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "settlement cycle failed");
                self.push_event(EventKind::Error, format!("settlement cycle failed: {e}"), None).await;
            }
        }

        self.settle_busy.store(false, Ordering::SeqCst);
    }

    async fn run_scan_and_trade(&self) {
        if self.scan_busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            tracing::debug!("scan already in flight, skipping tick");
            return;
        }

        if let Err(e) = self.scan_and_trade().await {
            tracing::error!(error = %e, "scan-and-trade cycle failed");
            self.push_event(EventKind::Error, format!("scan cycle failed: {e}"), None).await;
        }

        self.scan_busy.store(false, Ordering::SeqCst);
    }

    async fn scan_and_trade(&self) -> anyhow::Result<()> {
        let series = match self.candles.fetch(CANDLE_LOOKBACK).await {
            Some(s) => s,
            None => {
                self.push_event(EventKind::Warning, "no candle source available", None).await;
                return Ok(());
            }
        };

        let micro = match crate::core::indicators::compute_microstructure(&series) {
            Some(m) => m,
            None => {
                self.push_event(EventKind::Warning, "insufficient candles for indicators", None).await;
                return Ok(());
            }
        };

        let windows = fetch_active_windows(self.venue.as_ref()).await;
        if windows.is_empty() {
            self.push_event(EventKind::Data, "no active windows found", None).await;
            return Ok(());
        }

        let now = Utc::now();
        let signals = generate_signals(&windows, &micro, &series.source, &self.config, now);

        self.push_event(EventKind::Data, format!("scanned {} windows, {} signals", windows.len(), signals.len()), None).await;

        let mut executed_this_scan = 0usize;

        for mut signal in signals {
            match self.store.insert_signal_if_new(&signal).await {
                Ok(Some(id)) => signal.id = Some(id),
                Ok(None) => continue, // duplicate for this (market, minute)
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist signal");
                    continue;
                }
            }

            if executed_this_scan >= self.config.max_trades_per_scan {
                break;
            }

            if !signal.passes_threshold(self.config.min_edge_threshold) {
                continue;
            }

            match self.try_execute(&signal, &windows, now).await {
                Ok(true) => executed_this_scan += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, "failed to execute trade"),
            }
        }

        Ok(())
    }

    /// Apply the scheduler-boundary filters from the sizing & exposure gate
    /// and insert a trade if everything clears. Returns whether a trade was
    /// inserted.
    async fn try_execute(&self, signal: &Signal, windows: &[crate::models::Window], now: DateTime<Utc>) -> anyhow::Result<bool> {
        let state = self.store.get_state().await?;
        if !state.is_running {
            return Ok(false);
        }
        if state.daily_loss_breached(self.config.daily_loss_limit) {
            return Ok(false);
        }
        if state.bankroll < self.config.min_trade_size {
            return Ok(false);
        }

        let unsettled_total = self.store.count_unsettled().await?;
        if unsettled_total >= self.config.max_total_pending_trades as i64 {
            return Ok(false);
        }

        let Some(window) = windows.iter().find(|w| w.market_id == signal.market_id) else {
            return Ok(false);
        };

        let unsettled_for_slug = self.store.count_unsettled_for_slug(&window.slug).await?;
        if unsettled_for_slug >= self.config.max_trades_per_window as i64 {
            return Ok(false);
        }

        let entry_price = match signal.direction {
            Direction::Up => window.up_price,
            Direction::Down => window.down_price,
        };

        let size = signal
            .suggested_size
            .max(self.config.min_trade_size)
            .min(state.bankroll * self.config.max_trade_fraction);

        let trade = Trade {
            id: None,
            market_ticker: window.market_id.clone(),
            event_slug: window.slug.clone(),
            direction: signal.direction,
            entry_price,
            size,
            timestamp: now,
            model_probability: signal.model_probability,
            market_price_at_entry: entry_price,
            edge_at_entry: signal.edge,
            signal_id: signal.id,
            settled: false,
            result: TradeResult::Pending,
            settlement_value: None,
            pnl: None,
            settlement_time: None,
        };

        self.store.insert_trade(&trade).await?;
        self.push_event(
            EventKind::Trade,
            format!("opened {} {} @ {:.2} size ${:.2}", window.slug, signal.direction, entry_price, size),
            None,
        )
        .await;

        Ok(true)
    }
}
