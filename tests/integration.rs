mod common;

use chrono::{Duration, Utc};

use common::{make_candles, make_trend_candles, MockCandleSource, MockVenueClient};
use updown_bot::config::Config;
use updown_bot::core::engine::generate_signals;
use updown_bot::core::indicators::compute_microstructure;
use updown_bot::exchange::CandleFeed;
use updown_bot::models::{Direction, SettlementOutcome, TradeResult, Window};
use updown_bot::persistence::Store;
use updown_bot::settlement::run_settlement_cycle;

fn test_config() -> Config {
    let mut cfg = Config::from_env();
    cfg.initial_bankroll = 10_000.0;
    cfg.min_edge_threshold = 0.03;
    cfg.max_entry_price = 0.48;
    cfg.min_time_remaining = 60;
    cfg.max_time_remaining = 270;
    cfg.database_url = ":memory:".into();
    cfg
}

fn active_window(slug: &str, up_price: f64, seconds_remaining: i64) -> Window {
    let now = Utc::now();
    Window {
        slug: slug.to_string(),
        market_id: "m-integration".into(),
        up_price,
        down_price: 1.0 - up_price,
        window_start: now - Duration::seconds(300 - seconds_remaining),
        window_end: now + Duration::seconds(seconds_remaining),
        volume_24h: 5_000.0,
        closed: false,
    }
}

/// Scan a trending candle series against one favorable window, persist the
/// resulting signal and trade, then settle it as a win, wiring the engine,
/// the store, and the settlement reconciler together.
#[tokio::test]
async fn full_scan_to_settle_cycle_records_a_win() {
    let config = test_config();
    let series = make_trend_candles(20, 50_000.0, 50_200.0);
    let micro = compute_microstructure(&series).expect("enough candles for indicators");

    let window = active_window("btc-updown-5m-1700000400", 0.45, 150);
    let signals = generate_signals(&[window.clone()], &micro, "mock", &config, Utc::now());
    let signal = &signals[0];
    assert_eq!(signal.direction, Direction::Up);
    assert!(signal.passes_threshold(config.min_edge_threshold), "edge={}", signal.edge);

    let store = Store::open(&config.database_url, config.initial_bankroll).unwrap();
    let signal_id = store.insert_signal_if_new(signal).await.unwrap().expect("first insert for this minute");

    let trade = updown_bot::models::Trade {
        id: None,
        market_ticker: window.market_id.clone(),
        event_slug: window.slug.clone(),
        direction: signal.direction,
        entry_price: window.up_price,
        size: signal.suggested_size.max(config.min_trade_size),
        timestamp: Utc::now(),
        model_probability: signal.model_probability,
        market_price_at_entry: window.up_price,
        edge_at_entry: signal.edge,
        signal_id: Some(signal_id),
        settled: false,
        result: TradeResult::Pending,
        settlement_value: None,
        pnl: None,
        settlement_time: None,
    };
    store.insert_trade(&trade).await.unwrap();
    assert_eq!(store.count_unsettled().await.unwrap(), 1);

    let venue = MockVenueClient::new(vec![window.clone()], Some(SettlementOutcome::Up));
    let settled_count = run_settlement_cycle(&store, &venue).await.unwrap();
    assert_eq!(settled_count, 1);

    let state = store.get_state().await.unwrap();
    assert!(state.bankroll > config.initial_bankroll, "bankroll should grow after a win");
    assert_eq!(state.winning_trades, 1);
    assert_eq!(store.count_unsettled().await.unwrap(), 0);
}

/// A window whose price already reflects the model's view produces no
/// tradeable edge, so nothing should ever reach the store.
#[tokio::test]
async fn flat_market_produces_no_signal_worth_persisting() {
    let config = test_config();
    let series = make_trend_candles(20, 50_000.0, 50_000.0);
    let micro = compute_microstructure(&series).unwrap();
    let window = active_window("btc-updown-5m-1700000700", 0.50, 150);

    let signals = generate_signals(&[window], &micro, "mock", &config, Utc::now());
    assert!(!signals[0].passes_threshold(config.min_edge_threshold));
}

/// A second signal for the same market within the same minute is rejected at
/// the store boundary, independent of whatever the engine recomputes.
#[tokio::test]
async fn rescanning_within_the_same_minute_does_not_duplicate_a_signal() {
    let config = test_config();
    let series = make_trend_candles(20, 50_000.0, 50_200.0);
    let micro = compute_microstructure(&series).unwrap();
    let window = active_window("btc-updown-5m-1700001000", 0.45, 150);

    let now = Utc::now();
    let signals = generate_signals(&[window], &micro, "mock", &config, now);
    let signal = &signals[0];

    let store = Store::open(":memory:", config.initial_bankroll).unwrap();
    let first = store.insert_signal_if_new(signal).await.unwrap();
    let second = store.insert_signal_if_new(signal).await.unwrap();
    assert!(first.is_some());
    assert!(second.is_none());
}

/// An undecided resolution defers settlement and leaves bankroll untouched.
#[tokio::test]
async fn undecided_resolution_leaves_trade_pending() {
    let config = test_config();
    let window = active_window("btc-updown-5m-1700001300", 0.40, 150);

    let store = Store::open(":memory:", config.initial_bankroll).unwrap();
    let trade = updown_bot::models::Trade {
        id: None,
        market_ticker: window.market_id.clone(),
        event_slug: window.slug.clone(),
        direction: Direction::Up,
        entry_price: 0.40,
        size: 50.0,
        timestamp: Utc::now() - Duration::minutes(6),
        model_probability: 0.55,
        market_price_at_entry: 0.40,
        edge_at_entry: 0.05,
        signal_id: None,
        settled: false,
        result: TradeResult::Pending,
        settlement_value: None,
        pnl: None,
        settlement_time: None,
    };
    store.insert_trade(&trade).await.unwrap();

    let venue = MockVenueClient::new(vec![window], Some(SettlementOutcome::Undecided));
    let settled_count = run_settlement_cycle(&store, &venue).await.unwrap();
    assert_eq!(settled_count, 0);
    assert_eq!(store.count_unsettled().await.unwrap(), 1);

    let state = store.get_state().await.unwrap();
    assert!((state.bankroll - config.initial_bankroll).abs() < 1e-9);
}

/// A failing primary candle source doesn't sink the scan: the feed walks to
/// the next source in the chain.
#[tokio::test]
async fn candle_feed_falls_back_to_next_source_when_first_is_empty() {
    let unavailable = MockCandleSource::new(make_candles(&[]));
    let backup = MockCandleSource::new(make_candles(&[(100.0, 101.0, 99.0, 100.5)]));
    let feed = CandleFeed::new(vec![Box::new(unavailable), Box::new(backup)]);

    let series = feed.fetch(10).await.expect("backup source should serve candles");
    assert_eq!(series.len(), 1);
}
