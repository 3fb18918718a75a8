use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use updown_bot::exchange::CandleSource;
use updown_bot::models::{Candle, CandleSeries, SettlementOutcome, Window};
use updown_bot::venue::VenueClient;

/// Create candles from (open, high, low, close) tuples with auto-incrementing
/// 1-minute timestamps, named and tagged the way a real exchange source would.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z").unwrap().with_timezone(&Utc);
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            open_time: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(candles, "mock")
}

/// n candles climbing steadily from `start` to `end`.
pub fn make_trend_candles(n: usize, start: f64, end: f64) -> CandleSeries {
    let step = (end - start) / n.max(1) as f64;
    let data: Vec<(f64, f64, f64, f64)> = (0..n)
        .map(|i| {
            let open = start + step * i as f64;
            let close = start + step * (i as f64 + 1.0);
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_candles(&data)
}

/// A `CandleSource` backed by a fixed series, standing in for a live exchange.
pub struct MockCandleSource {
    series: CandleSeries,
}

impl MockCandleSource {
    pub fn new(series: CandleSeries) -> Self {
        Self { series }
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_recent_candles(&self, limit: usize) -> Option<CandleSeries> {
        Some(CandleSeries::new(self.series.tail(limit).to_vec(), "mock"))
    }
}

/// A `VenueClient` backed by a fixed window list and a queued resolution,
/// standing in for the Gamma API during wiring tests.
pub struct MockVenueClient {
    windows: Vec<Window>,
    resolution: Mutex<Option<SettlementOutcome>>,
}

impl MockVenueClient {
    pub fn new(windows: Vec<Window>, resolution: Option<SettlementOutcome>) -> Self {
        Self {
            windows,
            resolution: Mutex::new(resolution),
        }
    }
}

#[async_trait]
impl VenueClient for MockVenueClient {
    async fn fetch_by_slug(&self, slug: &str) -> Option<Window> {
        self.windows.iter().find(|w| w.slug == slug).cloned()
    }

    async fn fetch_by_series(&self, slug_contains: &str, _limit: usize, _include_closed: bool) -> Vec<Window> {
        self.windows.iter().filter(|w| w.slug.contains(slug_contains)).cloned().collect()
    }

    async fn fetch_resolution(&self, _market_id: &str, _event_slug: Option<&str>) -> Option<SettlementOutcome> {
        *self.resolution.lock().unwrap()
    }
}
