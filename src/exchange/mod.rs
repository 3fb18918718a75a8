pub mod binance;
pub mod bybit;
pub mod coinbase;
pub mod kraken;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::models::CandleSeries;

const CACHE_TTL: Duration = Duration::from_secs(30);

/// A read-only source of recent 1-minute BTC/USD candles. Implementations
/// never return an `Err` to their caller — network and format failures are
/// logged and degrade to `None` so the fallback chain can move to the next
/// source without unwinding the scan.
#[async_trait]
pub trait CandleSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_recent_candles(&self, limit: usize) -> Option<CandleSeries>;
}

/// Orchestrates the venue fallback chain with a short-lived cache so a burst
/// of callers within the same scan tick doesn't multiply outbound requests.
pub struct CandleFeed {
    sources: Vec<Box<dyn CandleSource>>,
    cache: Mutex<Option<(Instant, CandleSeries)>>,
}

impl CandleFeed {
    pub fn new(sources: Vec<Box<dyn CandleSource>>) -> Self {
        Self {
            sources,
            cache: Mutex::new(None),
        }
    }

    /// Binance primary, Coinbase/Kraken/Bybit fallback, in that order.
    pub fn with_default_sources() -> Self {
        Self::new(vec![
            Box::new(binance::BinanceSource::new()),
            Box::new(coinbase::CoinbaseSource::new()),
            Box::new(kraken::KrakenSource::new()),
            Box::new(bybit::BybitSource::new()),
        ])
    }

    fn cached(&self) -> Option<CandleSeries> {
        let guard = self.cache.lock().expect("candle cache mutex poisoned");
        guard.as_ref().and_then(|(at, series)| {
            if at.elapsed() < CACHE_TTL {
                Some(series.clone())
            } else {
                None
            }
        })
    }

    fn store(&self, series: &CandleSeries) {
        let mut guard = self.cache.lock().expect("candle cache mutex poisoned");
        *guard = Some((Instant::now(), series.clone()));
    }

    /// Walk the fallback chain until one source returns a usable series.
    pub async fn fetch(&self, limit: usize) -> Option<CandleSeries> {
        if let Some(series) = self.cached() {
            return Some(series);
        }

        for source in &self.sources {
            match source.fetch_recent_candles(limit).await {
                Some(series) if !series.is_empty() => {
                    self.store(&series);
                    return Some(series);
                }
                Some(_) => {
                    tracing::warn!(source = source.name(), "candle source returned empty series");
                }
                None => {
                    tracing::warn!(source = source.name(), "candle source unavailable");
                }
            }
        }

        tracing::error!("all candle sources exhausted");
        None
    }
}
