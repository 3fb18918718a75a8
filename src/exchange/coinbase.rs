use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::exchange::CandleSource;
use crate::models::{Candle, CandleSeries};

const BASE_URL: &str = "https://api.exchange.coinbase.com/products/BTC-USD/candles";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// First fallback. Coinbase's public Exchange candles endpoint — unlike the
/// authenticated Advanced Trade API, this one needs no JWT.
pub struct CoinbaseSource {
    client: Client,
}

impl CoinbaseSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent("updown-bot/0.1")
                .build()
                .expect("reqwest client"),
        }
    }
}

impl Default for CoinbaseSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for CoinbaseSource {
    fn name(&self) -> &str {
        "coinbase"
    }

    async fn fetch_recent_candles(&self, limit: usize) -> Option<CandleSeries> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[("granularity", "60"), ("limit", &limit.to_string())])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(source = "coinbase", error = %e, "request failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(source = "coinbase", status = %resp.status(), "non-success response");
            return None;
        }

        let rows: Vec<Value> = resp
            .json()
            .await
            .inspect_err(|e| tracing::warn!(source = "coinbase", error = %e, "decode failed"))
            .ok()?;

        // [time, low, high, open, close, volume], newest first.
        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            let ts = row.get(0)?.as_i64()?;
            let low = row.get(1)?.as_f64()?;
            let high = row.get(2)?.as_f64()?;
            let open = row.get(3)?.as_f64()?;
            let close = row.get(4)?.as_f64()?;
            let volume = row.get(5)?.as_f64()?;
            let open_time = DateTime::from_timestamp(ts, 0)?;
            candles.push(Candle {
                open_time,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        candles.sort_by_key(|c| c.open_time);
        Some(CandleSeries::new(candles, "coinbase"))
    }
}
