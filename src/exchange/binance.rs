use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::exchange::CandleSource;
use crate::models::{Candle, CandleSeries};

const BASE_URL: &str = "https://api.binance.com/api/v3/klines";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Primary candle source. Public `klines` endpoint, no authentication.
pub struct BinanceSource {
    client: Client,
}

impl BinanceSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }
}

impl Default for BinanceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for BinanceSource {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_recent_candles(&self, limit: usize) -> Option<CandleSeries> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("symbol", "BTCUSDT"),
                ("interval", "1m"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(source = "binance", error = %e, "request failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(source = "binance", status = %resp.status(), "non-success response");
            return None;
        }

        let rows: Vec<Value> = resp
            .json()
            .await
            .inspect_err(|e| tracing::warn!(source = "binance", error = %e, "decode failed"))
            .ok()?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            let open_ms = row.get(0)?.as_i64()?;
            let open: f64 = row.get(1)?.as_str()?.parse().ok()?;
            let high: f64 = row.get(2)?.as_str()?.parse().ok()?;
            let low: f64 = row.get(3)?.as_str()?.parse().ok()?;
            let close: f64 = row.get(4)?.as_str()?.parse().ok()?;
            let volume: f64 = row.get(5)?.as_str()?.parse().ok()?;
            let open_time: DateTime<Utc> = DateTime::from_timestamp_millis(open_ms)?;
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
        Some(CandleSeries::new(candles, "binance"))
    }
}
