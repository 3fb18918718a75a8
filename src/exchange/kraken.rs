use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::exchange::CandleSource;
use crate::models::{Candle, CandleSeries};

const BASE_URL: &str = "https://api.kraken.com/0/public/OHLC";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Second fallback. Kraken's public OHLC endpoint.
pub struct KrakenSource {
    client: Client,
}

impl KrakenSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }
}

impl Default for KrakenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for KrakenSource {
    fn name(&self) -> &str {
        "kraken"
    }

    async fn fetch_recent_candles(&self, limit: usize) -> Option<CandleSeries> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[("pair", "XBTUSD"), ("interval", "1")])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(source = "kraken", error = %e, "request failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(source = "kraken", status = %resp.status(), "non-success response");
            return None;
        }

        let body: Value = resp
            .json()
            .await
            .inspect_err(|e| tracing::warn!(source = "kraken", error = %e, "decode failed"))
            .ok()?;

        if let Some(errors) = body.get("error").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                tracing::warn!(source = "kraken", ?errors, "api returned errors");
                return None;
            }
        }

        let result = body.get("result")?.as_object()?;
        let rows = result
            .iter()
            .find(|(key, _)| key.as_str() != "last")
            .map(|(_, v)| v)?
            .as_array()?;

        // [time, open, high, low, close, vwap, volume, count]
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows.iter().rev().take(limit) {
            let ts = row.get(0)?.as_f64()? as i64;
            let open: f64 = row.get(1)?.as_str()?.parse().ok()?;
            let high: f64 = row.get(2)?.as_str()?.parse().ok()?;
            let low: f64 = row.get(3)?.as_str()?.parse().ok()?;
            let close: f64 = row.get(4)?.as_str()?.parse().ok()?;
            let volume: f64 = row.get(6)?.as_str()?.parse().ok()?;
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
        Some(CandleSeries::new(candles, "kraken"))
    }
}
