use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::exchange::CandleSource;
use crate::models::{Candle, CandleSeries};

const BASE_URL: &str = "https://api.bybit.com/v5/market/kline";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Last-resort fallback. Bybit's public spot kline endpoint.
pub struct BybitSource {
    client: Client,
}

impl BybitSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }
}

impl Default for BybitSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for BybitSource {
    fn name(&self) -> &str {
        "bybit"
    }

    async fn fetch_recent_candles(&self, limit: usize) -> Option<CandleSeries> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("category", "spot"),
                ("symbol", "BTCUSDT"),
                ("interval", "1"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(source = "bybit", error = %e, "request failed"))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!(source = "bybit", status = %resp.status(), "non-success response");
            return None;
        }

        let body: Value = resp
            .json()
            .await
            .inspect_err(|e| tracing::warn!(source = "bybit", error = %e, "decode failed"))
            .ok()?;

        let ret_code = body.get("retCode")?.as_i64()?;
        if ret_code != 0 {
            tracing::warn!(source = "bybit", ret_code, "api returned non-zero retCode");
            return None;
        }

        let rows = body.get("result")?.get("list")?.as_array()?;

        // [startTime, open, high, low, close, volume, turnover], newest first.
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let ts: i64 = row.get(0)?.as_str()?.parse().ok()?;
            let open: f64 = row.get(1)?.as_str()?.parse().ok()?;
            let high: f64 = row.get(2)?.as_str()?.parse().ok()?;
            let low: f64 = row.get(3)?.as_str()?.parse().ok()?;
            let close: f64 = row.get(4)?.as_str()?.parse().ok()?;
            let volume: f64 = row.get(5)?.as_str()?.parse().ok()?;
            let open_time = DateTime::from_timestamp_millis(ts)?;
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
        Some(CandleSeries::new(candles, "bybit"))
    }
}
