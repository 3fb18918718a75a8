use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::direction::SettlementOutcome;
use crate::models::window::is_valid_window_slug;
use crate::models::Window;
use crate::venue::VenueClient;

const BASE_URL: &str = "https://gamma-api.polymarket.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GammaClient {
    client: Client,
}

impl GammaClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
        }
    }

    async fn fetch_events_by_slug(&self, slug: &str) -> Option<Vec<Value>> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/events"))
            .query(&[("slug", slug)])
            .send()
            .await
            .inspect_err(|e| tracing::debug!(%slug, error = %e, "gamma slug fetch failed"))
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        resp.json().await.ok()
    }

    async fn fetch_events_filtered(&self, active: Option<bool>, closed: Option<bool>, slug_contains: &str, limit: usize) -> Vec<Value> {
        let mut query: Vec<(&str, String)> = vec![
            ("slug_contains", slug_contains.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(a) = active {
            query.push(("active", a.to_string()));
        }
        if let Some(c) = closed {
            query.push(("closed", c.to_string()));
        }

        let resp = match self.client.get(format!("{BASE_URL}/events")).query(&query).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "gamma series search failed");
                return Vec::new();
            }
        };

        if !resp.status().is_success() {
            return Vec::new();
        }

        resp.json::<Vec<Value>>().await.unwrap_or_default()
    }

    async fn fetch_market_by_id(&self, market_id: &str) -> Option<Value> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/markets/{market_id}"))
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        resp.json().await.ok()
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_event_to_window(event: &Value) -> Option<Window> {
    let markets = event.get("markets")?.as_array()?;
    let market = markets.first()?;

    let (up_price, down_price) = parse_outcome_prices(market).unwrap_or((0.5, 0.5));

    let slug = event.get("slug")?.as_str()?.to_string();
    let start_str = event
        .get("startDate")
        .and_then(|v| v.as_str())
        .or_else(|| market.get("startDate").and_then(|v| v.as_str()));
    let end_str = event
        .get("endDate")
        .and_then(|v| v.as_str())
        .or_else(|| market.get("endDate").and_then(|v| v.as_str()));

    let now = Utc::now();
    let window_start = start_str.and_then(parse_iso).unwrap_or(now);
    let window_end = end_str.and_then(parse_iso).unwrap_or(now);

    let closed = market
        .get("closed")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
        || event.get("closed").and_then(|v| v.as_bool()).unwrap_or(false);

    let market_id = market
        .get("id")
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    let volume_24h = market.get("volume").and_then(|v| v.as_f64()).unwrap_or(0.0);

    Some(Window {
        slug,
        market_id,
        up_price,
        down_price,
        window_start,
        window_end,
        volume_24h,
        closed,
    })
}

fn parse_outcome_prices(market: &Value) -> Option<(f64, f64)> {
    let raw = market.get("outcomePrices")?;
    let prices: Vec<Value> = match raw {
        Value::String(s) => serde_json::from_str(s).ok()?,
        Value::Array(_) => raw.as_array()?.clone(),
        _ => return None,
    };
    if prices.len() < 2 {
        return None;
    }
    let up = parse_price(&prices[0])?;
    let down = parse_price(&prices[1])?;
    Some((up, down))
}

fn parse_price(v: &Value) -> Option<f64> {
    match v {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

fn parse_market_resolution(market: &Value) -> Option<SettlementOutcome> {
    let is_closed = market.get("closed").and_then(|v| v.as_bool()).unwrap_or(false);
    if !is_closed {
        return None;
    }

    let (first_price, _) = parse_outcome_prices(market)?;
    let outcome = SettlementOutcome::from_first_price(first_price);
    if matches!(outcome, SettlementOutcome::Undecided) {
        None
    } else {
        Some(outcome)
    }
}

#[async_trait]
impl VenueClient for GammaClient {
    async fn fetch_by_slug(&self, slug: &str) -> Option<Window> {
        if !is_valid_window_slug(slug) {
            tracing::debug!(%slug, "rejected malformed window slug");
            return None;
        }

        let events = self.fetch_events_by_slug(slug).await?;
        let event = events.first()?;
        parse_event_to_window(event)
    }

    async fn fetch_by_series(&self, slug_contains: &str, limit: usize, include_closed: bool) -> Vec<Window> {
        let closed = if include_closed { None } else { Some(false) };
        let active = if include_closed { None } else { Some(true) };

        self.fetch_events_filtered(active, closed, slug_contains, limit)
            .await
            .iter()
            .filter_map(parse_event_to_window)
            .filter(|w| is_valid_window_slug(&w.slug))
            .collect()
    }

    async fn fetch_resolution(&self, market_id: &str, event_slug: Option<&str>) -> Option<SettlementOutcome> {
        if let Some(slug) = event_slug {
            if let Some(events) = self.fetch_events_by_slug(slug).await {
                if let Some(event) = events.first() {
                    if let Some(market) = event.get("markets").and_then(|m| m.as_array()).and_then(|a| a.first()) {
                        if let Some(outcome) = parse_market_resolution(market) {
                            return Some(outcome);
                        }
                        return None;
                    }
                }
            }
        }

        if let Some(market) = self.fetch_market_by_id(market_id).await {
            if let Some(outcome) = parse_market_resolution(&market) {
                return Some(outcome);
            }
            return None;
        }

        // Last resort: scan both closed and open event pages for this market id.
        for closed in [true, false] {
            let events = self.fetch_events_filtered(None, Some(closed), "", 200).await;
            for event in &events {
                if let Some(markets) = event.get("markets").and_then(|m| m.as_array()) {
                    for market in markets {
                        let id_matches = market
                            .get("id")
                            .map(|v| match v {
                                Value::String(s) => s == market_id,
                                other => other.to_string() == market_id,
                            })
                            .unwrap_or(false);
                        if id_matches {
                            return parse_market_resolution(market);
                        }
                    }
                }
            }
        }

        None
    }
}
