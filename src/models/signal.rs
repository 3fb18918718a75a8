use chrono::{DateTime, Utc};

use crate::models::direction::Direction;

/// A trading signal for one BTC 5-min window, produced on every scan.
/// Persisted exactly once per `(market_id, minute_floor(timestamp))`.
#[derive(Debug, Clone)]
pub struct Signal {
    pub id: Option<i64>,
    pub market_id: String,
    pub venue: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub model_probability: f64,
    pub market_price: f64,
    pub edge: f64,
    pub confidence: f64,
    pub kelly_fraction: f64,
    pub suggested_size: f64,
    pub sources: Vec<String>,
    pub reasoning: String,
    pub executed: bool,

    // Filled in by the settlement reconciler once the window resolves.
    pub actual_outcome: Option<Direction>,
    pub outcome_correct: Option<bool>,
    pub settlement_value: Option<f64>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// Minute-truncated timestamp used as the dedup key alongside `market_id`.
    pub fn minute_floor(&self) -> DateTime<Utc> {
        minute_floor(self.timestamp)
    }

    pub fn passes_threshold(&self, min_edge: f64) -> bool {
        self.edge.abs() >= min_edge
    }
}

pub fn minute_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts - chrono::Duration::seconds(ts.timestamp() % 60) - chrono::Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn minute_floor_truncates_seconds() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 10, 15, 47).unwrap();
        let floored = minute_floor(ts);
        assert_eq!(floored, Utc.with_ymd_and_hms(2026, 1, 1, 10, 15, 0).unwrap());
    }
}
