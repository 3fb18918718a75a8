use chrono::{DateTime, Utc};

use crate::models::direction::{Direction, TradeResult};

/// A simulated order against one BTC 5-min window. Transitions exactly once
/// from `settled = false` to `settled = true`; once settled, `pnl` and
/// `result` are immutable.
#[derive(Debug, Clone)]
pub struct Trade {
    pub id: Option<i64>,
    pub market_ticker: String,
    pub event_slug: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub size: f64,
    pub timestamp: DateTime<Utc>,

    // Snapshot of the signal that produced this trade.
    pub model_probability: f64,
    pub market_price_at_entry: f64,
    pub edge_at_entry: f64,
    pub signal_id: Option<i64>,

    pub settled: bool,
    pub result: TradeResult,
    pub settlement_value: Option<f64>,
    pub pnl: Option<f64>,
    pub settlement_time: Option<DateTime<Utc>>,
}

impl Trade {
    /// `0 < entry_price < 1` and `size > 0`.
    pub fn is_valid(&self) -> bool {
        self.entry_price > 0.0 && self.entry_price < 1.0 && self.size > 0.0
    }
}

/// Settlement P&L for a trade, given the venue's 0/1 outcome.
///
/// `direction` up wins when `settlement_value == 1.0`; down wins when it is
/// `0.0`. `up`/`down` map internally to `yes`/`no` the way the venue's
/// outcome pairs are laid out (`outcomePrices[0]` is the "up"/"yes" price).
pub fn calculate_pnl(trade: &Trade, settlement_value: f64) -> f64 {
    let pnl = match trade.direction {
        Direction::Up => {
            if settlement_value == 1.0 {
                trade.size * (1.0 - trade.entry_price)
            } else {
                -trade.size * trade.entry_price
            }
        }
        Direction::Down => {
            if settlement_value == 0.0 {
                trade.size * (1.0 - trade.entry_price)
            } else {
                -trade.size * trade.entry_price
            }
        }
    };
    round_cents(pnl)
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
