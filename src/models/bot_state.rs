use chrono::{DateTime, Utc};

/// The sole shared mutable singleton. Enforced at the schema level as the
/// single row `id = 1`; mutated only through atomic DB transactions, never
/// read-then-written in application memory.
#[derive(Debug, Clone)]
pub struct BotState {
    pub bankroll: f64,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub total_pnl: f64,
    pub is_running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub daily_pnl: f64,
    pub daily_pnl_date: String,
}

impl BotState {
    pub fn new(initial_bankroll: f64) -> Self {
        Self {
            bankroll: initial_bankroll,
            total_trades: 0,
            winning_trades: 0,
            total_pnl: 0.0,
            is_running: true,
            last_run: None,
            daily_pnl: 0.0,
            daily_pnl_date: String::new(),
        }
    }

    /// `winning_trades <= total_trades` always.
    pub fn is_consistent(&self) -> bool {
        self.winning_trades <= self.total_trades
    }

    /// Reset the daily P&L counter when the UTC calendar day has rolled over.
    pub fn roll_daily_pnl(&mut self, today: &str) {
        if self.daily_pnl_date != today {
            self.daily_pnl_date = today.to_string();
            self.daily_pnl = 0.0;
        }
    }

    pub fn daily_loss_breached(&self, limit: f64) -> bool {
        -self.daily_pnl >= limit
    }
}
