use std::sync::Arc;

/// Immutable settings loaded once from the environment at startup. Nothing in
/// this crate mutates configuration at runtime — there is no self-learning
/// refiner in scope — so it is shared by reference (`Arc<Config>`) rather
/// than behind a lock.
pub type SharedConfig = Arc<Config>;

#[derive(Debug, Clone)]
pub struct Config {
    // Bankroll & sizing
    pub initial_bankroll: f64,
    pub kelly_fraction: f64,
    pub max_trade_fraction: f64,
    pub max_trade_size: f64,
    pub min_trade_size: f64,

    // Entry filters
    pub min_edge_threshold: f64,
    pub max_entry_price: f64,
    pub min_time_remaining: i64,
    pub max_time_remaining: i64,

    // Exposure & risk
    pub max_total_pending_trades: usize,
    pub max_trades_per_window: usize,
    pub max_trades_per_scan: usize,
    pub daily_loss_limit: f64,

    // Composite weights (must sum to 1.0)
    pub weight_rsi: f64,
    pub weight_momentum: f64,
    pub weight_vwap: f64,
    pub weight_sma: f64,
    pub weight_market_skew: f64,

    // Job cadence
    pub scan_interval_seconds: u64,
    pub settlement_interval_seconds: u64,
    pub heartbeat_interval_seconds: u64,

    // Infrastructure
    pub database_url: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env_f64 = |key: &str, default: f64| -> f64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        let env_i64 = |key: &str, default: i64| -> i64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        let env_usize = |key: &str, default: usize| -> usize {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        let env_u64 = |key: &str, default: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        let env_string = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let cfg = Config {
            initial_bankroll: env_f64("INITIAL_BANKROLL", 10_000.0),
            kelly_fraction: env_f64("KELLY_FRACTION", 0.25),
            max_trade_fraction: env_f64("MAX_TRADE_FRACTION", 0.03),
            max_trade_size: env_f64("MAX_TRADE_SIZE", 250.0),
            min_trade_size: env_f64("MIN_TRADE_SIZE", 10.0),

            min_edge_threshold: env_f64("MIN_EDGE_THRESHOLD", 0.03),
            max_entry_price: env_f64("MAX_ENTRY_PRICE", 0.48),
            min_time_remaining: env_i64("MIN_TIME_REMAINING", 60),
            max_time_remaining: env_i64("MAX_TIME_REMAINING", 270),

            max_total_pending_trades: env_usize("MAX_TOTAL_PENDING_TRADES", 20),
            max_trades_per_window: env_usize("MAX_TRADES_PER_WINDOW", 1),
            max_trades_per_scan: env_usize("MAX_TRADES_PER_SCAN", 3),
            daily_loss_limit: env_f64("DAILY_LOSS_LIMIT", 300.0),

            weight_rsi: env_f64("WEIGHT_RSI", 0.20),
            weight_momentum: env_f64("WEIGHT_MOMENTUM", 0.35),
            weight_vwap: env_f64("WEIGHT_VWAP", 0.20),
            weight_sma: env_f64("WEIGHT_SMA", 0.15),
            weight_market_skew: env_f64("WEIGHT_MARKET_SKEW", 0.10),

            scan_interval_seconds: env_u64("SCAN_INTERVAL_SECONDS", 60),
            settlement_interval_seconds: env_u64("SETTLEMENT_INTERVAL_SECONDS", 120),
            heartbeat_interval_seconds: env_u64("HEARTBEAT_INTERVAL_SECONDS", 60),

            database_url: env_string("DATABASE_URL", "updown_bot.db"),
            log_level: env_string("LOG_LEVEL", "info"),
        };

        let weight_sum = cfg.weight_rsi
            + cfg.weight_momentum
            + cfg.weight_vwap
            + cfg.weight_sma
            + cfg.weight_market_skew;
        if (weight_sum - 1.0).abs() > 1e-6 {
            tracing::warn!(
                weight_sum,
                "composite weights do not sum to 1.0; signal probabilities will be skewed"
            );
        }

        cfg
    }

    pub fn shared(self) -> SharedConfig {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        // Constructed directly (not from_env) so the test is hermetic.
        let cfg = Config {
            initial_bankroll: 10_000.0,
            kelly_fraction: 0.25,
            max_trade_fraction: 0.03,
            max_trade_size: 250.0,
            min_trade_size: 10.0,
            min_edge_threshold: 0.03,
            max_entry_price: 0.48,
            min_time_remaining: 60,
            max_time_remaining: 270,
            max_total_pending_trades: 20,
            max_trades_per_window: 1,
            max_trades_per_scan: 3,
            daily_loss_limit: 300.0,
            weight_rsi: 0.20,
            weight_momentum: 0.35,
            weight_vwap: 0.20,
            weight_sma: 0.15,
            weight_market_skew: 0.10,
            scan_interval_seconds: 60,
            settlement_interval_seconds: 120,
            heartbeat_interval_seconds: 60,
            database_url: ":memory:".into(),
            log_level: "info".into(),
        };
        let sum = cfg.weight_rsi
            + cfg.weight_momentum
            + cfg.weight_vwap
            + cfg.weight_sma
            + cfg.weight_market_skew;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
