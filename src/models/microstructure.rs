/// A computed snapshot of short-term technical microstructure for the spot
/// reference series, as fed into the signal engine. Pure data — no behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Microstructure {
    pub rsi: f64,
    pub momentum_1m: f64,
    pub momentum_5m: f64,
    pub momentum_15m: f64,
    pub vwap: f64,
    pub vwap_deviation: f64,
    pub sma_crossover: f64,
    pub volatility: f64,
    pub price: f64,
}
