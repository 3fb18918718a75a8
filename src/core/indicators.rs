use crate::models::{CandleSeries, Microstructure};

const MIN_CLOSES: usize = 15;
const RSI_PERIOD: usize = 14;
const VWAP_WINDOW: usize = 30;
const VOLATILITY_WINDOW: usize = 30;

/// Pure, deterministic mapping from a candle window to a microstructure
/// snapshot. Returns `None` below 15 closes — callers treat that the same
/// as a candle-source miss, never fabricating a reading from a thin window.
pub fn compute_microstructure(series: &CandleSeries) -> Option<Microstructure> {
    let candles = series.as_slice();
    let closes = series.closes();
    if closes.len() < MIN_CLOSES {
        return None;
    }

    let price = *closes.last()?;

    Some(Microstructure {
        rsi: rsi_wilder(&closes, RSI_PERIOD),
        momentum_1m: pct_change(&closes, 1),
        momentum_5m: pct_change(&closes, 5),
        momentum_15m: pct_change(&closes, 15),
        vwap: vwap(candles),
        vwap_deviation: vwap_deviation(candles, price),
        sma_crossover: sma_crossover(&closes, price),
        volatility: volatility(&closes),
        price,
    })
}

/// Wilder-smoothed RSI. The first average gain/loss is the plain mean of the
/// first `period` deltas; every value after that is `(prev*(period-1) + new)
/// / period`. Zero average loss returns 100, not 50 — a deliberate choice
/// among the divergent drafts this was built from.
fn rsi_wilder(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 {
        return 50.0;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = deltas[..period].iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = deltas[..period].iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    for delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// `100*(c_last - c_last-k)/c_last-k`. Zero if the lookback isn't available
/// or the divisor is non-positive.
fn pct_change(closes: &[f64], k: usize) -> f64 {
    if closes.len() <= k {
        return 0.0;
    }
    let last = closes[closes.len() - 1];
    let prior = closes[closes.len() - 1 - k];
    if prior <= 0.0 {
        return 0.0;
    }
    100.0 * (last - prior) / prior
}

fn vwap(candles: &[crate::models::Candle]) -> f64 {
    let n = candles.len().min(VWAP_WINDOW);
    let window = &candles[candles.len() - n..];

    let total_volume: f64 = window.iter().map(|c| c.volume).sum();
    if total_volume == 0.0 {
        return window.last().map(|c| c.close).unwrap_or(0.0);
    }

    let weighted_sum: f64 = window.iter().map(|c| c.typical_price() * c.volume).sum();
    weighted_sum / total_volume
}

fn vwap_deviation(candles: &[crate::models::Candle], price: f64) -> f64 {
    let total_volume: f64 = candles.iter().rev().take(VWAP_WINDOW).map(|c| c.volume).sum();
    if total_volume == 0.0 {
        return 0.0;
    }
    let v = vwap(candles);
    if v == 0.0 {
        return 0.0;
    }
    100.0 * (price - v) / v
}

fn sma(closes: &[f64], n: usize) -> f64 {
    let n = closes.len().min(n);
    if n == 0 {
        return 0.0;
    }
    let window = &closes[closes.len() - n..];
    window.iter().sum::<f64>() / n as f64
}

fn sma_crossover(closes: &[f64], price: f64) -> f64 {
    if price == 0.0 {
        return 0.0;
    }
    let sma5 = sma(closes, 5);
    let sma15 = sma(closes, 15);
    100.0 * (sma5 - sma15) / price
}

/// Population stdev (not sample) of the last `min(30, N-1)` simple
/// close-to-close returns, expressed as a percentage.
fn volatility(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len().min(VOLATILITY_WINDOW);
    let window = &returns[returns.len() - n..];
    let mean = window.iter().sum::<f64>() / n as f64;
    let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
    100.0 * variance.sqrt()
}
