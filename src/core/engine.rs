use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::core::kelly;
use crate::models::{Direction, Microstructure, Signal, Window};

const VENUE_NAME: &str = "polymarket";
const CONVERGENCE_DEADBAND: f64 = 0.05;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_LOWER_BAND: f64 = 45.0;
const RSI_UPPER_BAND: f64 = 55.0;

fn clamp_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

/// RSI mapped to a bounded opinion in [-1,+1]. Oversold (<=30) biases
/// bullish, overbought (>=70) biases bearish; the 45-55 band is dead
/// neutral, with a mild bias scaled down outside it.
fn rsi_opinion(rsi: f64) -> f64 {
    if rsi <= RSI_OVERSOLD {
        return clamp_unit((RSI_OVERSOLD - rsi) / RSI_OVERSOLD);
    }
    if rsi >= RSI_OVERBOUGHT {
        return clamp_unit(-(rsi - RSI_OVERBOUGHT) / RSI_OVERBOUGHT);
    }
    if rsi < RSI_LOWER_BAND {
        return clamp_unit((RSI_LOWER_BAND - rsi) / (RSI_LOWER_BAND - RSI_OVERSOLD) * 0.3);
    }
    if rsi > RSI_UPPER_BAND {
        return clamp_unit(-(rsi - RSI_UPPER_BAND) / (RSI_OVERBOUGHT - RSI_UPPER_BAND) * 0.3);
    }
    0.0
}

fn momentum_opinion(m: &Microstructure) -> f64 {
    let blend = 0.50 * m.momentum_1m + 0.35 * m.momentum_5m + 0.15 * m.momentum_15m;
    clamp_unit(blend / 0.10)
}

fn vwap_opinion(m: &Microstructure) -> f64 {
    clamp_unit(m.vwap_deviation / 0.05)
}

fn sma_opinion(m: &Microstructure) -> f64 {
    clamp_unit(m.sma_crossover / 0.03)
}

/// Contrarian fade of the venue's own skew: the further `up_price` sits from
/// 0.50, the harder this leans against it.
fn market_skew_opinion(up_price: f64) -> f64 {
    clamp_unit(-(up_price - 0.50) * 4.0)
}

/// How many of {RSI, momentum, VWAP, SMA} agree on the same side beyond the
/// deadband. Returns the larger of the positive-count/negative-count, i.e.
/// the vote total for the winning direction.
fn convergence_votes(rsi: f64, momentum: f64, vwap: f64, sma: f64) -> usize {
    let opinions = [rsi, momentum, vwap, sma];
    let positive = opinions.iter().filter(|v| **v > CONVERGENCE_DEADBAND).count();
    let negative = opinions.iter().filter(|v| **v < -CONVERGENCE_DEADBAND).count();
    positive.max(negative)
}

struct Composite {
    rsi: f64,
    momentum: f64,
    vwap: f64,
    sma: f64,
    skew: f64,
    votes: usize,
    composite: f64,
    model_up: f64,
}

fn compute_composite(m: &Microstructure, up_price: f64, config: &Config) -> Composite {
    let rsi = rsi_opinion(m.rsi);
    let momentum = momentum_opinion(m);
    let vwap = vwap_opinion(m);
    let sma = sma_opinion(m);
    let skew = market_skew_opinion(up_price);

    let votes = convergence_votes(rsi, momentum, vwap, sma);

    let composite = rsi * config.weight_rsi
        + momentum * config.weight_momentum
        + vwap * config.weight_vwap
        + sma * config.weight_sma
        + skew * config.weight_market_skew;

    let model_up = (0.50 + composite * 0.08).clamp(0.42, 0.58);

    Composite {
        rsi,
        momentum,
        vwap,
        sma,
        skew,
        votes,
        composite,
        model_up,
    }
}

fn confidence(c: &Composite, volatility: f64) -> f64 {
    let base = 0.3 + (c.votes as f64 / 4.0) * 0.3 + c.composite.abs() * 0.2;
    (base * (volatility / 0.05).min(1.0)).min(0.8)
}

/// Full pipeline from a window + microstructure snapshot to a ranked signal.
/// Filters that fail zero out `edge` but the signal is still returned for
/// observability, per the engine's "emit regardless" policy.
pub fn generate_signal(window: &Window, micro: &Microstructure, candle_source: &str, config: &Config, now: DateTime<Utc>) -> Signal {
    let c = compute_composite(micro, window.up_price, config);

    let edge_up = c.model_up - window.up_price;
    let edge_down = window.up_price - c.model_up;

    let (direction, mut edge) = if edge_up >= edge_down {
        (Direction::Up, edge_up)
    } else {
        (Direction::Down, edge_down)
    };

    let entry_price = match direction {
        Direction::Up => window.up_price,
        Direction::Down => window.down_price,
    };

    let time_remaining = window.time_until_end(now);

    let mut reasons = Vec::new();

    if c.votes < 4 {
        edge = 0.0;
        reasons.push(format!("convergence {}/4 below gate", c.votes));
    }
    if entry_price > config.max_entry_price {
        edge = 0.0;
        reasons.push(format!("entry price {entry_price:.2} above max {:.2}", config.max_entry_price));
    }
    if time_remaining < config.min_time_remaining || time_remaining > config.max_time_remaining {
        edge = 0.0;
        reasons.push(format!("time remaining {time_remaining}s outside [{},{}]", config.min_time_remaining, config.max_time_remaining));
    }

    if reasons.is_empty() {
        reasons.push(format!(
            "composite={:.4} votes={}/4 rsi={:.2} momentum={:.2} vwap={:.2} sma={:.2} skew={:.2}",
            c.composite, c.votes, c.rsi, c.momentum, c.vwap, c.sma, c.skew
        ));
    }

    let p = match direction {
        Direction::Up => c.model_up,
        Direction::Down => 1.0 - c.model_up,
    };
    let kelly_fraction = kelly::kelly_fraction(p, entry_price, config.kelly_fraction, config.max_trade_fraction);
    let suggested_size = kelly::suggested_size(p, entry_price, config.kelly_fraction, config.max_trade_fraction, config.initial_bankroll, config.max_trade_size);

    Signal {
        id: None,
        market_id: window.market_id.clone(),
        venue: VENUE_NAME.to_string(),
        timestamp: now,
        direction,
        model_probability: c.model_up,
        market_price: window.up_price,
        edge,
        confidence: confidence(&c, micro.volatility),
        kelly_fraction,
        suggested_size,
        sources: vec![candle_source.to_string()],
        reasoning: reasons.join("; "),
        executed: false,
        actual_outcome: None,
        outcome_correct: None,
        settlement_value: None,
        settled_at: None,
    }
}

/// Evaluate every window and return signals ranked by |edge| descending,
/// ties broken by input order.
pub fn generate_signals(windows: &[Window], micro: &Microstructure, candle_source: &str, config: &Config, now: DateTime<Utc>) -> Vec<Signal> {
    let mut signals: Vec<Signal> = windows
        .iter()
        .map(|w| generate_signal(w, micro, candle_source, config, now))
        .collect();
    signals.sort_by(|a, b| b.edge.abs().partial_cmp(&a.edge.abs()).unwrap_or(std::cmp::Ordering::Equal));
    signals
}
