use chrono::{DateTime, Duration, Utc};

use crate::models::{Candle, CandleSeries};

/// Build a `CandleSeries` from `(open, high, low, close)` tuples, one minute
/// apart, ending at `Utc::now()`. Volume is fixed at 10.0 for every candle.
pub fn make_candles(ohlc: &[(f64, f64, f64, f64)]) -> CandleSeries {
    make_candles_with_volume(ohlc, 10.0)
}

pub fn make_candles_with_volume(ohlc: &[(f64, f64, f64, f64)], volume: f64) -> CandleSeries {
    let now = Utc::now();
    let start = now - Duration::minutes(ohlc.len() as i64);
    let candles = ohlc
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            open_time: start + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume,
        })
        .collect();
    CandleSeries::new(candles, "test")
}

/// A steady run of `n` one-minute candles closing at `price`, flat high/low.
pub fn make_flat_candles(n: usize, price: f64) -> CandleSeries {
    let ohlc: Vec<_> = (0..n).map(|_| (price, price, price, price)).collect();
    make_candles(&ohlc)
}

/// `n` candles closing in a straight line from `start` to `end`.
pub fn make_trend_candles(n: usize, start: f64, end: f64) -> CandleSeries {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    let mut ohlc = Vec::with_capacity(n);
    let mut prev = start;
    for i in 0..n {
        let close = start + step * i as f64;
        let open = if i == 0 { start } else { prev };
        let high = open.max(close);
        let low = open.min(close);
        ohlc.push((open, high, low, close));
        prev = close;
    }
    make_candles(&ohlc)
}

pub fn minutes_ago(n: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(n)
}
