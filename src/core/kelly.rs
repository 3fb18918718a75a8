//! Fractional-Kelly position sizing for a single binary-outcome side.

const MIN_FRACTION: f64 = 0.0;

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}

/// Raw (un-fractioned) Kelly criterion for a win probability `p` against
/// decimal price `q` on the chosen side. `b = (1-q)/q` is the net odds;
/// `(p*b - (1-p)) / b` is the classic Kelly formula. Returns 0 when `q` is
/// outside `(0,1)` since the odds are undefined there.
pub fn raw_kelly(p: f64, q: f64) -> f64 {
    if q <= 0.0 || q >= 1.0 {
        return 0.0;
    }
    let b = (1.0 - q) / q;
    if b <= 0.0 {
        return 0.0;
    }
    (p * b - (1.0 - p)) / b
}

/// Fraction of bankroll to risk: raw Kelly scaled by `kelly_fraction`
/// (operator-chosen risk dial, e.g. quarter-Kelly) and clamped to
/// `[0, max_trade_fraction]`.
pub fn kelly_fraction(p: f64, q: f64, kelly_fraction_mult: f64, max_trade_fraction: f64) -> f64 {
    let raw = raw_kelly(p, q);
    let scaled = raw * kelly_fraction_mult;
    round6(scaled.clamp(MIN_FRACTION, max_trade_fraction))
}

/// Dollar size for a trade: `kelly_fraction * bankroll`, capped by
/// `max_trade_size`. Never negative.
pub fn suggested_size(p: f64, q: f64, kelly_fraction_mult: f64, max_trade_fraction: f64, bankroll: f64, max_trade_size: f64) -> f64 {
    let fraction = kelly_fraction(p, q, kelly_fraction_mult, max_trade_fraction);
    let size = fraction * bankroll;
    round4(size.min(max_trade_size).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_kelly_is_zero_at_fair_odds_and_even_probability() {
        // p=0.5, q=0.5 -> b=1 -> (0.5*1 - 0.5)/1 = 0
        assert!((raw_kelly(0.5, 0.5) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn raw_kelly_is_positive_with_edge() {
        // p=0.55 on a q=0.45 price: b=(0.55/0.45)=1.222..
        let k = raw_kelly(0.55, 0.45);
        assert!(k > 0.0, "expected positive kelly, got {k}");
    }

    #[test]
    fn raw_kelly_is_negative_without_edge() {
        let k = raw_kelly(0.45, 0.55);
        assert!(k < 0.0);
    }

    #[test]
    fn degenerate_price_yields_zero() {
        assert_eq!(raw_kelly(0.6, 0.0), 0.0);
        assert_eq!(raw_kelly(0.6, 1.0), 0.0);
    }

    #[test]
    fn fraction_is_clamped_to_max_trade_fraction() {
        let f = kelly_fraction(0.58, 0.30, 1.0, 0.03);
        assert!(f <= 0.03 + 1e-9);
    }

    #[test]
    fn fraction_never_goes_negative() {
        let f = kelly_fraction(0.3, 0.7, 0.25, 0.03);
        assert_eq!(f, 0.0);
    }

    #[test]
    fn suggested_size_respects_max_trade_size_cap() {
        let size = suggested_size(0.58, 0.20, 1.0, 0.50, 100_000.0, 250.0);
        assert!(size <= 250.0 + 1e-9);
    }

    #[test]
    fn suggested_size_scales_with_bankroll() {
        let small = suggested_size(0.55, 0.45, 0.25, 0.03, 1_000.0, 10_000.0);
        let large = suggested_size(0.55, 0.45, 0.25, 0.03, 10_000.0, 10_000.0);
        assert!(large > small);
    }
}
