use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Exact grammar for a BTC 5-minute Up/Down window slug: `btc-updown-5m-<end_epoch>`
/// where `end_epoch` is a 10-digit unix-second timestamp on a 300 s boundary.
fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^btc-updown-5m-\d{10}$").expect("valid slug regex"))
}

pub fn is_valid_window_slug(slug: &str) -> bool {
    slug_re().is_match(slug)
}

pub fn window_slug(end_epoch: i64) -> String {
    format!("btc-updown-5m-{end_epoch}")
}

/// A single tradeable 5-minute Up/Down window, as reconciled from the venue.
/// Ephemeral — rebuilt on every scan, never persisted directly.
#[derive(Debug, Clone)]
pub struct Window {
    pub slug: String,
    pub market_id: String,
    pub up_price: f64,
    pub down_price: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub volume_24h: f64,
    pub closed: bool,
}

impl Window {
    pub fn spread(&self) -> f64 {
        (1.0 - self.up_price - self.down_price).abs()
    }

    pub fn time_until_end(&self, now: DateTime<Utc>) -> i64 {
        (self.window_end - now).num_seconds()
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.closed && self.window_start <= now && now <= self.window_end
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        !self.closed && now < self.window_start
    }

    /// End-epoch parsed back out of the slug, or `None` if malformed.
    pub fn end_epoch(&self) -> Option<i64> {
        self.slug
            .strip_prefix("btc-updown-5m-")
            .and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window(up: f64, down: f64) -> Window {
        let now = Utc::now();
        Window {
            slug: window_slug(1_700_000_400),
            market_id: "m1".into(),
            up_price: up,
            down_price: down,
            window_start: now - Duration::seconds(60),
            window_end: now + Duration::seconds(240),
            volume_24h: 1000.0,
            closed: false,
        }
    }

    #[test]
    fn slug_grammar_rejects_malformed_input() {
        assert!(is_valid_window_slug("btc-updown-5m-1700000400"));
        assert!(!is_valid_window_slug("btc-updown-5m-170000040")); // 9 digits
        assert!(!is_valid_window_slug("eth-updown-5m-1700000400"));
        assert!(!is_valid_window_slug("btc-updown-5m-17000004000")); // 11 digits
    }

    #[test]
    fn generated_slugs_always_validate() {
        for end in (1_700_000_000i64..1_700_010_000).step_by(300) {
            let slug = window_slug(end);
            assert_eq!(end % 300, 0);
            assert!(is_valid_window_slug(&slug), "slug {slug} should validate");
        }
    }

    #[test]
    fn spread_measures_distance_from_one() {
        let w = window(0.52, 0.47);
        assert!((w.spread() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn active_and_upcoming_are_mutually_exclusive() {
        let now = Utc::now();
        let w = window(0.5, 0.5);
        assert!(w.is_active(now));
        assert!(!w.is_upcoming(now));

        let future = Window {
            window_start: now + Duration::minutes(5),
            window_end: now + Duration::minutes(10),
            ..window(0.5, 0.5)
        };
        assert!(!future.is_active(now));
        assert!(future.is_upcoming(now));
    }

    #[test]
    fn end_epoch_round_trips_through_slug() {
        let w = window(0.5, 0.5);
        assert_eq!(w.end_epoch(), Some(1_700_000_400));
    }
}
