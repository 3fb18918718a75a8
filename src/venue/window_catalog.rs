use std::collections::HashSet;

use chrono::Utc;

use crate::models::window::window_slug;
use crate::models::Window;
use crate::venue::VenueClient;

const SLUG_CONTAINS: &str = "btc-updown-5m";

fn round_to_5min(epoch: i64) -> i64 {
    (epoch / 300) * 300
}

/// The current and next `count` window slugs, computed purely from the
/// system clock — no network call needed to know what they're named.
pub fn expected_window_slugs(count: usize) -> Vec<String> {
    let now = Utc::now().timestamp();
    let current_boundary = round_to_5min(now);
    let next_boundary = current_boundary + 300;

    (0..count)
        .map(|i| window_slug(next_boundary + (i as i64) * 300))
        .collect()
}

/// Fetch the currently tradeable BTC 5-min windows.
///
/// Two passes: direct lookups of the deterministically-computed upcoming
/// slugs, then a series search as a supplement for anything the direct pass
/// missed. Deduplicated by slug, closed windows dropped, sorted by
/// `window_end` ascending.
pub async fn fetch_active_windows(client: &dyn VenueClient) -> Vec<Window> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut windows: Vec<Window> = Vec::new();

    for slug in expected_window_slugs(6) {
        if let Some(window) = client.fetch_by_slug(&slug).await {
            if seen.insert(window.slug.clone()) {
                windows.push(window);
            }
        }
    }

    for window in client.fetch_by_series(SLUG_CONTAINS, 20, false).await {
        if seen.insert(window.slug.clone()) {
            windows.push(window);
        }
    }

    windows.retain(|w| !w.closed);
    windows.sort_by_key(|w| w.window_end);

    tracing::info!(count = windows.len(), "fetched active BTC 5-min windows");
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_slugs_land_on_5min_boundaries() {
        for slug in expected_window_slugs(6) {
            let suffix = slug.strip_prefix("btc-updown-5m-").unwrap();
            let epoch: i64 = suffix.parse().unwrap();
            assert_eq!(epoch % 300, 0);
        }
    }

    #[test]
    fn expected_slugs_are_strictly_increasing() {
        let slugs = expected_window_slugs(6);
        let epochs: Vec<i64> = slugs
            .iter()
            .map(|s| s.strip_prefix("btc-updown-5m-").unwrap().parse().unwrap())
            .collect();
        for pair in epochs.windows(2) {
            assert_eq!(pair[1] - pair[0], 300);
        }
    }
}
