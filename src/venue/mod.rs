pub mod gamma;
pub mod window_catalog;

use async_trait::async_trait;

use crate::models::{SettlementOutcome, Window};

/// A venue that lists BTC 5-minute Up/Down windows and publishes their
/// resolution once the underlying market closes. Implementations absorb
/// their own network/format errors and return `None`/empty rather than
/// propagating — a venue hiccup degrades a scan, it doesn't fail it.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Fetch one window by its exact event slug. Used both for live scanning
    /// (rejects closed windows upstream of this call) and for settlement.
    async fn fetch_by_slug(&self, slug: &str) -> Option<Window>;

    /// Search windows by slug substring, as a supplement to direct slug
    /// lookups. `include_closed` widens the search during settlement retries.
    async fn fetch_by_series(&self, slug_contains: &str, limit: usize, include_closed: bool) -> Vec<Window>;

    /// Look up the published resolution for a market, event slug first.
    async fn fetch_resolution(&self, market_id: &str, event_slug: Option<&str>) -> Option<SettlementOutcome>;
}
