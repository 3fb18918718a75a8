use chrono::Utc;

use crate::models::trade::calculate_pnl;
use crate::models::{Trade, TradeResult};
use crate::persistence::{SettledTrade, Store};
use crate::venue::VenueClient;

/// Sweep unsettled trades, resolve each against the venue, and fold any
/// newly-settled trades into bankroll and signal calibration.
///
/// Per-trade errors are logged and skipped so one bad row never blocks the
/// rest of the batch; the BotState/Signal fold-in for everything that did
/// resolve still runs as one transaction.
pub async fn run_settlement_cycle(store: &Store, venue: &dyn VenueClient) -> anyhow::Result<usize> {
    let pending = store.list_unsettled_trades().await?;
    if pending.is_empty() {
        tracing::debug!("no pending trades to settle");
        return Ok(0);
    }

    tracing::info!(count = pending.len(), "checking pending trades for settlement");

    let mut settled = Vec::new();
    for trade in &pending {
        match resolve_trade(venue, trade).await {
            Ok(Some(settlement)) => settled.push(settlement),
            Ok(None) => {} // not yet closed
            Err(e) => {
                tracing::error!(trade_id = ?trade.id, error = %e, "failed to settle trade");
            }
        }
    }

    for s in &settled {
        if let Err(e) = store
            .finalize_trade(s.trade_id, s.settlement_value, s.pnl, s.result, s.settled_at)
            .await
        {
            tracing::error!(trade_id = s.trade_id, error = %e, "failed to finalize trade row");
        }
    }

    if !settled.is_empty() {
        store.apply_settlements(&settled).await?;
        tracing::info!(count = settled.len(), "settled trades");
    } else {
        tracing::debug!("no trades ready for settlement (markets still open)");
    }

    Ok(settled.len())
}

async fn resolve_trade(venue: &dyn VenueClient, trade: &Trade) -> anyhow::Result<Option<SettledTrade>> {
    let Some(trade_id) = trade.id else {
        return Ok(None);
    };

    let outcome = venue
        .fetch_resolution(&trade.market_ticker, Some(&trade.event_slug))
        .await;

    let Some(outcome) = outcome else {
        return Ok(None);
    };
    let Some(settlement_value) = outcome.value() else {
        return Ok(None);
    };

    let pnl = calculate_pnl(trade, settlement_value);
    let result = TradeResult::from_pnl(pnl);

    let now = Utc::now();
    tracing::info!(
        trade_id,
        direction = %trade.direction,
        entry_price = trade.entry_price,
        result = %result,
        pnl,
        "trade settled"
    );

    Ok(Some(SettledTrade {
        trade_id,
        signal_id: trade.signal_id,
        direction: trade.direction,
        settlement_value,
        pnl,
        result,
        settled_at: now,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, SettlementOutcome, Window};
    use async_trait::async_trait;
    use chrono::Duration;

    struct MockVenue {
        outcome: Option<SettlementOutcome>,
    }

    #[async_trait]
    impl VenueClient for MockVenue {
        async fn fetch_by_slug(&self, _slug: &str) -> Option<Window> {
            None
        }
        async fn fetch_by_series(&self, _slug_contains: &str, _limit: usize, _include_closed: bool) -> Vec<Window> {
            Vec::new()
        }
        async fn fetch_resolution(&self, _market_id: &str, _event_slug: Option<&str>) -> Option<SettlementOutcome> {
            self.outcome
        }
    }

    fn base_trade(id: i64, direction: Direction, entry_price: f64, size: f64) -> Trade {
        Trade {
            id: Some(id),
            market_ticker: "m1".into(),
            event_slug: "btc-updown-5m-1700000400".into(),
            direction,
            entry_price,
            size,
            timestamp: Utc::now() - Duration::minutes(6),
            model_probability: 0.55,
            market_price_at_entry: entry_price,
            edge_at_entry: 0.05,
            signal_id: None,
            settled: false,
            result: TradeResult::Pending,
            settlement_value: None,
            pnl: None,
            settlement_time: None,
        }
    }

    #[tokio::test]
    async fn undecided_market_defers_settlement() {
        let venue = MockVenue { outcome: None };
        let trade = base_trade(1, Direction::Up, 0.40, 50.0);
        let resolved = resolve_trade(&venue, &trade).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn win_settlement_computes_correct_pnl() {
        let venue = MockVenue { outcome: Some(SettlementOutcome::Up) };
        let trade = base_trade(1, Direction::Up, 0.40, 50.0);
        let resolved = resolve_trade(&venue, &trade).await.unwrap().unwrap();
        assert!((resolved.pnl - 30.0).abs() < 1e-9);
        assert_eq!(resolved.result, TradeResult::Win);
    }

    #[tokio::test]
    async fn loss_settlement_computes_correct_pnl() {
        let venue = MockVenue { outcome: Some(SettlementOutcome::Up) };
        let trade = base_trade(1, Direction::Down, 0.45, 25.0);
        let resolved = resolve_trade(&venue, &trade).await.unwrap().unwrap();
        assert!((resolved.pnl - (-11.25)).abs() < 1e-9);
        assert_eq!(resolved.result, TradeResult::Loss);
    }

    #[tokio::test]
    async fn settle_cycle_is_idempotent_once_store_side_settles() {
        use crate::persistence::Store;

        let store = Store::open(":memory:", 1_000.0).unwrap();
        let trade_id = store.insert_trade(&base_trade(0, Direction::Up, 0.40, 50.0)).await.unwrap();
        assert!(trade_id > 0);

        let venue = MockVenue { outcome: Some(SettlementOutcome::Up) };
        let first_pass = run_settlement_cycle(&store, &venue).await.unwrap();
        assert_eq!(first_pass, 1);

        let second_pass = run_settlement_cycle(&store, &venue).await.unwrap();
        assert_eq!(second_pass, 0);

        let state = store.get_state().await.unwrap();
        assert!((state.bankroll - 1030.0).abs() < 1e-9);
    }
}
