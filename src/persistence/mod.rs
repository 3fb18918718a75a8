use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::error::{BotError, Result};
use crate::models::{BotState, Direction, Signal, Trade, TradeResult};

/// A resolved trade handed to the persistence layer by the settlement
/// reconciler, carrying everything needed to finalize the trade row and
/// fold its P&L into BotState in one pass.
#[derive(Debug, Clone)]
pub struct SettledTrade {
    pub trade_id: i64,
    pub signal_id: Option<i64>,
    pub direction: Direction,
    pub settlement_value: f64,
    pub pnl: f64,
    pub result: TradeResult,
    pub settled_at: DateTime<Utc>,
}

/// Relational store for signals, trades, and the bot-state singleton.
/// The synchronous `rusqlite::Connection` is wrapped behind a single
/// async mutex so the scheduler's concurrent jobs can share one handle,
/// following this lineage's `Arc<Mutex<Connection>>` convention for its
/// other SQLite-backed stores.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(database_url: &str, initial_bankroll: f64) -> Result<Self> {
        let conn = Connection::open(database_url)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id TEXT NOT NULL,
                venue TEXT NOT NULL,
                minute_floor TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                direction TEXT NOT NULL,
                model_probability REAL NOT NULL,
                market_price REAL NOT NULL,
                edge REAL NOT NULL,
                confidence REAL NOT NULL,
                kelly_fraction REAL NOT NULL,
                suggested_size REAL NOT NULL,
                sources TEXT NOT NULL,
                reasoning TEXT NOT NULL,
                executed INTEGER NOT NULL,
                actual_outcome TEXT,
                outcome_correct INTEGER,
                settlement_value REAL,
                settled_at TEXT,
                UNIQUE(market_id, minute_floor)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_ticker TEXT NOT NULL,
                event_slug TEXT NOT NULL,
                direction TEXT NOT NULL,
                entry_price REAL NOT NULL,
                size REAL NOT NULL,
                timestamp TEXT NOT NULL,
                model_probability REAL NOT NULL,
                market_price_at_entry REAL NOT NULL,
                edge_at_entry REAL NOT NULL,
                signal_id INTEGER,
                settled INTEGER NOT NULL,
                result TEXT NOT NULL,
                settlement_value REAL,
                pnl REAL,
                settlement_time TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trades_event_slug ON trades(event_slug)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trades_settled ON trades(settled)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS bot_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                bankroll REAL NOT NULL,
                total_trades INTEGER NOT NULL,
                winning_trades INTEGER NOT NULL,
                total_pnl REAL NOT NULL,
                is_running INTEGER NOT NULL,
                last_run TEXT,
                daily_pnl REAL NOT NULL,
                daily_pnl_date TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO bot_state
             (id, bankroll, total_trades, winning_trades, total_pnl, is_running, last_run, daily_pnl, daily_pnl_date)
             VALUES (1, ?1, 0, 0, 0.0, 1, NULL, 0.0, '')",
            params![initial_bankroll],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a signal, skipping silently if `(market_id, minute_floor)`
    /// already has one. Returns the row id on first insert, `None` on dedup.
    pub async fn insert_signal_if_new(&self, signal: &Signal) -> Result<Option<i64>> {
        let conn = self.conn.lock().await;
        let minute_floor = signal.minute_floor().to_rfc3339();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM signals WHERE market_id = ?1 AND minute_floor = ?2",
                params![signal.market_id, minute_floor],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO signals
             (market_id, venue, minute_floor, timestamp, direction, model_probability, market_price,
              edge, confidence, kelly_fraction, suggested_size, sources, reasoning, executed,
              actual_outcome, outcome_correct, settlement_value, settled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL, NULL, NULL, NULL)",
            params![
                signal.market_id,
                signal.venue,
                minute_floor,
                signal.timestamp.to_rfc3339(),
                signal.direction.as_str(),
                signal.model_probability,
                signal.market_price,
                signal.edge,
                signal.confidence,
                signal.kelly_fraction,
                signal.suggested_size,
                signal.sources.join(","),
                signal.reasoning,
                signal.executed as i64,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Insert a trade and bump `BotState.total_trades`, atomically.
    pub async fn insert_trade(&self, trade: &Trade) -> Result<i64> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO trades
             (market_ticker, event_slug, direction, entry_price, size, timestamp,
              model_probability, market_price_at_entry, edge_at_entry, signal_id,
              settled, result, settlement_value, pnl, settlement_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, NULL, NULL, NULL)",
            params![
                trade.market_ticker,
                trade.event_slug,
                trade.direction.as_str(),
                trade.entry_price,
                trade.size,
                trade.timestamp.to_rfc3339(),
                trade.model_probability,
                trade.market_price_at_entry,
                trade.edge_at_entry,
                trade.signal_id,
                trade.result.as_str(),
            ],
        )?;
        let trade_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE bot_state SET total_trades = total_trades + 1 WHERE id = 1",
            [],
        )?;

        tx.commit()?;
        Ok(trade_id)
    }

    /// Count of trades with `settled = 0` for the same event slug, used by
    /// the scheduler's per-window dedup gate.
    pub async fn count_unsettled_for_slug(&self, event_slug: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM trades WHERE event_slug = ?1 AND settled = 0",
            params![event_slug],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub async fn count_unsettled(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM trades WHERE settled = 0", [], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn list_unsettled_trades(&self) -> Result<Vec<Trade>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, market_ticker, event_slug, direction, entry_price, size, timestamp,
                    model_probability, market_price_at_entry, edge_at_entry, signal_id,
                    settled, result, settlement_value, pnl, settlement_time
             FROM trades WHERE settled = 0",
        )?;
        let rows = stmt.query_map([], row_to_trade)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Transition a single trade `settled=false -> true`. Isolated per-trade
    /// so one malformed row doesn't block the rest of a settlement batch.
    pub async fn finalize_trade(&self, trade_id: i64, settlement_value: f64, pnl: f64, result: TradeResult, settled_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE trades SET settled = 1, settlement_value = ?1, pnl = ?2, result = ?3, settlement_time = ?4
             WHERE id = ?5 AND settled = 0",
            params![settlement_value, pnl, result.as_str(), settled_at.to_rfc3339(), trade_id],
        )?;
        Ok(())
    }

    /// Fold a settled batch's P&L into BotState and link each originating
    /// signal, all inside one transaction. Rolls `daily_pnl` over when the
    /// UTC calendar day has changed since the last update.
    pub async fn apply_settlements(&self, settled: &[SettledTrade]) -> Result<()> {
        if settled.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let today = settled[0].settled_at.format("%Y-%m-%d").to_string();
        let current_date: String = tx.query_row("SELECT daily_pnl_date FROM bot_state WHERE id = 1", [], |row| row.get(0))?;
        if current_date != today {
            tx.execute(
                "UPDATE bot_state SET daily_pnl = 0.0, daily_pnl_date = ?1 WHERE id = 1",
                params![today],
            )?;
        }

        let total_pnl: f64 = settled.iter().map(|s| s.pnl).sum();
        let wins = settled.iter().filter(|s| s.pnl > 0.0).count() as i64;

        tx.execute(
            "UPDATE bot_state SET
                bankroll = bankroll + ?1,
                total_pnl = total_pnl + ?1,
                winning_trades = winning_trades + ?2,
                daily_pnl = daily_pnl + ?1
             WHERE id = 1",
            params![total_pnl, wins],
        )?;

        for s in settled {
            if let Some(signal_id) = s.signal_id {
                let actual_outcome = if s.settlement_value == 1.0 { Direction::Up } else { Direction::Down };
                tx.execute(
                    "UPDATE signals SET actual_outcome = ?1, outcome_correct = ?2, settlement_value = ?3, settled_at = ?4
                     WHERE id = ?5",
                    params![
                        actual_outcome.as_str(),
                        (actual_outcome == s.direction) as i64,
                        s.settlement_value,
                        s.settled_at.to_rfc3339(),
                        signal_id,
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub async fn get_state(&self) -> Result<BotState> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT bankroll, total_trades, winning_trades, total_pnl, is_running, last_run, daily_pnl, daily_pnl_date
             FROM bot_state WHERE id = 1",
            [],
            |row| {
                let last_run: Option<String> = row.get(5)?;
                Ok(BotState {
                    bankroll: row.get(0)?,
                    total_trades: row.get::<_, i64>(1)? as u64,
                    winning_trades: row.get::<_, i64>(2)? as u64,
                    total_pnl: row.get(3)?,
                    is_running: row.get::<_, i64>(4)? != 0,
                    last_run: last_run.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc)),
                    daily_pnl: row.get(6)?,
                    daily_pnl_date: row.get(7)?,
                })
            },
        ).map_err(BotError::from)
    }

    pub async fn set_running(&self, running: bool, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE bot_state SET is_running = ?1, last_run = ?2 WHERE id = 1",
            params![running as i64, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Reset BotState back to a fresh bankroll with zeroed counters. Does
    /// not touch signal/trade history.
    pub async fn reset(&self, initial_bankroll: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE bot_state SET bankroll = ?1, total_trades = 0, winning_trades = 0, total_pnl = 0.0,
                is_running = 1, last_run = NULL, daily_pnl = 0.0, daily_pnl_date = ''
             WHERE id = 1",
            params![initial_bankroll],
        )?;
        Ok(())
    }
}

fn row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let direction_str: String = row.get(3)?;
    let timestamp_str: String = row.get(6)?;
    let result_str: String = row.get(12)?;
    let settlement_time_str: Option<String> = row.get(15)?;

    Ok(Trade {
        id: row.get(0)?,
        market_ticker: row.get(1)?,
        event_slug: row.get(2)?,
        direction: direction_str.parse().unwrap_or(Direction::Up),
        entry_price: row.get(4)?,
        size: row.get(5)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp_str).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now()),
        model_probability: row.get(7)?,
        market_price_at_entry: row.get(8)?,
        edge_at_entry: row.get(9)?,
        signal_id: row.get(10)?,
        settled: row.get::<_, i64>(11)? != 0,
        result: result_str.parse().unwrap_or(TradeResult::Pending),
        settlement_value: row.get(13)?,
        pnl: row.get(14)?,
        settlement_time: settlement_time_str.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::direction::Direction;

    fn test_signal(market_id: &str, ts: DateTime<Utc>) -> Signal {
        Signal {
            id: None,
            market_id: market_id.to_string(),
            venue: "polymarket".into(),
            timestamp: ts,
            direction: Direction::Up,
            model_probability: 0.55,
            market_price: 0.45,
            edge: 0.10,
            confidence: 0.5,
            kelly_fraction: 0.01,
            suggested_size: 50.0,
            sources: vec!["test".into()],
            reasoning: "test".into(),
            executed: false,
            actual_outcome: None,
            outcome_correct: None,
            settlement_value: None,
            settled_at: None,
        }
    }

    fn test_trade(slug: &str) -> Trade {
        Trade {
            id: None,
            market_ticker: "m1".into(),
            event_slug: slug.into(),
            direction: Direction::Up,
            entry_price: 0.40,
            size: 50.0,
            timestamp: Utc::now(),
            model_probability: 0.55,
            market_price_at_entry: 0.40,
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
    async fn duplicate_signal_in_same_minute_is_rejected() {
        let store = Store::open(":memory:", 10_000.0).unwrap();
        let now = Utc::now();
        let first = store.insert_signal_if_new(&test_signal("m1", now)).await.unwrap();
        let second = store.insert_signal_if_new(&test_signal("m1", now)).await.unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn insert_trade_increments_total_trades() {
        let store = Store::open(":memory:", 10_000.0).unwrap();
        store.insert_trade(&test_trade("btc-updown-5m-1700000400")).await.unwrap();
        let state = store.get_state().await.unwrap();
        assert_eq!(state.total_trades, 1);
    }

    #[tokio::test]
    async fn settlement_updates_bankroll_and_winning_trades() {
        let store = Store::open(":memory:", 1_000.0).unwrap();
        let trade_id = store.insert_trade(&test_trade("btc-updown-5m-1700000400")).await.unwrap();

        store.finalize_trade(trade_id, 1.0, 30.0, TradeResult::Win, Utc::now()).await.unwrap();
        store
            .apply_settlements(&[SettledTrade {
                trade_id,
                signal_id: None,
                direction: Direction::Up,
                settlement_value: 1.0,
                pnl: 30.0,
                result: TradeResult::Win,
                settled_at: Utc::now(),
            }])
            .await
            .unwrap();

        let state = store.get_state().await.unwrap();
        assert!((state.bankroll - 1030.0).abs() < 1e-9);
        assert_eq!(state.winning_trades, 1);
    }

    #[tokio::test]
    async fn unsettled_count_scoped_to_event_slug() {
        let store = Store::open(":memory:", 10_000.0).unwrap();
        store.insert_trade(&test_trade("btc-updown-5m-1700000400")).await.unwrap();
        let count = store.count_unsettled_for_slug("btc-updown-5m-1700000400").await.unwrap();
        assert_eq!(count, 1);
        let other = store.count_unsettled_for_slug("btc-updown-5m-1700000700").await.unwrap();
        assert_eq!(other, 0);
    }
}
