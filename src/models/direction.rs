use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" | "yes" => Ok(Direction::Up),
            "down" | "no" => Ok(Direction::Down),
            _ => Err(()),
        }
    }
}

/// Outcome of a settled trade. Terminal once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Win,
    Loss,
    Push,
    Pending,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Win => "win",
            TradeResult::Loss => "loss",
            TradeResult::Push => "push",
            TradeResult::Pending => "pending",
        }
    }

    /// Classify a P&L value into a result. `pnl == 0.0` is a push.
    pub fn from_pnl(pnl: f64) -> Self {
        if pnl > 0.0 {
            TradeResult::Win
        } else if pnl < 0.0 {
            TradeResult::Loss
        } else {
            TradeResult::Push
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TradeResult {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(TradeResult::Win),
            "loss" => Ok(TradeResult::Loss),
            "push" => Ok(TradeResult::Push),
            "pending" => Ok(TradeResult::Pending),
            _ => Err(()),
        }
    }
}

/// The venue's published settlement outcome for a window. `Undecided` means
/// the market is still open or the last price isn't near the 0/1 boundary yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    Up,
    Down,
    Undecided,
}

impl SettlementOutcome {
    /// Parse the venue's post-close first-outcome price into a settlement.
    /// `>= 0.99` => Up won, `<= 0.01` => Down won, otherwise undecided.
    pub fn from_first_price(first_price: f64) -> Self {
        if first_price >= 0.99 {
            SettlementOutcome::Up
        } else if first_price <= 0.01 {
            SettlementOutcome::Down
        } else {
            SettlementOutcome::Undecided
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            SettlementOutcome::Up => Some(1.0),
            SettlementOutcome::Down => Some(0.0),
            SettlementOutcome::Undecided => None,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            SettlementOutcome::Up => Some(Direction::Up),
            SettlementOutcome::Down => Some(Direction::Down),
            SettlementOutcome::Undecided => None,
        }
    }
}

/// Structured event kind for the scheduler's observability ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Success,
    Warning,
    Error,
    Data,
    Trade,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Info => "info",
            EventKind::Success => "success",
            EventKind::Warning => "warning",
            EventKind::Error => "error",
            EventKind::Data => "data",
            EventKind::Trade => "trade",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
