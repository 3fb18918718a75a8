pub mod bot_state;
pub mod candle;
pub mod direction;
pub mod microstructure;
pub mod signal;
pub mod trade;
pub mod window;

pub use bot_state::BotState;
pub use candle::{Candle, CandleSeries};
pub use direction::{Direction, EventKind, SettlementOutcome, TradeResult};
pub use microstructure::Microstructure;
pub use signal::Signal;
pub use trade::Trade;
pub use window::Window;
