//! Domain types: bars, orders, fills, positions, trades.

pub mod bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use fill::Fill;
pub use ids::OrderId;
pub use order::{Order, OrderError, OrderKind, OrderSide, OrderStatus};
pub use position::Position;
pub use trade::{TradeDirection, TradeRecord};

/// Symbol type alias.
pub type Symbol = String;
