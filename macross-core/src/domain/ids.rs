//! Typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an order within a single run.
///
/// Allocated sequentially by the broker; also used as the parent back-reference
/// for bracket children, keyed through the broker's order table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(v: u64) -> Self {
        OrderId(v)
    }
}
