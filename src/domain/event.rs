// ============================================================================
// Market Events
// Everything the engine publishes downstream
// ============================================================================

use crate::error::RejectReason;
use std::fmt;

use super::{OrderId, Trade};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An order refused at admission, addressed back to its submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RejectionNotice {
    pub order_id: OrderId,
    pub reason: RejectReason,
}

impl RejectionNotice {
    pub fn new(order_id: OrderId, reason: RejectReason) -> Self {
        Self { order_id, reason }
    }
}

impl fmt::Display for RejectionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order {} rejected: {}", self.order_id, self.reason)
    }
}

/// Outbound event. Closed set; consumers match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "payload"))]
pub enum MarketEvent {
    Trade(Trade),
    /// Full book dump, one `SIDE: id, price, quantity` line per resting order
    Snapshot(String),
    Rejected(RejectionNotice),
}

impl MarketEvent {
    pub fn as_trade(&self) -> Option<&Trade> {
        match self {
            MarketEvent::Trade(trade) => Some(trade),
            _ => None,
        }
    }

    pub fn is_trade(&self) -> bool {
        matches!(self, MarketEvent::Trade(_))
    }
}

impl From<Trade> for MarketEvent {
    fn from(trade: Trade) -> Self {
        MarketEvent::Trade(trade)
    }
}

impl From<RejectionNotice> for MarketEvent {
    fn from(notice: RejectionNotice) -> Self {
        MarketEvent::Rejected(notice)
    }
}
