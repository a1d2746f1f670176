// ============================================================================
// Order Domain Model
// ============================================================================

use crate::error::RejectReason;
use crate::numeric::{Price, Quantity};
use std::fmt;
use std::str::FromStr;

use super::RejectionNotice;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

/// Order identifier, unique for the lifetime of a book. Lower ids arrived
/// earlier, so they also act as the time component of price-time priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account that placed the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OwnerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(RejectReason::UnknownSide(s.to_string())),
        }
    }
}

/// Order qualifier. Decides admission, whether the order may trade at any
/// price, and whether an unfilled remainder rests on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderType {
    /// Takes liquidity at any price; never rests
    Market,
    /// Takes what crosses, rests the remainder
    Limit,
    /// Held off-book until a trade reaches its trigger, then becomes a market order
    StopLoss,
    /// Rests only; rejected if it would cross on arrival
    PostOnly,
    /// All-or-none; rejected when at-or-better liquidity cannot fill it
    AllOrNone,
    /// Fill-or-kill; fills completely right away or is rejected
    FillOrKill,
    /// Immediate-or-cancel; fills what crosses, drops the rest
    ImmediateOrCancel,
}

impl OrderType {
    /// Whether an unfilled remainder is inserted into the book.
    pub fn can_rest(self) -> bool {
        matches!(
            self,
            OrderType::Limit | OrderType::PostOnly | OrderType::AllOrNone
        )
    }

    /// Whether `limit_price` is meaningful (and must therefore be valid).
    pub fn is_priced(self) -> bool {
        !matches!(self, OrderType::Market)
    }

    /// Whether admission requires enough liquidity to fill the whole order.
    pub fn requires_full_fill(self) -> bool {
        matches!(self, OrderType::AllOrNone | OrderType::FillOrKill)
    }
}

impl FromStr for OrderType {
    type Err = RejectReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop_loss" | "stop-loss" => Ok(OrderType::StopLoss),
            "post_only" | "post-only" => Ok(OrderType::PostOnly),
            "aon" => Ok(OrderType::AllOrNone),
            "fok" => Ok(OrderType::FillOrKill),
            "ioc" => Ok(OrderType::ImmediateOrCancel),
            _ => Err(RejectReason::UnknownOrderType(s.to_string())),
        }
    }
}

// ============================================================================
// Order Entity
// ============================================================================

/// An order intent travelling through the engine.
///
/// `quantity` is the remaining size and is decremented as the order fills.
/// For `StopLoss` orders `limit_price` is the trigger threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub order_type: OrderType,
    pub side: Side,
    pub limit_price: Price,
    pub quantity: Quantity,
}

impl Order {
    pub fn new(
        id: OrderId,
        owner_id: OwnerId,
        order_type: OrderType,
        side: Side,
        limit_price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            owner_id,
            order_type,
            side,
            limit_price,
            quantity,
        }
    }

    pub fn limit(id: u64, side: Side, price: i64, quantity: i64) -> Self {
        Self::new(
            OrderId(id),
            OwnerId(id),
            OrderType::Limit,
            side,
            Price::new(price),
            Quantity::new(quantity),
        )
    }

    pub fn market(id: u64, side: Side, quantity: i64) -> Self {
        Self::new(
            OrderId(id),
            OwnerId(id),
            OrderType::Market,
            side,
            Price::ZERO,
            Quantity::new(quantity),
        )
    }

    /// Same order with a different qualifier.
    pub fn with_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = owner_id;
        self
    }

    /// Field checks that need no book state.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if !self.quantity.is_positive() {
            return Err(RejectReason::NonPositiveQuantity(self.quantity));
        }
        if self.order_type.is_priced() && !self.limit_price.is_positive() {
            return Err(RejectReason::NonPositivePrice(self.limit_price));
        }
        Ok(())
    }

    /// Whether this order may trade against a resting order priced at `book_price`.
    pub fn crosses(&self, book_price: Price) -> bool {
        match (self.order_type, self.side) {
            (OrderType::Market, _) => true,
            (_, Side::Buy) => self.limit_price >= book_price,
            (_, Side::Sell) => self.limit_price <= book_price,
        }
    }

    /// The market order a fired stop turns into: same id, owner, side and size.
    pub fn into_triggered(self) -> Self {
        Self {
            order_type: OrderType::Market,
            limit_price: Price::ZERO,
            ..self
        }
    }

    pub fn is_market_order(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn is_stop_order(&self) -> bool {
        matches!(self.order_type, OrderType::StopLoss)
    }
}

// ============================================================================
// Resting Order
// ============================================================================

/// The part of an order kept by the book while it waits for a counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestingOrder {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl RestingOrder {
    pub fn new(id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            id,
            side,
            price,
            quantity,
        }
    }
}

impl From<&Order> for RestingOrder {
    fn from(order: &Order) -> Self {
        Self::new(order.id, order.side, order.limit_price, order.quantity)
    }
}

// ============================================================================
// Ingress Form
// ============================================================================

/// Loosely typed order as received from a transport collaborator.
///
/// Converting it into an [`Order`] is where unknown qualifiers and sides are
/// caught, before anything reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderRequest {
    pub id: u64,
    pub owner_id: u64,
    pub order_type: String,
    pub side: String,
    pub price: i64,
    pub quantity: i64,
}

impl TryFrom<OrderRequest> for Order {
    type Error = RejectionNotice;

    fn try_from(request: OrderRequest) -> Result<Self, Self::Error> {
        let id = OrderId(request.id);
        let reject = |reason| RejectionNotice::new(id, reason);

        let order_type = request.order_type.parse::<OrderType>().map_err(reject)?;
        let side = request.side.parse::<Side>().map_err(reject)?;
        let order = Order::new(
            id,
            OwnerId(request.owner_id),
            order_type,
            side,
            Price::new(request.price),
            Quantity::new(request.quantity),
        );
        order.validate().map_err(reject)?;
        Ok(order)
    }
}
