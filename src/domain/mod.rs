// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod config;
pub mod event;
pub mod heap;
pub mod order;
pub mod order_book;
pub mod stop_register;
pub mod trade;

pub use config::EngineConfig;
pub use event::{MarketEvent, RejectionNotice};
pub use heap::{HeapItem, IndexedHeap};
pub use order::{Order, OrderId, OrderRequest, OrderType, OwnerId, RestingOrder, Side};
pub use order_book::{Fill, OrderBook, OrderBookSide};
pub use stop_register::{StopOrder, StopRegister};
pub use trade::Trade;
