//! # Tickbook
//!
//! A low-latency market-data limit order book: replays exchange-published
//! update messages into a price-sorted, time-prioritised book of resting
//! orders and derives the best-bid/offer view.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively (no locks)
//! - **Pre-Allocation**: orders and price levels live in fixed pools;
//!   no heap allocation on the hot path
//! - **Index Linkage**: circular intrusive lists encoded as 32-bit pool
//!   indices instead of pointers
//! - **Replay, not matching**: the feed is the source of truth; trades
//!   arrive as messages and never cross the book locally
//!
//! ## Architecture
//!
//! ```text
//! [Feed Thread] --> [SPSC Ring Buffer] --> [Apply Thread (Pinned)]
//!                                                  |
//!                                          [Book + BBO View]
//! ```

pub mod book;
pub mod engine;
pub mod pool;
pub mod price_level;
pub mod ring;
pub mod tape;
pub mod types;
pub mod update;

// Re-exports for convenience
pub use book::{ApplyError, Bbo, OrderBook, Policy};
pub use engine::Engine;
pub use pool::{Pool, PoolIndex, NULL_INDEX};
pub use price_level::{Order, PriceLevel};
pub use ring::{ring, Consumer, Producer};
pub use tape::{TapeDecoder, TapeRow};
pub use types::{
    OrderId, Price, Priority, Qty, Side, TickerId, MAX_MARKET_UPDATES, MAX_ORDER_IDS,
    MAX_PRICE_LEVELS, MAX_TICKERS, ORDER_ID_INVALID, PRICE_INVALID, PRIORITY_INVALID, QTY_INVALID,
    TICKER_ID_INVALID,
};
pub use update::{MarketUpdate, SequencedUpdate, UpdateKind, WireError};
