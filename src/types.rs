//! Scalar domain types, sentinels and capacity constants.
//!
//! Every integer field uses the maximum value of its domain as the
//! "invalid" marker, so a zeroed buffer never looks like a valid message.

use serde::{Deserialize, Serialize};

/// Unique identifier of a resting order within one book.
pub type OrderId = u64;
/// Sentinel for "no order".
pub const ORDER_ID_INVALID: OrderId = OrderId::MAX;

/// Opaque identifier of one trading instrument.
pub type TickerId = u32;
/// Sentinel for "no ticker".
pub const TICKER_ID_INVALID: TickerId = TickerId::MAX;

/// Fixed-point price in ticks.
pub type Price = i64;
/// Sentinel for "no price".
pub const PRICE_INVALID: Price = Price::MAX;

/// Order quantity. Strictly positive while an order rests in the book.
pub type Qty = u32;
/// Sentinel for "no quantity".
pub const QTY_INVALID: Qty = Qty::MAX;

/// Position in the FIFO queue of all orders at one (side, price).
/// Strictly increasing with arrival time; lower value = older = first.
pub type Priority = u64;
/// Sentinel for "no priority".
pub const PRIORITY_INVALID: Priority = Priority::MAX;

// Upper bounds on the containers of the core. Order ids are dense from a
// known generator, live price ticks fit in MAX_PRICE_LEVELS slots.

/// Trading instruments live in `[0, MAX_TICKERS)`.
pub const MAX_TICKERS: usize = 8;
/// Capacity of the order pool and the order-id index.
pub const MAX_ORDER_IDS: usize = 1024 * 1024;
/// Capacity of the price-level pool and the price index.
pub const MAX_PRICE_LEVELS: usize = 256;
/// Capacity of the market-update ring between ingestion and apply thread.
pub const MAX_MARKET_UPDATES: usize = 256 * 1024;

/// Order side. The discriminants are the wire encoding.
///
/// `Max` is not a tradable side; it is the array-sizing bound carried in the
/// wire enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i8)]
pub enum Side {
    /// Not a side; the zero value of the wire encoding.
    #[default]
    Invalid = 0,
    /// Buy side (bids).
    Buy = 1,
    /// Sell side (asks).
    Sell = -1,
    /// Upper bound marker.
    Max = 2,
}

impl Side {
    /// Decode a wire byte. Returns `None` for bytes outside the enum.
    #[inline]
    pub const fn from_wire(raw: i8) -> Option<Self> {
        match raw {
            0 => Some(Side::Invalid),
            1 => Some(Side::Buy),
            -1 => Some(Side::Sell),
            2 => Some(Side::Max),
            _ => None,
        }
    }

    /// Returns true for the two tradable sides.
    #[inline]
    pub const fn is_tradable(self) -> bool {
        matches!(self, Side::Buy | Side::Sell)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Invalid => "INVALID",
            Side::Max => "MAX",
        };
        f.write_str(s)
    }
}
