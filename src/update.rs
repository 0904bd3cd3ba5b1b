//! Market-data update messages and their wire codec.
//!
//! One [`MarketUpdate`] describes one mutation of the book. The wire
//! layout is bit-exact little-endian with no padding, so a record can be
//! copied into a network frame without translation. The publisher-facing
//! [`SequencedUpdate`] prepends a monotonic sequence number.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    OrderId, Price, Priority, Qty, Side, TickerId, ORDER_ID_INVALID, PRICE_INVALID,
    PRIORITY_INVALID, QTY_INVALID, TICKER_ID_INVALID,
};

/// The action carried by a market update. Discriminants are the wire tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum UpdateKind {
    /// Not an action; the zero value of the wire encoding.
    #[default]
    Invalid = 0,
    /// Drop the whole book; a re-synchronisation boundary.
    Clear = 1,
    /// A new resting order.
    Add = 2,
    /// Quantity change on a resting order.
    Modify = 3,
    /// Removal of a resting order.
    Cancel = 4,
    /// Informational execution report; the book does not change.
    Trade = 5,
    /// Start of a snapshot replay frame.
    SnapshotStart = 6,
    /// End of a snapshot replay frame.
    SnapshotEnd = 7,
}

impl UpdateKind {
    /// Decode a wire tag. Returns `None` for bytes outside the enum.
    #[inline]
    pub const fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(UpdateKind::Invalid),
            1 => Some(UpdateKind::Clear),
            2 => Some(UpdateKind::Add),
            3 => Some(UpdateKind::Modify),
            4 => Some(UpdateKind::Cancel),
            5 => Some(UpdateKind::Trade),
            6 => Some(UpdateKind::SnapshotStart),
            7 => Some(UpdateKind::SnapshotEnd),
            _ => None,
        }
    }
}

/// Decode failure for a wire frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The update-kind tag byte is outside the enum.
    #[error("unknown update kind tag {0}")]
    UnknownKind(u8),
    /// The side byte is outside the enum.
    #[error("unknown side byte {0}")]
    UnknownSide(i8),
}

/// One mutation of the order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketUpdate {
    /// What happened.
    pub kind: UpdateKind,
    /// The order concerned (sentinel for CLEAR / snapshot framing).
    pub order_id: OrderId,
    /// Instrument the update belongs to.
    pub ticker_id: TickerId,
    /// Side of the order concerned.
    pub side: Side,
    /// Limit price in ticks.
    pub price: Price,
    /// Quantity: full resting size on ADD, replacement size on MODIFY,
    /// executed size on TRADE.
    pub qty: Qty,
    /// FIFO position within (side, price); strictly increasing from the feed.
    pub priority: Priority,
}

impl Default for MarketUpdate {
    fn default() -> Self {
        Self {
            kind: UpdateKind::Invalid,
            order_id: ORDER_ID_INVALID,
            ticker_id: TICKER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            priority: PRIORITY_INVALID,
        }
    }
}

impl MarketUpdate {
    /// Encoded size: `[u8][u64][u32][i8][i64][u32][u64]`, no padding.
    pub const WIRE_SIZE: usize = 34;

    /// Encode into the bit-exact little-endian wire layout.
    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0] = self.kind as u8;
        buf[1..9].copy_from_slice(&self.order_id.to_le_bytes());
        buf[9..13].copy_from_slice(&self.ticker_id.to_le_bytes());
        buf[13] = self.side as i8 as u8;
        buf[14..22].copy_from_slice(&self.price.to_le_bytes());
        buf[22..26].copy_from_slice(&self.qty.to_le_bytes());
        buf[26..34].copy_from_slice(&self.priority.to_le_bytes());
        buf
    }

    /// Decode a wire frame. Rejects unknown kind and side tags.
    pub fn from_wire(buf: &[u8; Self::WIRE_SIZE]) -> Result<Self, WireError> {
        let kind = UpdateKind::from_wire(buf[0]).ok_or(WireError::UnknownKind(buf[0]))?;
        let side_raw = buf[13] as i8;
        let side = Side::from_wire(side_raw).ok_or(WireError::UnknownSide(side_raw))?;

        Ok(Self {
            kind,
            order_id: u64::from_le_bytes(buf[1..9].try_into().unwrap()),
            ticker_id: u32::from_le_bytes(buf[9..13].try_into().unwrap()),
            side,
            price: i64::from_le_bytes(buf[14..22].try_into().unwrap()),
            qty: u32::from_le_bytes(buf[22..26].try_into().unwrap()),
            priority: u64::from_le_bytes(buf[26..34].try_into().unwrap()),
        })
    }
}

/// Publisher-facing update: a [`MarketUpdate`] behind a monotonic
/// sequence number, so consumers can detect gaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequencedUpdate {
    /// Monotonic per-stream sequence number.
    pub seq_num: u64,
    /// The wrapped update.
    pub update: MarketUpdate,
}

impl SequencedUpdate {
    /// Encoded size: `[u64 seq]` followed by the inner update.
    pub const WIRE_SIZE: usize = 8 + MarketUpdate::WIRE_SIZE;

    /// Encode into the bit-exact little-endian wire layout.
    pub fn to_wire(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[..8].copy_from_slice(&self.seq_num.to_le_bytes());
        buf[8..].copy_from_slice(&self.update.to_wire());
        buf
    }

    /// Decode a wire frame.
    pub fn from_wire(buf: &[u8; Self::WIRE_SIZE]) -> Result<Self, WireError> {
        let inner: &[u8; MarketUpdate::WIRE_SIZE] = buf[8..].try_into().unwrap();
        Ok(Self {
            seq_num: u64::from_le_bytes(buf[..8].try_into().unwrap()),
            update: MarketUpdate::from_wire(inner)?,
        })
    }
}
