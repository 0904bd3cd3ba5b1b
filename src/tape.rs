//! Replay adapter: recorded L3 tape rows -> market updates.
//!
//! Recorded feeds carry decimal prices and string order ids; the book
//! wants integer ticks and dense ids. The decoder owns both conversions:
//! fixed-point scaling, and an interner that hands out dense ids in
//! arrival order so the book's direct-index table stays small.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::types::{OrderId, Price, Priority, Qty, Side, TickerId};
use crate::update::{MarketUpdate, UpdateKind};

/// One row of a recorded L3 tape (CSV/JSON shaped, serde-deserialised).
#[derive(Debug, Deserialize)]
pub struct TapeRow {
    /// Row action: "open", "change", "done", "match", "reset".
    pub r#type: String,
    /// "buy"/"bid" or "sell"/"ask"; absent on rows without a side.
    pub side: Option<String>,
    /// Decimal limit price.
    pub price: Option<Decimal>,
    /// Decimal size.
    pub amount: Option<Decimal>,
    /// Venue order id; an opaque string (UUIDs on some venues).
    pub order_id: Option<String>,
    /// Venue timestamp; carried for diagnostics.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Stateful row decoder for one instrument.
pub struct TapeDecoder {
    ticker_id: TickerId,
    /// Ticks per whole price unit (e.g. 100 for cents).
    price_mult: i64,
    /// Quantity units per whole size unit.
    qty_mult: u32,
    /// Venue order id -> dense id, in first-seen order.
    ids: FxHashMap<String, OrderId>,
    next_id: OrderId,
    next_priority: Priority,
}

impl TapeDecoder {
    /// A decoder stamping `ticker_id`, scaling prices by `price_mult`
    /// and sizes by `qty_mult`.
    pub fn new(ticker_id: TickerId, price_mult: i64, qty_mult: u32) -> Self {
        Self {
            ticker_id,
            price_mult,
            qty_mult,
            ids: FxHashMap::default(),
            next_id: 0,
            next_priority: 0,
        }
    }

    /// Convert one row. Returns `None` for row types outside the book's
    /// vocabulary and for cancel/change rows whose order was never seen
    /// (a tape that starts mid-session produces those).
    pub fn decode(&mut self, row: &TapeRow) -> Option<MarketUpdate> {
        let side = match row.side.as_deref() {
            Some("buy") | Some("bid") => Side::Buy,
            Some("sell") | Some("ask") => Side::Sell,
            _ => Side::Invalid,
        };
        let price = self.scale_price(row.price)?;
        let qty = self.scale_qty(row.amount)?;

        match row.r#type.as_str() {
            "open" => {
                let order_id = self.intern(row.order_id.as_deref()?);
                self.next_priority += 1;
                Some(MarketUpdate {
                    kind: UpdateKind::Add,
                    order_id,
                    ticker_id: self.ticker_id,
                    side,
                    price,
                    qty,
                    priority: self.next_priority,
                })
            }
            "change" => {
                let order_id = self.lookup(row.order_id.as_deref()?)?;
                Some(MarketUpdate {
                    kind: UpdateKind::Modify,
                    order_id,
                    ticker_id: self.ticker_id,
                    side,
                    price,
                    qty,
                    ..Default::default()
                })
            }
            "done" => {
                let order_id = self.forget(row.order_id.as_deref()?)?;
                Some(MarketUpdate {
                    kind: UpdateKind::Cancel,
                    order_id,
                    ticker_id: self.ticker_id,
                    side,
                    price,
                    ..Default::default()
                })
            }
            "match" => {
                let order_id = self.lookup(row.order_id.as_deref()?)?;
                Some(MarketUpdate {
                    kind: UpdateKind::Trade,
                    order_id,
                    ticker_id: self.ticker_id,
                    side,
                    price,
                    qty,
                    ..Default::default()
                })
            }
            "reset" => Some(MarketUpdate {
                kind: UpdateKind::Clear,
                ticker_id: self.ticker_id,
                ..Default::default()
            }),
            _ => None,
        }
    }

    /// Dense ids handed out so far.
    pub fn interned(&self) -> usize {
        self.ids.len()
    }

    fn intern(&mut self, raw: &str) -> OrderId {
        *self.ids.entry(raw.to_owned()).or_insert_with(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        })
    }

    fn lookup(&self, raw: &str) -> Option<OrderId> {
        self.ids.get(raw).copied()
    }

    fn forget(&mut self, raw: &str) -> Option<OrderId> {
        self.ids.remove(raw)
    }

    fn scale_price(&self, price: Option<Decimal>) -> Option<Price> {
        match price {
            Some(p) => (p * Decimal::from(self.price_mult)).to_i64(),
            // Rows without a price (e.g. reset) decode with a zero price.
            None => Some(0),
        }
    }

    fn scale_qty(&self, amount: Option<Decimal>) -> Option<Qty> {
        match amount {
            Some(a) => (a * Decimal::from(self.qty_mult)).to_u32(),
            None => Some(0),
        }
    }
}
