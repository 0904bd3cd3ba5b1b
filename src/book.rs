//! The market-data limit order book.
//!
//! Replays exchange-published update messages into a price-sorted,
//! time-prioritised book of resting orders and keeps the best-bid/offer
//! view current. This is a replay book: there is no matching here, an
//! aggressive fill arrives from the feed as TRADE followed by the
//! CANCEL/MODIFY messages that mutate the book.
//!
//! Lookup is O(1) through two direct-index tables: order ids index the
//! order table directly (ids are dense from a known generator), and
//! `price mod level-capacity` indexes the level table (live price ticks
//! fit the table without collision — a pre-agreed domain assumption that
//! is checked, and fatal when broken).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::{Pool, PoolIndex, NULL_INDEX};
use crate::price_level::{
    append_order, insert_level, link_single, remove_level, unlink_order, Order, PriceLevel,
};
use crate::types::{
    OrderId, Price, Qty, Side, TickerId, MAX_ORDER_IDS, MAX_PRICE_LEVELS, PRICE_INVALID,
    QTY_INVALID,
};
use crate::update::{MarketUpdate, UpdateKind};

/// Best bid and offer: top-of-book price and aggregate quantity per side.
/// Sentinel values mark an empty side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bbo {
    pub bid_price: Price,
    pub bid_qty: Qty,
    pub ask_price: Price,
    pub ask_qty: Qty,
}

impl Default for Bbo {
    fn default() -> Self {
        Self {
            bid_price: PRICE_INVALID,
            bid_qty: QTY_INVALID,
            ask_price: PRICE_INVALID,
            ask_qty: QTY_INVALID,
        }
    }
}

/// What the book does with a malformed update. One switch for the whole
/// book, not per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Policy {
    /// Terminate on the first malformed update (development default).
    #[default]
    Fatal,
    /// Drop the update, log a warning, count it, surface the error.
    Report,
}

/// A malformed update, rejected under [`Policy::Report`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    /// ADD for an order id that is already live.
    #[error("duplicate add for live order id {0}")]
    DuplicateOrder(OrderId),
    /// MODIFY or CANCEL for an id with no resting order.
    #[error("unknown order id {0}")]
    UnknownOrder(OrderId),
    /// ADD or MODIFY with zero quantity.
    #[error("zero quantity for order id {0}")]
    ZeroQty(OrderId),
    /// Order id does not fit the direct-index table.
    #[error("order id {0} outside the index range")]
    OrderIdOutOfRange(OrderId),
    /// ADD without a tradable side.
    #[error("side {0} is not tradable")]
    BadSide(Side),
    /// Update kind tag INVALID.
    #[error("invalid update kind")]
    InvalidKind,
}

/// Per-instrument limit order book.
pub struct OrderBook {
    ticker_id: TickerId,
    orders: Pool<Order>,
    levels: Pool<PriceLevel>,
    /// Best bid level, `NULL_INDEX` when the side is empty.
    bid_head: PoolIndex,
    /// Best ask level, `NULL_INDEX` when the side is empty.
    ask_head: PoolIndex,
    /// Direct index: order id -> order pool slot.
    order_index: Box<[PoolIndex]>,
    /// Direct index: price hash -> level pool slot.
    price_index: Box<[PoolIndex]>,
    bbo: Bbo,
    policy: Policy,
    /// Malformed updates dropped under [`Policy::Report`].
    dropped: u64,
}

impl OrderBook {
    /// Create a book with the default capacities
    /// ([`MAX_ORDER_IDS`], [`MAX_PRICE_LEVELS`]).
    pub fn new(ticker_id: TickerId) -> Self {
        Self::with_capacity(ticker_id, MAX_ORDER_IDS, MAX_PRICE_LEVELS)
    }

    /// Create a book with explicit pool/index capacities.
    pub fn with_capacity(ticker_id: TickerId, order_capacity: usize, level_capacity: usize) -> Self {
        tracing::debug!(ticker_id, order_capacity, level_capacity, "constructing order book");
        Self {
            ticker_id,
            orders: Pool::new(order_capacity),
            levels: Pool::new(level_capacity),
            bid_head: NULL_INDEX,
            ask_head: NULL_INDEX,
            order_index: vec![NULL_INDEX; order_capacity].into_boxed_slice(),
            price_index: vec![NULL_INDEX; level_capacity].into_boxed_slice(),
            bbo: Bbo::default(),
            policy: Policy::default(),
            dropped: 0,
        }
    }

    /// Set the malformed-update policy; builder form.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Switch the malformed-update policy.
    pub fn set_policy(&mut self, policy: Policy) {
        self.policy = policy;
    }

    // ========================================================================
    // Update application
    // ========================================================================

    /// Apply one market update. The single public mutator.
    ///
    /// Non-fatal rejects (malformed updates under [`Policy::Report`]) come
    /// back as `Err`; structural-invariant violations are fatal.
    pub fn apply(&mut self, update: &MarketUpdate) -> Result<(), ApplyError> {
        match update.kind {
            UpdateKind::Add => self.apply_add(update),
            UpdateKind::Modify => self.apply_modify(update),
            UpdateKind::Cancel => self.apply_cancel(update),
            // Informational; book state changes via the follow-up
            // CANCEL/MODIFY messages from the feed.
            UpdateKind::Trade => Ok(()),
            UpdateKind::Clear => {
                self.clear();
                Ok(())
            }
            // Transparent framing for a higher layer.
            UpdateKind::SnapshotStart | UpdateKind::SnapshotEnd => Ok(()),
            UpdateKind::Invalid => self.reject(ApplyError::InvalidKind),
        }
    }

    fn apply_add(&mut self, update: &MarketUpdate) -> Result<(), ApplyError> {
        if !update.side.is_tradable() {
            return self.reject(ApplyError::BadSide(update.side));
        }
        if update.qty == 0 {
            return self.reject(ApplyError::ZeroQty(update.order_id));
        }
        let Some(order_slot) = self.order_slot(update.order_id) else {
            return self.reject(ApplyError::OrderIdOutOfRange(update.order_id));
        };
        if self.order_index[order_slot] != NULL_INDEX {
            return self.reject(ApplyError::DuplicateOrder(update.order_id));
        }

        let order_idx = self.orders.allocate(Order::new(
            update.order_id,
            update.side,
            update.price,
            update.qty,
            update.priority,
        ));

        let price_slot = self.price_slot(update.price);
        let existing = self.price_index[price_slot];
        if existing != NULL_INDEX {
            let level = self.levels.get(existing);
            if level.price != update.price || level.side != update.side {
                tracing::error!(
                    ticker_id = self.ticker_id,
                    slot = price_slot,
                    held_price = level.price,
                    held_side = %level.side,
                    new_price = update.price,
                    new_side = %update.side,
                    "price index collision"
                );
                panic!(
                    "price index collision: slot {price_slot} holds {} {}, update carries {} {}",
                    level.side, level.price, update.side, update.price
                );
            }
            // Existing level: the new order joins the FIFO tail.
            let first = level.first_order;
            append_order(&mut self.orders, first, order_idx);
        } else {
            // First order at this price: new level, spliced into the ladder.
            link_single(&mut self.orders, order_idx);
            let level_idx = self
                .levels
                .allocate(PriceLevel::new(update.side, update.price, order_idx));
            self.price_index[price_slot] = level_idx;
            match update.side {
                Side::Buy => {
                    self.bid_head = insert_level(&mut self.levels, self.bid_head, level_idx);
                }
                Side::Sell => {
                    self.ask_head = insert_level(&mut self.levels, self.ask_head, level_idx);
                }
                _ => unreachable!(),
            }
        }

        self.order_index[order_slot] = order_idx;
        self.refresh_bbo(update.side);
        Ok(())
    }

    fn apply_modify(&mut self, update: &MarketUpdate) -> Result<(), ApplyError> {
        let Some(order_slot) = self.order_slot(update.order_id) else {
            return self.reject(ApplyError::OrderIdOutOfRange(update.order_id));
        };
        let order_idx = self.order_index[order_slot];
        if order_idx == NULL_INDEX {
            return self.reject(ApplyError::UnknownOrder(update.order_id));
        }
        if update.qty == 0 {
            return self.reject(ApplyError::ZeroQty(update.order_id));
        }

        // Size change only; the order keeps its place in the FIFO queue.
        let side = {
            let order = self.orders.get_mut(order_idx);
            order.qty = update.qty;
            order.side
        };
        self.refresh_bbo(side);
        Ok(())
    }

    fn apply_cancel(&mut self, update: &MarketUpdate) -> Result<(), ApplyError> {
        let Some(order_slot) = self.order_slot(update.order_id) else {
            return self.reject(ApplyError::OrderIdOutOfRange(update.order_id));
        };
        let order_idx = self.order_index[order_slot];
        if order_idx == NULL_INDEX {
            return self.reject(ApplyError::UnknownOrder(update.order_id));
        }

        let (side, price) = {
            let order = self.orders.get(order_idx);
            (order.side, order.price)
        };
        let price_slot = self.price_slot(price);
        let level_idx = self.price_index[price_slot];
        debug_assert_ne!(level_idx, NULL_INDEX, "live order without a level");

        let successor = unlink_order(&mut self.orders, order_idx);
        if successor == NULL_INDEX {
            // Last order at this price: the level goes too.
            let head = self.side_head(side);
            let new_head = remove_level(&mut self.levels, head, level_idx);
            self.set_side_head(side, new_head);
            self.levels.deallocate(level_idx);
            self.price_index[price_slot] = NULL_INDEX;
        } else if self.levels.get(level_idx).first_order == order_idx {
            self.levels.get_mut(level_idx).first_order = successor;
        }

        self.orders.deallocate(order_idx);
        self.order_index[order_slot] = NULL_INDEX;
        self.refresh_bbo(side);
        Ok(())
    }

    /// Drop everything and return to the post-construction state.
    /// A CLEAR is a re-synchronisation boundary, not an error.
    fn clear(&mut self) {
        for slot in self.order_index.iter_mut() {
            if *slot != NULL_INDEX {
                self.orders.deallocate(*slot);
                *slot = NULL_INDEX;
            }
        }

        for head in [self.bid_head, self.ask_head] {
            if head != NULL_INDEX {
                let mut cursor = self.levels.get(head).next;
                while cursor != head {
                    let next = self.levels.get(cursor).next;
                    self.levels.deallocate(cursor);
                    cursor = next;
                }
                self.levels.deallocate(head);
            }
        }

        self.bid_head = NULL_INDEX;
        self.ask_head = NULL_INDEX;
        self.price_index.fill(NULL_INDEX);
        self.bbo = Bbo::default();
        tracing::debug!(ticker_id = self.ticker_id, "order book cleared");
    }

    fn reject(&mut self, err: ApplyError) -> Result<(), ApplyError> {
        match self.policy {
            Policy::Fatal => {
                tracing::error!(ticker_id = self.ticker_id, %err, "malformed market update");
                panic!("malformed market update: {err}");
            }
            Policy::Report => {
                self.dropped += 1;
                tracing::warn!(ticker_id = self.ticker_id, %err, "dropping malformed market update");
                Err(err)
            }
        }
    }

    // ========================================================================
    // BBO maintenance
    // ========================================================================

    /// Recompute one side of the BBO from the current ladder head:
    /// head price plus the quantity sum over the head level's FIFO chain.
    fn refresh_bbo(&mut self, side: Side) {
        let head = self.side_head(side);
        let (price, qty) = if head == NULL_INDEX {
            (PRICE_INVALID, QTY_INVALID)
        } else {
            let level = self.levels.get(head);
            let first = level.first_order;
            let mut qty = self.orders.get(first).qty;
            let mut cursor = self.orders.get(first).next;
            while cursor != first {
                qty += self.orders.get(cursor).qty;
                cursor = self.orders.get(cursor).next;
            }
            (level.price, qty)
        };

        match side {
            Side::Buy => {
                self.bbo.bid_price = price;
                self.bbo.bid_qty = qty;
            }
            Side::Sell => {
                self.bbo.ask_price = price;
                self.bbo.ask_qty = qty;
            }
            _ => {}
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Last-computed best bid/offer. Reflects every update applied before
    /// the call in the single-threaded book model.
    #[inline]
    pub fn bbo(&self) -> &Bbo {
        &self.bbo
    }

    /// Instrument this book replays.
    #[inline]
    pub fn ticker_id(&self) -> TickerId {
        self.ticker_id
    }

    /// Number of resting orders.
    #[inline]
    pub fn order_count(&self) -> u32 {
        self.orders.live()
    }

    /// Number of live price levels across both sides.
    #[inline]
    pub fn level_count(&self) -> u32 {
        self.levels.live()
    }

    /// Returns true when no orders rest in the book.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Malformed updates dropped under [`Policy::Report`].
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Ladder snapshot for one side, best-first: (price, aggregate qty)
    /// per level.
    pub fn depth(&self, side: Side) -> Vec<(Price, Qty)> {
        let head = self.side_head(side);
        let mut out = Vec::new();
        if head == NULL_INDEX {
            return out;
        }
        let mut level_idx = head;
        loop {
            let level = self.levels.get(level_idx);
            let first = level.first_order;
            let mut qty = self.orders.get(first).qty;
            let mut cursor = self.orders.get(first).next;
            while cursor != first {
                qty += self.orders.get(cursor).qty;
                cursor = self.orders.get(cursor).next;
            }
            out.push((level.price, qty));
            level_idx = level.next;
            if level_idx == head {
                break;
            }
        }
        out
    }

    /// Resting quantity of one order, if live. Intended for tests and
    /// diagnostics; the hot path never looks orders up by id twice.
    pub fn resting_qty(&self, order_id: OrderId) -> Option<Qty> {
        let slot = self.order_slot(order_id)?;
        let order_idx = self.order_index[slot];
        if order_idx == NULL_INDEX {
            return None;
        }
        Some(self.orders.get(order_idx).qty)
    }

    /// Pre-fault both pools before entering the hot loop.
    pub fn warm_up(&mut self) {
        self.orders.warm_up();
        self.levels.warm_up();
    }

    // ========================================================================
    // Internal lookups
    // ========================================================================

    #[inline]
    fn order_slot(&self, order_id: OrderId) -> Option<usize> {
        let slot = order_id as usize;
        (slot < self.order_index.len()).then_some(slot)
    }

    #[inline]
    fn price_slot(&self, price: Price) -> usize {
        price.rem_euclid(self.price_index.len() as i64) as usize
    }

    #[inline]
    fn side_head(&self, side: Side) -> PoolIndex {
        match side {
            Side::Buy => self.bid_head,
            _ => self.ask_head,
        }
    }

    #[inline]
    fn set_side_head(&mut self, side: Side, head: PoolIndex) {
        match side {
            Side::Buy => self.bid_head = head,
            _ => self.ask_head = head,
        }
    }

    /// Walk one side's ladder asserting the sort invariant; returns the
    /// prices best-first. Test support.
    #[cfg(test)]
    fn assert_sorted(&self, side: Side) -> Vec<Price> {
        use crate::price_level::better;
        let prices: Vec<Price> = self.depth(side).iter().map(|&(p, _)| p).collect();
        for pair in prices.windows(2) {
            assert!(better(side, pair[0], pair[1]), "ladder out of order: {prices:?}");
        }
        prices
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("ticker_id", &self.ticker_id)
            .field("orders", &self.orders.live())
            .field("levels", &self.levels.live())
            .field("bbo", &self.bbo)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(order_id: OrderId, side: Side, price: Price, qty: Qty, priority: u64) -> MarketUpdate {
        MarketUpdate {
            kind: UpdateKind::Add,
            order_id,
            ticker_id: 0,
            side,
            price,
            qty,
            priority,
        }
    }

    fn cancel(order_id: OrderId) -> MarketUpdate {
        MarketUpdate {
            kind: UpdateKind::Cancel,
            order_id,
            ticker_id: 0,
            ..Default::default()
        }
    }

    fn modify(order_id: OrderId, qty: Qty) -> MarketUpdate {
        MarketUpdate {
            kind: UpdateKind::Modify,
            order_id,
            ticker_id: 0,
            qty,
            ..Default::default()
        }
    }

    fn small_book() -> OrderBook {
        OrderBook::with_capacity(0, 1024, 64)
    }

    #[test]
    fn test_empty_book() {
        let book = small_book();
        assert!(book.is_empty());
        assert_eq!(*book.bbo(), Bbo::default());
        assert_eq!(book.depth(Side::Buy), vec![]);
        assert_eq!(book.depth(Side::Sell), vec![]);
    }

    #[test]
    fn test_add_sets_bbo() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();

        assert_eq!(book.bbo().bid_price, 100);
        assert_eq!(book.bbo().bid_qty, 10);
        assert_eq!(book.bbo().ask_price, PRICE_INVALID);
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.level_count(), 1);
    }

    #[test]
    fn test_same_level_aggregates_qty() {
        let mut book = small_book();
        book.apply(&add(1, Side::Sell, 200, 4, 1)).unwrap();
        book.apply(&add(2, Side::Sell, 200, 6, 2)).unwrap();

        assert_eq!(book.bbo().ask_price, 200);
        assert_eq!(book.bbo().ask_qty, 10);
        assert_eq!(book.level_count(), 1);
    }

    #[test]
    fn test_better_price_takes_top() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        book.apply(&add(2, Side::Buy, 101, 5, 2)).unwrap();

        assert_eq!(book.bbo().bid_price, 101);
        assert_eq!(book.bbo().bid_qty, 5);
        assert_eq!(book.assert_sorted(Side::Buy), vec![101, 100]);
    }

    #[test]
    fn test_worse_price_leaves_top_alone() {
        let mut book = small_book();
        book.apply(&add(1, Side::Sell, 200, 4, 1)).unwrap();
        book.apply(&add(2, Side::Sell, 205, 9, 2)).unwrap();

        assert_eq!(book.bbo().ask_price, 200);
        assert_eq!(book.bbo().ask_qty, 4);
        assert_eq!(book.assert_sorted(Side::Sell), vec![200, 205]);
    }

    #[test]
    fn test_crossed_prices_are_legal() {
        // A replay book records what the exchange published; a resting bid
        // above a resting ask is not an error here.
        let mut book = small_book();
        book.apply(&add(1, Side::Sell, 200, 4, 1)).unwrap();
        book.apply(&add(2, Side::Buy, 201, 2, 2)).unwrap();

        assert_eq!(book.bbo().bid_price, 201);
        assert_eq!(book.bbo().ask_price, 200);
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_modify_overwrites_qty_keeps_priority() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 50, 10, 1)).unwrap();
        book.apply(&add(2, Side::Buy, 50, 7, 2)).unwrap();
        book.apply(&modify(1, 3)).unwrap();

        assert_eq!(book.resting_qty(1), Some(3));
        assert_eq!(book.bbo().bid_qty, 10);

        // Order 1 is still first in the FIFO: cancelling it must leave
        // order 2 as the level head.
        book.apply(&cancel(1)).unwrap();
        assert_eq!(book.bbo().bid_qty, 7);
    }

    #[test]
    fn test_cancel_drops_empty_level() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 50, 1, 1)).unwrap();
        book.apply(&add(2, Side::Buy, 50, 1, 2)).unwrap();
        book.apply(&cancel(1)).unwrap();
        assert_eq!(book.level_count(), 1);

        book.apply(&cancel(2)).unwrap();
        assert_eq!(book.level_count(), 0);
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.bbo().bid_price, PRICE_INVALID);
        assert_eq!(book.bbo().bid_qty, QTY_INVALID);
    }

    #[test]
    fn test_cancel_mid_ladder_keeps_top() {
        let mut book = small_book();
        book.apply(&add(1, Side::Sell, 200, 1, 1)).unwrap();
        book.apply(&add(2, Side::Sell, 201, 2, 2)).unwrap();
        book.apply(&add(3, Side::Sell, 202, 3, 3)).unwrap();

        book.apply(&cancel(2)).unwrap();
        assert_eq!(book.assert_sorted(Side::Sell), vec![200, 202]);
        assert_eq!(book.bbo().ask_price, 200);
    }

    #[test]
    fn test_trade_is_a_no_op() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        let before = *book.bbo();

        let trade = MarketUpdate {
            kind: UpdateKind::Trade,
            order_id: 1,
            side: Side::Buy,
            price: 100,
            qty: 5,
            ..Default::default()
        };
        book.apply(&trade).unwrap();

        assert_eq!(*book.bbo(), before);
        assert_eq!(book.resting_qty(1), Some(10));
    }

    #[test]
    fn test_snapshot_framing_is_transparent() {
        let mut book = small_book();
        let start = MarketUpdate {
            kind: UpdateKind::SnapshotStart,
            ..Default::default()
        };
        let end = MarketUpdate {
            kind: UpdateKind::SnapshotEnd,
            ..Default::default()
        };
        book.apply(&start).unwrap();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        book.apply(&end).unwrap();

        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bbo().bid_price, 100);
    }

    #[test]
    fn test_clear_resets_to_initial_state() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        book.apply(&add(2, Side::Sell, 101, 5, 2)).unwrap();
        book.apply(&add(3, Side::Sell, 102, 5, 3)).unwrap();

        let clear = MarketUpdate {
            kind: UpdateKind::Clear,
            ..Default::default()
        };
        book.apply(&clear).unwrap();

        assert!(book.is_empty());
        assert_eq!(book.level_count(), 0);
        assert_eq!(*book.bbo(), Bbo::default());
        assert_eq!(book.depth(Side::Buy), vec![]);
        assert_eq!(book.depth(Side::Sell), vec![]);

        // The book accepts updates again: CLEAR is a re-sync boundary.
        book.apply(&add(4, Side::Buy, 99, 1, 4)).unwrap();
        assert_eq!(book.bbo().bid_price, 99);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        let clear = MarketUpdate {
            kind: UpdateKind::Clear,
            ..Default::default()
        };
        book.apply(&clear).unwrap();
        book.apply(&clear).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    #[should_panic(expected = "malformed market update")]
    fn test_duplicate_add_is_fatal_by_default() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        let _ = book.apply(&add(1, Side::Buy, 101, 5, 2));
    }

    #[test]
    fn test_report_policy_drops_and_counts() {
        let mut book = small_book().with_policy(Policy::Report);

        book.apply(&add(1, Side::Buy, 100, 10, 1)).unwrap();
        assert_eq!(
            book.apply(&add(1, Side::Buy, 101, 5, 2)),
            Err(ApplyError::DuplicateOrder(1))
        );
        assert_eq!(book.apply(&cancel(42)), Err(ApplyError::UnknownOrder(42)));
        assert_eq!(
            book.apply(&add(2, Side::Buy, 100, 0, 3)),
            Err(ApplyError::ZeroQty(2))
        );
        assert_eq!(book.apply(&modify(1, 0)), Err(ApplyError::ZeroQty(1)));
        assert_eq!(
            book.apply(&add(3, Side::Invalid, 100, 5, 4)),
            Err(ApplyError::BadSide(Side::Invalid))
        );
        assert_eq!(
            book.apply(&add(99_999_999, Side::Buy, 100, 5, 5)),
            Err(ApplyError::OrderIdOutOfRange(99_999_999))
        );
        let invalid = MarketUpdate::default();
        assert_eq!(book.apply(&invalid), Err(ApplyError::InvalidKind));

        assert_eq!(book.dropped(), 7);
        // The live state never changed past the first good add.
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.bbo().bid_price, 100);
    }

    #[test]
    #[should_panic(expected = "price index collision")]
    fn test_price_hash_collision_is_fatal() {
        // Level table of 64 slots: 10 and 74 hash to the same slot.
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 10, 1, 1)).unwrap();
        let _ = book.apply(&add(2, Side::Buy, 74, 1, 2));
    }

    #[test]
    #[should_panic(expected = "price index collision")]
    fn test_shared_price_across_sides_is_fatal() {
        // One shared price table cannot hold a live bid and ask at the
        // same price; the domain guarantees this never happens.
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, 10, 1, 1)).unwrap();
        let _ = book.apply(&add(2, Side::Sell, 10, 1, 2));
    }

    #[test]
    fn test_negative_price_stays_in_range() {
        let mut book = small_book();
        book.apply(&add(1, Side::Buy, -5, 3, 1)).unwrap();
        assert_eq!(book.bbo().bid_price, -5);
        book.apply(&cancel(1)).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_bbo_matches_rescan_after_churn() {
        let mut book = small_book();
        for i in 0..10u64 {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let price = if side == Side::Buy { 100 - i as i64 } else { 110 + i as i64 };
            book.apply(&add(i, side, price, 10 + i as u32, i)).unwrap();
        }
        for i in [0u64, 3, 4, 7] {
            book.apply(&cancel(i)).unwrap();
        }

        let bids = book.depth(Side::Buy);
        let asks = book.depth(Side::Sell);
        assert_eq!(book.bbo().bid_price, bids[0].0);
        assert_eq!(book.bbo().bid_qty, bids[0].1);
        assert_eq!(book.bbo().ask_price, asks[0].0);
        assert_eq!(book.bbo().ask_qty, asks[0].1);
    }
}
