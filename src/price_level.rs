//! Order and price-level nodes plus their intrusive circular lists.
//!
//! Orders at one (side, price) form a circular doubly-linked FIFO chain;
//! price levels on one side form a circular doubly-linked ladder sorted
//! best-first (bids descending, asks ascending). Both lists are encoded
//! as pool indices: the pool owns the nodes, the lists are weak
//! references by index, and a node stays addressable until the book
//! returns it to its pool.

use crate::pool::{Pool, PoolIndex, NULL_INDEX};
use crate::types::{
    OrderId, Price, Priority, Qty, Side, ORDER_ID_INVALID, PRICE_INVALID, PRIORITY_INVALID,
    QTY_INVALID,
};

/// One resting order. Lives in the book's order pool; `prev`/`next` chain
/// all orders at the same price level in FIFO order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub priority: Priority,
    /// Previous order in the FIFO chain (the tail, seen from the head).
    pub prev: PoolIndex,
    /// Next order in the FIFO chain.
    pub next: PoolIndex,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            order_id: ORDER_ID_INVALID,
            side: Side::Invalid,
            price: PRICE_INVALID,
            qty: QTY_INVALID,
            priority: PRIORITY_INVALID,
            prev: NULL_INDEX,
            next: NULL_INDEX,
        }
    }
}

impl Order {
    /// A fresh unlinked order.
    #[inline]
    pub const fn new(
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
        priority: Priority,
    ) -> Self {
        Self {
            order_id,
            side,
            price,
            qty,
            priority,
            prev: NULL_INDEX,
            next: NULL_INDEX,
        }
    }
}

/// The FIFO queue of orders at one (side, price). Lives in the book's
/// level pool; `prev`/`next` chain the levels of one side best-first.
///
/// A level exists only while it holds at least one order: `first_order`
/// is never `NULL_INDEX` on a live level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLevel {
    pub side: Side,
    pub price: Price,
    /// Head of the FIFO chain: oldest order, lowest priority value.
    pub first_order: PoolIndex,
    /// Previous (better) level on this side's ladder.
    pub prev: PoolIndex,
    /// Next (worse) level on this side's ladder.
    pub next: PoolIndex,
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self {
            side: Side::Invalid,
            price: PRICE_INVALID,
            first_order: NULL_INDEX,
            prev: NULL_INDEX,
            next: NULL_INDEX,
        }
    }
}

impl PriceLevel {
    /// A fresh unlinked level holding `first_order` as its only order.
    #[inline]
    pub const fn new(side: Side, price: Price, first_order: PoolIndex) -> Self {
        Self {
            side,
            price,
            first_order,
            prev: NULL_INDEX,
            next: NULL_INDEX,
        }
    }
}

// ============================================================================
// FIFO chain of orders within one level
// ============================================================================

/// Make `index` a singleton chain pointing at itself both ways.
#[inline]
pub fn link_single(orders: &mut Pool<Order>, index: PoolIndex) {
    let order = orders.get_mut(index);
    order.prev = index;
    order.next = index;
}

/// Append `index` at the tail of the chain headed by `first`
/// (tail = `first.prev`), preserving FIFO order.
#[inline]
pub fn append_order(orders: &mut Pool<Order>, first: PoolIndex, index: PoolIndex) {
    let tail = orders.get(first).prev;
    {
        let order = orders.get_mut(index);
        order.prev = tail;
        order.next = first;
    }
    orders.get_mut(tail).next = index;
    orders.get_mut(first).prev = index;
}

/// Unlink `index` from its chain.
///
/// Returns the successor order, or `NULL_INDEX` when `index` was the
/// chain's only member (the caller then removes the level). The order is
/// NOT freed; the caller owns that.
#[inline]
pub fn unlink_order(orders: &mut Pool<Order>, index: PoolIndex) -> PoolIndex {
    let (prev, next) = {
        let order = orders.get(index);
        (order.prev, order.next)
    };

    if next == index {
        debug_assert_eq!(prev, index);
        return NULL_INDEX;
    }

    orders.get_mut(prev).next = next;
    orders.get_mut(next).prev = prev;

    let order = orders.get_mut(index);
    order.prev = NULL_INDEX;
    order.next = NULL_INDEX;

    next
}

// ============================================================================
// Side ladder of price levels
// ============================================================================

/// Side-specific priority: does price `a` outrank price `b`?
#[inline]
pub const fn better(side: Side, a: Price, b: Price) -> bool {
    match side {
        Side::Buy => a > b,
        Side::Sell => a < b,
        _ => false,
    }
}

/// Splice an unlinked level into the ladder headed by `head`, keeping the
/// ladder sorted best-first. Returns the (possibly new) head.
pub fn insert_level(levels: &mut Pool<PriceLevel>, head: PoolIndex, index: PoolIndex) -> PoolIndex {
    if head == NULL_INDEX {
        let level = levels.get_mut(index);
        level.prev = index;
        level.next = index;
        return index;
    }

    let side = levels.get(index).side;
    let new_price = levels.get(index).price;

    // Walk worse-ward from the head; the new level lands before the first
    // level it outranks. A full circle means it is the worst and lands at
    // the tail (before the head).
    let mut cursor = head;
    loop {
        if better(side, new_price, levels.get(cursor).price) {
            splice_before(levels, cursor, index);
            return if cursor == head { index } else { head };
        }
        cursor = levels.get(cursor).next;
        if cursor == head {
            splice_before(levels, head, index);
            return head;
        }
    }
}

/// Unlink `index` from the ladder headed by `head`.
///
/// Returns the new head: the successor when the head itself left, or
/// `NULL_INDEX` when the ladder emptied. The level is NOT freed; the
/// caller owns that.
pub fn remove_level(levels: &mut Pool<PriceLevel>, head: PoolIndex, index: PoolIndex) -> PoolIndex {
    let (prev, next) = {
        let level = levels.get(index);
        (level.prev, level.next)
    };

    if next == index {
        debug_assert_eq!(head, index);
        clear_links(levels, index);
        return NULL_INDEX;
    }

    levels.get_mut(prev).next = next;
    levels.get_mut(next).prev = prev;
    clear_links(levels, index);

    if index == head {
        next
    } else {
        head
    }
}

#[inline]
fn clear_links(levels: &mut Pool<PriceLevel>, index: PoolIndex) {
    let level = levels.get_mut(index);
    level.prev = NULL_INDEX;
    level.next = NULL_INDEX;
}

#[inline]
fn splice_before(levels: &mut Pool<PriceLevel>, at: PoolIndex, index: PoolIndex) {
    let prev = levels.get(at).prev;
    {
        let level = levels.get_mut(index);
        level.prev = prev;
        level.next = at;
    }
    levels.get_mut(prev).next = index;
    levels.get_mut(at).prev = index;
}
