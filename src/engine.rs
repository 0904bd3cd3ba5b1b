//! Apply-thread harness: the consume loop between ring and book.
//!
//! The book is single-threaded; the engine owns it on a dedicated thread,
//! pops updates off the SPSC ring in commit order and applies them one by
//! one. Optional CPU pinning and a page-prefault warm-up keep the hot
//! loop free of faults and migrations.

use crate::book::OrderBook;
use crate::ring::Consumer;
use crate::types::TickerId;
use crate::update::MarketUpdate;

/// Owns one book and drives it from a ring consumer.
pub struct Engine {
    book: OrderBook,
}

impl Engine {
    /// Create an engine around a fresh book for `ticker_id`.
    pub fn new(ticker_id: TickerId) -> Self {
        Self {
            book: OrderBook::new(ticker_id),
        }
    }

    /// Wrap an existing book (e.g. one built with explicit capacities).
    pub fn with_book(book: OrderBook) -> Self {
        Self { book }
    }

    /// Run the apply loop.
    ///
    /// Busy-waits on the ring: updates apply in exactly the order they
    /// were committed, and an empty ring spins with a CPU relax hint.
    /// Runs until the program terminates.
    pub fn run(&mut self, input: &mut Consumer<MarketUpdate>, pin_to_core: bool) -> ! {
        if pin_to_core {
            self.pin_to_core();
        }
        self.warm_up();

        loop {
            while let Some(update) = input.pop() {
                // Malformed updates are already handled per the book's
                // policy; the loop itself never stops for them.
                let _ = self.book.apply(&update);
            }
            std::hint::spin_loop();
        }
    }

    /// Apply everything currently in the ring and return how many
    /// updates were consumed. Entry point for tests and benchmarks.
    pub fn drain(&mut self, input: &mut Consumer<MarketUpdate>) -> usize {
        let mut applied = 0;
        while let Some(update) = input.pop() {
            let _ = self.book.apply(&update);
            applied += 1;
        }
        applied
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically the one isolated from OS interrupts.
    pub fn pin_to_core(&self) {
        if let Some(core_ids) = core_affinity::get_core_ids() {
            if let Some(last_core) = core_ids.last() {
                if core_affinity::set_for_current(*last_core) {
                    tracing::debug!(core = last_core.id, "apply thread pinned");
                }
            }
        }
    }

    /// Pre-fault the book's pools before entering the hot loop.
    pub fn warm_up(&mut self) {
        self.book.warm_up();
    }

    /// The book this engine drives.
    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring;
    use crate::types::Side;
    use crate::update::UpdateKind;

    fn add(order_id: u64, side: Side, price: i64, qty: u32, priority: u64) -> MarketUpdate {
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

    #[test]
    fn test_drain_applies_in_commit_order() {
        let (mut producer, mut consumer) = ring::ring(16);
        let book = OrderBook::with_capacity(0, 256, 32);
        let mut engine = Engine::with_book(book);

        producer.push(add(1, Side::Buy, 100, 10, 1)).unwrap();
        producer.push(add(2, Side::Buy, 101, 5, 2)).unwrap();
        producer
            .push(MarketUpdate {
                kind: UpdateKind::Cancel,
                order_id: 2,
                ticker_id: 0,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(engine.drain(&mut consumer), 3);
        assert_eq!(engine.book().order_count(), 1);
        assert_eq!(engine.book().bbo().bid_price, 100);
    }

    #[test]
    fn test_drain_on_empty_ring() {
        let (_producer, mut consumer) = ring::ring::<MarketUpdate>(4);
        let mut engine = Engine::with_book(OrderBook::with_capacity(0, 64, 16));
        assert_eq!(engine.drain(&mut consumer), 0);
        assert!(engine.book().is_empty());
    }

    #[test]
    fn test_warm_up_leaves_book_untouched() {
        let mut engine = Engine::with_book(OrderBook::with_capacity(0, 64, 16));
        engine.warm_up();
        assert!(engine.book().is_empty());
    }
}
