//! Percentile latency report for the apply path.
//!
//! Cycles a pre-generated add/cancel stream through the ring and the
//! book, recording per-update wall time into an HDR histogram.

use hdrhistogram::Histogram;
use std::time::Instant;
use tickbook::{ring, Engine, MarketUpdate, OrderBook, Side, UpdateKind, MAX_MARKET_UPDATES};

const WINDOW: u64 = 10_000;
const ITERATIONS: usize = 100;

fn add(order_id: u64, priority: u64) -> MarketUpdate {
    // Bids on ticks 0..64, asks on 64..128: two sides, never one price.
    let (side, price) = if order_id % 2 == 0 {
        (Side::Buy, (order_id % 64) as i64)
    } else {
        (Side::Sell, 64 + (order_id % 64) as i64)
    };
    MarketUpdate {
        kind: UpdateKind::Add,
        order_id,
        ticker_id: 0,
        side,
        price,
        qty: 10,
        priority,
    }
}

fn cancel(order_id: u64) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Cancel,
        order_id,
        ticker_id: 0,
        ..Default::default()
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    println!("Preparing latency benchmark...");
    let (mut producer, mut consumer) = ring::<MarketUpdate>(MAX_MARKET_UPDATES);
    let mut engine = Engine::with_book(OrderBook::new(0));
    engine.pin_to_core();
    engine.warm_up();

    // One window of adds followed by the matching cancels; cycling it
    // holds the live set constant.
    let mut priority = 0u64;
    let mut updates = Vec::with_capacity(2 * WINDOW as usize);
    for id in 0..WINDOW {
        priority += 1;
        updates.push(add(id, priority));
    }
    for id in 0..WINDOW {
        updates.push(cancel(id));
    }

    println!("Warming up branch predictor...");
    for update in &updates {
        producer.push(*update).unwrap();
        engine.drain(&mut consumer);
    }

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 10_000_000, 3).unwrap();
    let total_ops = ITERATIONS * updates.len();
    println!("Running {total_ops} updates through ring and book...");

    let run_start = Instant::now();
    for _ in 0..ITERATIONS {
        for update in &updates {
            producer.push(*update).unwrap();

            let start = Instant::now();
            std::hint::black_box(engine.drain(&mut consumer));
            let elapsed = start.elapsed();

            histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        }
    }
    let total_duration = run_start.elapsed();

    println!("\n=== Apply Latency (ns) ===");
    println!("Total ops:  {total_ops}");
    println!(
        "Throughput: {:.2} ops/sec",
        total_ops as f64 / total_duration.as_secs_f64()
    );
    println!("--------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("Max:    {:6} ns", histogram.max());

    let bbo = engine.book().bbo();
    println!("\nFinal book: {} orders, bbo {bbo:?}", engine.book().order_count());
}
