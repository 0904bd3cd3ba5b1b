//! Ring hand-off tests: capacity accounting in one thread, then order
//! and content preservation across a real producer/consumer thread pair.

use std::thread;
use tickbook::{ring, MarketUpdate, Side, UpdateKind};

fn update(order_id: u64) -> MarketUpdate {
    MarketUpdate {
        kind: UpdateKind::Add,
        order_id,
        ticker_id: 0,
        side: if order_id % 2 == 0 { Side::Buy } else { Side::Sell },
        price: 9_000 + (order_id % 100) as i64,
        qty: 1 + (order_id % 500) as u32,
        priority: order_id,
    }
}

#[test]
fn test_fill_drain_refill() {
    const CAPACITY: usize = 64;
    let (mut producer, mut consumer) = ring::<MarketUpdate>(CAPACITY);

    // Fill to capacity - 1.
    for i in 0..(CAPACITY - 1) as u64 {
        producer.push(update(i)).unwrap();
    }
    assert_eq!(producer.len(), CAPACITY - 1);

    // Drain fully, order and content intact.
    for i in 0..(CAPACITY - 1) as u64 {
        assert_eq!(consumer.pop(), Some(update(i)));
    }
    assert!(consumer.pop().is_none());
    assert_eq!(consumer.len(), 0);

    // Refill to the brim: the wrapped storage still holds every message.
    for i in 100..100 + CAPACITY as u64 {
        producer.push(update(i)).unwrap();
    }
    assert!(producer.next_write_slot().is_none(), "ring must report full");
    for i in 100..100 + CAPACITY as u64 {
        assert_eq!(consumer.pop(), Some(update(i)));
    }
}

#[test]
fn test_cross_thread_order_and_content() {
    const CAPACITY: usize = 128;
    const MESSAGES: u64 = 100_000;

    let (mut producer, mut consumer) = ring::<MarketUpdate>(CAPACITY);

    let feeder = thread::spawn(move || {
        let mut backoffs = 0u64;
        for i in 0..MESSAGES {
            let mut message = update(i);
            loop {
                match producer.push(message) {
                    Ok(()) => break,
                    Err(returned) => {
                        // Full is a capacity signal, not an error; spin
                        // until the consumer frees a slot.
                        message = returned;
                        backoffs += 1;
                        std::hint::spin_loop();
                    }
                }
            }
        }
        backoffs
    });

    let mut received = 0u64;
    while received < MESSAGES {
        if let Some(message) = consumer.pop() {
            assert_eq!(message, update(received), "message {received} corrupted or reordered");
            received += 1;
        } else {
            std::hint::spin_loop();
        }
    }
    assert!(consumer.pop().is_none());

    let backoffs = feeder.join().unwrap();
    println!("cross-thread hand-off done: {MESSAGES} messages, {backoffs} producer back-offs");
}

#[test]
fn test_cross_thread_slot_api() {
    const CAPACITY: usize = 8;
    const MESSAGES: u64 = 10_000;

    let (mut producer, mut consumer) = ring::<MarketUpdate>(CAPACITY);

    let feeder = thread::spawn(move || {
        for i in 0..MESSAGES {
            loop {
                if let Some(slot) = producer.next_write_slot() {
                    *slot = update(i);
                    producer.commit_write();
                    break;
                }
                std::hint::spin_loop();
            }
        }
    });

    let mut received = 0u64;
    while received < MESSAGES {
        if let Some(slot) = consumer.next_read_slot() {
            assert_eq!(slot.order_id, received);
            assert_eq!(slot.priority, received);
            consumer.commit_read();
            received += 1;
        } else {
            std::hint::spin_loop();
        }
    }

    feeder.join().unwrap();
}
