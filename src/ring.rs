//! SPSC ring - bounded lock-free hand-off between two threads.
//!
//! Exactly one producer thread and one consumer thread, enforced by the
//! split [`Producer`]/[`Consumer`] handles. Publication uses a release
//! store on the committing side's counter and an acquire load on the
//! observing side, so slot contents written before a commit are visible
//! to the other thread exactly when the commit is observed.
//!
//! The ring never overwrites unread slots: when the ring is full the
//! producer is told so and decides its own back-off policy.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter on its own cache line so producer and consumer commits
/// do not false-share.
#[repr(align(64))]
struct Counter(AtomicUsize);

struct Shared<T> {
    slots: Box<[UnsafeCell<T>]>,
    /// Total committed writes, monotonically increasing.
    write: Counter,
    /// Total committed reads, monotonically increasing.
    read: Counter,
}

// One thread writes a slot strictly before the release-commit that lets the
// single reader observe it; counters are atomics. T only needs Send.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Create a ring with `capacity` slots and split it into its two handles.
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn ring<T: Default>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "ring capacity must be non-zero");

    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || UnsafeCell::new(T::default()));

    let shared = Arc::new(Shared {
        slots: slots.into_boxed_slice(),
        write: Counter(AtomicUsize::new(0)),
        read: Counter(AtomicUsize::new(0)),
    });

    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

/// Writer half of the ring. Owned by exactly one thread.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Address of the next slot to write in place, or `None` when the ring
    /// is full. Follow the in-place write with [`Producer::commit_write`].
    #[inline]
    pub fn next_write_slot(&mut self) -> Option<&mut T> {
        let write = self.shared.write.0.load(Ordering::Relaxed);
        let read = self.shared.read.0.load(Ordering::Acquire);
        if write.wrapping_sub(read) == self.shared.capacity() {
            return None;
        }

        let slot = &self.shared.slots[write % self.shared.capacity()];
        // Sole producer; the consumer will not touch this slot until the
        // release store in commit_write.
        Some(unsafe { &mut *slot.get() })
    }

    /// Publish the slot handed out by the last [`Producer::next_write_slot`].
    #[inline]
    pub fn commit_write(&mut self) {
        let write = self.shared.write.0.load(Ordering::Relaxed);
        self.shared.write.0.store(write.wrapping_add(1), Ordering::Release);
    }

    /// Write-and-commit convenience. Hands the value back when full.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), T> {
        match self.next_write_slot() {
            Some(slot) => {
                *slot = value;
                self.commit_write();
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Current-observation element count.
    #[inline]
    pub fn len(&self) -> usize {
        len(&self.shared)
    }

    /// Returns true when a current observation sees no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count fixed at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Reader half of the ring. Owned by exactly one thread.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Consumer<T> {
    /// The next readable slot, or `None` when the ring is empty.
    /// Follow the read with [`Consumer::commit_read`].
    #[inline]
    pub fn next_read_slot(&mut self) -> Option<&T> {
        let read = self.shared.read.0.load(Ordering::Relaxed);
        let write = self.shared.write.0.load(Ordering::Acquire);
        if write == read {
            return None;
        }

        let slot = &self.shared.slots[read % self.shared.capacity()];
        // The acquire load above pairs with the producer's release commit,
        // making the slot contents visible.
        Some(unsafe { &*slot.get() })
    }

    /// Retire the slot handed out by the last [`Consumer::next_read_slot`].
    #[inline]
    pub fn commit_read(&mut self) {
        let read = self.shared.read.0.load(Ordering::Relaxed);
        self.shared.read.0.store(read.wrapping_add(1), Ordering::Release);
    }

    /// Read-and-commit convenience.
    #[inline]
    pub fn pop(&mut self) -> Option<T>
    where
        T: Copy,
    {
        let value = *self.next_read_slot()?;
        self.commit_read();
        Some(value)
    }

    /// Current-observation element count.
    #[inline]
    pub fn len(&self) -> usize {
        len(&self.shared)
    }

    /// Returns true when a current observation sees no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot count fixed at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

#[inline]
fn len<T>(shared: &Shared<T>) -> usize {
    let write = shared.write.0.load(Ordering::Acquire);
    let read = shared.read.0.load(Ordering::Acquire);
    write.wrapping_sub(read)
}
