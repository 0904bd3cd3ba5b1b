//! Typed object pool - pre-allocated slab with free-slot reuse.
//!
//! The pool pre-allocates every slot at construction, eliminating heap
//! allocation on the hot path. Slots are addressed by stable `u32` indices
//! that remain valid until deallocation, so nodes can be linked into
//! intrusive lists by index without indirection.

use std::fmt;

/// Sentinel value representing a null/invalid index (like nullptr).
pub const NULL_INDEX: u32 = u32::MAX;

/// Type alias for pool indices - "compressed pointers" into the slab.
/// 32-bit indices halve link metadata versus raw pointers.
pub type PoolIndex = u32;

struct Slot<T> {
    value: T,
    free: bool,
}

/// Fixed-capacity object pool with O(1) amortised allocate/deallocate.
///
/// Free slots are found by a rotating cursor scan. The scan is O(capacity)
/// worst case but amortised O(1) when the live set stays well below
/// capacity, which is the sizing contract for this pool.
///
/// Misuse is fatal: allocating past capacity, freeing an out-of-range index
/// or freeing a slot twice all indicate a broken structural invariant
/// upstream, and the process terminates rather than corrupt the book.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Rotating cursor: where the next free-slot search starts.
    next_free: usize,
    live: u32,
    capacity: u32,
}

impl<T: Default> Pool<T> {
    /// Create a pool with `capacity` pre-allocated free slots.
    ///
    /// # Panics
    /// Panics if capacity is zero or does not fit a `PoolIndex`
    /// (`u32::MAX` is reserved for `NULL_INDEX`).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pool capacity must be non-zero");
        assert!(
            capacity < NULL_INDEX as usize,
            "pool capacity must be less than NULL_INDEX"
        );

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Slot {
            value: T::default(),
            free: true,
        });

        Self {
            slots,
            next_free: 0,
            live: 0,
            capacity: capacity as u32,
        }
    }

    /// Allocate a slot and move `value` into it.
    ///
    /// Returns a stable index, valid until [`Pool::deallocate`].
    ///
    /// # Panics
    /// Fatal when every slot is in use.
    #[inline]
    pub fn allocate(&mut self, value: T) -> PoolIndex {
        if self.live == self.capacity {
            tracing::error!(capacity = self.capacity, "object pool out of space");
            panic!("object pool out of space (capacity {})", self.capacity);
        }

        // Live < capacity, so the scan terminates at a free slot.
        while !self.slots[self.next_free].free {
            self.next_free += 1;
            if self.next_free == self.slots.len() {
                self.next_free = 0;
            }
        }

        let index = self.next_free as PoolIndex;
        let slot = &mut self.slots[self.next_free];
        slot.value = value;
        slot.free = false;
        self.live += 1;

        // Advance past the slot just handed out.
        self.next_free += 1;
        if self.next_free == self.slots.len() {
            self.next_free = 0;
        }

        index
    }

    /// Return a slot to the pool.
    ///
    /// # Panics
    /// Fatal when `index` is outside the slab or the slot is already free.
    #[inline]
    pub fn deallocate(&mut self, index: PoolIndex) {
        assert!(
            index < self.capacity,
            "deallocate of index {index} outside pool of capacity {}",
            self.capacity
        );
        let slot = &mut self.slots[index as usize];
        assert!(!slot.free, "double free of pool slot {index}");

        slot.value = T::default();
        slot.free = true;
        self.live -= 1;
    }

    /// Immutable access to an in-use slot.
    #[inline]
    pub fn get(&self, index: PoolIndex) -> &T {
        debug_assert!(index < self.capacity, "index out of bounds");
        debug_assert!(!self.slots[index as usize].free, "read of free slot");
        &self.slots[index as usize].value
    }

    /// Mutable access to an in-use slot.
    #[inline]
    pub fn get_mut(&mut self, index: PoolIndex) -> &mut T {
        debug_assert!(index < self.capacity, "index out of bounds");
        debug_assert!(!self.slots[index as usize].free, "write to free slot");
        &mut self.slots[index as usize].value
    }

    /// Number of slots currently in use.
    #[inline]
    pub fn live(&self) -> u32 {
        self.live
    }

    /// Total slot count.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns true if no slots are in use.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Pre-fault the slab (warm-up routine).
    ///
    /// Walks every slot to force the OS to map virtual pages to physical
    /// RAM before the hot path runs.
    pub fn warm_up(&mut self) {
        for slot in &mut self.slots {
            let free = slot.free;
            unsafe {
                std::ptr::write_volatile(&mut slot.free, free);
            }
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity)
            .field("live", &self.live)
            .field("next_free", &self.next_free)
            .finish()
    }
}
