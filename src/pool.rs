//! Fixed-slot buffer pool
//!
//! All slots are allocated up front. `acquire` hands a slot out, `release`
//! takes it back; the pool never allocates after construction, so the
//! pipeline's buffer memory is constant for the lifetime of a session.

/// Pool of reusable buffers with a fixed slot count
#[derive(Debug)]
pub struct BufferPool<T> {
    free: Vec<T>,
    capacity: usize,
}

impl<T> BufferPool<T> {
    /// Create a pool with `capacity` slots built by `make`
    pub fn new(capacity: usize, mut make: impl FnMut() -> T) -> Self {
        let free = (0..capacity).map(|_| make()).collect();
        Self { free, capacity }
    }

    /// Take a free slot, or `None` if every slot is in use
    pub fn acquire(&mut self) -> Option<T> {
        self.free.pop()
    }

    /// Return a slot to the pool
    ///
    /// Buffers beyond the slot count are dropped rather than kept.
    pub fn release(&mut self, item: T) {
        if self.free.len() < self.capacity {
            self.free.push(item);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }
}
