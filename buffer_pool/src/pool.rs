//! Size-classed buffer pool: 32 classes, class `i` holding allocations of
//! exactly `2^i` bytes. Eliminates per-operation allocation on the hot
//! serialisation path (§4.1).

use crossbeam_queue::SegQueue;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of size classes. Class `i` holds buffers of length `2^i`, so the
/// largest representable buffer is `2^31` bytes.
pub const NUM_CLASSES: usize = 32;

/// Round `n` up to the smallest size class `2^i >= n`, returning the class
/// index `i`. `n == 0` maps to class 0 (a buffer of length 1).
pub fn class_for(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    // ceil(log2(n))
    let class = (usize::BITS - (n - 1).leading_zeros()) as usize;
    class.min(NUM_CLASSES - 1)
}

/// The byte length of every buffer belonging to `class`.
pub fn class_size(class: usize) -> usize {
    1usize << class
}

#[derive(Debug, Default)]
struct ClassStats {
    /// Total buffers ever allocated for this class (pool miss).
    created: AtomicUsize,
    /// Buffers currently recycled and sitting in the free list.
    pooled: AtomicUsize,
}

/// Per-class free lists plus bookkeeping counters.
///
/// The free lists themselves are lock-free (`SegQueue`); `min_size`/
/// `max_size` bound which allocations are accepted back into the pool at
/// all, per the "forbid allocation outside `[minSize, maxSize]`" rule in
/// §9.
pub struct Pool {
    free_lists: Vec<SegQueue<Box<[u8]>>>,
    stats: Vec<ClassStats>,
    min_size: usize,
    max_size: usize,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl Pool {
    /// Create a pool that only pools allocations whose size lies in
    /// `[min_size, max_size]`.
    pub fn with_bounds(min_size: usize, max_size: usize) -> Self {
        let mut free_lists = Vec::with_capacity(NUM_CLASSES);
        let mut stats = Vec::with_capacity(NUM_CLASSES);
        for _ in 0..NUM_CLASSES {
            free_lists.push(SegQueue::new());
            stats.push(ClassStats::default());
        }
        Self {
            free_lists,
            stats,
            min_size,
            max_size,
        }
    }

    /// Allocate (or reuse) a buffer of at least `n` bytes. Returns the size
    /// class chosen and the backing slice, sized to exactly `2^class`.
    pub(crate) fn allocate_at_least(&self, n: usize) -> (usize, Box<[u8]>) {
        let class = class_for(n);
        if let Some(buf) = self.free_lists[class].pop() {
            self.stats[class].pooled.fetch_sub(1, Ordering::Relaxed);
            return (class, buf);
        }
        self.stats[class].created.fetch_add(1, Ordering::Relaxed);
        (class, vec![0u8; class_size(class)].into_boxed_slice())
    }

    /// Return `buf` to its size class, provided its length is poolable
    /// (exactly `2^class` and within `[min_size, max_size]`). Buffers
    /// outside the bounds are simply dropped.
    pub(crate) fn recycle_raw(&self, class: usize, buf: Box<[u8]>) {
        let size = class_size(class);
        if size < self.min_size || size > self.max_size {
            return;
        }
        debug_assert_eq!(buf.len(), size, "buffer length does not match its size class");
        self.free_lists[class].push(buf);
        self.stats[class].pooled.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of `(created, pooled)` for one size class.
    pub fn class_stats(&self, class: usize) -> (usize, usize) {
        (
            self.stats[class].created.load(Ordering::Relaxed),
            self.stats[class].pooled.load(Ordering::Relaxed),
        )
    }

    /// The strongest correctness signal named in §8: every class for which
    /// any buffer was ever created must, once all buffers have been
    /// recycled, have `created == pooled`.
    ///
    /// Returns the list of classes that are out of balance.
    pub fn imbalanced_classes(&self) -> Vec<usize> {
        (0..NUM_CLASSES)
            .filter(|&class| {
                let (created, pooled) = self.class_stats(class);
                created != pooled
            })
            .collect()
    }

    /// Test-hook teardown: drop every pooled buffer and reset counters.
    /// Mirrors the source's `Pool.clear()` used between test cases.
    pub fn clear(&self) {
        for class in 0..NUM_CLASSES {
            while self.free_lists[class].pop().is_some() {}
            self.stats[class].created.store(0, Ordering::Relaxed);
            self.stats[class].pooled.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::with_bounds(1, 1 << (NUM_CLASSES - 1))
    }
}

/// The process-wide pool instance, shared by every caller that does not
/// thread an explicit [`Pool`] through. Most production code wires an
/// explicit `Arc<Pool>` through instead; this exists for call sites (and
/// tests) that just want a single ambient pool.
pub static GLOBAL: Lazy<std::sync::Arc<Pool>> = Lazy::new(|| std::sync::Arc::new(Pool::default()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_for_picks_smallest_covering_power_of_two() {
        assert_eq!(class_for(0), 0);
        assert_eq!(class_for(1), 0);
        assert_eq!(class_for(2), 1);
        assert_eq!(class_for(3), 2);
        assert_eq!(class_for(4), 2);
        assert_eq!(class_for(5), 3);
        assert_eq!(class_for(8), 3);
        assert_eq!(class_for(9), 4);
    }

    #[test]
    fn allocate_then_recycle_balances() {
        let pool = Pool::default();
        let (class, buf) = pool.allocate_at_least(100);
        assert_eq!(buf.len(), class_size(class));
        let (created, pooled) = pool.class_stats(class);
        assert_eq!(created, 1);
        assert_eq!(pooled, 0);

        pool.recycle_raw(class, buf);
        let (created, pooled) = pool.class_stats(class);
        assert_eq!(created, 1);
        assert_eq!(pooled, 1);
        assert!(pool.imbalanced_classes().is_empty());
    }

    #[test]
    fn recycled_buffer_is_reused_without_new_allocation() {
        let pool = Pool::default();
        let (class, buf) = pool.allocate_at_least(64);
        pool.recycle_raw(class, buf);

        let (class2, _buf2) = pool.allocate_at_least(64);
        assert_eq!(class, class2);
        let (created, pooled) = pool.class_stats(class);
        assert_eq!(created, 1, "second allocation should reuse the freed buffer");
        assert_eq!(pooled, 0);
    }

    #[test]
    fn out_of_bounds_allocation_is_not_pooled() {
        let pool = Pool::with_bounds(16, 1024);
        let (class, buf) = pool.allocate_at_least(4); // class size 4 < min_size 16
        pool.recycle_raw(class, buf);
        let (_created, pooled) = pool.class_stats(class);
        assert_eq!(pooled, 0, "buffer below min_size must not be pooled");
    }

    #[test]
    fn clear_resets_counters_and_drops_buffers() {
        let pool = Pool::default();
        let (class, buf) = pool.allocate_at_least(32);
        pool.recycle_raw(class, buf);
        pool.clear();
        assert_eq!(pool.class_stats(class), (0, 0));
    }
}
