//! [`ByteBuf`]: a contiguous byte array with `readPos <= writePos <= limit`,
//! backed by the size-classed [`Pool`] (§4.1).

use crate::pool::{class_size, Pool};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

struct Shared {
    class: usize,
    data: Mutex<Box<[u8]>>,
    /// Number of live handles (the original owner plus every outstanding
    /// slice) sharing this allocation. The backing array returns to the
    /// pool when this reaches zero.
    refs: AtomicUsize,
}

/// A pooled byte buffer with three cursors: `read_pos <= write_pos <= limit`.
///
/// Recycling happens exactly once per handle via `Drop` — Rust's ownership
/// model enforces the "exactly once" rule the source spec had to check at
/// runtime, since a moved-from `ByteBuf` simply no longer exists to recycle
/// again. [`ByteBuf::recycle`] is provided as an explicit, self-documenting
/// spelling of `drop(buf)`.
pub struct ByteBuf {
    shared: Arc<Shared>,
    pool: Arc<Pool>,
    read_pos: usize,
    write_pos: usize,
    limit: usize,
}

impl std::fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuf")
            .field("read_pos", &self.read_pos)
            .field("write_pos", &self.write_pos)
            .field("limit", &self.limit)
            .field("class", &self.shared.class)
            .finish()
    }
}

impl ByteBuf {
    /// Allocate a fresh buffer of at least `n` bytes from `pool`.
    pub fn allocate_at_least(pool: &Arc<Pool>, n: usize) -> Self {
        let (class, data) = pool.allocate_at_least(n);
        let limit = data.len();
        Self {
            shared: Arc::new(Shared {
                class,
                data: Mutex::new(data),
                refs: AtomicUsize::new(1),
            }),
            pool: Arc::clone(pool),
            read_pos: 0,
            write_pos: 0,
            limit,
        }
    }

    /// Allocate from the process-wide [`crate::pool::GLOBAL`] pool.
    pub fn allocate_global(n: usize) -> Self {
        Self::allocate_at_least(&crate::pool::GLOBAL, n)
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_read_pos(&mut self, pos: usize) {
        assert!(pos <= self.write_pos, "read_pos must not exceed write_pos");
        self.read_pos = pos;
    }

    pub fn set_write_pos(&mut self, pos: usize) {
        assert!(pos <= self.limit, "write_pos must not exceed limit");
        self.write_pos = pos;
    }

    /// Bytes available to read: `write_pos - read_pos`.
    pub fn readable(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Bytes available to write before hitting `limit`.
    pub fn writable(&self) -> usize {
        self.limit - self.write_pos
    }

    /// Append `bytes` at `write_pos`, advancing it. Panics if it would
    /// exceed `limit` — callers on the growth path use
    /// [`reallocate_at_least`] first.
    pub fn put(&mut self, bytes: &[u8]) {
        assert!(
            self.write_pos + bytes.len() <= self.limit,
            "put would exceed buffer limit"
        );
        let mut data = self.shared.data.lock().unwrap();
        data[self.write_pos..self.write_pos + bytes.len()].copy_from_slice(bytes);
        self.write_pos += bytes.len();
    }

    /// Read `len` bytes starting at `read_pos`, advancing it.
    pub fn get(&mut self, len: usize) -> Vec<u8> {
        assert!(self.read_pos + len <= self.write_pos, "get past write_pos");
        let data = self.shared.data.lock().unwrap();
        let out = data[self.read_pos..self.read_pos + len].to_vec();
        drop(data);
        self.read_pos += len;
        out
    }

    /// Read `len` bytes starting at `read_pos` without advancing it.
    pub fn peek(&self, len: usize) -> Vec<u8> {
        assert!(self.read_pos + len <= self.write_pos, "peek past write_pos");
        let data = self.shared.data.lock().unwrap();
        data[self.read_pos..self.read_pos + len].to_vec()
    }

    /// Advance `read_pos` by `len` without copying.
    pub fn skip(&mut self, len: usize) {
        assert!(self.read_pos + len <= self.write_pos, "skip past write_pos");
        self.read_pos += len;
    }

    /// A read-only view over `[start, end)` of this buffer's backing array,
    /// sharing ownership via the refcount on [`Shared`]. Recycling the
    /// slice decrements the shared count instead of freeing immediately.
    pub fn slice(&self, start: usize, end: usize) -> ByteBuf {
        assert!(end <= self.limit && start <= end, "slice out of bounds");
        self.shared.refs.fetch_add(1, Ordering::AcqRel);
        ByteBuf {
            shared: Arc::clone(&self.shared),
            pool: Arc::clone(&self.pool),
            read_pos: start,
            write_pos: end,
            limit: end,
        }
    }

    /// Explicit, self-documenting spelling of `drop(self)`.
    pub fn recycle(self) {
        drop(self)
    }

    /// ASCII/UTF-8 decode of the readable region, without consuming it.
    pub fn as_ascii(&self) -> String {
        let data = self.shared.data.lock().unwrap();
        String::from_utf8_lossy(&data[self.read_pos..self.write_pos]).into_owned()
    }

    fn class(&self) -> usize {
        self.shared.class
    }

    fn capacity(&self) -> usize {
        class_size(self.shared.class)
    }
}

impl Drop for ByteBuf {
    fn drop(&mut self) {
        if self.shared.refs.fetch_sub(1, Ordering::AcqRel) == 1 {
            // We were the last handle; reclaim the backing array.
            let mut guard = self.shared.data.lock().unwrap();
            let empty: Box<[u8]> = Box::new([]);
            let data = std::mem::replace(&mut *guard, empty);
            self.pool.recycle_raw(self.class(), data);
        }
    }
}

/// Grow `buf` to hold at least `n` bytes, preserving its filled region
/// (`[0, write_pos)`). Returns `buf` unchanged if its current size class
/// already covers `n`; otherwise allocates a new buffer, copies, and
/// recycles the old one.
pub fn reallocate_at_least(pool: &Arc<Pool>, buf: ByteBuf, n: usize) -> ByteBuf {
    if n <= buf.capacity() {
        return buf;
    }
    let mut grown = ByteBuf::allocate_at_least(pool, n);
    {
        let data = buf.shared.data.lock().unwrap();
        grown.put(&data[0..buf.write_pos]);
    }
    grown.read_pos = buf.read_pos;
    buf.recycle();
    grown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get_round_trip_and_balance() {
        let pool = Arc::new(Pool::default());
        let mut buf = ByteBuf::allocate_at_least(&pool, 8);
        buf.put(b"Hello, World!");
        assert_eq!(buf.read_pos(), 0);
        assert_eq!(buf.write_pos(), 13);
        assert_eq!(buf.as_ascii(), "Hello, World!");
        assert_eq!(buf.get(5), b"Hello".to_vec());
        assert_eq!(buf.read_pos(), 5);
        buf.recycle();
        assert!(pool.imbalanced_classes().is_empty());
    }

    #[test]
    fn slice_keeps_parent_alive_until_all_handles_recycled() {
        let pool = Arc::new(Pool::default());
        let mut buf = ByteBuf::allocate_at_least(&pool, 16);
        buf.put(b"0123456789abcdef");
        let class = buf.class();

        let slice = buf.slice(2, 6);
        assert_eq!(slice.peek(4), b"2345".to_vec());

        buf.recycle();
        let (_created, pooled) = pool.class_stats(class);
        assert_eq!(pooled, 0, "must not be pooled while the slice is alive");

        slice.recycle();
        let (_created, pooled) = pool.class_stats(class);
        assert_eq!(pooled, 1, "backing array returns once the last handle recycles");
    }

    #[test]
    fn reallocate_preserves_written_bytes_when_growing() {
        let pool = Arc::new(Pool::default());
        let mut buf = ByteBuf::allocate_at_least(&pool, 4);
        buf.put(b"abcd");
        let grown = reallocate_at_least(&pool, buf, 100);
        assert!(grown.capacity() >= 100);
        assert_eq!(grown.as_ascii(), "abcd");
    }

    #[test]
    fn reallocate_is_noop_when_already_big_enough() {
        let pool = Arc::new(Pool::default());
        let buf = ByteBuf::allocate_at_least(&pool, 128);
        let cap_before = buf.capacity();
        let buf2 = reallocate_at_least(&pool, buf, 10);
        assert_eq!(buf2.capacity(), cap_before);
    }
}
