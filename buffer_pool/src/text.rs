//! Appendable text adapter (§4.1): a text sink that writes into a pool
//! buffer, growing it via `reallocate_at_least` whenever `append` would
//! overflow the current capacity.

use crate::byte_buf::{reallocate_at_least, ByteBuf};
use crate::pool::Pool;
use std::sync::Arc;

/// Growable text sink backed by a single pooled [`ByteBuf`].
#[derive(Debug)]
pub struct AppendableText {
    pool: Arc<Pool>,
    buf: ByteBuf,
}

impl AppendableText {
    /// Start with a buffer of at least `initial_capacity` bytes.
    pub fn with_capacity(pool: &Arc<Pool>, initial_capacity: usize) -> Self {
        Self {
            pool: Arc::clone(pool),
            buf: ByteBuf::allocate_at_least(pool, initial_capacity),
        }
    }

    /// Append `s`, growing the backing buffer first if needed.
    pub fn append(&mut self, s: &str) {
        if s.len() > self.buf.writable() {
            let needed = self.buf.write_pos() + s.len();
            let placeholder = ByteBuf::allocate_at_least(&self.pool, 0);
            let current = std::mem::replace(&mut self.buf, placeholder);
            self.buf = reallocate_at_least(&self.pool, current, needed);
        }
        self.buf.put(s.as_bytes());
    }

    /// Current accumulated text.
    pub fn as_str(&self) -> String {
        self.buf.as_ascii()
    }

    /// Consume the adapter, yielding the final buffer with the accumulated
    /// text in `[0, write_pos)`.
    pub fn into_buf(self) -> ByteBuf {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    #[test]
    fn append_grows_and_preserves_text() {
        let pool = Arc::new(Pool::default());
        let mut text = AppendableText::with_capacity(&pool, 8);
        text.append("Hello, World!");
        let buf = text.into_buf();
        assert_eq!(buf.read_pos(), 0);
        assert_eq!(buf.write_pos(), 13);
        assert_eq!(buf.as_ascii(), "Hello, World!");
    }

    #[test]
    fn multiple_appends_accumulate() {
        let pool = Arc::new(Pool::default());
        let mut text = AppendableText::with_capacity(&pool, 4);
        text.append("foo");
        text.append("bar");
        text.append("bazbazbaz");
        assert_eq!(text.as_str(), "foobarbazbazbaz");
    }
}
