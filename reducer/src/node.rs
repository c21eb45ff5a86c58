//! The node contract (§4.7): every stream node exposes `produce`, `suspend`,
//! `resume`, and `close_with_error`; `end_of_stream` is surfaced as a
//! variant of what `produce` returns rather than a separate method, since a
//! pull-based node has nowhere else to deliver it.

use crate::error::Error;
use data_types::Record;

/// Result of pulling one element from a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Produced {
    /// One element, in this node's output order.
    Item(Record),
    /// This node (or something it depends on) is suspended; the caller
    /// must `resume` it before calling `produce` again.
    Suspended,
    /// Delivered at most once per edge; every `produce` call after this
    /// one returns `EndOfStream` again rather than panicking.
    EndOfStream,
}

/// A pull-based stream node. Implementors form the splitter / mapper /
/// merge-reducer graph described in §4.7; `produce` is only ever called
/// from the single cooperative executor task (§5), so no implementation
/// here needs interior synchronization.
pub trait Node: std::fmt::Debug {
    /// Pull the next element. Must not be called again after returning
    /// `Err`, after `close_with_error`, or after `Produced::EndOfStream` —
    /// cheaply repeating the same answer in those cases, rather than
    /// panicking, lets a careless caller keep draining a finished graph.
    fn produce(&mut self) -> Result<Produced, Error>;

    /// Ask this node (and transitively, everything it pulls from) to stop
    /// producing until `resume`. Takes effect within one `produce` call.
    fn suspend(&mut self);

    /// Lift a `suspend`. A node with no pending demand is free to ignore
    /// this until `produce` is called again.
    fn resume(&mut self);

    /// Stop the node permanently; every subsequent `produce` returns
    /// `Err(err)` without touching anything further upstream or
    /// downstream. Idempotent, and the only path that must still recycle
    /// whatever internal buffering a node holds.
    fn close_with_error(&mut self, err: Error);
}
