//! Splitter (§4.7): one upstream node, `n` downstream taps, each element
//! copied to every tap. Backpressure is all-or-nothing — a new element is
//! only pulled from upstream once every tap is ready for it, so a single
//! slow consumer suspends the whole fan-out rather than letting the others
//! race ahead.

use crate::error::Error;
use crate::node::{Node, Produced};
use data_types::Record;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug)]
struct SplitterState {
    upstream: Box<dyn Node>,
    buffers: Vec<VecDeque<Record>>,
    suspended: Vec<bool>,
    ended: bool,
    closed: Option<Error>,
}

impl SplitterState {
    fn produce_for(&mut self, index: usize) -> Result<Produced, Error> {
        if let Some(err) = &self.closed {
            return Err(err.clone());
        }
        if let Some(item) = self.buffers[index].pop_front() {
            return Ok(Produced::Item(item));
        }
        if self.ended {
            return Ok(Produced::EndOfStream);
        }
        if self.suspended.iter().any(|s| *s) {
            return Ok(Produced::Suspended);
        }
        match self.upstream.produce()? {
            Produced::Item(item) => {
                for (i, buf) in self.buffers.iter_mut().enumerate() {
                    if i != index {
                        buf.push_back(item.clone());
                    }
                }
                Ok(Produced::Item(item))
            }
            Produced::Suspended => Ok(Produced::Suspended),
            Produced::EndOfStream => {
                self.ended = true;
                Ok(Produced::EndOfStream)
            }
        }
    }

    fn close_with_error(&mut self, err: Error) {
        if self.closed.is_none() {
            self.upstream.close_with_error(err.clone());
            self.buffers.iter_mut().for_each(VecDeque::clear);
            self.closed = Some(err);
        }
    }
}

/// One of a splitter's `n` outputs; cheap to clone, all clones of the same
/// tap share the same buffered position.
#[derive(Debug, Clone)]
pub struct SplitterTap {
    state: Rc<RefCell<SplitterState>>,
    index: usize,
}

impl Node for SplitterTap {
    fn produce(&mut self) -> Result<Produced, Error> {
        self.state.borrow_mut().produce_for(self.index)
    }

    fn suspend(&mut self) {
        self.state.borrow_mut().suspended[self.index] = true;
    }

    fn resume(&mut self) {
        self.state.borrow_mut().suspended[self.index] = false;
    }

    fn close_with_error(&mut self, err: Error) {
        self.state.borrow_mut().close_with_error(err);
    }
}

/// Build a splitter over `upstream` with `outputs` taps.
pub fn split(upstream: Box<dyn Node>, outputs: usize) -> Vec<SplitterTap> {
    let state = Rc::new(RefCell::new(SplitterState {
        upstream,
        buffers: (0..outputs).map(|_| VecDeque::new()).collect(),
        suspended: vec![false; outputs],
        ended: false,
        closed: None,
    }));
    (0..outputs)
        .map(|index| SplitterTap { state: state.clone(), index })
        .collect()
}
