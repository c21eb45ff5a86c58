//! Adapts an already-materialised, already-ordered batch of records (what
//! `AggregationEngine::query` returns) into a pull-based [`Node`] so it can
//! feed a splitter or merge reducer without either of those needing to
//! know where their input actually came from.

use crate::error::Error;
use crate::node::{Node, Produced};
use data_types::Record;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct VecSource {
    items: VecDeque<Record>,
    suspended: bool,
    closed: Option<Error>,
    ended: bool,
}

impl VecSource {
    pub fn new(items: Vec<Record>) -> Self {
        Self {
            items: VecDeque::from(items),
            suspended: false,
            closed: None,
            ended: false,
        }
    }
}

impl Node for VecSource {
    fn produce(&mut self) -> Result<Produced, Error> {
        if let Some(err) = &self.closed {
            return Err(err.clone());
        }
        if self.suspended {
            return Ok(Produced::Suspended);
        }
        match self.items.pop_front() {
            Some(item) => Ok(Produced::Item(item)),
            None => {
                self.ended = true;
                Ok(Produced::EndOfStream)
            }
        }
    }

    fn suspend(&mut self) {
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.suspended = false;
    }

    fn close_with_error(&mut self, err: Error) {
        if self.closed.is_none() {
            self.items.clear();
            self.closed = Some(err);
        }
    }
}
