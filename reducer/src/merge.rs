//! k-way merge reducer (§4.7): `n` sorted inputs merged into one stream
//! whose output keys are non-decreasing; on equal keys a user-supplied
//! `reduce` combines the two records instead of emitting both. The merge
//! itself is the same min-heap-over-`(key, input_index)` idiom as
//! `chunk_store`'s external sorter, reused here one element at a time
//! instead of over fully materialised runs.

use crate::error::Error;
use crate::node::{Node, Produced};
use data_types::Record;
use predicate::Value;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// `n` sorted `Node` inputs merged on a common key, ties combined by
/// `reduce`.
pub struct MergeReducer {
    inputs: Vec<Box<dyn Node>>,
    key_of: Box<dyn FnMut(&Record) -> Vec<Value>>,
    reduce: Box<dyn FnMut(Record, Record) -> Record>,
    pending: BinaryHeap<Reverse<(Vec<Value>, usize)>>,
    buffered: Vec<Option<Record>>,
    /// A fully tie-reduced item that couldn't be returned immediately
    /// because absorbing the last tie left one input's next refill
    /// suspended; re-checked at the top of the next `produce` call.
    held: Option<Record>,
    primed: bool,
    closed: Option<Error>,
}

impl std::fmt::Debug for MergeReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeReducer")
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

impl MergeReducer {
    pub fn new(
        inputs: Vec<Box<dyn Node>>,
        key_of: impl FnMut(&Record) -> Vec<Value> + 'static,
        reduce: impl FnMut(Record, Record) -> Record + 'static,
    ) -> Self {
        let n = inputs.len();
        Self {
            inputs,
            key_of: Box::new(key_of),
            reduce: Box::new(reduce),
            pending: BinaryHeap::new(),
            buffered: (0..n).map(|_| None).collect(),
            held: None,
            primed: false,
            closed: None,
        }
    }

    /// Pull one element from `idx` into `buffered[idx]` and push its key
    /// onto the heap; returns `Suspended`/`EndOfStream` if the input isn't
    /// ready to hand over an item.
    fn refill(&mut self, idx: usize) -> Result<Option<Produced>, Error> {
        match self.inputs[idx].produce()? {
            Produced::Item(item) => {
                let key = (self.key_of)(&item);
                self.buffered[idx] = Some(item);
                self.pending.push(Reverse((key, idx)));
                Ok(None)
            }
            Produced::Suspended => Ok(Some(Produced::Suspended)),
            Produced::EndOfStream => Ok(None),
        }
    }

    fn prime(&mut self) -> Result<Option<Produced>, Error> {
        for idx in 0..self.inputs.len() {
            if let Some(stop) = self.refill(idx)? {
                return Ok(Some(stop));
            }
        }
        self.primed = true;
        Ok(None)
    }
}

impl Node for MergeReducer {
    fn produce(&mut self) -> Result<Produced, Error> {
        if let Some(err) = &self.closed {
            return Err(err.clone());
        }
        if let Some(item) = self.held.take() {
            return Ok(Produced::Item(item));
        }
        if !self.primed {
            if let Some(stop) = self.prime()? {
                return Ok(stop);
            }
        }

        let Some(Reverse((key, idx))) = self.pending.pop() else {
            return Ok(Produced::EndOfStream);
        };
        let mut combined = self.buffered[idx].take().expect("heap entry implies a buffered item");
        if let Some(stop) = self.refill(idx)? {
            // Put the key back so the next successful `produce` resumes
            // the merge from the same point.
            self.pending.push(Reverse((key, idx)));
            self.buffered[idx] = Some(combined);
            return Ok(stop);
        }

        // Absorb every other input whose head carries the same key.
        while matches!(self.pending.peek(), Some(Reverse((next_key, _))) if *next_key == key) {
            let Reverse((_, next_idx)) = self.pending.pop().expect("peeked");
            let tied = self.buffered[next_idx].take().expect("heap entry implies a buffered item");
            combined = (self.reduce)(combined, tied);
            if let Some(stop) = self.refill(next_idx)? {
                // `combined` already absorbed `tied` and can't be handed
                // back to the heap; stash it so the next `produce` call
                // (once `next_idx` is resumed) emits it before resuming
                // the merge.
                self.held = Some(combined);
                return Ok(stop);
            }
        }
        Ok(Produced::Item(combined))
    }

    fn suspend(&mut self) {
        self.inputs.iter_mut().for_each(|i| i.suspend());
    }

    fn resume(&mut self) {
        self.inputs.iter_mut().for_each(|i| i.resume());
    }

    fn close_with_error(&mut self, err: Error) {
        if self.closed.is_none() {
            self.inputs.iter_mut().for_each(|i| i.close_with_error(err.clone()));
            self.buffered.iter_mut().for_each(|b| *b = None);
            self.closed = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use predicate::Value;

    fn rec(day: i32, clicks: i64) -> Record {
        Record::new()
            .with_field("day", Value::i32(day))
            .with_field("clicks", Value::i64(clicks))
    }

    fn key_of(r: &Record) -> Vec<Value> {
        vec![r.get("day").cloned().unwrap()]
    }

    fn sum_clicks(a: Record, b: Record) -> Record {
        let sum = match (a.get("clicks"), b.get("clicks")) {
            (Some(Value::I64(x)), Some(Value::I64(y))) => x + y,
            _ => unreachable!(),
        };
        Record::new()
            .with_field("day", a.get("day").cloned().unwrap())
            .with_field("clicks", Value::i64(sum))
    }

    fn drain(mut node: impl Node) -> Vec<Record> {
        let mut out = Vec::new();
        loop {
            match node.produce().unwrap() {
                Produced::Item(r) => out.push(r),
                Produced::EndOfStream => break,
                Produced::Suspended => panic!("unexpected suspension"),
            }
        }
        out
    }

    #[test]
    fn merges_disjoint_sorted_inputs_in_key_order() {
        let a = VecSource::new(vec![rec(1, 1), rec(3, 3)]);
        let b = VecSource::new(vec![rec(2, 2), rec(4, 4)]);
        let merged = MergeReducer::new(vec![Box::new(a), Box::new(b)], key_of, sum_clicks);
        let out = drain(merged);
        let days: Vec<i32> = out
            .iter()
            .map(|r| match r.get("day") {
                Some(Value::I32(d)) => *d,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(days, vec![1, 2, 3, 4]);
    }

    #[test]
    fn ties_are_combined_with_reduce() {
        let a = VecSource::new(vec![rec(1, 1)]);
        let b = VecSource::new(vec![rec(1, 10)]);
        let c = VecSource::new(vec![rec(1, 100)]);
        let merged = MergeReducer::new(
            vec![Box::new(a), Box::new(b), Box::new(c)],
            key_of,
            sum_clicks,
        );
        let out = drain(merged);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("clicks"), Some(&Value::i64(111)));
    }

    #[test]
    fn output_keys_are_non_decreasing() {
        let a = VecSource::new(vec![rec(5, 1), rec(7, 1), rec(9, 1)]);
        let b = VecSource::new(vec![rec(1, 1), rec(6, 1), rec(8, 1)]);
        let merged = MergeReducer::new(vec![Box::new(a), Box::new(b)], key_of, sum_clicks);
        let out = drain(merged);
        let days: Vec<i32> = out
            .iter()
            .map(|r| match r.get("day") {
                Some(Value::I32(d)) => *d,
                _ => unreachable!(),
            })
            .collect();
        let mut sorted = days.clone();
        sorted.sort_unstable();
        assert_eq!(days, sorted);
    }
}
