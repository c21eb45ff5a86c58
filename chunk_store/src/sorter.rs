//! External k-way merge sorter (§4.4): partial in-memory sort of up to
//! `sorter_items_in_memory` rows per run, final merge ordered by the
//! primary-key comparator, ties broken by run-arrival order.
//!
//! Runs are kept in memory rather than spilled to temp files — the
//! collaborator that would own real durability (`ChunkStorage`) is a
//! trait boundary (§6), and this crate's reference tier never reaches
//! past it for I/O. The merge step itself (a min-heap keyed on `(key,
//! run_index)`) is the idiomatic stand-in for a loser tree: it gives the
//! same stable, ties-by-arrival-order merge without a bespoke tournament
//! tree structure.

use crate::row::Row;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

#[derive(Debug)]
pub struct ExternalSorter {
    items_in_memory: usize,
    runs: Vec<Vec<Row>>,
    buffer: Vec<Row>,
}

impl ExternalSorter {
    pub fn new(items_in_memory: usize) -> Self {
        Self {
            items_in_memory: items_in_memory.max(1),
            runs: Vec::new(),
            buffer: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.buffer.push(row);
        if self.buffer.len() >= self.items_in_memory {
            self.flush_run();
        }
    }

    fn flush_run(&mut self) {
        let mut run = std::mem::take(&mut self.buffer);
        run.sort_by(|a, b| a.key.cmp(&b.key));
        self.runs.push(run);
    }

    /// Consume the sorter, producing all rows in ascending key order.
    pub fn finish(mut self) -> Vec<Row> {
        if !self.buffer.is_empty() {
            self.flush_run();
        }
        k_way_merge(self.runs)
    }
}

fn k_way_merge(runs: Vec<Vec<Row>>) -> Vec<Row> {
    let mut queues: Vec<VecDeque<Row>> = runs.into_iter().map(VecDeque::from).collect();
    let mut heap: BinaryHeap<Reverse<(Vec<predicate::Value>, usize)>> = BinaryHeap::new();
    for (run_idx, q) in queues.iter().enumerate() {
        if let Some(row) = q.front() {
            heap.push(Reverse((row.key.clone(), run_idx)));
        }
    }

    let mut out = Vec::new();
    while let Some(Reverse((_, run_idx))) = heap.pop() {
        let row = queues[run_idx]
            .pop_front()
            .expect("heap entry implies a non-empty queue");
        if let Some(next) = queues[run_idx].front() {
            heap.push(Reverse((next.key.clone(), run_idx)));
        }
        out.push(row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use predicate::Value;

    fn row(k: i32, m: i64) -> Row {
        Row::new(vec![Value::i32(k)], vec![Value::i64(m)])
    }

    #[test]
    fn single_run_sorts_in_memory() {
        let mut sorter = ExternalSorter::new(100);
        for k in [5, 1, 3, 2, 4] {
            sorter.push(row(k, 0));
        }
        let out = sorter.finish();
        assert_eq!(
            out.iter().map(|r| r.key[0].clone()).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5].into_iter().map(Value::i32).collect::<Vec<_>>()
        );
    }

    #[test]
    fn multiple_runs_merge_in_ascending_key_order() {
        let mut sorter = ExternalSorter::new(2);
        for k in [9, 1, 5, 2, 8, 3] {
            sorter.push(row(k, 0));
        }
        let out = sorter.finish();
        let keys: Vec<i32> = out
            .iter()
            .map(|r| match &r.key[0] {
                Value::I32(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn ties_preserve_run_arrival_order() {
        let mut sorter = ExternalSorter::new(1);
        sorter.push(row(1, 100)); // run 0
        sorter.push(row(1, 200)); // run 1
        let out = sorter.finish();
        assert_eq!(out[0].measures[0], Value::i64(100));
        assert_eq!(out[1].measures[0], Value::i64(200));
    }
}
