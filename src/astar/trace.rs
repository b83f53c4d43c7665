// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::Coord;

/// Number of [EdgeVisits](EdgeVisit) grouped into a single batch of a [Trace].
pub const TRACE_BATCH_SIZE: usize = 500;

/// A single step of the search: the node at `to` was expanded,
/// having been reached from the node at `from`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeVisit {
    pub from: Coord,
    pub to: Coord,
}

/// Ordered log of all edges explored by a search, split into batches for
/// incremental consumption (e.g. animation).
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace(Vec<Vec<EdgeVisit>>);

impl Trace {
    /// Returns the total number of explored edges.
    pub fn len(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }

    pub fn batches(&self) -> &[Vec<EdgeVisit>] {
        &self.0
    }

    /// Iterates over all explored edges in exploration order.
    pub fn iter(&self) -> impl Iterator<Item = &EdgeVisit> {
        self.0.iter().flatten()
    }

    pub fn into_batches(self) -> Vec<Vec<EdgeVisit>> {
        self.0
    }
}

/// Accumulates [EdgeVisits](EdgeVisit) into fixed-size batches.
#[derive(Debug)]
pub struct TraceRecorder {
    batch_size: usize,
    batches: Vec<Vec<EdgeVisit>>,
    current: Vec<EdgeVisit>,
}

impl TraceRecorder {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            batches: Vec::default(),
            current: Vec::with_capacity(batch_size),
        }
    }

    pub fn record(&mut self, from: Coord, to: Coord) {
        self.current.push(EdgeVisit { from, to });
        if self.current.len() >= self.batch_size {
            let full = std::mem::replace(&mut self.current, Vec::with_capacity(self.batch_size));
            self.batches.push(full);
        }
    }

    /// Flushes the last, partially-filled batch and returns the complete [Trace].
    pub fn finish(mut self) -> Trace {
        if !self.current.is_empty() {
            self.batches.push(self.current);
        }
        Trace(self.batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(i: usize) -> (Coord, Coord) {
        let i = i as f64;
        (Coord::new(i, 0.0), Coord::new(i + 1.0, 0.0))
    }

    #[test]
    fn batches() {
        let mut r = TraceRecorder::new(3);
        for i in 0..7 {
            let (from, to) = visit(i);
            r.record(from, to);
        }
        let trace = r.finish();

        assert_eq!(trace.len(), 7);
        assert_eq!(
            trace.batches().iter().map(Vec::len).collect::<Vec<_>>(),
            vec![3, 3, 1]
        );

        let order: Vec<f64> = trace.iter().map(|v| v.from.lat).collect();
        assert_eq!(order, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn exact_multiple_has_no_empty_batch() {
        let mut r = TraceRecorder::new(2);
        for i in 0..4 {
            let (from, to) = visit(i);
            r.record(from, to);
        }
        assert_eq!(r.finish().batches().len(), 2);
    }

    #[test]
    fn empty() {
        let trace = TraceRecorder::new(TRACE_BATCH_SIZE).finish();
        assert!(trace.is_empty());
        assert_eq!(trace.len(), 0);
        assert!(trace.batches().is_empty());
    }
}
