//! Lazy candidate lengths for one operator at one input position.

use std::ops::RangeInclusive;

use super::Op;
use crate::range::LengthRange;

/// Direction a [`Candidates`] walks its window in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Shortest first.
    Ascending,
    /// Longest first.
    Descending,
}

/// Yields each length in a window that the operator accepts.
///
/// Stateful and single-use: a new match attempt needs a new iterator.
pub struct Candidates<'a> {
    op: &'a Op,
    input: &'a [char],
    start: usize,
    lengths: RangeInclusive<usize>,
    order: Order,
}

impl<'a> Candidates<'a> {
    pub fn new(op: &'a Op, input: &'a [char], start: usize, window: LengthRange) -> Self {
        Self {
            op,
            input,
            start,
            // An empty window gives an empty range.
            lengths: window.min..=window.max,
            order: op.order(),
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            let len = match self.order {
                Order::Ascending => self.lengths.next()?,
                Order::Descending => self.lengths.next_back()?,
            };
            if self.op.accepts(self.input, self.start, len) {
                return Some(len);
            }
        }
    }
}
