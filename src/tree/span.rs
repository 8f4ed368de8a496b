//! Inclusive EDU spans

use std::fmt;
use serde::{Serialize, Deserialize};

/// A contiguous, inclusive range of EDU indices `[start, end]`
///
/// A leaf covers a single EDU, so `start == end`. Spans are plain values:
/// compared by equality and used as map and set keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// First EDU index
    pub start: usize,
    /// Last EDU index (inclusive)
    pub end: usize,
}

impl Span {
    /// Create a span; `start` must not exceed `end`
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Span { start, end }
    }

    /// Span covering a single EDU
    pub fn leaf(index: usize) -> Self {
        Span { start: index, end: index }
    }

    /// Number of EDUs covered
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Spans always cover at least one EDU
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the span covers exactly one EDU
    pub fn is_leaf(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether `other` starts right after this span ends
    pub fn is_adjacent_to(&self, other: &Span) -> bool {
        self.end + 1 == other.start
    }

    /// Union of two adjacent spans
    pub fn join(&self, right: &Span) -> Span {
        Span::new(self.start, right.end)
    }

    /// Whether the span cuts through some range of a partition,
    /// i.e. it is neither inside one range nor a union of whole ranges
    pub fn crosses(&self, partition: &[Span]) -> bool {
        partition.iter().any(|range| {
            let overlaps = range.start <= self.end && self.start <= range.end;
            overlaps && !range.contains(self) && !self.contains(range)
        })
    }
}

impl From<(usize, usize)> for Span {
    fn from((start, end): (usize, usize)) -> Self {
        Span::new(start, end)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..={}]", self.start, self.end)
    }
}
