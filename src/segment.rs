//! Segments derived from a boundary list

use crate::boundary::Boundary;
use crate::extractor::LineRecord;
use std::ops::RangeInclusive;

/// A contiguous run of lines written out as one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// `order` of the first line
    pub start_line: usize,
    /// `order` of the last line
    pub end_line: usize,
    /// First and last page touched by the segment (0-indexed, inclusive)
    pub page_range: (usize, usize),
}

impl Segment {
    pub fn pages(&self) -> RangeInclusive<usize> {
        self.page_range.0..=self.page_range.1
    }

    pub fn page_count(&self) -> usize {
        self.page_range.1 - self.page_range.0 + 1
    }
}

/// Split `lines` after every boundary
///
/// Boundaries referring to lines that aren't in `lines`, or to the last
/// line, produce no cut.
pub fn segments(lines: &[LineRecord], boundaries: &[Boundary]) -> Vec<Segment> {
    if lines.is_empty() {
        return Vec::new();
    }

    let mut cuts: Vec<usize> = boundaries
        .iter()
        .filter_map(|b| lines.binary_search_by_key(&b.after_line, |l| l.order).ok())
        .filter(|&i| i + 1 < lines.len())
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut result = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for end in cuts.into_iter().chain(std::iter::once(lines.len() - 1)) {
        let (first, last) = (&lines[start], &lines[end]);
        result.push(Segment {
            start_line: first.order,
            end_line: last.order,
            page_range: (first.page_index, last.page_index),
        });
        start = end + 1;
    }

    result
}
