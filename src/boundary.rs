//! Boundary selection
//!
//! Picks the `N - 1` cut points that split a document into `N` segments.
//! The largest significant gaps win when there are enough of them;
//! otherwise the significant gaps are kept and the remaining cuts come
//! from an evenly spaced grid over the lines.

use crate::gaps::Gap;
use crate::SegmentError;
use std::collections::BTreeSet;

/// A cut point: the document is split right after `after_line`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    /// `order` of the last line before the cut
    pub after_line: usize,
    /// Page of that line
    pub page_index: usize,
}

/// How a selection was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every boundary sits on a significant gap
    Significant,
    /// Too few significant gaps; evenly spaced cuts fill the rest
    Padded,
}

/// Selected boundaries, sorted by position
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub boundaries: Vec<Boundary>,
    pub strategy: Strategy,
}

impl Strategy {
    /// Pick the strategy from the number of significant gaps available
    fn choose(significant: usize, needed: usize) -> Self {
        if significant >= needed {
            Strategy::Significant
        } else {
            Strategy::Padded
        }
    }
}

/// Select `num_segments - 1` boundaries from classified gaps
///
/// `gaps` must be the full gap sequence of a document, in reading order,
/// so that `gaps.len() + 1` is its line count.
pub fn select(gaps: &[Gap], num_segments: usize) -> Result<Selection, SegmentError> {
    if num_segments == 0 {
        return Err(SegmentError::InvalidConfiguration(
            "number of segments must be at least 1".to_string(),
        ));
    }

    let line_count = gaps.len() + 1;
    if num_segments > line_count {
        return Err(SegmentError::InsufficientContent {
            requested: num_segments,
            lines: line_count,
        });
    }

    let needed = num_segments - 1;

    // Largest first; earlier position wins ties
    let mut significant: Vec<usize> = (0..gaps.len())
        .filter(|&i| gaps[i].is_significant())
        .collect();
    significant.sort_by(|&a, &b| gaps[b].size.total_cmp(&gaps[a].size).then(a.cmp(&b)));

    let strategy = Strategy::choose(significant.len(), needed);
    let chosen: BTreeSet<usize> = match strategy {
        Strategy::Significant => significant.into_iter().take(needed).collect(),
        Strategy::Padded => {
            let mut chosen: BTreeSet<usize> = significant.into_iter().collect();
            // The grid has `needed` positions, so the free ones always suffice
            fill_farthest(&mut chosen, &even_grid(line_count, num_segments), needed);
            chosen
        }
    };

    if strategy == Strategy::Padded && needed > 0 {
        log::info!(
            "only {} of {} boundaries found on significant gaps, padding with evenly spaced cuts",
            gaps.iter().filter(|g| g.is_significant()).count(),
            needed
        );
    }

    let boundaries = chosen
        .into_iter()
        .map(|i| Boundary {
            after_line: gaps[i].after_line,
            page_index: gaps[i].page_index,
        })
        .collect();

    Ok(Selection {
        boundaries,
        strategy,
    })
}

/// Gap positions that split `line_count` lines into `num_segments` runs of
/// near-equal length; one position after the last line of every run but
/// the final one
fn even_grid(line_count: usize, num_segments: usize) -> Vec<usize> {
    (1..num_segments)
        .map(|i| i * line_count / num_segments - 1)
        .collect()
}

/// Add candidates to `chosen` until it holds `needed` positions
///
/// Each round takes the unused candidate farthest from every position
/// already chosen; the earlier candidate wins ties.
fn fill_farthest(chosen: &mut BTreeSet<usize>, candidates: &[usize], needed: usize) {
    while chosen.len() < needed {
        let best = candidates
            .iter()
            .copied()
            .filter(|c| !chosen.contains(c))
            .map(|c| (distance_to_nearest(chosen, c), c))
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        match best {
            Some((_, position)) => {
                chosen.insert(position);
            }
            None => break,
        }
    }
}

fn distance_to_nearest(chosen: &BTreeSet<usize>, position: usize) -> usize {
    let before = chosen.range(..position).next_back().map(|&p| position - p);
    let after = chosen.range(position..).next().map(|&p| p - position);
    match (before, after) {
        (Some(a), Some(b)) => a.min(b),
        (Some(d), None) | (None, Some(d)) => d,
        (None, None) => usize::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaps::GapClass;

    fn gap(after_line: usize, size: f32, significant: bool) -> Gap {
        Gap {
            after_line,
            size,
            page_index: after_line / 10,
            classification: if significant {
                GapClass::Significant
            } else {
                GapClass::Normal
            },
        }
    }

    fn normal_gaps(count: usize) -> Vec<Gap> {
        (0..count).map(|i| gap(i, 10.0, false)).collect()
    }

    fn positions(selection: &Selection) -> Vec<usize> {
        selection.boundaries.iter().map(|b| b.after_line).collect()
    }

    #[test]
    fn test_zero_segments_rejected() {
        let err = select(&normal_gaps(5), 0).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_one_segment_has_no_boundaries() {
        let selection = select(&normal_gaps(5), 1).unwrap();
        assert!(selection.boundaries.is_empty());

        // Also fine for a single-line document
        assert!(select(&[], 1).unwrap().boundaries.is_empty());
    }

    #[test]
    fn test_too_many_segments_rejected() {
        let err = select(&normal_gaps(2), 5).unwrap_err();
        match err {
            SegmentError::InsufficientContent { requested, lines } => {
                assert_eq!(requested, 5);
                assert_eq!(lines, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_one_segment_per_line_is_allowed() {
        let selection = select(&normal_gaps(3), 4).unwrap();
        assert_eq!(positions(&selection), vec![0, 1, 2]);
    }

    #[test]
    fn test_largest_significant_gaps_win() {
        let mut gaps = normal_gaps(20);
        gaps[3] = gap(3, 80.0, true);
        gaps[9] = gap(9, 120.0, true);
        gaps[15] = gap(15, 60.0, true);

        let selection = select(&gaps, 3).unwrap();
        assert_eq!(selection.strategy, Strategy::Significant);
        assert_eq!(positions(&selection), vec![3, 9]);
        assert_eq!(selection.boundaries[1].page_index, 0);
    }

    #[test]
    fn test_tie_prefers_earlier_gap() {
        let mut gaps = normal_gaps(20);
        gaps[12] = gap(12, 50.0, true);
        gaps[4] = gap(4, 50.0, true);

        let selection = select(&gaps, 2).unwrap();
        assert_eq!(positions(&selection), vec![4]);
    }

    #[test]
    fn test_uniform_spacing_splits_at_midpoint() {
        let selection = select(&normal_gaps(9), 2).unwrap();
        assert_eq!(selection.strategy, Strategy::Padded);
        assert_eq!(positions(&selection), vec![4]);
    }

    #[test]
    fn test_even_grid_without_significant_gaps() {
        // 12 lines into 4 runs of 3
        let selection = select(&normal_gaps(11), 4).unwrap();
        assert_eq!(positions(&selection), vec![2, 5, 8]);
    }

    #[test]
    fn test_padding_keeps_significant_gaps() {
        let mut gaps = normal_gaps(19);
        gaps[2] = gap(2, 90.0, true);

        let selection = select(&gaps, 3).unwrap();
        assert_eq!(selection.strategy, Strategy::Padded);
        let chosen = positions(&selection);
        assert_eq!(chosen.len(), 2);
        assert!(chosen.contains(&2));
        // Grid for 20 lines in 3 runs is [5, 12]; 12 is farther from 2
        assert_eq!(chosen, vec![2, 12]);
    }

    #[test]
    fn test_padding_skips_grid_positions_already_chosen() {
        // Grid for 4 lines in 4 runs is [0, 1, 2]; the significant gap
        // already sits on 1
        let mut gaps = normal_gaps(3);
        gaps[1] = gap(1, 90.0, true);

        let selection = select(&gaps, 4).unwrap();
        assert_eq!(positions(&selection), vec![0, 1, 2]);
    }

    #[test]
    fn test_boundaries_sorted_and_unique() {
        let mut gaps = normal_gaps(50);
        for (i, size) in [(40, 70.0), (7, 95.0), (22, 85.0), (31, 75.0)] {
            gaps[i] = gap(i, size, true);
        }

        for n in 1..=12 {
            let selection = select(&gaps, n).unwrap();
            let chosen = positions(&selection);
            assert_eq!(chosen.len(), n - 1);
            assert!(chosen.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_significant_selection_is_monotonic() {
        let mut gaps = normal_gaps(50);
        for (i, size) in [(40, 70.0), (7, 95.0), (22, 85.0), (31, 75.0)] {
            gaps[i] = gap(i, size, true);
        }

        let mut previous: Vec<usize> = Vec::new();
        for n in 1..=5 {
            let selection = select(&gaps, n).unwrap();
            assert_eq!(selection.strategy, Strategy::Significant);
            let chosen = positions(&selection);
            assert!(previous.iter().all(|p| chosen.contains(p)));
            previous = chosen;
        }
    }

    #[test]
    fn test_selection_is_deterministic() {
        let mut gaps = normal_gaps(30);
        gaps[5] = gap(5, 40.0, true);
        gaps[17] = gap(17, 40.0, true);
        assert_eq!(select(&gaps, 4).unwrap(), select(&gaps, 4).unwrap());
    }

    #[test]
    fn test_boundary_uses_gap_order_not_index() {
        // Orders need not be contiguous
        let gaps = vec![gap(10, 10.0, false), gap(20, 10.0, false), gap(30, 10.0, false)];
        let selection = select(&gaps, 2).unwrap();
        assert_eq!(positions(&selection), vec![20]);
    }
}
