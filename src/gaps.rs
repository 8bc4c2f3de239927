//! Vertical gap analysis between consecutive lines
//!
//! Measures the whitespace between every line and the next one in reading
//! order, then flags the gaps that stand out from the document's typical
//! spacing. A gap is significant when it exceeds `mean + k * std_dev` of
//! all gap sizes.

use crate::extractor::{LineRecord, DEFAULT_PAGE_HEIGHT};
use crate::stats;
use crate::SegmentError;

/// Spread (in points) below which spacing is treated as perfectly uniform
const UNIFORM_SPREAD: f32 = 1e-3;

/// Whether a gap stands out from the surrounding spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapClass {
    Normal,
    Significant,
}

/// Whitespace between a line and the one following it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// `order` of the line preceding the gap
    pub after_line: usize,
    /// Vertical distance in points, never negative
    pub size: f32,
    /// Page of the line preceding the gap
    pub page_index: usize,
    pub classification: GapClass,
}

impl Gap {
    pub fn is_significant(&self) -> bool {
        self.classification == GapClass::Significant
    }
}

/// Tunables for gap measurement and classification
#[derive(Debug, Clone)]
pub struct GapConfig {
    /// Multiplier `k` on the standard deviation (default: 1.0)
    pub threshold_multiplier: f32,
    /// Added to every gap that crosses a page break (default: 14.4, one
    /// blank line of 12pt text)
    pub page_bridge: f32,
    /// Height assumed for pages missing from the height table
    pub default_page_height: f32,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            threshold_multiplier: 1.0,
            page_bridge: 14.4,
            default_page_height: DEFAULT_PAGE_HEIGHT,
        }
    }
}

impl GapConfig {
    /// Reject values that would make classification meaningless
    pub fn validate(&self) -> Result<(), SegmentError> {
        let fields = [
            ("threshold multiplier", self.threshold_multiplier),
            ("page bridge", self.page_bridge),
            ("default page height", self.default_page_height),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SegmentError::InvalidConfiguration(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Classified gaps plus the statistics used to classify them
#[derive(Debug, Clone)]
pub struct GapAnalysis {
    pub gaps: Vec<Gap>,
    pub mean: f32,
    pub std_dev: f32,
    /// Size a gap must exceed to be significant; `None` when spacing is
    /// uniform and nothing can stand out
    pub threshold: Option<f32>,
}

impl GapAnalysis {
    /// Measure and classify the gaps between `lines`
    ///
    /// `page_heights` is indexed by page index and is used to measure gaps
    /// that cross a page break.
    pub fn compute(
        lines: &[LineRecord],
        page_heights: &[f32],
        config: &GapConfig,
    ) -> Result<Self, SegmentError> {
        config.validate()?;

        if lines.is_empty() {
            return Err(SegmentError::InvalidInput(
                "no text lines to analyze".to_string(),
            ));
        }

        if let Some(pair) = lines.windows(2).find(|w| w[1].order <= w[0].order) {
            return Err(SegmentError::InvalidInput(format!(
                "lines out of reading order: {} followed by {}",
                pair[0].order, pair[1].order
            )));
        }

        let sizes: Vec<f32> = lines
            .windows(2)
            .map(|w| gap_size(&w[0], &w[1], page_heights, config))
            .collect();

        let summary = stats::summarize(&sizes);
        let (mean, std_dev) = summary.map_or((0.0, 0.0), |s| (s.mean, s.std_dev));

        let threshold = if std_dev <= UNIFORM_SPREAD {
            None
        } else {
            Some(mean + config.threshold_multiplier * std_dev)
        };

        let gaps: Vec<Gap> = lines
            .windows(2)
            .zip(sizes)
            .map(|(w, size)| Gap {
                after_line: w[0].order,
                size,
                page_index: w[0].page_index,
                classification: match threshold {
                    Some(t) if size > t => GapClass::Significant,
                    _ => GapClass::Normal,
                },
            })
            .collect();

        log::debug!(
            "{} gaps: mean {:.2}, std dev {:.2}, threshold {:?}, {} significant",
            gaps.len(),
            mean,
            std_dev,
            threshold,
            gaps.iter().filter(|g| g.is_significant()).count()
        );

        Ok(Self {
            gaps,
            mean,
            std_dev,
            threshold,
        })
    }

    pub fn significant_count(&self) -> usize {
        self.gaps.iter().filter(|g| g.is_significant()).count()
    }

    /// Number of lines the gaps were measured between
    pub fn line_count(&self) -> usize {
        self.gaps.len() + 1
    }
}

/// Measure and classify the gaps between consecutive lines
pub fn analyze(
    lines: &[LineRecord],
    page_heights: &[f32],
    config: &GapConfig,
) -> Result<Vec<Gap>, SegmentError> {
    GapAnalysis::compute(lines, page_heights, config).map(|analysis| analysis.gaps)
}

/// Whitespace between two consecutive lines
///
/// Across a page break the gap is the space left below `prev` on its page,
/// plus the space above `next` on its page, plus the configured bridge.
fn gap_size(
    prev: &LineRecord,
    next: &LineRecord,
    page_heights: &[f32],
    config: &GapConfig,
) -> f32 {
    if prev.page_index == next.page_index {
        return (next.top_y - prev.bottom_y).max(0.0);
    }

    let prev_height = page_heights
        .get(prev.page_index)
        .copied()
        .unwrap_or(config.default_page_height);
    let below = (prev_height - prev.bottom_y).max(0.0);
    let above = next.top_y.max(0.0);

    config.page_bridge + below + above
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lines of height 10 laid out on one page with the given gaps
    fn lines_with_gaps(gaps: &[f32]) -> Vec<LineRecord> {
        let mut lines = Vec::new();
        let mut top = 50.0;
        for order in 0..=gaps.len() {
            lines.push(LineRecord {
                page_index: 0,
                top_y: top,
                bottom_y: top + 10.0,
                order,
            });
            if let Some(gap) = gaps.get(order) {
                top += 10.0 + gap;
            }
        }
        lines
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = analyze(&[], &[], &GapConfig::default()).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidInput(_)));
    }

    #[test]
    fn test_single_line_has_no_gaps() {
        let lines = lines_with_gaps(&[]);
        let analysis = GapAnalysis::compute(&lines, &[792.0], &GapConfig::default()).unwrap();
        assert!(analysis.gaps.is_empty());
        assert_eq!(analysis.threshold, None);
        assert_eq!(analysis.line_count(), 1);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut lines = lines_with_gaps(&[10.0, 10.0]);
        lines.swap(0, 1);
        let err = analyze(&lines, &[792.0], &GapConfig::default()).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidInput(_)));
    }

    #[test]
    fn test_single_large_gap_is_significant() {
        let mut gaps = vec![10.0; 9];
        gaps[4] = 100.0;
        let lines = lines_with_gaps(&gaps);

        let analysis = GapAnalysis::compute(&lines, &[792.0], &GapConfig::default()).unwrap();
        assert_eq!(analysis.gaps.len(), 9);
        assert!((analysis.mean - 20.0).abs() < 1e-3);
        assert!((analysis.std_dev - 28.284).abs() < 1e-2);

        let significant: Vec<usize> = analysis
            .gaps
            .iter()
            .filter(|g| g.is_significant())
            .map(|g| g.after_line)
            .collect();
        assert_eq!(significant, vec![4]);
    }

    #[test]
    fn test_uniform_spacing_has_no_significant_gaps() {
        let lines = lines_with_gaps(&[14.4; 20]);
        let analysis = GapAnalysis::compute(&lines, &[792.0], &GapConfig::default()).unwrap();
        assert_eq!(analysis.threshold, None);
        assert_eq!(analysis.significant_count(), 0);
    }

    #[test]
    fn test_overlapping_lines_clamp_to_zero() {
        let lines = vec![
            LineRecord {
                page_index: 0,
                top_y: 100.0,
                bottom_y: 112.0,
                order: 0,
            },
            LineRecord {
                page_index: 0,
                top_y: 108.0,
                bottom_y: 120.0,
                order: 1,
            },
        ];
        let gaps = analyze(&lines, &[792.0], &GapConfig::default()).unwrap();
        assert_eq!(gaps[0].size, 0.0);
    }

    #[test]
    fn test_cross_page_gap_includes_bridge_and_residuals() {
        let lines = vec![
            LineRecord {
                page_index: 0,
                top_y: 700.0,
                bottom_y: 712.0,
                order: 0,
            },
            LineRecord {
                page_index: 1,
                top_y: 72.0,
                bottom_y: 84.0,
                order: 1,
            },
        ];
        let config = GapConfig {
            page_bridge: 20.0,
            ..GapConfig::default()
        };
        let gaps = analyze(&lines, &[792.0, 792.0], &config).unwrap();
        // 80 below the last line, 72 above the first, plus the bridge
        assert!((gaps[0].size - 172.0).abs() < 1e-4);
        assert_eq!(gaps[0].page_index, 0);
    }

    #[test]
    fn test_missing_page_height_uses_default() {
        let lines = vec![
            LineRecord {
                page_index: 0,
                top_y: 700.0,
                bottom_y: 712.0,
                order: 0,
            },
            LineRecord {
                page_index: 1,
                top_y: 0.0,
                bottom_y: 12.0,
                order: 1,
            },
        ];
        let config = GapConfig {
            page_bridge: 0.0,
            default_page_height: 800.0,
            ..GapConfig::default()
        };
        let gaps = analyze(&lines, &[], &config).unwrap();
        assert!((gaps[0].size - 88.0).abs() < 1e-4);
    }

    #[test]
    fn test_higher_multiplier_flags_fewer_gaps() {
        let lines = lines_with_gaps(&[10.0, 10.0, 40.0, 10.0, 10.0, 90.0, 10.0, 10.0]);

        let loose = GapAnalysis::compute(
            &lines,
            &[792.0],
            &GapConfig {
                threshold_multiplier: 0.5,
                ..GapConfig::default()
            },
        )
        .unwrap();
        let strict = GapAnalysis::compute(
            &lines,
            &[792.0],
            &GapConfig {
                threshold_multiplier: 2.0,
                ..GapConfig::default()
            },
        )
        .unwrap();

        assert_eq!(loose.significant_count(), 2);
        assert_eq!(strict.significant_count(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let lines = lines_with_gaps(&[10.0]);
        let config = GapConfig {
            threshold_multiplier: f32::NAN,
            ..GapConfig::default()
        };
        let err = analyze(&lines, &[792.0], &config).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidConfiguration(_)));
    }
}
