//! Whitespace-driven PDF segmentation using lopdf
//!
//! This crate provides:
//! - Line geometry extraction from text-based PDFs
//! - Vertical gap analysis that flags unusually large gaps between lines
//! - Boundary selection that cuts a document into N contiguous segments
//! - Writing each segment's page range to its own PDF

pub mod boundary;
pub mod detector;
pub mod extractor;
pub mod gaps;
pub mod segment;
pub mod stats;
pub mod writer;

pub use boundary::{select, Boundary, Selection, Strategy};
pub use detector::{probe_text_layer, DetectionConfig, TextLayer, TextLayerReport};
pub use extractor::{extract_lines, extract_lines_mem, LineLayout, LineRecord};
pub use gaps::{analyze, Gap, GapAnalysis, GapClass, GapConfig};
pub use segment::{segments, Segment};
pub use writer::{write_segments, OutputPlan};

use lopdf::Document;
use std::path::{Path, PathBuf};

/// Settings for a segmentation run
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Number of segments to produce (default: 2)
    pub num_segments: usize,
    /// Gap measurement and classification
    pub gap: GapConfig,
    /// Text layer probing
    pub detection: DetectionConfig,
    /// Output directory; defaults to the input's directory
    pub output_dir: Option<PathBuf>,
    /// Output file name prefix; defaults to the input's file stem
    pub output_prefix: Option<String>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            num_segments: 2,
            gap: GapConfig::default(),
            detection: DetectionConfig::default(),
            output_dir: None,
            output_prefix: None,
        }
    }
}

impl SegmentOptions {
    fn validate(&self) -> Result<(), SegmentError> {
        if self.num_segments == 0 {
            return Err(SegmentError::InvalidConfiguration(
                "number of segments must be at least 1".to_string(),
            ));
        }
        self.gap.validate()
    }
}

/// Everything decided about a document before any file is written
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    pub layout: LineLayout,
    pub analysis: GapAnalysis,
    pub selection: Selection,
    pub segments: Vec<Segment>,
}

/// High-level segmentation result
#[derive(Debug)]
pub struct SegmentReport {
    pub plan: SegmentPlan,
    /// Written files, in segment order
    pub outputs: Vec<PathBuf>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Plan segments from already extracted lines
///
/// This is the pure core: gap analysis, boundary selection and segment
/// derivation, with no PDF access.
pub fn plan_from_layout(
    layout: LineLayout,
    num_segments: usize,
    config: &GapConfig,
) -> Result<SegmentPlan, SegmentError> {
    let analysis = GapAnalysis::compute(&layout.lines, &layout.page_heights, config)?;
    let selection = select(&analysis.gaps, num_segments)?;
    let segments = segments(&layout.lines, &selection.boundaries);

    Ok(SegmentPlan {
        layout,
        analysis,
        selection,
        segments,
    })
}

/// Plan segments for a loaded document
///
/// `label` identifies the document in error messages. Options are checked
/// by gap analysis and boundary selection; the file-level entry points
/// check them before loading.
pub fn plan_from_document(
    doc: &Document,
    options: &SegmentOptions,
    label: &str,
) -> Result<SegmentPlan, SegmentError> {
    let probe = probe_text_layer(doc, &options.detection);
    if probe.text_layer == TextLayer::Scanned {
        return Err(SegmentError::InvalidInput(format!(
            "{}: no text layer found (scanned document, OCR required): \
             {} of {} sampled pages place images, none show text",
            label, probe.pages_with_images, probe.pages_sampled
        )));
    }

    let layout = extractor::extract_lines_from_doc(doc)?;
    if layout.is_empty() {
        return Err(SegmentError::InvalidInput(format!(
            "{}: no extractable text lines",
            label
        )));
    }

    plan_from_layout(layout, options.num_segments, &options.gap)
}

/// Plan segments for a PDF file without writing anything
pub fn plan_segments<P: AsRef<Path>>(
    path: P,
    options: &SegmentOptions,
) -> Result<SegmentPlan, SegmentError> {
    options.validate()?;
    let doc = Document::load(&path)?;
    plan_from_document(&doc, options, &path.as_ref().display().to_string())
}

/// Plan segments for a PDF held in memory
pub fn plan_segments_mem(
    buffer: &[u8],
    options: &SegmentOptions,
) -> Result<SegmentPlan, SegmentError> {
    options.validate()?;
    let doc = Document::load_mem(buffer)?;
    plan_from_document(&doc, options, "<memory>")
}

/// Segment a PDF file and write one output file per segment
///
/// This function will:
/// 1. Reject scanned documents and documents without text lines
/// 2. Measure and classify the gaps between lines
/// 3. Select the boundaries and derive segments
/// 4. Write every segment's pages, or nothing if any write fails
pub fn segment_pdf<P: AsRef<Path>>(
    path: P,
    options: &SegmentOptions,
) -> Result<SegmentReport, SegmentError> {
    let start = std::time::Instant::now();
    let path = path.as_ref();

    options.validate()?;
    let doc = Document::load(path)?;
    let plan = plan_from_document(&doc, options, &path.display().to_string())?;

    log::info!(
        "{}: {} lines, {} significant gaps, {:?} selection",
        path.display(),
        plan.layout.lines.len(),
        plan.analysis.significant_count(),
        plan.selection.strategy
    );

    let output = OutputPlan::for_input(
        path,
        options.output_dir.as_deref(),
        options.output_prefix.as_deref(),
    );
    let outputs = write_segments(&doc, &plan.segments, &output)?;

    Ok(SegmentReport {
        plan,
        outputs,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Cannot split {lines} lines into {requested} non-empty segments")]
    InsufficientContent { requested: usize, lines: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
}

impl From<lopdf::Error> for SegmentError {
    fn from(e: lopdf::Error) -> Self {
        SegmentError::Parse(e.to_string())
    }
}
