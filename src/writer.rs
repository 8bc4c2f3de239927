//! Writing segment page ranges to new PDF files
//!
//! Every output document is built in memory before anything touches the
//! disk, and files already written are removed if a later one fails, so a
//! run leaves either all of its outputs or none.

use crate::segment::Segment;
use crate::SegmentError;
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Characters that can't appear in a file name on common platforms
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// Where output files go and how they are named
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub output_dir: PathBuf,
    pub prefix: String,
}

impl OutputPlan {
    /// Resolve output settings for `input`
    ///
    /// The directory defaults to the input's directory and the prefix to
    /// the input's file stem.
    pub fn for_input(input: &Path, output_dir: Option<&Path>, prefix: Option<&str>) -> Self {
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let prefix = match prefix {
            Some(p) => sanitize_prefix(p),
            None => input
                .file_stem()
                .map(|s| sanitize_prefix(&s.to_string_lossy()))
                .unwrap_or_else(|| "segment".to_string()),
        };

        Self { output_dir, prefix }
    }

    /// Path of the output for a 1-indexed segment
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}{}.pdf", self.prefix, index))
    }
}

/// Replace path separators and other characters illegal in file names
pub fn sanitize_prefix(prefix: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(prefix, "_").into_owned()
}

/// Write one PDF per segment, each holding the segment's page range
///
/// Returns the written paths in segment order.
pub fn write_segments(
    source: &Document,
    segments: &[Segment],
    plan: &OutputPlan,
) -> Result<Vec<PathBuf>, SegmentError> {
    let mut rendered = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let bytes = render_segment(source, segment)?;
        rendered.push((plan.path_for(i + 1), bytes));
    }

    prepare_output_dir(&plan.output_dir)?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(rendered.len());
    for (path, bytes) in rendered {
        if let Err(e) = fs::write(&path, bytes) {
            remove_partial_output(&written);
            return Err(SegmentError::InvalidConfiguration(format!(
                "cannot write {}: {}",
                path.display(),
                e
            )));
        }
        log::info!("wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

/// Build a copy of `source` restricted to the segment's pages
pub fn segment_document(source: &Document, segment: &Segment) -> Document {
    let mut doc = source.clone();

    let to_delete: Vec<u32> = doc
        .get_pages()
        .keys()
        .copied()
        .filter(|&page_num| !segment.pages().contains(&(page_num as usize - 1)))
        .collect();

    if !to_delete.is_empty() {
        doc.delete_pages(&to_delete);
    }
    doc.prune_objects();
    doc
}

fn render_segment(source: &Document, segment: &Segment) -> Result<Vec<u8>, SegmentError> {
    let mut doc = segment_document(source, segment);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| SegmentError::Parse(format!("cannot serialize segment: {}", e)))?;
    Ok(buffer)
}

fn prepare_output_dir(dir: &Path) -> Result<(), SegmentError> {
    fs::create_dir_all(dir).map_err(|e| {
        SegmentError::InvalidConfiguration(format!(
            "cannot create output directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let metadata = fs::metadata(dir)?;
    if metadata.permissions().readonly() {
        return Err(SegmentError::InvalidConfiguration(format!(
            "output directory {} is read-only",
            dir.display()
        )));
    }
    Ok(())
}

fn remove_partial_output(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("could not remove partial output {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_prefix() {
        assert_eq!(sanitize_prefix("report"), "report");
        assert_eq!(sanitize_prefix("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_prefix("what?<now>"), "what__now_");
    }

    #[test]
    fn test_plan_defaults_to_input_location() {
        let plan = OutputPlan::for_input(Path::new("/data/papers/thesis.pdf"), None, None);
        assert_eq!(plan.output_dir, PathBuf::from("/data/papers"));
        assert_eq!(plan.prefix, "thesis");
        assert_eq!(plan.path_for(2), PathBuf::from("/data/papers/thesis2.pdf"));
    }

    #[test]
    fn test_plan_bare_file_name_uses_current_dir() {
        let plan = OutputPlan::for_input(Path::new("thesis.pdf"), None, None);
        assert_eq!(plan.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_plan_overrides() {
        let plan = OutputPlan::for_input(
            Path::new("/data/thesis.pdf"),
            Some(Path::new("/tmp/out")),
            Some("part_"),
        );
        assert_eq!(plan.path_for(1), PathBuf::from("/tmp/out/part_1.pdf"));
    }
}
