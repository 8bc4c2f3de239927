//! Line geometry extraction from PDF using lopdf
//!
//! Walks each page's content stream, tracks the text and graphics matrices,
//! and groups positioned text into lines. Every line is reported with its
//! vertical extent in a top-down coordinate system (0 at the top edge of
//! the page, growing downwards), which is what gap analysis works on.

use crate::SegmentError;
use lopdf::{Document, Object, ObjectId};
use rayon::prelude::*;
use std::path::Path;

/// Page height used when a page has no usable MediaBox or CropBox (US Letter)
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Fraction of the font size drawn above the baseline
const ASCENT: f32 = 0.8;
/// Fraction of the font size drawn below the baseline
const DESCENT: f32 = 0.2;
/// Items whose baselines differ by less than this belong to one line
const LINE_Y_TOLERANCE: f32 = 3.0;
/// Guard against cyclic Parent references
const MAX_TREE_DEPTH: usize = 32;

/// One line of text as it appears in reading order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRecord {
    /// Page the line sits on (0-indexed)
    pub page_index: usize,
    /// Top edge, measured down from the top of the page
    pub top_y: f32,
    /// Bottom edge, measured down from the top of the page
    pub bottom_y: f32,
    /// Position in reading order, strictly increasing
    pub order: usize,
}

impl LineRecord {
    pub fn height(&self) -> f32 {
        self.bottom_y - self.top_y
    }
}

/// Everything the gap analyzer needs from a document
#[derive(Debug, Clone, Default)]
pub struct LineLayout {
    /// Lines in reading order
    pub lines: Vec<LineRecord>,
    /// Text of each line; `text[i]` belongs to `lines[i]`
    pub text: Vec<String>,
    /// Height of every page in points, indexed by page index
    pub page_heights: Vec<f32>,
}

impl LineLayout {
    pub fn page_count(&self) -> usize {
        self.page_heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A run of text drawn by a single show-text operator
#[derive(Debug, Clone)]
struct TextItem {
    text: String,
    x: f32,
    /// Baseline in PDF coordinates (origin at bottom-left)
    y: f32,
    font_size: f32,
}

/// Lines of a single page before global ordering is assigned
struct PageLines {
    height: f32,
    lines: Vec<(f32, f32, String)>,
}

/// Extract line geometry from a PDF file
pub fn extract_lines<P: AsRef<Path>>(path: P) -> Result<LineLayout, SegmentError> {
    let doc = Document::load(path)?;
    extract_lines_from_doc(&doc)
}

/// Extract line geometry from a memory buffer
pub fn extract_lines_mem(buffer: &[u8]) -> Result<LineLayout, SegmentError> {
    let doc = Document::load_mem(buffer)?;
    extract_lines_from_doc(&doc)
}

/// Extract line geometry from a loaded document
///
/// Pages are decoded and grouped into lines in parallel. Results are joined
/// back in page order and only then numbered, so `order` always follows
/// reading order.
pub fn extract_lines_from_doc(doc: &Document) -> Result<LineLayout, SegmentError> {
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();

    let per_page: Vec<PageLines> = pages
        .into_par_iter()
        .map(|(page_num, page_id)| {
            let (page_top, height) = page_box(doc, page_id).unwrap_or_else(|| {
                log::warn!(
                    "page {} has no usable MediaBox or CropBox, assuming {}pt",
                    page_num,
                    DEFAULT_PAGE_HEIGHT
                );
                (DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_HEIGHT)
            });
            let items = extract_page_text_items(doc, page_id)?;
            Ok(build_page_lines(page_top, height, items))
        })
        .collect::<Result<_, SegmentError>>()?;

    let mut layout = LineLayout::default();
    for (page_index, page) in per_page.into_iter().enumerate() {
        layout.page_heights.push(page.height);
        for (top_y, bottom_y, text) in page.lines {
            layout.lines.push(LineRecord {
                page_index,
                top_y,
                bottom_y,
                order: layout.lines.len(),
            });
            layout.text.push(text);
        }
    }

    log::debug!(
        "extracted {} lines from {} pages",
        layout.lines.len(),
        layout.page_heights.len()
    );

    Ok(layout)
}

/// Group a page's items into lines with top-down vertical extents
fn build_page_lines(page_top: f32, height: f32, items: Vec<TextItem>) -> PageLines {
    let lines = group_into_lines(items)
        .into_iter()
        .map(|line| {
            let top = line
                .iter()
                .map(|i| page_top - (i.y + i.font_size * ASCENT))
                .fold(f32::INFINITY, f32::min);
            let bottom = line
                .iter()
                .map(|i| page_top - (i.y - i.font_size * DESCENT))
                .fold(f32::NEG_INFINITY, f32::max);
            let text = line
                .iter()
                .map(|i| i.text.trim())
                .collect::<Vec<_>>()
                .join(" ");
            (top, bottom, text)
        })
        .collect();

    PageLines { height, lines }
}

/// Top edge and height of a page
///
/// Uses the page's (possibly inherited) MediaBox, falling back to its
/// CropBox when no MediaBox is present anywhere up the page tree.
fn page_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    inherited_box(doc, page_id, b"MediaBox").or_else(|| inherited_box(doc, page_id, b"CropBox"))
}

/// Read a rectangle entry from the page or the nearest ancestor carrying it
fn inherited_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<(f32, f32)> {
    let mut current = doc.get_dictionary(page_id).ok();
    let mut depth = 0;

    // Box entries are inheritable; walk up the page tree until one is found
    while let Some(dict) = current {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            return None;
        }
        if let Ok(rect) = dict.get(key) {
            let array = match rect {
                Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
                other => other.as_array().ok()?,
            };
            if array.len() < 4 {
                return None;
            }
            let lower = get_number(&array[1])?;
            let upper = get_number(&array[3])?;
            let height = (upper - lower).abs();
            if height <= 0.0 {
                return None;
            }
            return Some((upper.max(lower), height));
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }

    None
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Walk a page's content stream and collect every non-blank text run
fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<TextItem>, SegmentError> {
    use lopdf::content::Content;

    let mut items = Vec::new();

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| SegmentError::Parse(e.to_string()))?;

    let content = Content::decode(&content_data).map_err(|e| SegmentError::Parse(e.to_string()))?;

    let mut ctm = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();

    let mut current_font = String::new();
    let mut current_font_size: f32 = 12.0;
    let mut leading: Option<f32> = None;
    let mut text_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut line_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut in_text_block = false;

    // Records a text run at the current text position
    let mut push_item = |text: String, text_matrix: &[f32; 6], ctm: &[f32; 6], size: f32| {
        if text.trim().is_empty() {
            return;
        }
        let combined = multiply_matrices(text_matrix, ctm);
        items.push(TextItem {
            text,
            x: combined[4],
            y: combined[5],
            font_size: effective_font_size(size, &combined),
        });
    };

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let new_matrix = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    ctm = multiply_matrices(&new_matrix, &ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            }
            "ET" => in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        current_font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        current_font_size = size;
                    }
                }
            }
            "TL" => {
                leading = op.operands.first().and_then(get_number);
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        leading = Some(-ty);
                    }
                    // Offsets are in text space, scaled by the line matrix
                    line_matrix[4] += tx * line_matrix[0] + ty * line_matrix[2];
                    line_matrix[5] += tx * line_matrix[1] + ty * line_matrix[3];
                    text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    line_matrix = text_matrix;
                }
            }
            "T*" => {
                next_line(&mut line_matrix, leading.unwrap_or(current_font_size * 1.2));
                text_matrix = line_matrix;
            }
            "Tj" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &current_font)
                    {
                        push_item(text, &text_matrix, &ctm, current_font_size);
                    }
                }
            }
            "TJ" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Ok(array) = op.operands[0].as_array() {
                        let combined_text: String = array
                            .iter()
                            .filter_map(|item| {
                                extract_text_from_operand(item, doc, &fonts, &current_font)
                            })
                            .collect();
                        push_item(combined_text, &text_matrix, &ctm, current_font_size);
                    }
                }
            }
            "'" | "\"" => {
                next_line(&mut line_matrix, leading.unwrap_or(current_font_size * 1.2));
                text_matrix = line_matrix;
                // `"` carries word and char spacing before the string
                let string_operand = if op.operator == "\"" {
                    op.operands.get(2)
                } else {
                    op.operands.first()
                };
                if let Some(operand) = string_operand {
                    if let Some(text) =
                        extract_text_from_operand(operand, doc, &fonts, &current_font)
                    {
                        push_item(text, &text_matrix, &ctm, current_font_size);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(items)
}

/// Move the line matrix down by one leading
fn next_line(line_matrix: &mut [f32; 6], leading: f32) {
    line_matrix[4] -= leading * line_matrix[2];
    line_matrix[5] -= leading * line_matrix[3];
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute rendered font size from base size and the combined matrix
fn effective_font_size(base_size: f32, matrix: &[f32; 6]) -> f32 {
    let scale_x = (matrix[0].powi(2) + matrix[1].powi(2)).sqrt();
    let scale_y = (matrix[2].powi(2) + matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Extract text from a text operand, handling encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &std::collections::BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: try UTF-16BE then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

/// Group a page's text items into lines
///
/// Preserves content stream order, which is the reading order for
/// single-column documents; only consecutive items sharing a baseline are
/// merged. Items within a line are sorted left to right.
fn group_into_lines(items: Vec<TextItem>) -> Vec<Vec<TextItem>> {
    let mut lines: Vec<Vec<TextItem>> = Vec::new();

    for item in items {
        match lines.last_mut() {
            Some(line) if (line[0].y - item.y).abs() < LINE_Y_TOLERANCE => line.push(item),
            _ => lines.push(vec![item]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}
