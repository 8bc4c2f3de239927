//! Text layer detection
//!
//! Samples page content streams for text-showing operators before any
//! geometry is extracted. A document whose sampled pages place images but
//! never show text is a scan: there is no line structure to segment.

use lopdf::{Document, Object, ObjectId};

/// What the sampled pages contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLayer {
    /// Text operators found on at least one sampled page
    Present,
    /// Only images were found; the document needs OCR
    Scanned,
    /// Neither text nor images were found
    Empty,
}

/// Result of probing a document for a text layer
#[derive(Debug, Clone)]
pub struct TextLayerReport {
    pub text_layer: TextLayer,
    /// Number of pages sampled
    pub pages_sampled: u32,
    /// Sampled pages placing an XObject
    pub pages_with_images: u32,
    /// Total text operators over the sampled pages
    pub text_operator_count: u32,
}

/// Configuration for text layer detection
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Maximum number of pages to sample (default: 5)
    pub max_pages_to_sample: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_pages_to_sample: 5,
        }
    }
}

/// Probe a loaded document for a text layer
pub fn probe_text_layer(doc: &Document, config: &DetectionConfig) -> TextLayerReport {
    let pages = doc.get_pages();
    let total_pages = pages.len() as u32;
    let sample = sample_pages(total_pages, config.max_pages_to_sample);

    let mut pages_with_images = 0u32;
    let mut text_operator_count = 0u32;

    for page_num in &sample {
        if let Some(&page_id) = pages.get(page_num) {
            let (text_ops, has_images) = scan_page(doc, page_id);
            if has_images {
                pages_with_images += 1;
            }
            text_operator_count += text_ops;
        }
    }

    let text_layer = if text_operator_count > 0 {
        TextLayer::Present
    } else if pages_with_images > 0 {
        TextLayer::Scanned
    } else {
        TextLayer::Empty
    };

    log::debug!(
        "text layer {:?}: {} text operators over {} sampled pages, {} with images",
        text_layer,
        text_operator_count,
        sample.len(),
        pages_with_images
    );

    TextLayerReport {
        text_layer,
        pages_sampled: sample.len() as u32,
        pages_with_images,
        text_operator_count,
    }
}

/// Pick the 1-indexed pages to sample: first, last, and evenly in between
fn sample_pages(total_pages: u32, max_pages: u32) -> Vec<u32> {
    let pages_to_sample = max_pages.min(total_pages);
    if pages_to_sample >= total_pages {
        return (1..=total_pages).collect();
    }

    let mut indices = Vec::with_capacity(pages_to_sample as usize);
    if pages_to_sample == 0 {
        return indices;
    }
    indices.push(1);
    if pages_to_sample > 1 {
        indices.push(total_pages);
    }

    let remaining = pages_to_sample.saturating_sub(2);
    if remaining > 0 && total_pages > 2 {
        let step = (total_pages - 2) / (remaining + 1);
        for i in 1..=remaining {
            let idx = 1 + step * i;
            if idx > 1 && idx < total_pages && !indices.contains(&idx) {
                indices.push(idx);
            }
        }
    }

    indices.sort();
    indices.dedup();
    indices
}

/// Count text operators and note image placement across a page's streams
fn scan_page(doc: &Document, page_id: ObjectId) -> (u32, bool) {
    let mut text_ops = 0u32;
    let mut has_images = false;

    for content_id in doc.get_page_contents(page_id) {
        if let Ok(Object::Stream(stream)) = doc.get_object(content_id) {
            let content = match stream.decompressed_content() {
                Ok(data) => data,
                Err(_) => stream.content.clone(),
            };
            let (ops, imgs) = scan_content_for_text_operators(&content);
            text_ops += ops;
            has_images = has_images || imgs;
        }
    }

    (text_ops, has_images)
}

/// Fast scan of content stream bytes for text operators
///
/// Looks for `Tj`, `TJ`, `'` and `"` (the operators that show text) and
/// `Do` (XObject placement). An operator only counts when it stands as its
/// own token, so names like `/FTj` are skipped.
fn scan_content_for_text_operators(content: &[u8]) -> (u32, bool) {
    let mut text_ops = 0u32;
    let mut has_images = false;

    let starts_token = |i: usize| {
        i == 0 || content[i - 1].is_ascii_whitespace() || b")]>".contains(&content[i - 1])
    };
    let ends_token = |i: usize| {
        i >= content.len() || content[i].is_ascii_whitespace() || b"/([<%".contains(&content[i])
    };

    for i in 0..content.len() {
        if !starts_token(i) {
            continue;
        }
        let next = content.get(i + 1).copied();
        match (content[i], next) {
            (b'T', Some(b'j' | b'J')) if ends_token(i + 2) => text_ops += 1,
            (b'\'' | b'"', _) if ends_token(i + 1) => text_ops += 1,
            (b'D', Some(b'o')) if ends_token(i + 2) => has_images = true,
            _ => {}
        }
    }

    (text_ops, has_images)
}
