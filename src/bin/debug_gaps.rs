//! Debug tool: Print line extents, the gap before each line, and gap statistics
//!
//! Usage: debug_gaps <pdf_file> [page_number]
//!
//! Shows every text line with its top/bottom position, the gap from the
//! previous line in reading order, and whether that gap is significant.
//! Ends with the gap statistics and a histogram of gap sizes rounded to the
//! nearest half point.

use pdf_segmenter::{extract_lines, GapAnalysis, GapConfig};
use std::collections::BTreeMap;
use std::env;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file> [page_number]", args[0]);
        eprintln!();
        eprintln!("Prints line positions and the whitespace gaps between them.");
        eprintln!("If page_number is given (1-indexed), only that page is shown.");
        process::exit(1);
    }

    let pdf_path = &args[1];
    let filter_page: Option<usize> = args.get(2).and_then(|s| s.parse().ok());

    let layout = match extract_lines(pdf_path) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error extracting lines: {}", e);
            process::exit(1);
        }
    };

    if layout.is_empty() {
        eprintln!("No text lines found in PDF.");
        process::exit(0);
    }

    let config = GapConfig::default();
    let analysis = match GapAnalysis::compute(&layout.lines, &layout.page_heights, &config) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Error analyzing gaps: {}", e);
            process::exit(1);
        }
    };

    println!(
        "{:>5} {:>5} {:>8} {:>8} {:>8}  {}",
        "Line", "Page", "Top", "Bottom", "Gap", "Text (first 70 chars)"
    );
    println!("{}", "-".repeat(110));

    for (i, line) in layout.lines.iter().enumerate() {
        // The gap before line i is gap i - 1
        let before = i.checked_sub(1).and_then(|g| analysis.gaps.get(g));

        if let Some(page) = filter_page {
            if line.page_index + 1 != page {
                continue;
            }
        }

        let (gap_str, marker) = match before {
            Some(gap) => (
                format!("{:8.1}", gap.size),
                if gap.is_significant() { " <<SIGNIFICANT>>" } else { "" },
            ),
            None => ("     ---".to_string(), ""),
        };
        let text: String = layout.text[i].chars().take(70).collect();

        println!(
            "{:5} {:5} {:8.1} {:8.1} {}  {}{}",
            line.order,
            line.page_index + 1,
            line.top_y,
            line.bottom_y,
            gap_str,
            text,
            marker
        );
    }

    println!();
    println!("Gap statistics:");
    println!("  Count:     {}", analysis.gaps.len());
    println!("  Mean:      {:8.2}", analysis.mean);
    println!("  Std dev:   {:8.2}", analysis.std_dev);
    match analysis.threshold {
        Some(t) => println!(
            "  Threshold: {:8.2} (mean + {} * std dev)",
            t, config.threshold_multiplier
        ),
        None => println!("  Threshold: n/a (uniform spacing)"),
    }
    println!("  Significant: {}", analysis.significant_count());

    // Histogram of gap sizes rounded to the nearest 0.5pt
    let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
    for gap in &analysis.gaps {
        *buckets.entry((gap.size * 2.0).round() as i64).or_insert(0) += 1;
    }

    println!();
    println!("  Gap size histogram (pt):");
    for (key, count) in buckets {
        let bar: String = "#".repeat(count.min(60));
        println!("    {:8.1} | {:4} {}", key as f32 / 2.0, count, bar);
    }
}
