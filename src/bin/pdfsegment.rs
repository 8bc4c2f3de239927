//! CLI tool for splitting a PDF at its largest whitespace gaps

use clap::Parser;
use pdf_segmenter::{
    plan_segments, segment_pdf, GapConfig, SegmentOptions, SegmentPlan, Strategy,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "pdfsegment")]
#[command(version)]
#[command(about = "Split a PDF into sections at unusually large vertical gaps", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Number of segments to produce
    #[arg(long, default_value_t = 2, value_name = "N")]
    segments: usize,

    /// Directory for the output files (default: the input's directory)
    #[arg(long = "output_dir", alias = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output file name prefix (default: the input's file stem)
    #[arg(long = "output_prefix", alias = "output-prefix", value_name = "PREFIX")]
    output_prefix: Option<String>,

    /// Standard deviations above the mean a gap must reach to be significant
    #[arg(long, default_value_t = 1.0, value_name = "K")]
    threshold: f32,

    /// Points added to every gap that crosses a page break
    #[arg(long = "page-bridge", default_value_t = 14.4, value_name = "PT")]
    page_bridge: f32,

    /// Print the planned segments without writing any file
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let options = SegmentOptions {
        num_segments: cli.segments,
        gap: GapConfig {
            threshold_multiplier: cli.threshold,
            page_bridge: cli.page_bridge,
            ..GapConfig::default()
        },
        output_dir: cli.output_dir.clone(),
        output_prefix: cli.output_prefix.clone(),
        ..SegmentOptions::default()
    };

    let result = if cli.dry_run {
        plan_segments(&cli.input, &options).map(|plan| print_plan(&plan))
    } else {
        segment_pdf(&cli.input, &options).map(|report| {
            print_plan(&report.plan);
            println!();
            for path in &report.outputs {
                println!("Saved: {}", path.display());
            }
            println!(
                "Segmented into {} files in {}ms",
                report.outputs.len(),
                report.processing_time_ms
            );
        })
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_plan(plan: &SegmentPlan) {
    let analysis = &plan.analysis;

    println!(
        "Lines: {}  Pages: {}",
        plan.layout.lines.len(),
        plan.layout.page_count()
    );
    println!(
        "Gaps: mean {:.1}pt, std dev {:.1}pt, threshold {}",
        analysis.mean,
        analysis.std_dev,
        analysis
            .threshold
            .map(|t| format!("{:.1}pt", t))
            .unwrap_or_else(|| "n/a (uniform spacing)".to_string())
    );
    println!(
        "Significant gaps: {} ({})",
        analysis.significant_count(),
        match plan.selection.strategy {
            Strategy::Significant => "boundaries on significant gaps",
            Strategy::Padded => "padded with evenly spaced boundaries",
        }
    );
    println!();

    for (i, segment) in plan.segments.iter().enumerate() {
        println!(
            "Segment {}: lines {}-{}, pages {}-{}",
            i + 1,
            segment.start_line + 1,
            segment.end_line + 1,
            segment.page_range.0 + 1,
            segment.page_range.1 + 1
        );
    }
}
