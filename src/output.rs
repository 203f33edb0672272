//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! photo.jpg 4000x3000 image/jpeg (8-bit)
//!     Orient: rotate 90
//!     Pre-crop: crop 2000x2000+100+0
//!     Scale: resize 800x800, sharpen 0x0.5+2.4+0.07
//!     Strategy: stretch
//!     Result: 800x800
//!     Command: "/usr/bin/convert" "photo.jpg" -depth 16 ...
//! ```
//!
//! ## Resize
//!
//! ```text
//! photo.jpg → thumb.jpg (800x800)
//! ```
//!
//! ## Check
//!
//! ```text
//! ImageMagick: /usr/bin/convert
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::{
    FlipAxis, ImageInfo, Operation, PreparedTransform, ResizeStrategy, ToolSupport,
    TransformOutcome,
};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Last path component, or the whole path when there is none.
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn dimensions(info: &ImageInfo) -> String {
    format!("{}x{}", info.width, info.height)
}

/// One operation in words.
fn describe(op: &Operation) -> String {
    match op {
        Operation::Rotate { degrees } => format!("rotate {degrees}"),
        Operation::Flip { axis } => format!("flip {}", axis_name(*axis)),
        Operation::Crop { rect } => format!("crop {rect}"),
        Operation::Resize { width, height } => format!("resize {width}x{height}"),
        Operation::CropAfterResize { rect } => format!("crop {rect}"),
        Operation::Sharpen { mask } => format!(
            "sharpen {}x{}+{}+{}",
            mask.radius, mask.sigma, mask.amount, mask.threshold
        ),
    }
}

fn axis_name(axis: FlipAxis) -> &'static str {
    match axis {
        FlipAxis::Horizontal => "horizontal",
        FlipAxis::Vertical => "vertical",
    }
}

/// `Label: op, op` or nothing for an empty bucket.
fn bucket_line(label: &str, ops: &[Operation]) -> Option<String> {
    if ops.is_empty() {
        return None;
    }
    let described: Vec<String> = ops.iter().map(describe).collect();
    Some(format!("{}{}: {}", indent(1), label, described.join(", ")))
}

fn strategy_label(strategy: &ResizeStrategy) -> String {
    match strategy {
        ResizeStrategy::Identity => "identity".to_string(),
        ResizeStrategy::Stretch => "stretch".to_string(),
        ResizeStrategy::CropToFit {
            fill_width,
            fill_height,
            offset_x,
            offset_y,
        } => format!("crop to fit (fill {fill_width}x{fill_height}, offset +{offset_x}+{offset_y})"),
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Format a dry-run: what would happen to `source`, and the command for it.
pub fn format_plan(source: &Path, source_info: &ImageInfo, prepared: &PreparedTransform) -> Vec<String> {
    let plan = &prepared.plan;
    let mut lines = vec![format!(
        "{} {} {} ({}-bit)",
        file_label(source),
        dimensions(source_info),
        source_info.mime_type,
        source_info.bit_depth
    )];

    lines.extend(bucket_line("Orient", &plan.orient));
    lines.extend(bucket_line("Pre-crop", &plan.pre_crop));
    lines.extend(bucket_line("Scale", &plan.scale));
    if plan.is_noop() {
        lines.push(format!("{}Operations: none", indent(1)));
    }
    lines.push(format!("{}Strategy: {}", indent(1), strategy_label(&plan.strategy)));
    lines.push(format!("{}Result: {}", indent(1), dimensions(&plan.info)));
    lines.push(format!("{}Command: {}", indent(1), prepared.command.shell_line()));
    lines
}

pub fn print_plan(source: &Path, source_info: &ImageInfo, prepared: &PreparedTransform) {
    for line in format_plan(source, source_info, prepared) {
        println!("{}", line);
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Format a finished transform as a single summary line.
pub fn format_outcome(source: &Path, destination: &Path, outcome: &TransformOutcome) -> Vec<String> {
    vec![format!(
        "{} → {} ({})",
        file_label(source),
        destination.display(),
        dimensions(outcome.final_info())
    )]
}

pub fn print_outcome(source: &Path, destination: &Path, outcome: &TransformOutcome) {
    for line in format_outcome(source, destination, outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the tool discovery result.
pub fn format_check(support: &ToolSupport) -> Vec<String> {
    match support {
        ToolSupport::Available { convert } => {
            vec![format!("ImageMagick: {}", convert.display())]
        }
        ToolSupport::Unconfigured => vec![
            "ImageMagick: not configured".to_string(),
            format!(
                "{}Set imagemagick_path in magick-sizer.toml or pass --imagemagick-path",
                indent(1)
            ),
        ],
        ToolSupport::MissingExecutable(dir) => vec![
            "ImageMagick: missing executable".to_string(),
            format!("{}No convert in {}", indent(1), dir.display()),
        ],
    }
}

pub fn print_check(support: &ToolSupport) {
    for line in format_check(support) {
        println!("{}", line);
    }
}
