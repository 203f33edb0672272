//! Geometry planner: decides which operations a transform needs.
//!
//! Planning is a fold over a `Working` accumulator. Each stage receives the
//! working image as left by the previous stage and returns an updated copy,
//! so a later stage always sees the current size rather than the source size.
//!
//! ```text
//! rotate → flip → pre-crop → resize strategy → sharpen
//! └─ bucket A ─┘  bucket B   └────────── bucket C ─────────┘
//! ```
//!
//! Bucket B forces the assembler into a two-stage pipe when bucket C is not
//! empty.

use super::TransformError;
use super::calculations::{
    calculate_crop_offset, calculate_fill_dimensions, effective_rotation, swaps_axes,
};
use super::params::{
    CropRect, Cropping, FlipAxis, ImageInfo, OrientationHint, TransformRequest, UnsharpMask,
};
use serde::Serialize;
use tracing::{debug, warn};

/// A single geometric step, in the order it is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Clockwise rotation; exposed corners are transparent.
    Rotate { degrees: f64 },
    Flip { axis: FlipAxis },
    /// Exact crop before any scaling.
    Crop { rect: CropRect },
    /// Non-proportional resize to exactly `width` x `height`.
    Resize { width: u32, height: u32 },
    /// Exact crop of the scaled canvas.
    CropAfterResize { rect: CropRect },
    Sharpen { mask: UnsharpMask },
}

/// How requested dimensions are reconciled with the working size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResizeStrategy {
    /// Working size already matches; nothing is scaled.
    Identity,
    /// Scale straight to the requested size.
    Stretch,
    /// Scale to cover the requested box, then crop the box out.
    CropToFit {
        fill_width: u32,
        fill_height: u32,
        offset_x: u32,
        offset_y: u32,
    },
}

/// Result of a planning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Bucket A: rotate and flip.
    pub orient: Vec<Operation>,
    /// Bucket B: crop before resize.
    pub pre_crop: Vec<Operation>,
    /// Bucket C: resize, crop-after-resize, sharpen.
    pub scale: Vec<Operation>,
    pub strategy: ResizeStrategy,
    /// Working image after every stage ran.
    pub info: ImageInfo,
}

impl Plan {
    /// Every operation in application order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.orient
            .iter()
            .chain(self.pre_crop.iter())
            .chain(self.scale.iter())
    }

    /// True when the pre-crop stage has to run in its own invocation.
    pub fn needs_pipe(&self) -> bool {
        !self.pre_crop.is_empty() && !self.scale.is_empty()
    }

    pub fn is_noop(&self) -> bool {
        self.operations().next().is_none()
    }
}

/// Accumulator threaded through the planning stages.
#[derive(Debug, Clone)]
struct Working {
    info: ImageInfo,
    orient: Vec<Operation>,
    pre_crop: Vec<Operation>,
    scale: Vec<Operation>,
    strategy: ResizeStrategy,
    sharpen_allowed: bool,
}

impl Working {
    fn resized(self, width: u32, height: u32) -> Self {
        let info = self.info.with_dimensions(width, height);
        Self { info, ..self }
    }
}

/// Plan the operations that turn `info` into the requested geometry.
///
/// Fails only on contract violations: a zero requested dimension. The input
/// `info` is never touched; the final working image is returned in the plan.
pub fn plan(
    info: &ImageInfo,
    request: &TransformRequest,
    hint: &OrientationHint,
) -> Result<Plan, TransformError> {
    if request.final_width == 0 || request.final_height == 0 {
        return Err(TransformError::InvalidDimensions {
            width: request.final_width,
            height: request.final_height,
        });
    }
    if info.width == 0 || info.height == 0 {
        return Err(TransformError::InvalidDimensions {
            width: info.width,
            height: info.height,
        });
    }

    let auto_orient = request.auto_rotate && hint.is_significant();

    let working = Working {
        info: info.clone(),
        orient: Vec::new(),
        pre_crop: Vec::new(),
        scale: Vec::new(),
        strategy: ResizeStrategy::Identity,
        sharpen_allowed: true,
    };

    let working = rotate_stage(working, request, hint, auto_orient);
    let working = flip_stage(working, request, hint, auto_orient);
    let working = pre_crop_stage(working, request);
    let working = resize_stage(working, request);
    let working = sharpen_stage(working, request);

    debug!(
        strategy = ?working.strategy,
        width = working.info.width,
        height = working.info.height,
        "planned transform"
    );

    Ok(Plan {
        orient: working.orient,
        pre_crop: working.pre_crop,
        scale: working.scale,
        strategy: working.strategy,
        info: working.info,
    })
}

fn rotate_stage(
    mut working: Working,
    request: &TransformRequest,
    hint: &OrientationHint,
    auto_orient: bool,
) -> Working {
    // An explicit 0 counts as unset and leaves the EXIF rotation in charge
    let requested = match request.rotate_degrees {
        Some(degrees) if degrees != 0.0 => Some(degrees),
        _ if auto_orient => hint.rotation_degrees,
        _ => None,
    };
    let Some(degrees) = requested.and_then(effective_rotation) else {
        return working;
    };

    working.orient.push(Operation::Rotate { degrees });
    if swaps_axes(degrees) {
        let (w, h) = working.info.dimensions();
        working = working.resized(h, w);
    }
    working
}

fn flip_stage(
    mut working: Working,
    request: &TransformRequest,
    hint: &OrientationHint,
    auto_orient: bool,
) -> Working {
    let axis = request.flip.or(if auto_orient { hint.flip } else { None });
    if let Some(axis) = axis {
        working.orient.push(Operation::Flip { axis });
    }
    working
}

fn pre_crop_stage(mut working: Working, request: &TransformRequest) -> Working {
    let Some(rect) = request.extra_crop else {
        return working;
    };
    let (w, h) = working.info.dimensions();
    if rect.x >= w || rect.y >= h {
        warn!(crop = %rect, width = w, height = h, "crop rectangle outside the image, ignoring");
        return working;
    }
    working.pre_crop.push(Operation::Crop { rect });
    // convert clips the region to the canvas
    working.resized(rect.width.min(w - rect.x), rect.height.min(h - rect.y))
}

fn resize_stage(mut working: Working, request: &TransformRequest) -> Working {
    let current = working.info.dimensions();
    let target = request.final_dimensions();

    if current == target {
        working.strategy = ResizeStrategy::Identity;
        working.sharpen_allowed = false;
        return working;
    }

    let fill = calculate_fill_dimensions(current, target);
    if request.cropping == Cropping::Disabled || fill == target {
        working.strategy = ResizeStrategy::Stretch;
        working.scale.push(Operation::Resize {
            width: target.0,
            height: target.1,
        });
        return working.resized(target.0, target.1);
    }

    let (offset_x, offset_y) = calculate_crop_offset(fill, target, request.cropping);
    working.strategy = ResizeStrategy::CropToFit {
        fill_width: fill.0,
        fill_height: fill.1,
        offset_x,
        offset_y,
    };
    working.scale.push(Operation::Resize {
        width: fill.0,
        height: fill.1,
    });
    working.scale.push(Operation::CropAfterResize {
        rect: CropRect {
            x: offset_x,
            y: offset_y,
            width: target.0,
            height: target.1,
        },
    });
    working.resized(target.0, target.1)
}

fn sharpen_stage(mut working: Working, request: &TransformRequest) -> Working {
    if !working.sharpen_allowed {
        return working;
    }
    if let Some(mask) = request.sharpening.unsharp() {
        working.scale.push(Operation::Sharpen { mask });
    }
    working
}
