//! Image transforms through the ImageMagick CLI.
//!
//! | Stage | Where |
//! |---|---|
//! | **Plan** | [`planner::plan`]: rotate, flip, pre-crop, resize strategy, sharpen |
//! | **Assemble** | [`assembler::assemble`]: `convert` tokens, optional two-stage pipe |
//! | **Execute** | [`ToolBackend`] / [`MagickCliBackend`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for cover size, crop offsets and rotations (unit testable)
//! - **Parameters**: Data structures describing the source and the request
//! - **Planner** and **Assembler**: the pure core, no I/O
//! - **Backend**: [`ToolBackend`] trait + [`MagickCliBackend`] + tool discovery
//! - **Operations**: High-level functions combining the core with a backend

pub mod assembler;
pub mod backend;
mod calculations;
pub mod magick_backend;
pub mod operations;
mod params;
pub mod planner;

pub use assembler::{CommandPlan, EncodeSettings, Invocation};
pub use backend::{BackendError, ExecOutput, ToolBackend};
pub use magick_backend::{MagickCliBackend, ToolSupport, detect};
pub use operations::{
    PreparedTransform, TransformError, TransformJob, TransformOutcome, prepare, transform,
};
pub use params::{
    CropRect, Cropping, FlipAxis, ImageInfo, ImageType, OrientationHint, Quality, Sharpening,
    TransformRequest, UnsharpMask,
};
pub use planner::{Operation, Plan, ResizeStrategy};
