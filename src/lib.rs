//! # magick-sizer
//!
//! Plans and runs ImageMagick `convert` transforms: EXIF auto-orientation,
//! explicit rotation and mirroring, an optional pre-crop, and a resize that
//! either stretches or crops to fit, followed by unsharp-mask sharpening.
//!
//! # Architecture: Plan, Assemble, Execute
//!
//! ```text
//! 1. Plan      ImageInfo + request  →  Plan          (pure geometry)
//! 2. Assemble  Plan                 →  CommandPlan   (convert tokens, maybe a pipe)
//! 3. Execute   CommandPlan          →  ExecOutput    (ToolBackend)
//! ```
//!
//! Planning and assembly never touch the filesystem, so the interesting
//! behavior is unit tested without ImageMagick installed. Only the backend
//! spawns processes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Planner, command assembler, execution backend, tool discovery |
//! | [`metadata`] | Source identification: dimensions, depth, MIME type, EXIF orientation |
//! | [`config`] | `magick-sizer.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## 16-bit Working Depth
//!
//! Every command reads the source at 16 bits per channel and only reduces to
//! 8 bits right before writing. With gamma correction on, scaling happens in
//! linear light between `-gamma 0.454545` and `-gamma 2.2`.
//!
//! ## Two-Stage Pipe
//!
//! A pre-crop followed by scaling runs as two `convert` processes joined by a
//! MIFF stream on stdout/stdin, so the crop is applied on the full-resolution
//! image before any resampling. Everything else is a single invocation.
//!
//! ## Injected Tool Discovery
//!
//! Whether `convert` exists is decided once by [`imaging::detect`] and passed
//! around as a [`imaging::ToolSupport`] value. There is no global state.

pub mod config;
pub mod imaging;
pub mod metadata;
pub mod output;
