//! High-level transform operations.
//!
//! These functions combine the planner, the assembler and a backend. They
//! take one job, compute the plan, clear the destination and hand the
//! command to the backend.

use super::assembler::{CommandPlan, EncodeSettings, assemble};
use super::backend::{BackendError, ExecOutput, ToolBackend};
use super::magick_backend::ToolSupport;
use super::params::{ImageInfo, OrientationHint, TransformRequest};
use super::planner::{Plan, plan};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid dimensions {width}x{height}: both must be positive")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Destination is the source image: {0}")]
    SameSourceAndDestination(PathBuf),
    #[error("ImageMagick unavailable: {0}")]
    ToolUnavailable(String),
    #[error("ImageMagick exited with status {}: {stderr}", status_label(.status))]
    ToolFailed { status: Option<i32>, stderr: String },
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_label(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// One image to transform.
#[derive(Debug, Clone)]
pub struct TransformJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub info: ImageInfo,
    pub hint: OrientationHint,
    pub request: TransformRequest,
}

/// A planned job: operations plus the command that performs them.
#[derive(Debug, Clone)]
pub struct PreparedTransform {
    pub plan: Plan,
    pub command: CommandPlan,
}

/// A finished job.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub plan: Plan,
    pub command: CommandPlan,
    pub output: ExecOutput,
}

impl TransformOutcome {
    /// Working image after the transform: the dimensions of the output file.
    pub fn final_info(&self) -> &ImageInfo {
        &self.plan.info
    }
}

/// Plan a job and render its command without executing anything.
pub fn prepare(convert: &Path, job: &TransformJob) -> Result<PreparedTransform> {
    let plan = plan(&job.info, &job.request, &job.hint)?;
    let settings = EncodeSettings {
        image_type: job.info.image_type,
        quality: job.request.quality,
        gamma: job.request.gamma,
    };
    let command = assemble(&plan, &settings, convert, &job.source, &job.destination);
    debug!(command = %command.shell_line(), "assembled command");
    Ok(PreparedTransform { plan, command })
}

/// Remove `path` if it exists. A missing file is fine.
pub fn clear_destination(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// True when both paths name the same existing file.
fn same_file(source: &Path, destination: &Path) -> bool {
    match (source.canonicalize(), destination.canonicalize()) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => source == destination,
    }
}

/// Transform one image.
///
/// The destination is removed before the tool runs, and again if the tool
/// fails, so a file at `destination` always means success. Writing over the
/// source is refused. Failures are not retried.
pub fn transform(
    backend: &impl ToolBackend,
    tool: &ToolSupport,
    job: &TransformJob,
) -> Result<TransformOutcome> {
    let convert = tool.require()?;
    let PreparedTransform { plan, command } = prepare(convert, job)?;

    if same_file(&job.source, &job.destination) {
        return Err(TransformError::SameSourceAndDestination(
            job.destination.clone(),
        ));
    }
    clear_destination(&job.destination)?;
    let output = backend.run(&command)?;

    if !output.success() {
        clear_destination(&job.destination)?;
        return Err(TransformError::ToolFailed {
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }

    info!(
        source = %job.source.display(),
        destination = %job.destination.display(),
        width = plan.info.width,
        height = plan.info.height,
        "transformed"
    );
    Ok(TransformOutcome {
        plan,
        command,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::params::{CropRect, Sharpening};
    use tempfile::TempDir;

    fn available() -> ToolSupport {
        ToolSupport::Available {
            convert: PathBuf::from("/usr/bin/convert"),
        }
    }

    fn job(dir: &Path, width: u32, height: u32, request: TransformRequest) -> TransformJob {
        TransformJob {
            source: dir.join("in.jpg"),
            destination: dir.join("out.jpg"),
            info: ImageInfo::new(width, height, 8, "image/jpeg").unwrap(),
            hint: OrientationHint::default(),
            request,
        }
    }

    #[test]
    fn transform_runs_backend_once() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let job = job(tmp.path(), 800, 600, TransformRequest::new(400, 500));

        let outcome = transform(&backend, &available(), &job).unwrap();

        assert_eq!(outcome.final_info().dimensions(), (400, 500));
        let commands = backend.get_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0], outcome.command);
        assert_eq!(
            commands[0].stages()[0].program,
            PathBuf::from("/usr/bin/convert")
        );
    }

    #[test]
    fn transform_clears_stale_destination_first() {
        let tmp = TempDir::new().unwrap();
        let job = job(tmp.path(), 800, 600, TransformRequest::new(400, 300));
        std::fs::write(&job.destination, "stale").unwrap();

        let backend = MockBackend::new();
        transform(&backend, &available(), &job).unwrap();

        // The mock writes nothing, so the stale file must be gone
        assert!(!job.destination.exists());
    }

    #[test]
    fn nonzero_exit_is_failure() {
        let tmp = TempDir::new().unwrap();
        let job = job(tmp.path(), 800, 600, TransformRequest::new(400, 300));
        std::fs::write(&job.destination, "stale").unwrap();

        let backend = MockBackend::failing(1, "convert: no decode delegate\n");
        let result = transform(&backend, &available(), &job);

        assert!(matches!(
            result,
            Err(TransformError::ToolFailed { status: Some(1), ref stderr })
                if stderr == "convert: no decode delegate"
        ));
        assert!(!job.destination.exists());
        assert_eq!(backend.get_commands().len(), 1);
    }

    #[test]
    fn killed_tool_is_failure() {
        let tmp = TempDir::new().unwrap();
        let job = job(tmp.path(), 800, 600, TransformRequest::new(400, 300));
        let backend = MockBackend::with_status(None);

        let result = transform(&backend, &available(), &job);
        assert!(matches!(
            result,
            Err(TransformError::ToolFailed { status: None, .. })
        ));
    }

    #[test]
    fn unavailable_tool_fails_before_running() {
        let tmp = TempDir::new().unwrap();
        let job = job(tmp.path(), 800, 600, TransformRequest::new(400, 300));
        let backend = MockBackend::new();

        let result = transform(&backend, &ToolSupport::Unconfigured, &job);

        assert!(matches!(result, Err(TransformError::ToolUnavailable(_))));
        assert!(backend.get_commands().is_empty());
    }

    #[test]
    fn invalid_request_fails_before_running() {
        let tmp = TempDir::new().unwrap();
        let job = job(tmp.path(), 800, 600, TransformRequest::new(0, 300));
        let backend = MockBackend::new();

        let result = transform(&backend, &available(), &job);

        assert!(matches!(
            result,
            Err(TransformError::InvalidDimensions { .. })
        ));
        assert!(backend.get_commands().is_empty());
    }

    #[test]
    fn prepare_uses_request_encoding() {
        let tmp = TempDir::new().unwrap();
        let request = TransformRequest {
            quality: crate::imaging::Quality::new(70),
            gamma: false,
            sharpening: Sharpening::None,
            extra_crop: CropRect::from_values(&[0, 0, 400, 400]),
            ..TransformRequest::new(100, 100)
        };
        let job = job(tmp.path(), 800, 600, request);

        let prepared = prepare(Path::new("convert"), &job).unwrap();

        assert!(matches!(prepared.command, CommandPlan::Piped { .. }));
        let stages = prepared.command.stages();
        assert!(stages[1].find_pair("-quality", "70").is_some());
        assert!(!stages[0].args.iter().any(|a| a == "-gamma"));
    }

    #[test]
    fn destination_equal_to_source_is_refused() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(tmp.path(), 800, 600, TransformRequest::new(400, 300));
        job.destination = job.source.clone();
        std::fs::write(&job.source, "original").unwrap();
        let backend = MockBackend::new();

        let result = transform(&backend, &available(), &job);

        assert!(matches!(
            result,
            Err(TransformError::SameSourceAndDestination(_))
        ));
        assert_eq!(std::fs::read_to_string(&job.source).unwrap(), "original");
        assert!(backend.get_commands().is_empty());
    }

    #[test]
    fn destination_spelled_differently_is_still_the_source() {
        let tmp = TempDir::new().unwrap();
        let mut job = job(tmp.path(), 800, 600, TransformRequest::new(400, 300));
        job.destination = tmp.path().join(".").join("in.jpg");
        std::fs::write(&job.source, "original").unwrap();
        let backend = MockBackend::new();

        let result = transform(&backend, &available(), &job);

        assert!(matches!(
            result,
            Err(TransformError::SameSourceAndDestination(_))
        ));
        assert!(job.source.exists());
    }

    #[test]
    fn clear_destination_ignores_missing_file() {
        let tmp = TempDir::new().unwrap();
        clear_destination(&tmp.path().join("nope.png")).unwrap();
    }
}
