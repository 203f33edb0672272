//! Execution backend trait and shared types.
//!
//! The [`ToolBackend`] trait is the single seam between the pure
//! planner/assembler and the outside world: it receives a finished
//! [`CommandPlan`] and reports how the external tool exited.
//!
//! The production implementation is
//! [`MagickCliBackend`](super::magick_backend::MagickCliBackend), which spawns
//! ImageMagick's `convert`.

use super::assembler::CommandPlan;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// What the tool reported. Only `status` decides success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Trait for command execution backends.
pub trait ToolBackend {
    /// Run every stage of `command` to completion. Blocks until the tool exits.
    fn run(&self, command: &CommandPlan) -> Result<ExecOutput, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records command plans without executing them.
    #[derive(Default)]
    pub struct MockBackend {
        pub exit_status: Option<i32>,
        pub stderr: String,
        pub commands: Mutex<Vec<CommandPlan>>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::with_status(Some(0))
        }

        pub fn with_status(status: Option<i32>) -> Self {
            Self {
                exit_status: status,
                stderr: String::new(),
                commands: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(status: i32, stderr: &str) -> Self {
            Self {
                exit_status: Some(status),
                stderr: stderr.to_string(),
                commands: Mutex::new(Vec::new()),
            }
        }

        pub fn get_commands(&self) -> Vec<CommandPlan> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl ToolBackend for MockBackend {
        fn run(&self, command: &CommandPlan) -> Result<ExecOutput, BackendError> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(ExecOutput {
                status: self.exit_status,
                stdout: String::new(),
                stderr: self.stderr.clone(),
            })
        }
    }

    #[test]
    fn exec_output_success_needs_zero() {
        assert!(
            ExecOutput {
                status: Some(0),
                ..ExecOutput::default()
            }
            .success()
        );
        assert!(
            !ExecOutput {
                status: Some(1),
                ..ExecOutput::default()
            }
            .success()
        );
        assert!(!ExecOutput::default().success());
    }

    #[test]
    fn mock_records_commands() {
        use crate::imaging::assembler::{EncodeSettings, assemble};
        use crate::imaging::params::{ImageInfo, OrientationHint, Quality, TransformRequest};
        use crate::imaging::planner::plan;
        use std::path::Path;

        let info = ImageInfo::new(10, 10, 8, "image/png").unwrap();
        let plan = plan(&info, &TransformRequest::new(5, 5), &OrientationHint::default()).unwrap();
        let command = assemble(
            &plan,
            &EncodeSettings {
                image_type: info.image_type,
                quality: Quality::default(),
                gamma: false,
            },
            Path::new("convert"),
            Path::new("a.png"),
            Path::new("b.png"),
        );

        let backend = MockBackend::new();
        let output = backend.run(&command).unwrap();

        assert!(output.success());
        assert_eq!(backend.get_commands(), vec![command]);
    }
}
