//! Command assembler: renders a [`Plan`] into `convert` arguments.
//!
//! Every flag and every value is a separate token. Nothing is joined into a
//! shell string until [`CommandPlan::shell_line`] formats it for display; the
//! backend passes the tokens straight to the process.
//!
//! ## Envelope
//!
//! ```text
//! convert SRC -depth 16 [-gamma 0.454545] [-filter Lanczos]  <ops>  [-gamma 2.2] -depth 8 [-quality Q -sampling-factor 1x1] -strip DST
//!             └─ 16-bit working space ─┘  └─ JPEG only ─┘            └─ restore ─┘            └────────── JPEG only ─────────┘
//! ```
//!
//! When the plan has both a pre-crop and a scale bucket the command is split
//! into two invocations joined by a pipe: the first writes MIFF (which keeps
//! the 16-bit depth) to stdout and the second reads it from stdin.

use super::params::{FlipAxis, ImageType, Quality};
use super::planner::{Operation, Plan};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const LINEAR_GAMMA: &str = "0.454545";
const RESTORE_GAMMA: &str = "2.2";
const WORKING_DEPTH: &str = "16";
const OUTPUT_DEPTH: &str = "8";
const JPEG_FILTER: &str = "Lanczos";
const JPEG_SAMPLING: &str = "1x1";
/// MIFF over stdin/stdout between the two pipe stages.
const PIPE_STREAM: &str = "miff:-";

/// Output encoding settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncodeSettings {
    pub image_type: ImageType,
    pub quality: Quality,
    /// Linearize before the operations and restore after them.
    pub gamma: bool,
}

/// One process to run: the executable and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Indices of `args` that are file paths; always quoted on display.
    #[serde(skip)]
    path_args: Vec<usize>,
}

impl Invocation {
    /// Build from raw tokens. None of them is treated as a path on display.
    pub fn with_args(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            path_args: Vec::new(),
        }
    }

    fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            path_args: Vec::new(),
        }
    }

    fn arg(&mut self, token: impl Into<String>) -> &mut Self {
        self.args.push(token.into());
        self
    }

    fn path(&mut self, path: &Path) -> &mut Self {
        self.path_args.push(self.args.len());
        self.arg(path.to_string_lossy())
    }

    fn args<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Position of `flag` followed by `value`, if present.
    pub fn find_pair(&self, flag: &str, value: &str) -> Option<usize> {
        self.args
            .windows(2)
            .position(|pair| pair[0] == flag && pair[1] == value)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_path(&self.program.to_string_lossy()))?;
        for (index, arg) in self.args.iter().enumerate() {
            if self.path_args.contains(&index) {
                write!(f, " {}", quote_path(arg))?;
            } else {
                write!(f, " {}", quote_token(arg))?;
            }
        }
        Ok(())
    }
}

/// What the backend runs: one invocation, or two joined by a pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandPlan {
    Single(Invocation),
    Piped {
        producer: Invocation,
        consumer: Invocation,
    },
}

impl CommandPlan {
    /// Invocations in execution order.
    pub fn stages(&self) -> Vec<&Invocation> {
        match self {
            Self::Single(invocation) => vec![invocation],
            Self::Piped { producer, consumer } => vec![producer, consumer],
        }
    }

    /// Flatten to one quoted line, for logs and dry runs.
    pub fn shell_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(invocation) => write!(f, "{invocation}"),
            Self::Piped { producer, consumer } => write!(f, "{producer} | {consumer}"),
        }
    }
}

/// Render `plan` into the `convert` invocation(s) that read `source` and
/// write `destination`.
pub fn assemble(
    plan: &Plan,
    settings: &EncodeSettings,
    convert: &Path,
    source: &Path,
    destination: &Path,
) -> CommandPlan {
    let is_jpeg = settings.image_type == ImageType::Jpeg;

    let mut first = Invocation::new(convert);
    first.path(source).args(["-depth", WORKING_DEPTH]);
    if settings.gamma {
        first.args(["-gamma", LINEAR_GAMMA]);
    }
    if is_jpeg {
        first.args(["-filter", JPEG_FILTER]);
    }
    first.args(render_all(&plan.orient));
    first.args(render_all(&plan.pre_crop));

    if plan.needs_pipe() {
        first.arg(PIPE_STREAM);

        let mut second = Invocation::new(convert);
        second.arg(PIPE_STREAM);
        if is_jpeg {
            second.args(["-filter", JPEG_FILTER]);
        }
        second.args(render_all(&plan.scale));
        finish(&mut second, settings, destination);

        CommandPlan::Piped {
            producer: first,
            consumer: second,
        }
    } else {
        first.args(render_all(&plan.scale));
        finish(&mut first, settings, destination);
        CommandPlan::Single(first)
    }
}

fn finish(invocation: &mut Invocation, settings: &EncodeSettings, destination: &Path) {
    if settings.gamma {
        invocation.args(["-gamma", RESTORE_GAMMA]);
    }
    invocation.args(["-depth", OUTPUT_DEPTH]);
    if settings.image_type == ImageType::Jpeg {
        invocation
            .arg("-quality")
            .arg(settings.quality.value().to_string())
            .args(["-sampling-factor", JPEG_SAMPLING]);
    }
    invocation.arg("-strip").path(destination);
}

fn render_all(operations: &[Operation]) -> Vec<String> {
    operations.iter().flat_map(render).collect()
}

/// Tokens for one operation. Geometries carry `!` so convert uses the exact
/// size instead of re-deriving the aspect ratio.
pub fn render(operation: &Operation) -> Vec<String> {
    match operation {
        Operation::Rotate { degrees } => vec![
            "-background".into(),
            "transparent".into(),
            "-rotate".into(),
            degrees.to_string(),
        ],
        Operation::Flip { axis } => vec![
            match axis {
                FlipAxis::Vertical => "-flip",
                FlipAxis::Horizontal => "-flop",
            }
            .into(),
        ],
        Operation::Crop { rect } | Operation::CropAfterResize { rect } => {
            vec!["-crop".into(), format!("{rect}!")]
        }
        Operation::Resize { width, height } => {
            vec!["-resize".into(), format!("{width}x{height}!")]
        }
        Operation::Sharpen { mask } => vec![
            "-unsharp".into(),
            format!(
                "{}x{}+{}+{}",
                mask.radius, mask.sigma, mask.amount, mask.threshold
            ),
        ],
    }
}

fn quote_path(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`");
    format!("\"{escaped}\"")
}

fn quote_token(text: &str) -> String {
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:+!/=%@".contains(c));
    if plain { text.to_string() } else { quote_path(text) }
}
