use clap::{Parser, Subcommand};
use magick_sizer::config::{self, SizerConfig};
use magick_sizer::imaging::{
    self, CommandPlan, CropRect, Cropping, FlipAxis, MagickCliBackend, Plan, Quality, Sharpening,
    TransformJob, TransformRequest,
};
use magick_sizer::{metadata, output};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Source, destination and every transform modifier.
#[derive(clap::Args, Clone)]
struct TransformArgs {
    /// Source image (JPEG, PNG or GIF)
    source: PathBuf,

    /// Where to write the result; an existing file is replaced
    destination: PathBuf,

    /// Requested output width in pixels
    #[arg(long)]
    width: u32,

    /// Requested output height in pixels
    #[arg(long)]
    height: u32,

    /// Clockwise rotation in degrees; overrides the EXIF orientation
    #[arg(long, allow_negative_numbers = true)]
    rotate: Option<f64>,

    /// Mirror the image: h (left-right) or v (top-bottom)
    #[arg(long, value_name = "h|v")]
    flip: Option<FlipAxis>,

    /// Ignore the EXIF orientation tag
    #[arg(long)]
    no_auto_rotate: bool,

    /// Crop before resizing, in source pixels after orientation
    #[arg(long, value_name = "X,Y,W,H")]
    crop: Option<String>,

    /// Sharpening after scaling: none, soft, medium, strong
    #[arg(long, value_name = "LEVEL")]
    sharpen: Option<Sharpening>,

    /// Crop-to-fit anchor (center, north, ..., northwest) or "disabled" to stretch
    #[arg(long, value_name = "POSITION")]
    cropping: Option<Cropping>,

    /// JPEG quality
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Scale in the source gamma instead of linear light
    #[arg(long)]
    no_gamma: bool,
}

#[derive(Parser)]
#[command(name = "magick-sizer")]
#[command(about = "Resize, crop and rotate images through ImageMagick")]
#[command(long_about = "\
Resize, crop and rotate images through ImageMagick

Every transform runs the same steps in order:

  1. orient    EXIF orientation, or --rotate / --flip
  2. pre-crop  --crop X,Y,W,H on the oriented image
  3. scale     stretch or crop-to-fit to --width x --height
  4. sharpen   unsharp mask (skipped when no scaling happened)

Images are processed at 16 bits per channel and, unless --no-gamma is given,
scaled in linear light.

Run 'magick-sizer gen-config' to generate a documented magick-sizer.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: magick-sizer.toml in the working directory, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing ImageMagick's convert; overrides the config file
    #[arg(long, global = true)]
    imagemagick_path: Option<PathBuf>,

    /// Log plans and commands
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transform one image
    Resize(TransformArgs),
    /// Show the operations and the convert command without running it
    Plan {
        #[command(flatten)]
        transform: TransformArgs,

        /// Print the plan and command as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report whether ImageMagick was found
    Check,
    /// Print a stock magick-sizer.toml with all options documented
    GenConfig,
}

/// `plan --json` output.
#[derive(Serialize)]
struct PlanReport<'a> {
    source: &'a Path,
    destination: &'a Path,
    plan: &'a Plan,
    command: &'a CommandPlan,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new(config::CONFIG_FILE))?,
    };
    let imagemagick_dir = cli
        .imagemagick_path
        .clone()
        .or_else(|| config.imagemagick_path.as_ref().map(PathBuf::from));
    let tool = imaging::detect(imagemagick_dir.as_deref());

    match cli.command {
        Command::Resize(args) => {
            let job = build_job(&args, &config)?;
            let outcome = imaging::transform(&MagickCliBackend::new(), &tool, &job)?;
            output::print_outcome(&job.source, &job.destination, &outcome);
        }
        Command::Plan { transform, json } => {
            let job = build_job(&transform, &config)?;
            // Planning works without ImageMagick; show a bare program name then
            let convert = tool
                .require()
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from("convert"));
            let prepared = imaging::prepare(&convert, &job)?;
            if json {
                let report = PlanReport {
                    source: &job.source,
                    destination: &job.destination,
                    plan: &prepared.plan,
                    command: &prepared.command,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_plan(&job.source, &job.info, &prepared);
            }
        }
        Command::Check => {
            output::print_check(&tool);
            tool.require()?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr. `-v` shows this crate's debug output; otherwise `RUST_LOG`
/// decides, falling back to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,magick_sizer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Identify the source and combine config defaults with command-line flags.
fn build_job(
    args: &TransformArgs,
    config: &SizerConfig,
) -> Result<TransformJob, Box<dyn std::error::Error>> {
    let source = metadata::identify(&args.source)?;
    let request = apply_flags(args, config.defaults.request(args.width, args.height));

    Ok(TransformJob {
        source: args.source.clone(),
        destination: args.destination.clone(),
        info: source.info,
        hint: source.hint,
        request,
    })
}

fn apply_flags(args: &TransformArgs, mut request: TransformRequest) -> TransformRequest {
    request.rotate_degrees = args.rotate;
    request.flip = args.flip;
    request.extra_crop = args.crop.as_deref().and_then(|text| {
        let rect = CropRect::parse(text);
        if rect.is_none() {
            warn!(crop = text, "malformed crop rectangle, ignoring");
        }
        rect
    });
    if args.no_auto_rotate {
        request.auto_rotate = false;
    }
    if args.no_gamma {
        request.gamma = false;
    }
    if let Some(sharpening) = args.sharpen {
        request.sharpening = sharpening;
    }
    if let Some(cropping) = args.cropping {
        request.cropping = cropping;
    }
    if let Some(quality) = args.quality {
        request.quality = Quality::new(quality);
    }
    request
}
