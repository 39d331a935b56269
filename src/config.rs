//! Configuration layer separating CLI arguments from the internal
//! identification config.

use clap::Parser;
use clap_verbosity_flag::Verbosity;

/// Parse probability value (must be between 0.0 and 1.0)
pub fn parse_probability(s: &str) -> Result<f32, String> {
    let val = s
        .parse::<f32>()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if !(0.0..=1.0).contains(&val) {
        return Err(format!("Must be between 0.0 and 1.0, got {val}"));
    }
    Ok(val)
}

/// Global CLI arguments that apply to all shelfscan commands
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Output directory for annotated images (default: next to the input)
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Warn instead of erroring on missing or unsupported input files
    #[arg(long, global = true)]
    pub permissive: bool,

    /// Device to use for local inference (auto, cpu, coreml)
    #[arg(long, default_value = "auto", global = true)]
    pub device: String,

    /// Disable colored output (also respects NO_COLOR and SHELFSCAN_NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// CLI command for product identification
#[derive(Parser, Debug, Clone)]
pub struct IdentifyCommand {
    /// Path(s) to input images or directories. Supports glob patterns like *.jpg
    #[arg(value_name = "IMAGES_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Minimum confidence for a detection to be reported (0.0-1.0)
    #[arg(short, long, default_value = "0.5", value_parser = parse_probability)]
    pub confidence: f32,

    /// URL of a remote inference endpoint; replaces local inference
    #[arg(long, conflicts_with_all = ["model_path", "model_url", "model_checksum", "labels"])]
    pub endpoint: Option<String>,

    /// Path to a local ONNX product model
    #[arg(long)]
    pub model_path: Option<String>,

    /// URL to download the product model from (cached between runs)
    #[arg(long)]
    pub model_url: Option<String>,

    /// MD5 checksum for model verification (used with --model-url)
    #[arg(long)]
    pub model_checksum: Option<String>,

    /// JSON file with class-id-ordered label names for the local model
    #[arg(long)]
    pub labels: Option<String>,

    /// Save a copy of each image with detection boxes drawn
    #[arg(long)]
    pub annotated: bool,
}

/// Internal configuration for the identification pipeline
#[derive(Debug, Clone)]
pub struct IdentifyConfig {
    pub sources: Vec<String>,
    pub confidence: f32,
    pub device: String,
    pub output_dir: Option<String>,
    /// Fail on bad inputs instead of warning. Opposite of `--permissive`.
    pub strict: bool,
    pub endpoint: Option<String>,
    pub model_path: Option<String>,
    pub model_url: Option<String>,
    pub model_checksum: Option<String>,
    pub labels_path: Option<String>,
    pub annotated: bool,
}

impl IdentifyConfig {
    pub fn from_args(global: GlobalArgs, cmd: IdentifyCommand) -> Result<Self, String> {
        if cmd.annotated && cmd.endpoint.is_some() {
            return Err(
                "--annotated requires local inference; remote results carry no box geometry"
                    .to_string(),
            );
        }

        Ok(Self {
            sources: cmd.sources,
            confidence: cmd.confidence,
            device: global.device,
            output_dir: global.output_dir,
            strict: !global.permissive,
            endpoint: cmd.endpoint,
            model_path: cmd.model_path,
            model_url: cmd.model_url,
            model_checksum: cmd.model_checksum,
            labels_path: cmd.labels,
            annotated: cmd.annotated,
        })
    }
}
