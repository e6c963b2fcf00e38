use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceswap_core::{
    DetectorKind, FaceSwapper, ImageRole, ImageSource, SwapConfig, SwapError, SwapRequest, SwapResponse,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "faceswap", about = "Swap one face onto another", version)]
struct Cli {
    /// TOML config file (FACESWAP_* environment variables still apply)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Face detector: cascade or ssd
    #[arg(long, global = true)]
    detector: Option<DetectorKind>,

    /// Directory holding the detector model files
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Face padding as a fraction of the target face width
    #[arg(long, global = true)]
    padding: Option<f32>,

    /// JPEG quality of the result (1-100)
    #[arg(long, global = true)]
    quality: Option<u8>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Swap the face in SWAP onto the face in TARGET
    Swap {
        /// Target image: file path, URL, data URI, or base64
        #[arg(short, long)]
        target: String,
        /// Swap image: file path, URL, data URI, or base64
        #[arg(short, long)]
        swap: String,
        /// Write the JPEG result here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the JSON response record
        #[arg(long)]
        json: bool,
    },
    /// Answer a JSON request body read from FILE or stdin
    Request {
        file: Option<PathBuf>,
        /// Correlation id echoed in the response
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Print the faces found in an image
    Detect {
        /// File path, URL, data URI, or base64
        image: String,
    },
}

/// Exit status for a failed swap: 2 when the input is at fault, 1 otherwise.
fn failure_code(err: &SwapError) -> ExitCode {
    if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let mut swapper = FaceSwapper::new(&config).context("initializing face swapper")?;

    match cli.command {
        Commands::Swap {
            target,
            swap,
            output,
            json,
        } => {
            let result = resolve(ImageRole::Target, &target).and_then(|target| {
                let swap = resolve(ImageRole::Swap, &swap)?;
                swapper.swap_sources(&target, &swap)
            });

            if let (Ok(encoded), Some(path)) = (&result, &output) {
                std::fs::write(path, &encoded.bytes)
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!(path = %path.display(), bytes = encoded.bytes.len(), "result written");
            }
            if json || output.is_none() {
                println!("{}", serde_json::to_string(&SwapResponse::from_result(&result))?);
            }

            match &result {
                Ok(_) => Ok(ExitCode::SUCCESS),
                Err(err) => {
                    eprintln!("swap failed: {err}");
                    Ok(failure_code(err))
                }
            }
        }
        Commands::Request { file, request_id } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut body = String::new();
                    std::io::stdin()
                        .read_to_string(&mut body)
                        .context("reading request from stdin")?;
                    body
                }
            };

            let result = serde_json::from_str::<SwapRequest>(&body)
                .map_err(|e| SwapError::InvalidInput(format!("malformed request body: {e}")))
                .and_then(|request| swapper.swap_request(&request));

            let mut response = SwapResponse::from_result(&result);
            if let Some(id) = request_id {
                response = response.with_request_id(id);
            }
            println!("{}", serde_json::to_string(&response)?);
            Ok(match &result {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => failure_code(err),
            })
        }
        Commands::Detect { image } => {
            let source = resolve(ImageRole::Target, &image)?;
            let grid = swapper.load(ImageRole::Target, &source)?;
            let faces = swapper.detect(&grid)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "detector": swapper.locator_name(),
                    "width": grid.width,
                    "height": grid.height,
                    "faces": faces.detections,
                }))?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Defaults, then the config file, then the environment, then flags.
fn build_config(cli: &Cli) -> Result<SwapConfig> {
    let mut config = match &cli.config {
        Some(path) => SwapConfig::load(path)?,
        None => SwapConfig::from_env(),
    };
    if let Some(detector) = cli.detector {
        config.detector = detector;
    }
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(padding) = cli.padding {
        config.padding_ratio = padding;
    }
    if let Some(quality) = cli.quality {
        config.jpeg_quality = quality;
    }
    Ok(config)
}

/// A readable file is taken as inline bytes; anything else is parsed as a reference.
fn resolve(role: ImageRole, argument: &str) -> Result<ImageSource, SwapError> {
    let path = Path::new(argument);
    if path.is_file() {
        return std::fs::read(path)
            .map(ImageSource::Inline)
            .map_err(|e| SwapError::InvalidInput(format!("reading {role} image {}: {e}", path.display())));
    }
    ImageSource::parse(argument).map_err(|e| SwapError::from_source(role, e))
}
