//! Command line entry point for the gifclip converter.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gifclip_models::{
    parse_video_source, CachePolicy, ConversionRequest, DitherMode, QualityTier, SourceDescriptor,
};
use gifclip_pipeline::{convert, ConvertError, ConvertResult, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "gifclip")]
#[command(version, about = "Turn a video segment into an optimized, seamlessly looping GIF", long_about = None)]
struct Cli {
    /// Remote video URL or bare video id
    #[arg(short, long)]
    url: Option<String>,

    /// Local input video file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output GIF path
    #[arg(short, long, default_value = "output.gif")]
    output: PathBuf,

    /// Segment start within the source, in seconds
    #[arg(short, long, default_value_t = 0.0)]
    start: f64,

    /// Segment duration, in seconds
    #[arg(short = 't', long, default_value_t = 5.0)]
    duration: f64,

    /// Output width in pixels; height follows the source aspect
    #[arg(short, long, default_value_t = 480)]
    width: u32,

    /// Output frame rate
    #[arg(long, default_value_t = 15)]
    fps: u32,

    /// GIF loop count (0 = forever)
    #[arg(long = "loop", default_value_t = 0)]
    loop_count: i32,

    /// Crossfade length in seconds; greater than zero enables seamless looping
    #[arg(long, default_value_t = 0.0)]
    crossfade: f64,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Palette size, 2-256 colors
    #[arg(long, default_value_t = 256)]
    colors: u16,

    /// Lossy compression level passed to gifsicle (0 disables)
    #[arg(long, default_value_t = 0)]
    lossy: u32,

    /// Dither mode: none, floyd-steinberg or ordered
    #[arg(long, default_value = "floyd-steinberg")]
    dither: DitherMode,

    /// Size ceiling in megabytes the output is constrained towards
    #[arg(long = "max-size", default_value_t = 50.0)]
    max_size_mb: f64,

    /// Source rendition tier: auto, lowest, low, medium, high or highest
    #[arg(short, long, default_value = "auto")]
    quality: QualityTier,

    /// Encoder threads (0 = engine default)
    #[arg(long, default_value_t = 0)]
    threads: u32,

    /// Skip the segment cache for this run
    #[arg(long)]
    no_cache: bool,
}

fn build_request(cli: &Cli) -> ConvertResult<ConversionRequest> {
    let source = match (&cli.url, &cli.input) {
        (Some(url), None) => SourceDescriptor::remote(parse_video_source(url)?),
        (None, Some(path)) => SourceDescriptor::local(path),
        _ => return Err(ConvertError::InputConflict),
    };

    let mut request = ConversionRequest::new(source)
        .with_window(cli.start, cli.duration)
        .with_output(cli.width, cli.fps)
        .with_crossfade(cli.crossfade)
        .with_speed(cli.speed);
    request.loop_count = cli.loop_count;
    request.colors = cli.colors;
    request.lossy = cli.lossy;
    request.dither = cli.dither;
    request.max_size_mb = cli.max_size_mb;
    request.quality = cli.quality;
    request.threads = cli.threads;
    if cli.no_cache {
        request.cache = CachePolicy::Bypass;
    }

    Ok(request)
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("gifclip=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();

    let request = match build_request(&cli) {
        Ok(r) => r,
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    match convert(&request, &config, &cli.output).await {
        Ok(output) => {
            info!(
                path = %output.path.display(),
                size_mb = format!("{:.2}", output.size_bytes as f64 / 1_048_576.0),
                "wrote GIF"
            );
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
