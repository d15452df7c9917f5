use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use vidmark::{
    EncoderOptions, FfmpegLogLevel, LogoScale, Placement, Position, ProgressCallback,
    ProgressInfo, VideoCodec, VideoSource, WatermarkOptions, Watermarker,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidmark apply input.mp4 --logo logo.png\n  vidmark apply input.mp4 --logo logo.png --scale frame:0.05 --position top-right --margin 20 --progress\n  vidmark preview input.mp4 --logo logo.png --out preview.png --height 400\n  vidmark metadata input.mp4 --json\n  vidmark completions zsh > _vidmark";

#[derive(Debug, Parser)]
#[command(
    name = "vidmark",
    version,
    about = "Overlay a logo onto every frame of a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Logo geometry shared by `apply` and `preview`.
#[derive(Debug, Args, Clone)]
struct OverlayArgs {
    /// Logo image (PNG with alpha recommended).
    #[arg(long)]
    logo: PathBuf,

    /// Logo size: a factor of the logo's own size (0.5), a fraction of the
    /// frame (frame:0.2), an exact size (120x40), or "original".
    #[arg(long, default_value = "0.5")]
    scale: String,

    /// Logo anchor: top-left, top-right, bottom-left, bottom-right, center,
    /// or an explicit X,Y offset.
    #[arg(long, default_value = "top-right", allow_hyphen_values = true)]
    position: String,

    /// Margin in pixels from the anchored edges.
    #[arg(long, default_value_t = 20)]
    margin: u32,

    /// Logo opacity between 0.0 and 1.0.
    #[arg(long, default_value_t = 1.0)]
    opacity: f32,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watermark a video.
    #[command(
        about = "Overlay the logo on every frame",
        visible_alias = "run",
        after_help = "Examples:\n  vidmark apply input.mp4 --logo logo.png\n  vidmark apply input.mp4 --logo logo.png --out marked.mp4 --codec h264 --crf 20"
    )]
    Apply {
        /// Input video path.
        input: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,

        /// Output path. Defaults to <input stem>_watermarked.mp4.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output codec: mpeg4 | h264 | h265.
        #[arg(long, default_value = "mpeg4")]
        codec: String,

        /// Constant Rate Factor for h264/h265.
        #[arg(long)]
        crf: Option<u32>,

        /// Target bitrate in bits per second.
        #[arg(long)]
        bitrate: Option<usize>,
    },

    /// Render the first frame with the logo applied.
    #[command(
        about = "Render a still preview",
        after_help = "Examples:\n  vidmark preview input.mp4 --logo logo.png --out preview.png"
    )]
    Preview {
        /// Input video path.
        input: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,

        /// Output image path.
        #[arg(long)]
        out: PathBuf,

        /// Scale the preview to this height, keeping aspect ratio.
        #[arg(long)]
        height: Option<u32>,
    },

    /// Print video properties.
    #[command(about = "Print video metadata", visible_alias = "probe")]
    Metadata {
        /// Input video path.
        input: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_scale(value: &str) -> Result<LogoScale, String> {
    let value = value.trim().to_ascii_lowercase();
    if value == "original" {
        return Ok(LogoScale::Original);
    }
    if let Some(fraction) = value.strip_prefix("frame:") {
        let fraction = fraction
            .parse::<f32>()
            .map_err(|_| format!("invalid frame fraction: {fraction}"))?;
        return Ok(LogoScale::FrameFraction(fraction));
    }
    if let Some((width, height)) = value.split_once('x') {
        let width = width
            .parse::<u32>()
            .map_err(|_| format!("invalid logo width: {width}"))?;
        let height = height
            .parse::<u32>()
            .map_err(|_| format!("invalid logo height: {height}"))?;
        return Ok(LogoScale::Exact { width, height });
    }
    value
        .parse::<f32>()
        .map(LogoScale::Factor)
        .map_err(|_| format!("invalid --scale: {value}"))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn overlay_options(args: &OverlayArgs) -> Result<WatermarkOptions, Box<dyn std::error::Error>> {
    let scale = parse_scale(&args.scale)?;
    let position: Position = args.position.parse()?;
    let options = WatermarkOptions::new()
        .with_scale(scale)
        .with_placement(Placement::new(position, args.margin))
        .with_opacity(args.opacity);
    options.validate()?;
    Ok(options)
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = match &global.log_level {
        Some(level) => level.parse::<FfmpegLogLevel>()?,
        None if global.verbose => FfmpegLogLevel::Info,
        None => FfmpegLogLevel::Error,
    };
    vidmark::set_ffmpeg_log_level(level);
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(percent) = info.percent {
            self.bar.set_position(u64::from(percent));
        }
        self.bar.set_message(format!("{} frame(s)", info.current));
        if info.finished {
            if info.percent == Some(100) {
                self.bar.finish_with_message("done");
            } else {
                self.bar.abandon_with_message("stopped");
            }
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Apply {
            input,
            overlay,
            out,
            codec,
            crf,
            bitrate,
        } => {
            let output = out.unwrap_or_else(|| vidmark::default_output_path(&input));
            ensure_writable_path(&output, cli.global.overwrite)?;

            let codec: VideoCodec = codec.parse()?;
            let mut encoder = EncoderOptions::default().codec(codec);
            if let Some(crf) = crf {
                encoder = encoder.crf(crf);
            }
            if let Some(bitrate) = bitrate {
                encoder = encoder.bitrate(bitrate);
            }

            let mut options = overlay_options(&overlay)?.with_encoder(encoder);
            if cli.global.progress {
                options = options.with_progress(Arc::new(TerminalProgress::new()?));
            }

            if cli.global.verbose {
                eprintln!(
                    "watermarking {} with {} -> {}",
                    input.display(),
                    overlay.logo.display(),
                    output.display()
                );
            }

            let report = Watermarker::new(options)
                .spawn(&input, &overlay.logo, &output)?
                .join()?;

            if cli.global.verbose {
                eprintln!(
                    "{} frame(s) at {}x{} in {:.2}s",
                    report.frames_written,
                    report.width,
                    report.height,
                    report.elapsed.as_secs_f64()
                );
            }
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("watermark added, output: {}", report.output.display()).green()
            );
        }
        Commands::Preview {
            input,
            overlay,
            out,
            height,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let options = overlay_options(&overlay)?;
            let image = Watermarker::new(options).preview(&input, &overlay.logo, height)?;
            image.save(&out)?;
            println!("{} {}", "saved".green().bold(), out.display());
        }
        Commands::Metadata { input, json } => {
            let source = VideoSource::open(&input)?;
            let metadata = source.metadata();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_rate": metadata.frame_rate.to_string(),
                    "frame_count": metadata.frame_count,
                    "codec": metadata.codec,
                    "bit_rate": metadata.bit_rate,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
                println!("Frames: {}", metadata.frame_count);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidmark", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
