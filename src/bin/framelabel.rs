use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt::MakeWriter};

use framelabel::{
    CancellationToken, FfmpegLogLevel, ImageFormat, Pipeline, PipelineConfig, ProgressCallback,
    ProgressInfo, ReadFailurePolicy, RekognitionClient, RekognitionConfig, RunSummary, VideoFile,
    configuration::{
        DEFAULT_MAX_LABELS, DEFAULT_MIN_CONFIDENCE, DEFAULT_OUTPUT_DIR, DEFAULT_STRIDE,
        DEFAULT_TARGET_CLASS,
    },
    rekognition::DEFAULT_TIMEOUT,
};

const CLI_AFTER_HELP: &str = "Examples:\n  framelabel run zebras.mp4 --out data --stride 10 --target-class Zebra\n  framelabel run traffic.mp4 --target-class Car --min-confidence 80 --format png --progress\n  framelabel metadata zebras.mp4 --json\n  framelabel completions zsh > _framelabel\n\nCredentials are read from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY (and AWS_SESSION_TOKEN).";

#[derive(Debug, Parser)]
#[command(
    name = "framelabel",
    version,
    about = "Sample video frames, label them with Amazon Rekognition, and write bounding-box annotations",
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
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while labelling.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Label a video and write images/ and labels/ trees.
    #[command(
        about = "Label sampled frames of a video",
        after_help = "Examples:\n  framelabel run zebras.mp4\n  framelabel run zebras.mp4 --out dataset --stride 5 --skip-unreadable 3 --json"
    )]
    Run {
        /// Input video path.
        input: PathBuf,
        /// Output root; images/ and labels/ are created beneath it.
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        out: PathBuf,
        /// Sample every Nth frame.
        #[arg(long, default_value_t = DEFAULT_STRIDE)]
        stride: u64,
        /// Maximum labels requested per frame.
        #[arg(long, default_value_t = DEFAULT_MAX_LABELS)]
        max_labels: u32,
        /// Minimum label confidence (0-100).
        #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
        min_confidence: f32,
        /// Label name to annotate (exact, case-sensitive).
        #[arg(long, default_value = DEFAULT_TARGET_CLASS)]
        target_class: String,
        /// Image format for uploads and saved frames (jpg, png).
        #[arg(long, default_value = "jpg")]
        format: String,
        /// AWS region (defaults to AWS_REGION / AWS_DEFAULT_REGION / us-east-1).
        #[arg(long)]
        region: Option<String>,
        /// Override the detection endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,
        /// Per-request timeout in seconds.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
        timeout: u64,
        /// Skip unreadable frames, stopping after N consecutive failures.
        #[arg(long, value_name = "N")]
        skip_unreadable: Option<u32>,
        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print metadata for a video file.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Metadata {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Log sink that hides the progress bar while a record is printed.
struct SuspendBar {
    bar: ProgressBar,
}

impl<'a> MakeWriter<'a> for SuspendBar {
    type Writer = SuspendedStderr;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedStderr {
            bar: self.bar.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Buffers one formatted record and writes it out on drop.
struct SuspendedStderr {
    bar: ProgressBar,
    buffer: Vec<u8>,
}

impl Write for SuspendedStderr {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SuspendedStderr {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let buffer = std::mem::take(&mut self.buffer);
        self.bar.suspend(|| {
            let _ = io::stderr().write_all(&buffer);
        });
    }
}

fn init_logging(verbose: bool, bar: Option<&ProgressBar>) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,framelabel={level}")));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = match bar {
        Some(bar) => builder
            .with_writer(SuspendBar { bar: bar.clone() })
            .try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
}

/// Returns true when the process should exit immediately: the run was
/// already asked to stop and the user interrupted again.
fn handle_interrupt(token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return true;
    }
    log::warn!("Interrupt received, stopping after the current frame");
    token.cancel();
    false
}

/// Cancel `token` on the first Ctrl-C so the current frame finishes
/// writing; exit on the second.
fn install_interrupt_handler(token: CancellationToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if handle_interrupt(&token) {
            std::process::exit(130);
        }
    })
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = FfmpegLogLevel::from_name(level)
            .ok_or(format!("unsupported --log-level: {level}"))?;
        framelabel::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::no_length();
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total.max(info.current));
        }
        self.bar.set_position(info.current);
        if info.failed_detections > 0 {
            self.bar
                .set_message(format!("({} failed)", info.failed_detections).yellow().to_string());
        }
    }
}

fn print_summary(
    summary: &RunSummary,
    out: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let payload = json!({
            "frames_processed": summary.frames_processed,
            "instances_written": summary.instances_written,
            "failed_frames": summary.failed_frames,
            "read_failures": summary.read_failures,
            "elapsed_seconds": summary.elapsed.as_secs_f64(),
            "output": out.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if !summary.failed_frames.is_empty() {
        let frames = summary
            .failed_frames
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("detection failed for frame(s) {frames}; their label files are empty").yellow()
        );
    }
    if summary.read_failures > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{} frame(s) could not be decoded", summary.read_failures).yellow()
        );
    }

    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Labelled {} frame(s), {} instance(s) written to {}",
            summary.frames_processed,
            summary.instances_written,
            out.display()
        )
        .green()
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let progress = if cli.global.progress && matches!(cli.command, Commands::Run { .. }) {
        Some(Arc::new(BarProgress::new()?))
    } else {
        None
    };
    init_logging(cli.global.verbose, progress.as_ref().map(|progress| &progress.bar));
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Run {
            input,
            out,
            stride,
            max_labels,
            min_confidence,
            target_class,
            format,
            region,
            endpoint,
            timeout,
            skip_unreadable,
            json,
        } => {
            let image_format = ImageFormat::from_extension(&format)
                .ok_or(format!("unsupported --format: {format}"))?;

            let mut config = PipelineConfig::new(&input)
                .with_output_dir(&out)
                .with_stride(stride)
                .with_max_labels(max_labels)
                .with_min_confidence(min_confidence)
                .with_target_class(target_class)
                .with_image_format(image_format);
            if let Some(max_consecutive) = skip_unreadable {
                config =
                    config.with_read_failure_policy(ReadFailurePolicy::Skip { max_consecutive });
            }
            config.validate()?;

            let mut detector_config =
                RekognitionConfig::from_env()?.with_timeout(Duration::from_secs(timeout));
            if let Some(region) = region {
                detector_config = detector_config.with_region(region);
            }
            if let Some(endpoint) = endpoint {
                detector_config = detector_config.with_endpoint(endpoint);
            }
            let detector = RekognitionClient::new(detector_config)?;

            let cancellation = CancellationToken::new();
            install_interrupt_handler(cancellation.clone())?;
            config = config.with_cancellation(cancellation);

            let video = VideoFile::open(&input)?;
            if let Some(progress) = &progress {
                if let Some(expected) = video.metadata().sampled_frame_count(stride) {
                    progress.bar.set_length(expected);
                }
                config = config.with_progress(progress.clone());
            }

            let pipeline = Pipeline::new(config)?;
            let result = pipeline.run_with(video, &detector);

            if let Some(progress) = &progress {
                match &result {
                    Ok(_) => progress.bar.finish_with_message("done"),
                    Err(_) => progress.bar.abandon(),
                }
            }
            print_summary(&result?, &out, json)?;
        }
        Commands::Metadata { input, json } => {
            let video = VideoFile::open(&input)?;
            let metadata = video.metadata();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "codec": metadata.codec,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps, ~{} frames [{}]",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec,
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framelabel", &mut std::io::stdout());
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
