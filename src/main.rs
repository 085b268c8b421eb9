use anyhow::{Context, Result};
use asciivid::driver::has_stale_frames;
use asciivid::{format_elapsed, AppConfig, CancelToken, ColorMode, ConvertOptions, Ffmpeg, PipelineDriver, Progress, ProgressPhase, RunContext, VideoCodec};
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Re-render a video as ASCII art.")]
struct Args {
    /// Input video file
    #[arg(short, long)]
    input: PathBuf,

    /// Maximum edge length of rendered frames, in pixels [default: 1280]
    #[arg(short, long)]
    size: Option<u32>,

    /// Point size of the monospace font [default: 12]
    #[arg(short, long)]
    font_size: Option<u32>,

    /// Fill each glyph with the color of the pixel it replaces
    #[arg(short, long, default_value_t = false)]
    color: bool,

    /// Carry the original audio track into the output
    #[arg(short, long, default_value_t = false)]
    audio: bool,

    /// Encode with VP9 instead of VP8
    #[arg(long, default_value_t = false)]
    vp9: bool,

    /// Monospace TrueType font to render with
    #[arg(long)]
    font: Option<PathBuf>,

    /// Maximum glyph columns/rows per frame [default: 128]
    #[arg(long)]
    grid: Option<u32>,

    /// Output video path [default: output.webm]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for intermediate frames [default: frames]
    #[arg(long)]
    scratch: Option<PathBuf>,

    /// Worker threads for rendering [default: half the CPUs]
    #[arg(long)]
    workers: Option<usize>,

    /// Config file (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clear leftover frames in the scratch directory without asking
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Log pipeline details to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "asciivid=debug" } else { "asciivid=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn resolve_options(args: &Args, cfg: &AppConfig) -> ConvertOptions {
    let mut opts = ConvertOptions::from_config(cfg)
        .with_color(if args.color { ColorMode::Color } else { ColorMode::Monochrome })
        .with_audio(args.audio)
        .with_codec(if args.vp9 { VideoCodec::Vp9 } else { VideoCodec::Vp8 });
    if let Some(size) = args.size {
        opts = opts.with_size(size);
    }
    if let Some(font_size) = args.font_size {
        opts = opts.with_font_size(font_size);
    }
    if let Some(font) = &args.font {
        opts = opts.with_font_path(font);
    }
    if let Some(grid) = args.grid {
        opts = opts.with_grid_size(grid);
    }
    if let Some(output) = &args.output {
        opts = opts.with_output(output);
    }
    if let Some(scratch) = &args.scratch {
        opts = opts.with_scratch_dir(scratch);
    }
    if let Some(workers) = args.workers {
        opts = opts.with_workers(workers);
    }
    opts
}

/// Turns library progress updates into terminal progress bars.
struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    fn new() -> Self {
        Self { bar: Mutex::new(None) }
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(message);
        pb
    }

    fn report(&self, progress: Progress) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        match progress.phase {
            ProgressPhase::RenderingFrames => {
                let needs_bar = guard.as_ref().map_or(true, |pb| pb.length() != Some(progress.total as u64));
                if needs_bar {
                    if let Some(pb) = guard.take() {
                        pb.finish_and_clear();
                    }
                    let pb = ProgressBar::new(progress.total as u64);
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                    {
                        pb.set_style(style.progress_chars("#>-"));
                    }
                    *guard = Some(pb);
                }
                if let Some(pb) = guard.as_ref() {
                    pb.set_position(progress.completed as u64);
                }
            }
            ProgressPhase::Complete => {
                if let Some(pb) = guard.take() {
                    pb.finish_and_clear();
                }
            }
            _ => {
                if let Some(pb) = guard.take() {
                    pb.finish_and_clear();
                }
                *guard = Some(Self::spinner(progress.message));
            }
        }
    }
}

fn main() -> Result<()> {
    let ctx = RunContext::start();
    let args = Args::parse();
    init_logging(args.verbose);

    let cfg = AppConfig::load(args.config.as_deref()).context("loading configuration")?;
    let opts = resolve_options(&args, &cfg);

    if has_stale_frames(&opts.scratch_dir) && !args.force {
        let overwrite = Confirm::new()
            .with_prompt(format!("Scratch directory {} already contains frames. Overwrite?", opts.scratch_dir.display()))
            .default(false)
            .interact()
            .context("asking whether to clear the scratch directory (pass --force when not on a terminal)")?;
        if !overwrite {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel()).context("installing Ctrl-C handler")?;

    let transcoder = Ffmpeg::new(&cfg.ffmpeg, &cfg.ffprobe);
    let driver = PipelineDriver::new(transcoder, opts).with_cancel(cancel).with_run_context(ctx);
    let reporter = ProgressReporter::new();

    let summary = driver
        .run(&args.input, |p| reporter.report(p))
        .with_context(|| format!("converting {}", args.input.display()))?;

    println!("Wrote {} frames to {}", summary.frames, summary.output.display());
    println!("Complete! Time elapsed: {}", format_elapsed(summary.elapsed));
    Ok(())
}
