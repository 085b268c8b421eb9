//! Orchestration of one conversion run: decode, render in parallel, encode.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ConvertOptions;
use crate::error::{PipelineError, PipelineResult, RenderError};
use crate::font::{GlyphFace, TrueTypeFace};
use crate::frame::{self, Frame, FrameId};
use crate::pipeline::{CancelToken, ParallelPipeline};
use crate::raster::FrameRenderer;
use crate::transcode::{EncodeJob, Transcoder, VideoInfo};
use crate::Progress;

pub const AUDIO_FILE: &str = "audio.ogg";

/// Per-run state created when a run starts and handed to reporting at the end.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    started: Instant,
}

impl RunContext {
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// `H:MM:SS.ss`, hundredths of a second.
pub fn format_elapsed(d: Duration) -> String {
    let centis = d.as_millis() / 10;
    let (secs, centis) = (centis / 100, centis % 100);
    format!("{}:{:02}:{:02}.{:02}", secs / 3600, (secs / 60) % 60, secs % 60, centis)
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: usize,
    pub output: PathBuf,
    pub video: VideoInfo,
    pub elapsed: Duration,
}

/// Scratch directory holding decoded and rendered frames. Its artifacts are
/// removed when the guard is dropped, whether or not the run succeeded; a
/// directory the guard created itself is removed too.
pub struct ScratchDir {
    path: PathBuf,
    created: bool,
    cleaned: bool,
}

impl ScratchDir {
    pub fn create(path: &Path) -> PipelineResult<Self> {
        let created = !path.exists();
        fs::create_dir_all(path).map_err(|e| PipelineError::scratch(path, e))?;
        // leftovers from an aborted run would be picked up as frames
        frame::remove_frame_files(path).map_err(|e| PipelineError::scratch(path, e))?;
        Ok(Self { path: path.to_path_buf(), created, cleaned: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn audio_path(&self) -> PathBuf {
        self.path.join(AUDIO_FILE)
    }

    /// Remove every intermediate artifact now, reporting failures.
    pub fn cleanup(mut self) -> PipelineResult<()> {
        self.cleaned = true;
        self.remove_artifacts().map_err(|e| PipelineError::scratch(&self.path, e))
    }

    fn remove_artifacts(&self) -> std::io::Result<()> {
        frame::remove_frame_files(&self.path)?;
        let audio = self.audio_path();
        if audio.exists() {
            fs::remove_file(audio)?;
        }
        if self.created {
            fs::remove_dir(&self.path)?;
        }
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.cleaned {
            if let Err(e) = self.remove_artifacts() {
                warn!(dir = %self.path.display(), error = %e, "could not clean scratch directory");
            }
        }
    }
}

/// Whether `dir` already holds frames from an earlier run.
pub fn has_stale_frames(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|e| {
        e.file_name()
            .to_str()
            .is_some_and(|n| FrameId::parse_source_name(n).is_some() || FrameId::parse_rendered_name(n).is_some())
    })
}

/// Render one stored frame, persist it under its ordinal and drop the source.
pub fn render_stored_frame<F: GlyphFace>(renderer: &FrameRenderer<F>, id: FrameId, dir: &Path) -> Result<(), RenderError> {
    let source = id.source_path(dir);
    let rendered = {
        let frame = Frame::load(id, dir)?;
        renderer.render(&frame)?
    };
    rendered.save(dir)?;
    fs::remove_file(source)?;
    debug!(frame = %id, "rendered");
    Ok(())
}

pub struct PipelineDriver<T: Transcoder> {
    transcoder: T,
    options: ConvertOptions,
    cancel: CancelToken,
    context: Option<RunContext>,
}

impl<T: Transcoder> PipelineDriver<T> {
    pub fn new(transcoder: T, options: ConvertOptions) -> Self {
        Self { transcoder, options, cancel: CancelToken::new(), context: None }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Measure elapsed time from `context` instead of from the start of `run`.
    pub fn with_run_context(mut self, context: RunContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    fn check_setup(&self, input: &Path) -> PipelineResult<()> {
        self.options.validate()?;
        if !input.is_file() {
            return Err(PipelineError::InputNotFound(input.to_path_buf()));
        }
        Ok(())
    }

    /// Convert `input`, loading the configured TrueType face first.
    pub fn run<P>(&self, input: &Path, progress: P) -> PipelineResult<RunSummary>
    where
        P: Fn(Progress) + Send + Sync,
    {
        let ctx = self.context.unwrap_or_else(RunContext::start);
        self.check_setup(input)?;
        let face = TrueTypeFace::locate(self.options.font_path.as_deref(), self.options.font_size)?;
        self.execute(input, face, ctx, progress)
    }

    /// Convert `input` rendering with `face`.
    pub fn run_with_face<F, P>(&self, input: &Path, face: F, progress: P) -> PipelineResult<RunSummary>
    where
        F: GlyphFace,
        P: Fn(Progress) + Send + Sync,
    {
        let ctx = self.context.unwrap_or_else(RunContext::start);
        self.execute(input, face, ctx, progress)
    }

    fn execute<F, P>(&self, input: &Path, face: F, ctx: RunContext, progress: P) -> PipelineResult<RunSummary>
    where
        F: GlyphFace,
        P: Fn(Progress) + Send + Sync,
    {
        self.check_setup(input)?;
        let opts = &self.options;

        let video = self.transcoder.probe(input)?;
        info!(input = %input.display(), width = video.width, height = video.height, fps = %video.frame_rate, "probed input");

        let scratch = ScratchDir::create(&opts.scratch_dir)?;

        progress(Progress::decoding_frames());
        self.transcoder.decode_frames(input, scratch.path())?;
        let ids = frame::collect_source_frames(scratch.path())?;
        if ids.is_empty() {
            return Err(PipelineError::DecodeFailure(format!("no frames decoded from {}", input.display())));
        }
        let total = ids.len();
        info!(frames = total, "decoded frames");

        let renderer = FrameRenderer::new(face, opts.color, opts.grid_size, opts.size);
        let pipeline = ParallelPipeline::new(opts.workers)?.with_cancel(self.cancel.clone());
        progress(Progress::rendering_frames(0, total));
        pipeline.run(
            &ids,
            |id| render_stored_frame(&renderer, id, scratch.path()),
            |done, total| progress(Progress::rendering_frames(done, total)),
        )?;
        frame::verify_rendered(scratch.path(), total)?;

        let audio = if opts.audio && video.has_audio {
            progress(Progress::extracting_audio());
            let dest = scratch.audio_path();
            self.transcoder.extract_audio(input, &dest, opts.workers)?;
            Some(dest)
        } else {
            if opts.audio {
                warn!(input = %input.display(), "no audio track found, encoding without audio");
            }
            None
        };

        if let Some(parent) = opts.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::scratch(parent, e))?;
        }
        progress(Progress::encoding(total));
        self.transcoder.encode(&EncodeJob {
            frames_dir: scratch.path(),
            frame_count: total,
            frame_rate: video.frame_rate,
            audio: audio.as_deref(),
            codec: opts.codec,
            crf: opts.crf,
            threads: opts.workers,
            output: &opts.output,
        })?;

        scratch.cleanup()?;
        progress(Progress::complete(total));
        info!(output = %opts.output.display(), frames = total, "conversion complete");

        Ok(RunSummary { frames: total, output: opts.output.clone(), video, elapsed: ctx.elapsed() })
    }
}
