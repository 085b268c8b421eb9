//! # asciivid - ASCII Video Renderer
//!
//! `asciivid` re-renders every frame of a video as a grid of monospace glyphs
//! and reassembles the result into a WebM, optionally in color and with the
//! original audio.
//!
//! ## Features
//!
//! - Fixed ten-glyph brightness ramp (`@%#*+=-:. `)
//! - Monochrome (black on white) or per-glyph color rendering
//! - Parallel frame rendering on a bounded worker pool
//! - Deterministic reassembly by frame ordinal
//! - Progress reporting for integration with UI applications
//!
//! ## Example
//!
//! ```no_run
//! use asciivid::{convert_video, ColorMode, ConvertOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ConvertOptions::default()
//!     .with_size(960)
//!     .with_color(ColorMode::Color)
//!     .with_font_path("square.ttf");
//! let summary = convert_video(Path::new("input.mp4"), options, |_| {})?;
//! println!("{} frames written to {}", summary.frames, summary.output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress Reporting
//!
//! ```no_run
//! use asciivid::{convert_video, ConvertOptions, ProgressPhase};
//! use std::path::Path;
//!
//! convert_video(Path::new("input.mp4"), ConvertOptions::default(), |progress| {
//!     match progress.phase {
//!         ProgressPhase::DecodingFrames => println!("Decoding frames..."),
//!         ProgressPhase::RenderingFrames => {
//!             println!("Rendering: {}/{} ({:.1}%)", progress.completed, progress.total, progress.percentage);
//!         }
//!         ProgressPhase::ExtractingAudio => println!("Extracting audio..."),
//!         ProgressPhase::Encoding => println!("Encoding..."),
//!         ProgressPhase::Complete => println!("Done!"),
//!     }
//! })
//! .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod config;
pub mod driver;
pub mod error;
pub mod font;
pub mod frame;
pub mod glyph;
pub mod luminance;
pub mod pipeline;
pub mod raster;
pub mod transcode;

pub use config::{AppConfig, ConvertOptions};
pub use driver::{format_elapsed, PipelineDriver, RunContext, RunSummary};
pub use error::{PipelineError, PipelineResult, RenderError};
pub use font::{GlyphFace, TrueTypeFace};
pub use frame::{Frame, FrameId, RenderedFrame};
pub use glyph::{classify, GlyphGrid, GLYPH_RAMP};
pub use luminance::{brightness, BrightnessGrid};
pub use pipeline::{default_worker_count, CancelToken, ParallelPipeline};
pub use raster::{ColorMode, FrameRasterizer, FrameRenderer};
pub use transcode::{Ffmpeg, Transcoder, VideoCodec, VideoInfo};

/// Represents the current phase of a conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Splitting the input into frames
    DecodingFrames,
    /// Rendering frames as glyphs
    RenderingFrames,
    /// Extracting the audio track
    ExtractingAudio,
    /// Assembling the output video
    Encoding,
    /// Conversion completed successfully
    Complete,
}

/// Progress information for conversion runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if unknown)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    pub message: String,
}

impl Progress {
    fn indeterminate(phase: ProgressPhase, message: &str) -> Self {
        Self { phase, completed: 0, total: 0, percentage: 0.0, message: message.to_string() }
    }

    pub fn decoding_frames() -> Self {
        Self::indeterminate(ProgressPhase::DecodingFrames, "Decoding frames from video...")
    }

    pub fn extracting_audio() -> Self {
        Self::indeterminate(ProgressPhase::ExtractingAudio, "Extracting audio from video...")
    }

    pub fn rendering_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 { (completed as f64 / total as f64) * 100.0 } else { 0.0 };
        Self {
            phase: ProgressPhase::RenderingFrames,
            completed,
            total,
            percentage,
            message: format!("Rendering frame {} of {}", completed, total),
        }
    }

    pub fn encoding(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Encoding,
            completed: 0,
            total: total_frames,
            percentage: 0.0,
            message: format!("Encoding {} frames...", total_frames),
        }
    }

    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Conversion complete: {} frames", total_frames),
        }
    }
}

/// Convert `input` with ffmpeg from `PATH` and the configured font.
pub fn convert_video<P>(input: &Path, options: ConvertOptions, progress: P) -> PipelineResult<RunSummary>
where
    P: Fn(Progress) + Send + Sync,
{
    PipelineDriver::new(Ffmpeg::default(), options).run(input, progress)
}
