//! Error types for the conversion pipeline.

use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Why a single frame could not be rendered.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("glyph grid is empty ({columns}x{rows})")]
    EmptyGrid { columns: u32, rows: u32 },

    #[error("color source is {actual:?} but the glyph grid is {expected:?}")]
    SourceMismatch { expected: (u32, u32), actual: (u32, u32) },

    #[error("line {row} measured zero pixels wide")]
    ZeroWidthLine { row: u32 },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can abort a conversion run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input video not found: {} (check the --input path)", .0.display())]
    InputNotFound(PathBuf),

    #[error("{} is not a readable video container: {reason}", .path.display())]
    UnsupportedContainer { path: PathBuf, reason: String },

    #[error("decoding frames failed: {0}")]
    DecodeFailure(String),

    #[error("font resource missing; searched: {}", format_paths(.searched))]
    FontResourceMissing { searched: Vec<PathBuf> },

    #[error("font {} could not be parsed as TrueType/OpenType", .0.display())]
    InvalidFont(PathBuf),

    #[error("frame {ordinal} failed to render: {source}")]
    FrameRenderFailure {
        ordinal: u32,
        #[source]
        source: RenderError,
    },

    #[error("frame sequence has a gap: expected ordinal {expected}, found {found:?}")]
    SequenceGap { expected: u32, found: Option<u32> },

    #[error("could not run {}: {source} (install ffmpeg or set `ffmpeg`/`ffprobe` in the config file)", .tool.display())]
    TranscoderMissing {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {}: {stderr}", format_status(.status))]
    EncodeFailure { tool: String, status: Option<i32>, stderr: String },

    #[error("conversion cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("scratch directory {}: {source}", .path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Scratch { path: path.into(), source }
    }

    pub(crate) fn render(ordinal: u32, source: impl Into<RenderError>) -> Self {
        Self::FrameRenderFailure { ordinal, source: source.into() }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(no candidates)".to_string();
    }
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

fn format_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no exit code (terminated by a signal)".to_string(),
    }
}
