//! Frames, rendered frames and their ordering.
//!
//! Every decoded frame gets a [`FrameId`] holding its 1-based ordinal. The
//! decoder stores frames zero-based (`frame_000000.png` is ordinal 1) and the
//! rendered frame is written under the ordinal itself (`ascii_000001.png`), so
//! the encoder can consume rendered frames in order no matter which worker
//! finished first.

use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{PipelineError, PipelineResult, RenderError};

pub const SOURCE_PREFIX: &str = "frame_";
pub const RENDERED_PREFIX: &str = "ascii_";
pub const FRAME_EXT: &str = "png";
const INDEX_DIGITS: usize = 6;

/// Typed identity of a frame within the source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId {
    ordinal: u32,
}

impl FrameId {
    /// `None` for ordinal 0; ordinals start at 1.
    pub fn new(ordinal: u32) -> Option<Self> {
        (ordinal > 0).then_some(Self { ordinal })
    }

    /// Identity of the frame stored under zero-based `index`; `None` when the
    /// ordinal would not fit.
    pub fn from_storage_index(index: u32) -> Option<Self> {
        index.checked_add(1).map(|ordinal| Self { ordinal })
    }

    pub fn ordinal(self) -> u32 {
        self.ordinal
    }

    pub fn storage_index(self) -> u32 {
        self.ordinal - 1
    }

    /// File name of the decoded source frame.
    pub fn source_name(self) -> String {
        format!("{}{:0width$}.{}", SOURCE_PREFIX, self.storage_index(), FRAME_EXT, width = INDEX_DIGITS)
    }

    /// File name of the rendered frame.
    pub fn rendered_name(self) -> String {
        format!("{}{:0width$}.{}", RENDERED_PREFIX, self.ordinal, FRAME_EXT, width = INDEX_DIGITS)
    }

    pub fn source_path(self, dir: &Path) -> PathBuf {
        dir.join(self.source_name())
    }

    pub fn rendered_path(self, dir: &Path) -> PathBuf {
        dir.join(self.rendered_name())
    }

    /// Recover the identity from a decoded frame's file name.
    pub fn parse_source_name(name: &str) -> Option<Self> {
        parse_number(name, SOURCE_PREFIX).and_then(Self::from_storage_index)
    }

    /// Recover the identity from a rendered frame's file name.
    pub fn parse_rendered_name(name: &str) -> Option<Self> {
        parse_number(name, RENDERED_PREFIX).and_then(Self::new)
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.ordinal)
    }
}

fn parse_number(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?.strip_suffix(FRAME_EXT)?.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Printf-style pattern matching [`FrameId::source_name`], for the decoder.
pub fn source_pattern() -> String {
    format!("{}%0{}d.{}", SOURCE_PREFIX, INDEX_DIGITS, FRAME_EXT)
}

/// Printf-style pattern matching [`FrameId::rendered_name`], for the encoder.
pub fn rendered_pattern() -> String {
    format!("{}%0{}d.{}", RENDERED_PREFIX, INDEX_DIGITS, FRAME_EXT)
}

/// A decoded frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    pub image: RgbImage,
}

impl Frame {
    pub fn load(id: FrameId, dir: &Path) -> Result<Self, RenderError> {
        let image = image::open(id.source_path(dir))?.to_rgb8();
        Ok(Self { id, image })
    }
}

/// A frame after glyph rendering, keyed only by the source ordinal.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub id: FrameId,
    pub image: RgbImage,
}

impl RenderedFrame {
    /// Write under the ordinal-tagged name in `dir` and return the path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, RenderError> {
        let path = self.id.rendered_path(dir);
        self.image.save(&path)?;
        Ok(path)
    }
}

/// Sort ids into temporal order and check they are exactly `1..=len`.
pub fn ensure_contiguous(ids: &mut [FrameId]) -> PipelineResult<()> {
    ids.sort_unstable();
    for (i, id) in ids.iter().enumerate() {
        let expected = i as u32 + 1;
        if id.ordinal() != expected {
            return Err(PipelineError::SequenceGap { expected, found: Some(id.ordinal()) });
        }
    }
    Ok(())
}

fn collect_ids(dir: &Path, parse: fn(&str) -> Option<FrameId>) -> PipelineResult<Vec<FrameId>> {
    let mut ids = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| PipelineError::scratch(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(id) = entry.file_name().to_str().and_then(parse) {
            ids.push(id);
        }
    }
    ensure_contiguous(&mut ids)?;
    Ok(ids)
}

/// All decoded frames in `dir`, in temporal order.
pub fn collect_source_frames(dir: &Path) -> PipelineResult<Vec<FrameId>> {
    collect_ids(dir, FrameId::parse_source_name)
}

/// All rendered frames in `dir`, in temporal order.
pub fn collect_rendered_frames(dir: &Path) -> PipelineResult<Vec<FrameId>> {
    collect_ids(dir, FrameId::parse_rendered_name)
}

/// Check that every ordinal in `1..=total` was rendered into `dir`.
pub fn verify_rendered(dir: &Path, total: usize) -> PipelineResult<Vec<FrameId>> {
    let ids = collect_rendered_frames(dir)?;
    if ids.len() != total {
        return Err(PipelineError::SequenceGap { expected: ids.len() as u32 + 1, found: None });
    }
    Ok(ids)
}

/// Remove every source and rendered frame from `dir`, leaving other files.
pub fn remove_frame_files(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| FrameId::parse_source_name(n).is_some() || FrameId::parse_rendered_name(n).is_some());
        if is_frame && path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
