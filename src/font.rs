//! Monospace glyph faces used to rasterize glyph grids.
//!
//! [`GlyphFace`] is the seam between the rasterizer and the font engine. The
//! production face is [`TrueTypeFace`], backed by `ab_glyph`; tests substitute
//! simpler faces.

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Default font file name looked up when no explicit font is configured.
pub const DEFAULT_FONT_FILE: &str = "square.ttf";

/// Metrics and drawing for a fixed-size monospace face.
///
/// Implementations are shared read-only between worker threads.
pub trait GlyphFace: Send + Sync {
    /// Horizontal advance of one cell, in pixels.
    fn char_width(&self) -> u32;

    /// Height of one text line, in pixels.
    fn line_height(&self) -> u32;

    /// Width in pixels of `text` laid out on a single line.
    fn measure(&self, text: &str) -> u32;

    /// Draw `text` with its line box's top-left corner at `(x, y)`, blending
    /// `fill` over whatever is already on the canvas. Pixels outside the canvas
    /// are clipped.
    fn draw_text(&self, canvas: &mut RgbImage, x: u32, y: u32, text: &str, fill: Rgb<u8>);
}

/// A TrueType/OpenType face at a fixed pixel size.
pub struct TrueTypeFace {
    font: FontVec,
    scale: PxScale,
    char_width: u32,
    line_height: u32,
}

impl std::fmt::Debug for TrueTypeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFace")
            .field("scale", &self.scale)
            .field("char_width", &self.char_width)
            .field("line_height", &self.line_height)
            .finish()
    }
}

impl TrueTypeFace {
    /// Parse font bytes. `size` is the em size in pixels.
    pub fn from_bytes(bytes: Vec<u8>, size: u32) -> Option<Self> {
        let font = FontVec::try_from_vec(bytes).ok()?;
        // PxScale is ascent-to-descent height; convert so that one em equals `size`.
        let scale = match font.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(size as f32 * font.height_unscaled() / upem),
            _ => PxScale::from(size as f32),
        };
        let scaled = font.as_scaled(scale);
        let char_width = scaled.h_advance(scaled.glyph_id('@')).round().max(1.0) as u32;
        let line_height = scaled.height().ceil().max(1.0) as u32;
        Some(Self { font, scale, char_width, line_height })
    }

    /// Load a face from disk.
    pub fn load(path: &Path, size: u32) -> PipelineResult<Self> {
        let bytes = fs::read(path)
            .map_err(|_| PipelineError::FontResourceMissing { searched: vec![path.to_path_buf()] })?;
        let face = Self::from_bytes(bytes, size).ok_or_else(|| PipelineError::InvalidFont(path.to_path_buf()))?;
        debug!(font = %path.display(), size, char_width = face.char_width, line_height = face.line_height, "loaded font");
        Ok(face)
    }

    /// Resolve and load a face: an explicit path must exist, otherwise the
    /// default candidates are tried in order.
    pub fn locate(explicit: Option<&Path>, size: u32) -> PipelineResult<Self> {
        let path = resolve_font_path(explicit)?;
        Self::load(&path, size)
    }
}

impl GlyphFace for TrueTypeFace {
    fn char_width(&self) -> u32 {
        self.char_width
    }

    fn line_height(&self) -> u32 {
        self.line_height
    }

    fn measure(&self, text: &str) -> u32 {
        let scaled = self.font.as_scaled(self.scale);
        let mut width = 0.0f32;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width.ceil().max(0.0) as u32
    }

    fn draw_text(&self, canvas: &mut RgbImage, x: u32, y: u32, text: &str, fill: Rgb<u8>) {
        let scaled = self.font.as_scaled(self.scale);
        let baseline = y as f32 + scaled.ascent();
        let (cw, ch) = canvas.dimensions();
        let mut caret = x as f32;
        let mut prev = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(self.scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            prev = Some(id);

            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px as u32 >= cw || py as u32 >= ch {
                    return;
                }
                blend(canvas.get_pixel_mut(px as u32, py as u32), fill, coverage);
            });
        }
    }
}

/// Blend `fill` over `dst` with the given coverage in `[0, 1]`.
pub fn blend(dst: &mut Rgb<u8>, fill: Rgb<u8>, coverage: f32) {
    let a = coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let v = fill[c] as f32 * a + dst[c] as f32 * (1.0 - a);
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
}

/// Places a default font is looked for, in order: next to the working directory
/// (`../square.ttf`), in it, then in the per-user data directory.
pub fn default_font_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("..").join(DEFAULT_FONT_FILE), PathBuf::from(DEFAULT_FONT_FILE)];
    if let Some(mut d) = dirs::data_dir() {
        d.push("asciivid");
        d.push(DEFAULT_FONT_FILE);
        candidates.push(d);
    }
    candidates
}

/// Pick the font file to load without reading it.
pub fn resolve_font_path(explicit: Option<&Path>) -> PipelineResult<PathBuf> {
    if let Some(p) = explicit {
        if p.is_file() {
            return Ok(p.to_path_buf());
        }
        return Err(PipelineError::FontResourceMissing { searched: vec![p.to_path_buf()] });
    }
    let candidates = default_font_candidates();
    if let Some(p) = candidates.iter().find(|p| p.is_file()) {
        return Ok(p.clone());
    }
    Err(PipelineError::FontResourceMissing { searched: candidates })
}
