//! Glyph grid rasterization and the composed per-frame transform.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::error::RenderError;
use crate::font::GlyphFace;
use crate::frame::{Frame, RenderedFrame};
use crate::glyph::GlyphGrid;
use crate::luminance::BrightnessGrid;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// How glyphs are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Whole lines in black on white.
    #[default]
    Monochrome,
    /// Every glyph filled with the color of the pixel it stands for.
    Color,
}

/// Lays glyph grids out onto a white canvas using a monospace face.
pub struct FrameRasterizer<'a, F: GlyphFace + ?Sized> {
    face: &'a F,
    mode: ColorMode,
}

impl<'a, F: GlyphFace + ?Sized> FrameRasterizer<'a, F> {
    pub fn new(face: &'a F, mode: ColorMode) -> Self {
        Self { face, mode }
    }

    /// Canvas size for `grid`: the widest measured line by `line_height * rows`.
    pub fn canvas_size(&self, grid: &GlyphGrid) -> Result<(u32, u32), RenderError> {
        if grid.is_empty() {
            return Err(RenderError::EmptyGrid { columns: grid.columns(), rows: grid.rows() });
        }
        let mut width = 0;
        for (row, line) in grid.lines().enumerate() {
            let w = self.face.measure(&line);
            if w == 0 {
                return Err(RenderError::ZeroWidthLine { row: row as u32 });
            }
            width = width.max(w);
        }
        if self.mode == ColorMode::Color {
            // color glyphs are placed on whole cells, which can outrun the measured line
            width = width.max(self.face.char_width() * grid.columns());
        }
        Ok((width, self.face.line_height() * grid.rows()))
    }

    /// Draw `grid` at full glyph resolution. `source` supplies fill colors in
    /// [`ColorMode::Color`] and must match the grid's dimensions; it is ignored
    /// in monochrome mode.
    pub fn rasterize(&self, grid: &GlyphGrid, source: &RgbImage) -> Result<RgbImage, RenderError> {
        let (width, height) = self.canvas_size(grid)?;
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
        let line_height = self.face.line_height();

        match self.mode {
            ColorMode::Monochrome => {
                for (row, line) in grid.lines().enumerate() {
                    self.face.draw_text(&mut canvas, 0, row as u32 * line_height, &line, FOREGROUND);
                }
            }
            ColorMode::Color => {
                if source.dimensions() != (grid.columns(), grid.rows()) {
                    return Err(RenderError::SourceMismatch {
                        expected: (grid.columns(), grid.rows()),
                        actual: source.dimensions(),
                    });
                }
                let char_width = self.face.char_width();
                let mut buf = [0u8; 4];
                for row in 0..grid.rows() {
                    for (col, &glyph) in grid.row(row).iter().enumerate() {
                        // spaces draw nothing
                        if glyph == ' ' {
                            continue;
                        }
                        let fill = *source.get_pixel(col as u32, row);
                        let text = glyph.encode_utf8(&mut buf);
                        self.face.draw_text(&mut canvas, col as u32 * char_width, row * line_height, text, fill);
                    }
                }
            }
        }
        Ok(canvas)
    }
}

/// Largest size with the same aspect ratio as `(width, height)` whose longer
/// edge is at most `bound`. Never enlarges.
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let bound = bound.max(1);
    if width <= bound && height <= bound {
        return (width, height);
    }
    let scale = bound as f64 / width.max(height) as f64;
    let w = ((width as f64 * scale).round() as u32).clamp(1, bound);
    let h = ((height as f64 * scale).round() as u32).clamp(1, bound);
    (w, h)
}

/// Shrink `image` to fit a `bound x bound` box, keeping its aspect ratio.
pub fn downscale(image: RgbImage, bound: u32, filter: FilterType) -> RgbImage {
    let (w, h) = image.dimensions();
    let (tw, th) = fit_within(w, h, bound);
    if (tw, th) == (w, h) {
        return image;
    }
    imageops::resize(&image, tw, th, filter)
}

/// The full per-frame transform: shrink to the glyph grid, classify, draw and
/// downscale to the output bound.
pub struct FrameRenderer<F: GlyphFace> {
    face: F,
    mode: ColorMode,
    grid_size: u32,
    output_size: u32,
}

impl<F: GlyphFace> FrameRenderer<F> {
    pub fn new(face: F, mode: ColorMode, grid_size: u32, output_size: u32) -> Self {
        Self { face, mode, grid_size, output_size }
    }

    pub fn face(&self) -> &F {
        &self.face
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Shrink a decoded frame to at most `grid_size` pixels on its longer edge;
    /// one glyph is emitted per remaining pixel.
    pub fn grid_source(&self, image: &RgbImage) -> RgbImage {
        let (w, h) = image.dimensions();
        let (tw, th) = fit_within(w, h, self.grid_size);
        if (tw, th) == (w, h) {
            return image.clone();
        }
        imageops::resize(image, tw, th, FilterType::Triangle)
    }

    /// Classify a frame into glyphs, returning the grid together with the
    /// pixels it was classified from.
    pub fn classify(&self, image: &RgbImage) -> (GlyphGrid, RgbImage) {
        let source = self.grid_source(image);
        let grid = GlyphGrid::from_brightness(&BrightnessGrid::from_image(&source));
        (grid, source)
    }

    pub fn render(&self, frame: &Frame) -> Result<RenderedFrame, RenderError> {
        let (grid, source) = self.classify(&frame.image);
        let canvas = FrameRasterizer::new(&self.face, self.mode).rasterize(&grid, &source)?;
        let image = downscale(canvas, self.output_size, FilterType::Lanczos3);
        Ok(RenderedFrame { id: frame.id, image })
    }
}
