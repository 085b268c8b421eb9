//! Rendering tests: luminance, classification and rasterization properties.

mod common;

use asciivid::raster::{fit_within, BACKGROUND, FOREGROUND};
use asciivid::{brightness, BrightnessGrid, ColorMode, Frame, FrameId, FrameRasterizer, FrameRenderer, GlyphGrid, RenderError, TrueTypeFace};
use asciivid::GlyphFace;
use common::{solid, BlockFace, RecordingFace};
use image::{Rgb, RgbImage};

// ==================== Luminance ====================

#[test]
fn brightness_stays_in_byte_range() {
    let limit = 255.0 * 1.0001;
    for r in (0..=255u16).step_by(15) {
        for g in (0..=255u16).step_by(15) {
            for b in (0..=255u16).step_by(15) {
                let v = brightness(Rgb([r as u8, g as u8, b as u8]));
                assert!((0.0..=limit).contains(&v), "{:?} -> {}", (r, g, b), v);
            }
        }
    }
}

#[test]
fn brightness_grid_is_deterministic() {
    let mut img = RgbImage::new(5, 3);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Rgb([(x * 50) as u8, (y * 80) as u8, 200]);
    }
    assert_eq!(BrightnessGrid::from_image(&img), BrightnessGrid::from_image(&img));
}

// ==================== Rasterizer ====================

fn grid(lines: &[&str]) -> GlyphGrid {
    GlyphGrid::from_lines(lines).expect("rectangular grid")
}

#[test]
fn monochrome_canvas_matches_line_metrics() {
    let face = BlockFace { cell_width: 5, line_height: 9 };
    let g = grid(&["@%#", "   ", ".:-"]);
    let raster = FrameRasterizer::new(&face, ColorMode::Monochrome);
    assert_eq!(raster.canvas_size(&g).unwrap(), (15, 27));

    let canvas = raster.rasterize(&g, &RgbImage::new(1, 1)).unwrap();
    assert_eq!(canvas.dimensions(), (face.measure("@%#"), face.line_height * 3));
}

#[test]
fn monochrome_draws_whole_lines_black_on_white() {
    let face = RecordingFace::default();
    let g = grid(&["@ ", " @"]);
    let canvas = FrameRasterizer::new(&face, ColorMode::Monochrome).rasterize(&g, &RgbImage::new(1, 1)).unwrap();

    let calls = face.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!((calls[0].text.as_str(), calls[0].x, calls[0].y), ("@ ", 0, 0));
    assert_eq!((calls[1].text.as_str(), calls[1].x, calls[1].y), (" @", 0, 6));
    assert!(calls.iter().all(|c| c.fill == FOREGROUND));

    assert_eq!(*canvas.get_pixel(0, 0), FOREGROUND);
    assert_eq!(*canvas.get_pixel(4, 0), BACKGROUND);
    assert_eq!(*canvas.get_pixel(4, 6), FOREGROUND);
    assert_eq!(*canvas.get_pixel(0, 6), BACKGROUND);
}

#[test]
fn color_mode_fills_each_glyph_with_its_source_pixel() {
    let rgb = [200, 30, 60];
    let source = solid(3, 2, rgb);
    let g = GlyphGrid::from_brightness(&BrightnessGrid::from_image(&source));
    assert!(g.cells().iter().all(|&c| c == '#'));

    let face = RecordingFace::default();
    let canvas = FrameRasterizer::new(&face, ColorMode::Color).rasterize(&g, &source).unwrap();

    let calls = face.calls();
    assert_eq!(calls.len(), 6);
    assert!(calls.iter().all(|c| c.fill == Rgb(rgb) && c.text == "#"));
    let positions: Vec<(u32, u32)> = calls.iter().map(|c| (c.x, c.y)).collect();
    assert_eq!(positions, vec![(0, 0), (4, 0), (8, 0), (0, 6), (4, 6), (8, 6)]);
    assert!(canvas.pixels().all(|px| *px == Rgb(rgb)));
}

#[test]
fn color_mode_looks_up_the_pixel_not_the_brightness() {
    let mut source = solid(2, 1, [0, 0, 0]);
    source.put_pixel(1, 0, Rgb([10, 20, 90]));
    let g = GlyphGrid::from_brightness(&BrightnessGrid::from_image(&source));
    let face = RecordingFace::default();
    FrameRasterizer::new(&face, ColorMode::Color).rasterize(&g, &source).unwrap();
    let fills: Vec<Rgb<u8>> = face.calls().iter().map(|c| c.fill).collect();
    assert_eq!(fills, vec![Rgb([0, 0, 0]), Rgb([10, 20, 90])]);
}

#[test]
fn empty_grid_is_rejected() {
    let face = BlockFace::default();
    let empty = GlyphGrid::from_brightness(&BrightnessGrid::from_image(&RgbImage::new(0, 0)));
    let err = FrameRasterizer::new(&face, ColorMode::Monochrome).rasterize(&empty, &RgbImage::new(0, 0)).unwrap_err();
    assert!(matches!(err, RenderError::EmptyGrid { .. }));
}

#[test]
fn color_source_must_match_grid() {
    let face = BlockFace::default();
    let g = grid(&["@@", "@@"]);
    let err = FrameRasterizer::new(&face, ColorMode::Color).rasterize(&g, &solid(3, 2, [0, 0, 0])).unwrap_err();
    assert!(matches!(err, RenderError::SourceMismatch { expected: (2, 2), actual: (3, 2) }));
}

// ==================== Composed transform ====================

#[test]
fn downscale_preserves_aspect_and_bound() {
    let renderer = FrameRenderer::new(BlockFace::default(), ColorMode::Monochrome, 128, 64);
    let frame = Frame { id: FrameId::new(1).unwrap(), image: solid(40, 10, [0, 0, 0]) };
    let out = renderer.render(&frame).unwrap();

    // canvas is 160x60 before downscale
    let (w, h) = out.image.dimensions();
    assert!(w.max(h) <= 64);
    let before = 160.0 / 60.0;
    let after = w as f64 / h as f64;
    assert!((before - after).abs() < 0.05, "{} vs {}", before, after);
    assert_eq!((w, h), fit_within(160, 60, 64));
}

#[test]
fn frames_are_shrunk_to_the_grid_bound_first() {
    let renderer = FrameRenderer::new(BlockFace::default(), ColorMode::Monochrome, 128, 10_000);
    let (g, source) = renderer.classify(&solid(300, 150, [255, 255, 255]));
    assert_eq!((g.columns(), g.rows()), (128, 64));
    assert_eq!(source.dimensions(), (128, 64));

    let (small, _) = renderer.classify(&solid(2, 2, [0, 0, 0]));
    assert_eq!((small.columns(), small.rows()), (2, 2));
}

#[test]
fn rendered_frame_keeps_its_ordinal() {
    let renderer = FrameRenderer::new(BlockFace::default(), ColorMode::Color, 128, 1280);
    let id = FrameId::new(42).unwrap();
    let out = renderer.render(&Frame { id, image: solid(3, 3, [90, 90, 90]) }).unwrap();
    assert_eq!(out.id, id);
    assert_eq!(out.image.dimensions(), (12, 18));
}

// ==================== TrueType face ====================

const SYSTEM_MONO_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/Library/Fonts/Courier New.ttf",
];

#[test]
fn truetype_face_measures_and_draws_when_a_font_is_installed() {
    let Some(path) = SYSTEM_MONO_FONTS.iter().map(std::path::Path::new).find(|p| p.is_file()) else {
        eprintln!("no monospace system font found, skipping");
        return;
    };
    let face = TrueTypeFace::load(path, 12).unwrap();
    assert!(face.char_width() > 0);
    assert!(face.line_height() >= 12);
    let one = face.measure("@");
    let three = face.measure("@@@");
    assert!(three >= 3 * one - 2 && three <= 3 * one + 2);

    let g = grid(&["@@", "  "]);
    let canvas = FrameRasterizer::new(&face, ColorMode::Monochrome).rasterize(&g, &RgbImage::new(1, 1)).unwrap();
    assert_eq!(canvas.height(), face.line_height() * 2);
    let lh = face.line_height();
    let dark_top = canvas.enumerate_pixels().filter(|(_, y, px)| *y < lh && px[0] < 128).count();
    let dark_bottom = canvas.enumerate_pixels().filter(|(_, y, px)| *y >= lh && px[0] < 128).count();
    assert!(dark_top > 0);
    assert_eq!(dark_bottom, 0);
}

#[test]
fn truetype_color_mode_inks_the_last_column() {
    let Some(path) = SYSTEM_MONO_FONTS.iter().map(std::path::Path::new).find(|p| p.is_file()) else {
        eprintln!("no monospace system font found, skipping");
        return;
    };
    // 13 px rounds the advance up for DejaVu Sans Mono
    for size in [12, 13, 15] {
        let face = TrueTypeFace::load(path, size).unwrap();
        let line = "@".repeat(128);
        let g = grid(&[line.as_str()]);
        let source = solid(128, 1, [0, 0, 0]);
        let canvas = FrameRasterizer::new(&face, ColorMode::Color).rasterize(&g, &source).unwrap();

        let last_cell = 127 * face.char_width();
        assert!(canvas.width() >= last_cell + face.char_width() / 2, "size {}: canvas {} too narrow", size, canvas.width());
        let inked = canvas.enumerate_pixels().any(|(x, _, px)| x >= last_cell && px[0] < 128);
        assert!(inked, "size {}: last column not drawn", size);
    }
}
