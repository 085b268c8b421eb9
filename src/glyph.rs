//! Brightness to glyph classification.

use crate::luminance::BrightnessGrid;

/// One band of the ramp: every brightness `<= upper` (and above the previous
/// band's bound) maps to `glyph`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub upper: f32,
    pub glyph: char,
}

/// The fixed ten-step ramp, darkest first. The last band is open-ended and
/// renders as background.
pub const GLYPH_RAMP: [Band; 10] = [
    Band { upper: 30.0, glyph: '@' },
    Band { upper: 55.0, glyph: '%' },
    Band { upper: 80.0, glyph: '#' },
    Band { upper: 105.0, glyph: '*' },
    Band { upper: 130.0, glyph: '+' },
    Band { upper: 155.0, glyph: '=' },
    Band { upper: 180.0, glyph: '-' },
    Band { upper: 205.0, glyph: ':' },
    Band { upper: 230.0, glyph: '.' },
    Band { upper: f32::INFINITY, glyph: ' ' },
];

/// Position of `brightness` on the ramp, 0 being the densest glyph.
pub fn ramp_index(brightness: f32) -> usize {
    GLYPH_RAMP
        .iter()
        .position(|band| brightness <= band.upper)
        .unwrap_or(GLYPH_RAMP.len() - 1)
}

#[inline]
pub fn classify(brightness: f32) -> char {
    GLYPH_RAMP[ramp_index(brightness)].glyph
}

/// A row-major grid of glyphs, one per brightness cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    columns: u32,
    rows: u32,
    cells: Vec<char>,
}

impl GlyphGrid {
    pub fn from_brightness(grid: &BrightnessGrid) -> Self {
        let cells = grid.values().iter().map(|&b| classify(b)).collect();
        Self { columns: grid.width(), rows: grid.height(), cells }
    }

    /// Build a grid from text lines; used by tooling and tests. Lines must have
    /// equal length.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Option<Self> {
        let columns = lines.first().map(|l| l.as_ref().chars().count()).unwrap_or(0);
        let mut cells = Vec::with_capacity(columns * lines.len());
        for line in lines {
            let before = cells.len();
            cells.extend(line.as_ref().chars());
            if cells.len() - before != columns {
                return None;
            }
        }
        Some(Self { columns: columns as u32, rows: lines.len() as u32, cells })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    pub fn get(&self, column: u32, row: u32) -> Option<char> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells.get((row * self.columns + column) as usize).copied()
    }

    pub fn row(&self, row: u32) -> &[char] {
        let start = (row * self.columns) as usize;
        &self.cells[start..start + self.columns as usize]
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.cells.chunks(self.columns.max(1) as usize).map(|row| row.iter().collect())
    }

    pub fn cells(&self) -> &[char] {
        &self.cells
    }
}

impl std::fmt::Display for GlyphGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
