//! Configuration file layer and resolved conversion options.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::default_worker_count;
use crate::raster::ColorMode;
use crate::transcode::VideoCodec;

pub const CONFIG_STEM: &str = "asciivid";

fn default_size() -> u32 {
    1280
}
fn default_font_size() -> u32 {
    12
}
fn default_grid_size() -> u32 {
    128
}
fn default_crf() -> u32 {
    31
}
fn default_scratch_dir() -> PathBuf {
    PathBuf::from("frames")
}
fn default_output() -> PathBuf {
    PathBuf::from("output.webm")
}
fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}
fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

/// Settings read from `asciivid.toml` / `asciivid.json`. Every field is optional
/// in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Longest edge of a rendered frame, in pixels
    #[serde(default = "default_size")]
    pub size: u32,
    /// Em size of the glyph face, in pixels
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    pub font_path: Option<PathBuf>,
    /// Longest edge of the glyph grid, in characters
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    pub workers: Option<usize>,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            font_size: default_font_size(),
            font_path: None,
            grid_size: default_grid_size(),
            crf: default_crf(),
            scratch_dir: default_scratch_dir(),
            output: default_output(),
            workers: None,
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

impl AppConfig {
    /// Parse a config file; the format follows the extension (`.toml`, else JSON).
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| PipelineError::InvalidConfig(format!("reading {}: {}", path.display(), e)))?;
        let is_toml = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|e| PipelineError::InvalidConfig(format!("parsing {}: {}", path.display(), e)))
    }

    /// Files looked at when no config is given explicitly, in order.
    pub fn candidates() -> Vec<PathBuf> {
        let mut tried = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push(CONFIG_STEM);
            tried.push(d.join(format!("{}.toml", CONFIG_STEM)));
            tried.push(d.join(format!("{}.json", CONFIG_STEM)));
        }
        tried.push(PathBuf::from(format!("{}.toml", CONFIG_STEM)));
        tried.push(PathBuf::from(format!("{}.json", CONFIG_STEM)));
        tried
    }

    /// Load `explicit` if given, else the first existing candidate, else defaults.
    pub fn load(explicit: Option<&Path>) -> PipelineResult<Self> {
        if let Some(p) = explicit {
            return Self::from_file(p);
        }
        for p in Self::candidates() {
            if p.is_file() {
                return Self::from_file(&p);
            }
        }
        Ok(Self::default())
    }
}

/// Fully resolved options for one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub size: u32,
    pub font_size: u32,
    pub font_path: Option<PathBuf>,
    pub grid_size: u32,
    pub color: ColorMode,
    pub audio: bool,
    pub codec: VideoCodec,
    pub crf: u32,
    pub workers: usize,
    pub scratch_dir: PathBuf,
    pub output: PathBuf,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ConvertOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            size: cfg.size,
            font_size: cfg.font_size,
            font_path: cfg.font_path.clone(),
            grid_size: cfg.grid_size,
            color: ColorMode::Monochrome,
            audio: false,
            codec: VideoCodec::Vp8,
            crf: cfg.crf,
            workers: cfg.workers.unwrap_or_else(default_worker_count),
            scratch_dir: cfg.scratch_dir.clone(),
            output: cfg.output.clone(),
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let checks = [
            (self.size == 0, "size must be at least 1"),
            (self.font_size == 0, "font size must be at least 1"),
            (self.grid_size == 0, "grid size must be at least 1"),
            (self.workers == 0, "worker count must be at least 1"),
            (self.crf > 63, "crf must be between 0 and 63"),
        ];
        match checks.iter().find(|(bad, _)| *bad) {
            Some((_, msg)) => Err(PipelineError::InvalidConfig((*msg).to_string())),
            None => Ok(()),
        }
    }
}
