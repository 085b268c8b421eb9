//! Shared fixtures: a deterministic block-glyph face and an in-memory transcoder.

#![allow(dead_code)]

use asciivid::frame::{self, FrameId};
use asciivid::transcode::{EncodeJob, FrameRate};
use asciivid::{GlyphFace, PipelineError, PipelineResult, Transcoder, VideoInfo};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Every non-space glyph is a solid `cell_width x line_height` block.
#[derive(Debug, Clone, Copy)]
pub struct BlockFace {
    pub cell_width: u32,
    pub line_height: u32,
}

impl Default for BlockFace {
    fn default() -> Self {
        Self { cell_width: 4, line_height: 6 }
    }
}

impl GlyphFace for BlockFace {
    fn char_width(&self) -> u32 {
        self.cell_width
    }

    fn line_height(&self) -> u32 {
        self.line_height
    }

    fn measure(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.cell_width
    }

    fn draw_text(&self, canvas: &mut RgbImage, x: u32, y: u32, text: &str, fill: Rgb<u8>) {
        for (i, c) in text.chars().enumerate() {
            if c == ' ' {
                continue;
            }
            let left = x + i as u32 * self.cell_width;
            for py in y..(y + self.line_height).min(canvas.height()) {
                for px in left..(left + self.cell_width).min(canvas.width()) {
                    canvas.put_pixel(px, py, fill);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub fill: Rgb<u8>,
}

/// A [`BlockFace`] that remembers every draw call.
#[derive(Default)]
pub struct RecordingFace {
    pub inner: BlockFace,
    pub calls: Mutex<Vec<DrawCall>>,
}

impl RecordingFace {
    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl GlyphFace for RecordingFace {
    fn char_width(&self) -> u32 {
        self.inner.char_width()
    }

    fn line_height(&self) -> u32 {
        self.inner.line_height()
    }

    fn measure(&self, text: &str) -> u32 {
        self.inner.measure(text)
    }

    fn draw_text(&self, canvas: &mut RgbImage, x: u32, y: u32, text: &str, fill: Rgb<u8>) {
        self.calls.lock().unwrap().push(DrawCall { text: text.to_string(), x, y, fill });
        self.inner.draw_text(canvas, x, y, text, fill);
    }
}

/// Stands in for ffmpeg: "decodes" a list of in-memory frames and captures the
/// rendered frames at encode time, in the order the encoder would read them.
pub struct FakeTranscoder {
    pub frames: Vec<RgbImage>,
    pub has_audio: bool,
    /// Storage indices whose decoded file is written as garbage
    pub corrupt: Vec<u32>,
    pub calls: Mutex<Vec<&'static str>>,
    pub encoded: Mutex<Vec<(FrameId, RgbImage)>>,
    pub audio_muxed: Mutex<Option<PathBuf>>,
}

impl FakeTranscoder {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            has_audio: false,
            corrupt: Vec::new(),
            calls: Mutex::new(Vec::new()),
            encoded: Mutex::new(Vec::new()),
            audio_muxed: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn encoded(&self) -> Vec<(FrameId, RgbImage)> {
        self.encoded.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Transcoder for FakeTranscoder {
    fn probe(&self, _input: &Path) -> PipelineResult<VideoInfo> {
        self.record("probe");
        let (width, height) = self.frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Ok(VideoInfo { width, height, frame_rate: FrameRate { num: 2, den: 1 }, has_audio: self.has_audio })
    }

    fn decode_frames(&self, _input: &Path, scratch: &Path) -> PipelineResult<()> {
        self.record("decode");
        for (i, img) in self.frames.iter().enumerate() {
            let path = FrameId::new(i as u32 + 1).expect("ordinal").source_path(scratch);
            if self.corrupt.contains(&(i as u32)) {
                fs::write(&path, b"not a png").map_err(|e| PipelineError::DecodeFailure(e.to_string()))?;
            } else {
                img.save(&path).map_err(|e| PipelineError::DecodeFailure(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn extract_audio(&self, _input: &Path, dest: &Path, _threads: usize) -> PipelineResult<()> {
        self.record("audio");
        fs::write(dest, b"OggS").map_err(|e| PipelineError::DecodeFailure(e.to_string()))
    }

    fn encode(&self, job: &EncodeJob<'_>) -> PipelineResult<()> {
        self.record("encode");
        let ids = frame::collect_rendered_frames(job.frames_dir)?;
        assert_eq!(ids.len(), job.frame_count);
        let mut encoded = self.encoded.lock().unwrap();
        for id in ids {
            let img = image::open(id.rendered_path(job.frames_dir)).unwrap().to_rgb8();
            encoded.push((id, img));
        }
        *self.audio_muxed.lock().unwrap() = job.audio.map(Path::to_path_buf);
        Ok(())
    }
}

/// A placeholder input file; the fake transcoder never reads it.
pub fn dummy_input(dir: &Path) -> PathBuf {
    let path = dir.join("input.mp4");
    fs::write(&path, b"fake video").unwrap();
    path
}

pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}
