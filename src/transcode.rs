//! Video decoding and encoding through an external transcoder.
//!
//! [`Transcoder`] is the typed interface the driver talks to. [`Ffmpeg`]
//! implements it by running `ffprobe`/`ffmpeg` with explicit argument vectors;
//! nothing goes through a shell.

use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcCommand, Output};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::frame;

/// Target video codec for the final WebM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    #[default]
    Vp8,
    Vp9,
}

impl VideoCodec {
    pub fn encoder_name(self) -> &'static str {
        match self {
            VideoCodec::Vp8 => "libvpx",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }
}

/// A rational frame rate as reported by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const FALLBACK: FrameRate = FrameRate { num: 30, den: 1 };

    /// Parse `"30000/1001"` or `"25"`. Zero rates are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let (num, den) = match s.trim().split_once('/') {
            Some((n, d)) => (n.trim().parse().ok()?, d.trim().parse().ok()?),
            None => (s.trim().parse().ok()?, 1),
        };
        (num > 0 && den > 0).then_some(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// What the probe learned about an input.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub has_audio: bool,
}

/// Everything the encoder needs to assemble the output video.
#[derive(Debug, Clone)]
pub struct EncodeJob<'a> {
    pub frames_dir: &'a Path,
    pub frame_count: usize,
    pub frame_rate: FrameRate,
    pub audio: Option<&'a Path>,
    pub codec: VideoCodec,
    pub crf: u32,
    pub threads: usize,
    pub output: &'a Path,
}

pub trait Transcoder: Send + Sync {
    /// Inspect `input`; fails with `UnsupportedContainer` when it holds no
    /// decodable video stream.
    fn probe(&self, input: &Path) -> PipelineResult<VideoInfo>;

    /// Write every frame of `input` into `scratch` under
    /// [`frame::FrameId::source_name`] names, zero-based and gapless.
    fn decode_frames(&self, input: &Path, scratch: &Path) -> PipelineResult<()>;

    /// Extract the audio track of `input` into `dest`.
    fn extract_audio(&self, input: &Path, dest: &Path, threads: usize) -> PipelineResult<()>;

    /// Encode the rendered frames, in ordinal order, into `job.output`.
    fn encode(&self, job: &EncodeJob<'_>) -> PipelineResult<()>;
}

/// Binary locations for the ffmpeg tool suite.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self { ffmpeg: PathBuf::from("ffmpeg"), ffprobe: PathBuf::from("ffprobe") }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

impl Ffmpeg {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self { ffmpeg: ffmpeg.into(), ffprobe: ffprobe.into() }
    }

    pub fn ffmpeg_cmd(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe_cmd(&self) -> &Path {
        &self.ffprobe
    }

    fn run(&self, program: &Path, args: &[OsString]) -> PipelineResult<Output> {
        debug!(program = %program.display(), ?args, "spawning");
        let output = ProcCommand::new(program)
            .args(args)
            .output()
            .map_err(|source| PipelineError::TranscoderMissing { tool: program.to_path_buf(), source })?;
        if !output.status.success() {
            return Err(PipelineError::EncodeFailure {
                tool: program.display().to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn parse_probe(json: &[u8]) -> Result<VideoInfo, String> {
    let probe: ProbeOutput = serde_json::from_slice(json).map_err(|e| format!("unreadable probe output: {}", e))?;
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| "no video stream".to_string())?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };
    let frame_rate = [&video.avg_frame_rate, &video.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|r| FrameRate::parse(r))
        .unwrap_or(FrameRate::FALLBACK);
    let has_audio = probe.streams.iter().any(|s| s.codec_type.as_deref() == Some("audio"));
    Ok(VideoInfo { width, height, frame_rate, has_audio })
}

fn os_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    args.into_iter().map(Into::into).collect()
}

impl Transcoder for Ffmpeg {
    fn probe(&self, input: &Path) -> PipelineResult<VideoInfo> {
        let mut args = os_args(["-v", "error", "-print_format", "json", "-show_streams"]);
        args.push(input.as_os_str().to_owned());
        // only a probe that ran and rejected the file says anything about the input
        let output = self.run(&self.ffprobe, &args).map_err(|e| match e {
            PipelineError::EncodeFailure { stderr, .. } => PipelineError::UnsupportedContainer {
                path: input.to_path_buf(),
                reason: stderr,
            },
            other => other,
        })?;
        parse_probe(&output.stdout).map_err(|reason| PipelineError::UnsupportedContainer { path: input.to_path_buf(), reason })
    }

    fn decode_frames(&self, input: &Path, scratch: &Path) -> PipelineResult<()> {
        let mut args = os_args(["-loglevel", "error", "-y", "-i"]);
        args.push(input.as_os_str().to_owned());
        args.extend(os_args(["-map", "0:v:0", "-vsync", "passthrough", "-start_number", "0"]));
        args.push(scratch.join(frame::source_pattern()).into_os_string());
        self.run(&self.ffmpeg, &args).map_err(|e| match e {
            PipelineError::EncodeFailure { .. } => PipelineError::DecodeFailure(e.to_string()),
            other => other,
        })?;
        Ok(())
    }

    fn extract_audio(&self, input: &Path, dest: &Path, threads: usize) -> PipelineResult<()> {
        let mut args = os_args(["-loglevel", "error", "-y", "-i"]);
        args.push(input.as_os_str().to_owned());
        args.extend(os_args(["-vn", "-acodec", "libvorbis", "-threads"]));
        args.push(threads.to_string().into());
        args.push(dest.as_os_str().to_owned());
        self.run(&self.ffmpeg, &args)?;
        Ok(())
    }

    fn encode(&self, job: &EncodeJob<'_>) -> PipelineResult<()> {
        let args = encode_args(job);
        self.run(&self.ffmpeg, &args)?;
        Ok(())
    }
}

/// Argument vector for the final encode.
pub fn encode_args(job: &EncodeJob<'_>) -> Vec<OsString> {
    let mut args = os_args(["-loglevel", "error", "-y", "-framerate"]);
    args.push(job.frame_rate.to_string().into());
    args.extend(os_args(["-start_number", "1", "-i"]));
    args.push(job.frames_dir.join(frame::rendered_pattern()).into_os_string());
    if let Some(audio) = job.audio {
        args.push("-i".into());
        args.push(audio.as_os_str().to_owned());
        args.extend(os_args(["-map", "0:v:0", "-map", "1:a:0", "-c:a", "copy", "-shortest"]));
    }
    args.push("-frames:v".into());
    args.push(job.frame_count.to_string().into());
    // yuv420p needs even dimensions
    args.extend(os_args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2:color=white", "-pix_fmt", "yuv420p", "-c:v"]));
    args.push(job.codec.encoder_name().into());
    args.push("-crf".into());
    args.push(job.crf.to_string().into());
    args.extend(os_args(["-b:v", "0", "-threads"]));
    args.push(job.threads.to_string().into());
    args.push(job.output.as_os_str().to_owned());
    args
}
