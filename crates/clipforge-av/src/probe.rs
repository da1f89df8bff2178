//! Media probing via ffprobe.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and maps the JSON document into [`MediaInfo`]. The probe is
//! the companion metadata contract: duration feeds progress computation, and
//! the stream summaries back the info endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use clipforge_core::{Error, Result};

use crate::command::Command;
use crate::exec;

/// Probe commands are short-lived; a stuck ffprobe is killed.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Summary of a probed media file.
#[derive(Debug, Clone, Serialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub format_name: String,
    /// Total duration in seconds, when the container reports one.
    pub duration_secs: Option<f64>,
    pub size_bytes: u64,
    pub video: Vec<VideoStream>,
    pub audio: Vec<AudioStream>,
}

/// One video stream.
#[derive(Debug, Clone, Serialize)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
}

/// One audio stream.
#[derive(Debug, Clone, Serialize)]
pub struct AudioStream {
    pub codec: String,
    pub channels: u32,
    pub sample_rate: Option<u32>,
}

/// Probe a media file.
pub async fn probe_file(ffprobe: &Path, path: &Path) -> Result<MediaInfo> {
    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ]);
    cmd.arg(path.to_string_lossy());

    let output = exec::execute(&cmd, PROBE_TIMEOUT).await?;
    let ff: FfprobeOutput = serde_json::from_str(&output.stdout)
        .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    Ok(parse_ffprobe_output(path, ff))
}

/// Total duration of a media file in seconds, best effort. Failures leave
/// progress unreported rather than failing the caller.
pub async fn media_duration(ffprobe: &Path, path: &Path) -> Option<f64> {
    match probe_file(ffprobe, path).await {
        Ok(info) => info.duration_secs,
        Err(e) => {
            tracing::debug!("duration probe failed for {}: {e}", path.display());
            None
        }
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> MediaInfo {
    let duration_secs = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| *d > 0.0);

    let size_bytes = output
        .format
        .size
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let mut video = Vec::new();
    let mut audio = Vec::new();

    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") => video.push(VideoStream {
                codec: stream.codec_name.unwrap_or_default(),
                width: stream.width.unwrap_or(0),
                height: stream.height.unwrap_or(0),
                frame_rate: stream.r_frame_rate.as_deref().and_then(parse_frame_rate),
            }),
            Some("audio") => audio.push(AudioStream {
                codec: stream.codec_name.unwrap_or_default(),
                channels: stream.channels.unwrap_or(2),
                sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
            }),
            _ => {}
        }
    }

    MediaInfo {
        path: path.to_path_buf(),
        format_name: output.format.format_name.unwrap_or_default(),
        duration_secs,
        size_bytes,
        video,
        audio,
    }
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}
