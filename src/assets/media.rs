use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::Arc,
};

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Audio mixing sample rate used across decode/mix/encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Stereo silence of the given length, handy for narration-less tests.
    pub fn silence(sample_rate: u32, secs: f64) -> Self {
        let frames = (secs.max(0.0) * f64::from(sample_rate)).round() as usize;
        Self {
            sample_rate,
            channels: 2,
            interleaved_f32: vec![0.0; frames * 2],
        }
    }
}

/// Where an audio track comes from.
#[derive(Clone, Debug)]
pub enum AudioSource {
    /// Audio file decoded through `ffmpeg`.
    File(PathBuf),
    /// Already decoded PCM.
    Pcm(Arc<AudioPcm>),
}

impl AudioSource {
    /// Name used in logs and errors.
    pub fn label(&self) -> String {
        match self {
            AudioSource::File(p) => p.display().to_string(),
            AudioSource::Pcm(pcm) => format!(
                "<pcm {} Hz x{} {:.3}s>",
                pcm.sample_rate,
                pcm.channels,
                pcm.duration_secs()
            ),
        }
    }

    /// Decode to PCM at [`MIX_SAMPLE_RATE`] (files) or hand back the in-memory buffer.
    pub fn decode(&self) -> SlidecastResult<Arc<AudioPcm>> {
        match self {
            AudioSource::File(path) => {
                decode_audio_f32_stereo(path, MIX_SAMPLE_RATE).map(Arc::new)
            }
            AudioSource::Pcm(pcm) => Ok(pcm.clone()),
        }
    }

    /// Duration in seconds without decoding the whole file.
    pub fn probe_duration(&self) -> SlidecastResult<f64> {
        match self {
            AudioSource::File(path) => probe_audio_duration(path),
            AudioSource::Pcm(pcm) => Ok(pcm.duration_secs()),
        }
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        AudioSource::File(path)
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read the container duration of an audio file through `ffprobe`.
pub fn probe_audio_duration(path: &Path) -> SlidecastResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: ProbeFormat,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| SlidecastError::playback(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(SlidecastError::playback(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| SlidecastError::serde(format!("ffprobe json parse failed: {e}")))?;
    let duration = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            SlidecastError::playback(format!(
                "ffprobe reported no duration for '{}'",
                path.display()
            ))
        })?;
    Ok(duration)
}

/// Decode audio from a media file to stereo interleaved `f32` PCM.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> SlidecastResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            SlidecastError::playback(format!("failed to run ffmpeg for audio decode: {e}"))
        })?;

    if !out.status.success() {
        return Err(SlidecastError::playback(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(SlidecastError::playback(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}
