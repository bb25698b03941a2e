use std::{
    io::Read,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    assets::media::is_ffmpeg_on_path,
    encode::sink::{Artifact, FrameSink, SinkConfig},
    foundation::{
        core::{Fps, FrameIndex},
        error::{SlidecastError, SlidecastResult},
        math::{mul_div255_u16, premul_rgba8},
    },
    render::FrameRGBA,
};

/// Default file name of a delivered export.
pub const DEFAULT_OUTPUT_NAME: &str = "slideshow.mp4";

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Final MP4 path; the encoder writes next to it until delivery.
    pub out_path: PathBuf,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Options for an MP4 delivered to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            bg_rgba: [0, 0, 0, 255],
        }
    }

    /// In-progress file written by the encoder.
    pub fn partial_path(&self) -> PathBuf {
        partial_path_for(&self.out_path)
    }
}

/// `<dir>/<stem>.partial.mp4` for a final output path.
pub fn partial_path_for(out_path: &Path) -> PathBuf {
    out_path.with_extension("partial.mp4")
}

/// Sink that spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
///
/// Output is H.264 + AAC in MP4. Audio comes from `SinkConfig.audio` when present.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames_written: u64,
}

impl std::fmt::Debug for FfmpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSink")
            .field("opts", &self.opts)
            .field("running", &self.child.is_some())
            .field("frames_written", &self.frames_written)
            .finish_non_exhaustive()
    }
}

impl FfmpegSink {
    /// Create a sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames_written: 0,
        }
    }

    fn write_scratch(&mut self) -> SlidecastResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SlidecastError::encode("ffmpeg sink is already finalized"));
        };
        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            SlidecastError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        let partial = self.opts.partial_path();
        if partial.exists() {
            let _ = std::fs::remove_file(&partial);
        }
    }
}

impl FrameSink for FfmpegSink {
    #[tracing::instrument(level = "debug", skip_all, fields(out = %self.opts.out_path.display()))]
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(SlidecastError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SlidecastError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.child.is_some() {
            return Err(SlidecastError::encode("ffmpeg sink already started"));
        }

        let partial = self.opts.partial_path();
        ensure_parent_dir(&partial)?;

        if !is_ffmpeg_on_path() {
            return Err(SlidecastError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input: raw RGBA8 frames, alpha flattened in push_frame.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 {
                return Err(SlidecastError::validation(
                    "audio sample_rate must be non-zero when audio is enabled",
                ));
            }
            if audio.channels == 0 {
                return Err(SlidecastError::validation(
                    "audio channels must be non-zero when audio is enabled",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path)
            .args([
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-shortest",
                "-movflags",
                "+faststart",
            ]);
        } else {
            cmd.args([
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]);
        }
        cmd.args(["-f", "mp4"]).arg(&partial);

        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecastError::encode("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlidecastError::encode("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames_written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SlidecastError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(SlidecastError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SlidecastError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(SlidecastError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }
        self.last_idx = Some(idx);

        if frame.premultiplied {
            flatten_premul_over_bg_to_opaque_rgba8(
                &mut self.scratch,
                &frame.data,
                self.opts.bg_rgba,
            )?;
        } else {
            let straight_bg = self.opts.bg_rgba;
            let premul: Vec<u8> = frame
                .data
                .chunks_exact(4)
                .flat_map(|px| premul_rgba8([px[0], px[1], px[2], px[3]]))
                .collect();
            flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &premul, straight_bg)?;
        }
        self.write_scratch()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(frames = self.frames_written))]
    fn end(&mut self) -> SlidecastResult<Artifact> {
        if self.child.is_none() {
            return Err(SlidecastError::encode("ffmpeg sink not started"));
        }

        // An mp4 with no video samples is not playable; emit one background frame instead.
        if self.frames_written == 0 {
            let [r, g, b, _] = self.opts.bg_rgba;
            for px in self.scratch.chunks_exact_mut(4) {
                px.copy_from_slice(&[r, g, b, 255]);
            }
            if let Err(e) = self.write_scratch() {
                tracing::warn!(error = %e, "could not write placeholder frame");
            }
        }

        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| SlidecastError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            SlidecastError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SlidecastError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| SlidecastError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        self.cfg = None;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            let _ = std::fs::remove_file(self.opts.partial_path());
            return Err(SlidecastError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        Ok(Artifact::File(self.opts.partial_path()))
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            tracing::debug!("ffmpeg sink dropped while running, discarding partial output");
            self.abort();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> SlidecastResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let [bg_r, bg_g, bg_b, _] = bg_rgba.map(u16::from);
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Move a finished artifact to `out_path`.
///
/// File artifacts are renamed (copied then removed when a rename is not possible); in-memory
/// artifacts are written out. The temporary file is gone once this returns `Ok`.
#[tracing::instrument(level = "debug", skip(artifact), fields(out = %out_path.display()))]
pub fn deliver_artifact(artifact: Artifact, out_path: &Path) -> SlidecastResult<PathBuf> {
    ensure_parent_dir(out_path)?;
    match artifact {
        Artifact::File(tmp) => {
            if tmp == out_path {
                return Ok(out_path.to_path_buf());
            }
            if std::fs::rename(&tmp, out_path).is_err() {
                std::fs::copy(&tmp, out_path).map_err(|e| {
                    SlidecastError::encode(format!(
                        "failed to deliver '{}' to '{}': {e}",
                        tmp.display(),
                        out_path.display()
                    ))
                })?;
                std::fs::remove_file(&tmp).map_err(|e| {
                    SlidecastError::encode(format!(
                        "failed to remove temporary '{}': {e}",
                        tmp.display()
                    ))
                })?;
            }
        }
        Artifact::Bytes(bytes) => {
            std::fs::write(out_path, bytes).map_err(|e| {
                SlidecastError::encode(format!(
                    "failed to write '{}': {e}",
                    out_path.display()
                ))
            })?;
        }
    }
    Ok(out_path.to_path_buf())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
