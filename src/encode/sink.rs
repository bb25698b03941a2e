use std::path::PathBuf;

use crate::{
    foundation::{
        core::{Fps, FrameIndex},
        error::{SlidecastError, SlidecastResult},
    },
    render::FrameRGBA,
};

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional external raw PCM audio file input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that mux audio.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Finished encoder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Container written to a temporary file, awaiting delivery.
    File(PathBuf),
    /// Container held in memory.
    Bytes(Vec<u8>),
}

impl Artifact {
    /// Size in bytes, reading file metadata when needed.
    pub fn len(&self) -> SlidecastResult<u64> {
        match self {
            Artifact::File(path) => std::fs::metadata(path)
                .map(|m| m.len())
                .map_err(|e| {
                    SlidecastError::encode(format!(
                        "cannot stat artifact '{}': {e}",
                        path.display()
                    ))
                }),
            Artifact::Bytes(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// `true` for an in-memory artifact without bytes.
    pub fn is_empty(&self) -> bool {
        matches!(self, Artifact::Bytes(b) if b.is_empty())
    }
}

/// Consumer of rendered frames.
///
/// `begin` is called once, then `push_frame` in strictly increasing [`FrameIndex`] order, then
/// `end` exactly once to flush and hand back the container.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()>;
    /// Flush buffered output and return the finished container.
    fn end(&mut self) -> SlidecastResult<Artifact>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        (**self).begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        (**self).push_frame(idx, frame)
    }

    fn end(&mut self) -> SlidecastResult<Artifact> {
        (**self).end()
    }
}

/// In-memory sink: one chunk per frame, concatenated on `end`.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    chunks: Vec<Vec<u8>>,
    indices: Vec<FrameIndex>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Frame indices received so far.
    pub fn indices(&self) -> &[FrameIndex] {
        &self.indices
    }

    /// Number of buffered chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SlidecastError::validation(
                "sink width/height must be non-zero",
            ));
        }
        self.cfg = Some(cfg);
        self.chunks.clear();
        self.indices.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        if self.cfg.is_none() || self.ended {
            return Err(SlidecastError::encode("in-memory sink is not recording"));
        }
        if let Some(last) = self.indices.last()
            && idx <= *last
        {
            return Err(SlidecastError::encode(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.indices.push(idx);
        self.chunks.push(frame.data.clone());
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<Artifact> {
        if self.cfg.is_none() {
            return Err(SlidecastError::encode("in-memory sink not started"));
        }
        self.ended = true;
        Ok(Artifact::Bytes(self.chunks.concat()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
