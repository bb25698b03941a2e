use std::{path::Path, sync::Arc};

use crate::{
    assets::media::{AudioPcm, MIX_SAMPLE_RATE},
    foundation::error::{SlidecastError, SlidecastResult},
};

const OUT_CHANNELS: u16 = 2;

/// Two-source mixing graph: narration at unit gain plus an optional looping music bed.
///
/// The output always spans exactly the narration length; the music gain is fixed when the graph
/// is built.
#[derive(Clone, Debug)]
pub struct MixGraph {
    narration: Arc<AudioPcm>,
    music: Option<Arc<AudioPcm>>,
    music_gain: f32,
    sample_rate: u32,
}

impl MixGraph {
    /// Build a graph mixing at [`MIX_SAMPLE_RATE`].
    pub fn new(narration: Arc<AudioPcm>, music: Option<Arc<AudioPcm>>, music_gain: f32) -> Self {
        Self {
            narration,
            music,
            music_gain: if music_gain.is_finite() {
                music_gain.clamp(0.0, 1.0)
            } else {
                0.0
            },
            sample_rate: MIX_SAMPLE_RATE,
        }
    }

    /// Override the output sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output channel count.
    pub fn channels(&self) -> u16 {
        OUT_CHANNELS
    }

    /// Gain applied to the music bed.
    pub fn music_gain(&self) -> f32 {
        self.music_gain
    }

    /// Output length in sample frames.
    pub fn total_frames(&self) -> usize {
        (self.narration.duration_secs() * f64::from(self.sample_rate)).round() as usize
    }

    /// Render the mix as interleaved stereo `f32`, clamped to `[-1, 1]`.
    #[tracing::instrument(level = "debug", skip(self), fields(frames = self.total_frames()))]
    pub fn render(&self) -> Vec<f32> {
        let frames = self.total_frames();
        let mut out = vec![0.0f32; frames * usize::from(OUT_CHANNELS)];

        mix_source(&mut out, self.sample_rate, &self.narration, 1.0, false);
        if let Some(music) = &self.music
            && self.music_gain > 0.0
        {
            mix_source(&mut out, self.sample_rate, music, self.music_gain, true);
        }

        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        out
    }
}

fn mix_source(out: &mut [f32], out_rate: u32, src: &AudioPcm, gain: f32, looping: bool) {
    let src_frames = src.frames();
    if src_frames == 0 || src.sample_rate == 0 {
        return;
    }
    let channels = usize::from(src.channels);
    let data = src.interleaved_f32.as_slice();
    let step = f64::from(src.sample_rate) / f64::from(out_rate);

    for (dst_frame, dst) in out.chunks_exact_mut(usize::from(OUT_CHANNELS)).enumerate() {
        let mut src_pos = dst_frame as f64 * step;
        if looping {
            src_pos %= src_frames as f64;
        }
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = if looping {
            (src_frame0 + 1) % src_frames
        } else {
            (src_frame0 + 1).min(src_frames - 1)
        };
        let frac = (src_pos - src_frame0 as f64) as f32;

        let (l, r) = if channels == 1 {
            let v0 = data[src_frame0];
            let v1 = data[src_frame1];
            let v = v0 + ((v1 - v0) * frac);
            (v, v)
        } else {
            let i0 = src_frame0 * channels;
            let i1 = src_frame1 * channels;
            let l0 = data[i0];
            let l1 = data[i1];
            let r0 = data[i0 + 1];
            let r1 = data[i1 + 1];
            (l0 + ((l1 - l0) * frac), r0 + ((r1 - r0) * frac))
        };

        dst[0] += l * gain;
        dst[1] += r * gain;
    }
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            SlidecastError::capture(format!(
                "failed to create audio mix output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        SlidecastError::capture(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
