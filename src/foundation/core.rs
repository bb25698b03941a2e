use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Zero-based index of a rendered output frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Rational frames-per-second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator.
    pub num: u32,
    /// Denominator (must be > 0).
    pub den: u32,
}

impl Fps {
    /// Construct a validated frame rate.
    pub fn new(num: u32, den: u32) -> SlidecastResult<Self> {
        if den == 0 {
            return Err(SlidecastError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(SlidecastError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Length of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Time of frame `frames` in seconds.
    ///
    /// Computed as a single division so that integer rates land exactly on whole seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64 * f64::from(self.den)) / f64::from(self.num)
    }

    /// Index of the frame on screen at `secs`.
    pub fn frame_at(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        ((secs * f64::from(self.num)) / f64::from(self.den) + 1e-9).floor() as u64
    }

    /// Number of frames needed to cover `secs` of output.
    pub fn frames_covering(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        ((secs * f64::from(self.num)) / f64::from(self.den) - 1e-9).ceil() as u64
    }
}

/// Fixed-size output surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// 1280x720, the export resolution.
    pub const HD: Canvas = Canvas {
        width: 1280,
        height: 720,
    };

    /// Width divided by height.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Dimensions as `u16`, the limit of the CPU rasterizer.
    pub fn as_u16(self) -> SlidecastResult<(u16, u16)> {
        let w: u16 = self
            .width
            .try_into()
            .map_err(|_| SlidecastError::validation("canvas width exceeds u16"))?;
        let h: u16 = self
            .height
            .try_into()
            .map_err(|_| SlidecastError::validation("canvas height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(SlidecastError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        Ok((w, h))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
