use std::str::FromStr;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Pan/zoom motion applied to each slide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Effect {
    /// Scale from 1.0 to 1.1 across the slide.
    #[default]
    ZoomIn,
    /// Scale from 1.1 down to 1.0 across the slide.
    ZoomOut,
    /// Constant 1.15 scale with a slow diagonal drift.
    Pan,
    /// Static cover-fit placement.
    None,
}

impl Effect {
    /// Stable kebab-case name, as used in project files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::ZoomIn => "zoom-in",
            Effect::ZoomOut => "zoom-out",
            Effect::Pan => "pan",
            Effect::None => "none",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = SlidecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zoom-in" => Ok(Effect::ZoomIn),
            "zoom-out" => Ok(Effect::ZoomOut),
            "pan" => Ok(Effect::Pan),
            "none" => Ok(Effect::None),
            other => Err(SlidecastError::validation(format!(
                "unknown effect '{other}' (expected zoom-in, zoom-out, pan or none)"
            ))),
        }
    }
}

/// User-facing slideshow settings.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SlideshowConfig {
    /// Seconds each slide stays on screen.
    pub per_slide_duration_secs: u32,
    /// Motion applied to every slide.
    pub effect: Effect,
    /// Background music gain in `[0, 1]`.
    pub music_volume: f32,
}

impl SlideshowConfig {
    /// Smallest accepted per-slide duration.
    pub const MIN_SLIDE_SECS: u32 = 1;
    /// Largest accepted per-slide duration.
    pub const MAX_SLIDE_SECS: u32 = 30;

    /// Check ranges of every field.
    pub fn validate(&self) -> SlidecastResult<()> {
        if !(Self::MIN_SLIDE_SECS..=Self::MAX_SLIDE_SECS).contains(&self.per_slide_duration_secs) {
            return Err(SlidecastError::validation(format!(
                "per-slide duration must be within {}..={} seconds, got {}",
                Self::MIN_SLIDE_SECS,
                Self::MAX_SLIDE_SECS,
                self.per_slide_duration_secs
            )));
        }
        if !self.music_volume.is_finite() || !(0.0..=1.0).contains(&self.music_volume) {
            return Err(SlidecastError::validation(format!(
                "music volume must be within [0, 1], got {}",
                self.music_volume
            )));
        }
        Ok(())
    }

    /// Per-slide duration as seconds.
    pub fn slide_secs(&self) -> f64 {
        f64::from(self.per_slide_duration_secs)
    }
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            per_slide_duration_secs: 7,
            effect: Effect::ZoomIn,
            music_volume: 0.5,
        }
    }
}

/// Derived timeline rules. Total duration is always the narration duration.
pub struct Timeline;

impl Timeline {
    /// Slide shown at `t`: `floor(t / per_slide) mod image_count`.
    ///
    /// Returns `None` when there are no images.
    pub fn slide_index_at(t: f64, per_slide_secs: f64, image_count: usize) -> Option<usize> {
        if image_count == 0 || !(per_slide_secs > 0.0) {
            return None;
        }
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let period = (t / per_slide_secs).floor() as u64;
        Some((period % image_count as u64) as usize)
    }

    /// Fractional position through the current slide, in `[0, 1)`.
    pub fn local_progress(t: f64, per_slide_secs: f64) -> f64 {
        if !(per_slide_secs > 0.0) {
            return 0.0;
        }
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        ((t % per_slide_secs) / per_slide_secs).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
