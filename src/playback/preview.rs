//! Preview mode: narration (and optional music) playback driving slide and subtitle selection.

use crate::{
    foundation::error::{SlidecastError, SlidecastResult},
    playback::transport::{FramePacer, Transport},
    subtitle::index::SubtitleIndex,
};

/// Preview state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewState {
    /// Nothing playing.
    Idle,
    /// Narration playing, slides advancing.
    Playing,
}

/// What the preview shows after one poll.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewUpdate {
    /// Narration time the update was taken at.
    pub time: f64,
    /// Slide currently shown.
    pub slide_index: usize,
    /// Subtitle text, empty when no cue is active.
    pub subtitle: String,
    /// `false` once the preview has stopped.
    pub playing: bool,
}

/// Preview player.
///
/// `Idle -> Playing` on [`PreviewPlayer::start`]; back to `Idle` on [`PreviewPlayer::stop`], on
/// narration end, or when narration fails to start. Every return to `Idle` pauses and rewinds
/// both tracks, resets the slide index to zero and clears the subtitle.
pub struct PreviewPlayer {
    narration: Box<dyn Transport>,
    music: Option<Box<dyn Transport>>,
    pacer: FramePacer,
    subtitles: SubtitleIndex,
    per_slide_secs: f64,
    image_count: usize,

    state: PreviewState,
    slide_index: usize,
    next_advance_at: f64,
    subtitle: String,
}

impl std::fmt::Debug for PreviewPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPlayer")
            .field("state", &self.state)
            .field("slide_index", &self.slide_index)
            .field("subtitle", &self.subtitle)
            .finish_non_exhaustive()
    }
}

impl PreviewPlayer {
    /// Player over the given tracks, idle.
    pub fn new(
        narration: Box<dyn Transport>,
        music: Option<Box<dyn Transport>>,
        pacer: FramePacer,
    ) -> Self {
        Self {
            narration,
            music,
            pacer,
            subtitles: SubtitleIndex::default(),
            per_slide_secs: 0.0,
            image_count: 0,
            state: PreviewState::Idle,
            slide_index: 0,
            next_advance_at: 0.0,
            subtitle: String::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// `true` while playing.
    pub fn is_playing(&self) -> bool {
        self.state == PreviewState::Playing
    }

    /// Slide currently shown.
    pub fn slide_index(&self) -> usize {
        self.slide_index
    }

    /// Subtitle currently shown.
    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    /// Narration position.
    pub fn current_time(&self) -> f64 {
        self.narration.current_time()
    }

    /// Stop, then start from zero.
    ///
    /// A narration that refuses to play leaves the player idle and returns the error. Music
    /// failing to play is logged and the preview continues without it.
    pub fn start(
        &mut self,
        per_slide_secs: f64,
        image_count: usize,
        subtitles: SubtitleIndex,
    ) -> SlidecastResult<()> {
        if image_count == 0 {
            return Err(SlidecastError::not_ready("preview needs at least one image"));
        }
        if !(per_slide_secs > 0.0) {
            return Err(SlidecastError::validation(
                "per-slide duration must be positive",
            ));
        }
        self.stop();

        self.per_slide_secs = per_slide_secs;
        self.image_count = image_count;
        self.subtitles = subtitles;
        self.next_advance_at = per_slide_secs;

        self.narration.rewind();
        if let Err(e) = self.narration.play() {
            tracing::warn!(error = %e, "narration playback failed, preview stopped");
            self.stop();
            return Err(e);
        }
        if let Some(music) = self.music.as_mut() {
            music.rewind();
            if let Err(e) = music.play() {
                tracing::warn!(error = %e, "music playback failed, continuing without it");
            }
        }

        self.pacer.reset();
        self.state = PreviewState::Playing;
        tracing::debug!(per_slide_secs, image_count, "preview started");
        Ok(())
    }

    /// Swap the cue list; the next `poll` reads from it.
    pub fn set_subtitles(&mut self, subtitles: SubtitleIndex) {
        self.subtitles = subtitles;
    }

    /// Return to idle. Safe to call in any state.
    pub fn stop(&mut self) {
        self.narration.pause();
        self.narration.rewind();
        if let Some(music) = self.music.as_mut() {
            music.pause();
            music.rewind();
        }
        if self.state == PreviewState::Playing {
            tracing::debug!("preview stopped");
        }
        self.state = PreviewState::Idle;
        self.slide_index = 0;
        self.next_advance_at = self.per_slide_secs;
        self.subtitle.clear();
    }

    /// Sample narration time and update slide and subtitle.
    pub fn poll(&mut self) -> PreviewUpdate {
        if self.state == PreviewState::Idle {
            return self.update(0.0);
        }

        if self.narration.has_ended() {
            tracing::debug!("narration ended");
            self.stop();
            return self.update(0.0);
        }

        let t = self.narration.current_time();
        // Slide timer: one advance per elapsed period.
        while t >= self.next_advance_at {
            self.slide_index = (self.slide_index + 1) % self.image_count;
            self.next_advance_at += self.per_slide_secs;
        }
        self.subtitle = self.subtitles.active_cue_at(t).to_string();
        self.update(t)
    }

    /// Wait for the next host frame.
    pub fn advance(&mut self) {
        let mut tracks: Vec<&mut dyn Transport> = Vec::with_capacity(2);
        tracks.push(self.narration.as_mut());
        if let Some(music) = self.music.as_mut() {
            tracks.push(music.as_mut());
        }
        self.pacer.next_frame(&mut tracks);
    }

    fn update(&self, time: f64) -> PreviewUpdate {
        PreviewUpdate {
            time,
            slide_index: self.slide_index,
            subtitle: self.subtitle.clone(),
            playing: self.is_playing(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/preview.rs"]
mod tests;
