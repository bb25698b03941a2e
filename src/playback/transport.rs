use std::time::{Duration, Instant};

use crate::foundation::{core::Fps, error::SlidecastResult};

/// Playback clock of one audio track.
///
/// The narration transport's `current_time` is the only time source for slide and subtitle
/// selection in both preview and export.
pub trait Transport: Send {
    /// Start or resume playback.
    fn play(&mut self) -> SlidecastResult<()>;
    /// Pause; a paused transport keeps its position. Safe to call repeatedly.
    fn pause(&mut self);
    /// Seek back to zero without changing play/pause state.
    fn rewind(&mut self);
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    /// Track length in seconds.
    fn duration(&self) -> f64;
    /// `true` once a non-looping track has reached its end.
    fn has_ended(&self) -> bool;
    /// `true` while playing.
    fn is_playing(&self) -> bool;
    /// Host frame callback. Clocks that follow wall time ignore it.
    fn on_host_frame(&mut self) {}
}

fn sanitize_duration(secs: f64) -> f64 {
    if secs.is_finite() { secs.max(0.0) } else { 0.0 }
}

fn position_in_track(elapsed: f64, duration: f64, looping: bool) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    if looping {
        elapsed % duration
    } else {
        elapsed.min(duration)
    }
}

/// Transport following the monotonic wall clock.
#[derive(Debug, Clone)]
pub struct WallTransport {
    duration: f64,
    looping: bool,
    started_at: Option<Instant>,
    offset: f64,
}

impl WallTransport {
    /// Paused transport at zero.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration: sanitize_duration(duration_secs),
            looping: false,
            started_at: None,
            offset: 0.0,
        }
    }

    /// Loop at the end instead of stopping.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn elapsed(&self) -> f64 {
        self.offset
            + self
                .started_at
                .map(|s| s.elapsed().as_secs_f64())
                .unwrap_or(0.0)
    }
}

impl Transport for WallTransport {
    fn play(&mut self) -> SlidecastResult<()> {
        if self.started_at.is_none() {
            if !self.looping && self.elapsed() >= self.duration {
                self.offset = 0.0;
            }
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.started_at.is_some() {
            self.offset = self.elapsed();
            self.started_at = None;
        }
    }

    fn rewind(&mut self) {
        self.offset = 0.0;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn current_time(&self) -> f64 {
        position_in_track(self.elapsed(), self.duration, self.looping)
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn has_ended(&self) -> bool {
        !self.looping && self.elapsed() >= self.duration
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some() && !self.has_ended()
    }
}

/// Transport advancing exactly one frame period per host frame while playing.
///
/// Time is `ticks / fps`, so an export at an integer rate visits exact frame instants with no
/// drift from the audio timeline.
#[derive(Debug, Clone)]
pub struct SteppedTransport {
    duration: f64,
    fps: Fps,
    looping: bool,
    ticks: u64,
    playing: bool,
}

impl SteppedTransport {
    /// Paused transport at zero.
    pub fn new(duration_secs: f64, fps: Fps) -> Self {
        Self {
            duration: sanitize_duration(duration_secs),
            fps,
            looping: false,
            ticks: 0,
            playing: false,
        }
    }

    /// Loop at the end instead of stopping.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Host frames elapsed since the last rewind.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn elapsed(&self) -> f64 {
        self.fps.frames_to_secs(self.ticks)
    }
}

impl Transport for SteppedTransport {
    fn play(&mut self) -> SlidecastResult<()> {
        if !self.looping && self.elapsed() >= self.duration {
            self.ticks = 0;
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn rewind(&mut self) {
        self.ticks = 0;
    }

    fn current_time(&self) -> f64 {
        position_in_track(self.elapsed(), self.duration, self.looping)
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn has_ended(&self) -> bool {
        !self.looping && self.elapsed() >= self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn on_host_frame(&mut self) {
        if !self.playing {
            return;
        }
        self.ticks += 1;
        if self.has_ended() {
            self.playing = false;
        }
    }
}

/// How the host frame callback is paced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pacing {
    /// As fast as possible; clocks advance one frame per callback.
    #[default]
    Offline,
    /// One callback per frame period of wall time.
    Realtime,
}

/// Stand-in for the host's per-frame callback.
#[derive(Debug, Clone)]
pub struct FramePacer {
    pacing: Pacing,
    period: Duration,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    /// Pacer for frames at `fps`.
    pub fn new(pacing: Pacing, fps: Fps) -> Self {
        Self {
            pacing,
            period: Duration::from_secs_f64(fps.frame_duration_secs()),
            next_deadline: None,
        }
    }

    /// Pacing mode.
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Wait for the next host frame and notify every transport.
    pub fn next_frame(&mut self, transports: &mut [&mut dyn Transport]) {
        if self.pacing == Pacing::Realtime {
            let now = Instant::now();
            let deadline = self.next_deadline.unwrap_or(now) + self.period;
            if deadline > now {
                std::thread::sleep(deadline - now);
                self.next_deadline = Some(deadline);
            } else {
                self.next_deadline = Some(now);
            }
        }
        for t in transports.iter_mut() {
            t.on_host_frame();
        }
    }

    /// Forget the last deadline, e.g. after a pause.
    pub fn reset(&mut self) {
        self.next_deadline = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/transport.rs"]
mod tests;
