//! Export mode: renders frames in lock-step with the narration clock and feeds them, together
//! with the mixed audio, to a [`FrameSink`].
//!
//! ```text
//! Idle -> Preparing -> Recording -> Finalizing -> Idle
//!            |             |
//!            +--> Failed <-+--> Idle
//! ```

use std::{path::PathBuf, sync::Arc};

use rayon::prelude::*;

use crate::{
    assets::{
        decode::ImageSource,
        media::{AudioPcm, AudioSource},
    },
    audio::mix::{MixGraph, write_mix_to_f32le_file},
    encode::{
        ffmpeg::deliver_artifact,
        sink::{Artifact, AudioInputConfig, FrameSink, SinkConfig},
    },
    foundation::{
        core::{Canvas, Fps, FrameIndex},
        error::{SlidecastError, SlidecastResult},
    },
    playback::transport::{FramePacer, Pacing, SteppedTransport, Transport, WallTransport},
    render::{
        FrameRGBA,
        frame::{Drawable, FrameRenderer, Surface},
        text::{SubtitleFont, SubtitleStyle},
    },
    subtitle::index::SubtitleIndex,
    timeline::SlideshowConfig,
};

/// Capture pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// No export in flight.
    Idle,
    /// Building the mix, decoding images, preparing the renderer.
    Preparing,
    /// Render loop running.
    Recording,
    /// Render loop done; waiting for the encoder to flush.
    Finalizing,
    /// Preparation failed; passes straight back to `Idle`.
    Failed,
}

/// Fixed export parameters, independent of input image sizes.
#[derive(Clone, Debug)]
pub struct CaptureSettings {
    /// Output surface size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Render loop pacing.
    pub pacing: Pacing,
    /// Background behind slides, straight RGBA8.
    pub background: [u8; 4],
    /// Subtitle look.
    pub subtitle_style: SubtitleStyle,
    /// Subtitle font file; otherwise `$SLIDECAST_FONT` or a system font.
    pub font_path: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            canvas: Canvas::HD,
            fps: Fps { num: 30, den: 1 },
            pacing: Pacing::Offline,
            background: [0, 0, 0, 255],
            subtitle_style: SubtitleStyle::default(),
            font_path: None,
        }
    }
}

/// Everything one export reads. Captured by value so later edits cannot reach a running export.
#[derive(Clone, Debug)]
pub struct CaptureInputs {
    /// Slide images in display order.
    pub images: Vec<ImageSource>,
    /// Narration track; its length is the video length.
    pub narration: AudioSource,
    /// Optional background music, looped under the narration.
    pub music: Option<AudioSource>,
    /// Subtitle cues.
    pub subtitles: SubtitleIndex,
    /// Slide duration, effect and music volume.
    pub config: SlideshowConfig,
}

/// Result of one render loop callback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// A frame was rendered at `time` and handed to the encoder.
    Rendered {
        /// Index of the frame.
        frame: FrameIndex,
        /// Narration time of the frame.
        time: f64,
    },
    /// Narration finished or the encoder stopped; call [`CapturePipeline::finalize`].
    ReadyToFinalize,
    /// The pipeline is not recording.
    Inactive,
}

/// Summary of a finished export.
#[derive(Debug)]
pub struct ExportReport {
    /// Delivered file, when an output path was given.
    pub output: Option<PathBuf>,
    /// Undelivered container, when no output path was given.
    pub artifact: Option<Artifact>,
    /// Frames handed to the encoder.
    pub frames: u64,
    /// Narration length in seconds.
    pub duration_secs: f64,
    /// `true` when the encoder stopped before the narration ended.
    pub encoder_failed: bool,
}

/// Receives pipeline notifications.
pub trait PipelineObserver: Send {
    /// State transition.
    fn on_state_change(&mut self, _from: CaptureState, _to: CaptureState) {}
    /// Progress in percent, `0..=100`.
    fn on_progress(&mut self, _percent: u8) {}
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Resources owned by one export attempt.
struct CaptureSession {
    total_duration: f64,
    narration: Box<dyn Transport>,
    music: Option<Box<dyn Transport>>,
    pacer: FramePacer,
    surface: Surface,
    renderer: FrameRenderer,
    slides: Vec<Option<Drawable>>,
    sink: Box<dyn FrameSink>,
    sink_config: SinkConfig,
    output: Option<PathBuf>,
    encoder_active: bool,
    encoder_failed: bool,
    frames_pushed: u64,
    fps: Fps,
    pacing: Pacing,
    last_frame: Option<FrameRGBA>,
    _mix_file: TempFileGuard,
}

impl CaptureSession {
    fn pause_tracks(&mut self) {
        self.narration.pause();
        if let Some(music) = self.music.as_mut() {
            music.pause();
        }
    }

    /// Repeats `frame` until `target` frames have been pushed.
    fn fill_to(&mut self, target: u64, frame: &FrameRGBA) -> SlidecastResult<()> {
        while self.frames_pushed < target {
            self.sink.push_frame(FrameIndex(self.frames_pushed), frame)?;
            self.frames_pushed += 1;
        }
        Ok(())
    }

    fn mark_encoder_failed(&mut self, error: &SlidecastError) {
        tracing::warn!(
            error = %error,
            frame = self.frames_pushed,
            "encoder stopped accepting frames"
        );
        self.encoder_active = false;
        self.encoder_failed = true;
    }

    /// Realtime only: repeat the last frame until the video covers the narration.
    fn pad_to_duration(&mut self) {
        if self.pacing != Pacing::Realtime || !self.encoder_active {
            return;
        }
        let Some(frame) = self.last_frame.take() else {
            return;
        };
        let target = self.fps.frames_covering(self.total_duration);
        if let Err(e) = self.fill_to(target, &frame) {
            self.mark_encoder_failed(&e);
        }
        self.last_frame = Some(frame);
    }

    fn record_frame(&mut self, elapsed: f64) -> SlidecastResult<FrameIndex> {
        let frame = self
            .renderer
            .render_frame(&mut self.surface, elapsed, &self.slides)?;
        if self.pacing == Pacing::Realtime {
            let target = self.fps.frame_at(elapsed);
            match self.last_frame.take() {
                Some(held) => {
                    let filled = self.fill_to(target, &held);
                    self.last_frame = Some(held);
                    filled?;
                }
                None => self.fill_to(target, &frame)?,
            }
        }
        let idx = FrameIndex(self.frames_pushed);
        self.sink.push_frame(idx, &frame)?;
        self.frames_pushed += 1;
        self.last_frame = Some(frame);
        Ok(idx)
    }
}

/// Export state machine.
pub struct CapturePipeline {
    settings: CaptureSettings,
    state: CaptureState,
    progress: u8,
    session: Option<CaptureSession>,
    observer: Option<Box<dyn PipelineObserver>>,
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl Default for CapturePipeline {
    fn default() -> Self {
        Self::new(CaptureSettings::default())
    }
}

impl CapturePipeline {
    /// Idle pipeline.
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            state: CaptureState::Idle,
            progress: 0,
            session: None,
            observer: None,
        }
    }

    /// Attach an observer.
    pub fn with_observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Export settings.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Progress in percent.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// `true` from `Preparing` until the pipeline is back to `Idle`.
    pub fn is_active(&self) -> bool {
        self.state != CaptureState::Idle
    }

    fn set_state(&mut self, to: CaptureState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        tracing::debug!(?from, ?to, "capture state");
        if let Some(obs) = self.observer.as_mut() {
            obs.on_state_change(from, to);
        }
    }

    fn set_progress(&mut self, percent: u8) {
        if self.progress == percent {
            return;
        }
        self.progress = percent;
        if let Some(obs) = self.observer.as_mut() {
            obs.on_progress(percent);
        }
    }

    /// `Idle -> Preparing`: freeze `inputs`, mix audio, decode every image and set up the
    /// renderer. Any failure passes through `Failed` back to `Idle` with nothing left behind.
    #[tracing::instrument(level = "info", skip_all, fields(images = inputs.images.len()))]
    pub fn prepare(
        &mut self,
        inputs: CaptureInputs,
        sink: Box<dyn FrameSink>,
        output: Option<PathBuf>,
    ) -> SlidecastResult<()> {
        if self.state != CaptureState::Idle {
            return Err(SlidecastError::busy(format!(
                "an export is already in progress ({:?})",
                self.state
            )));
        }
        if inputs.images.is_empty() {
            return Err(SlidecastError::not_ready(
                "export needs narration and at least one image",
            ));
        }
        inputs.config.validate()?;

        self.set_progress(0);
        self.set_state(CaptureState::Preparing);
        match build_session(&self.settings, inputs, sink, output) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "export preparation failed");
                self.fail();
                Err(e)
            }
        }
    }

    fn fail(&mut self) {
        self.session = None;
        self.set_state(CaptureState::Failed);
        self.set_state(CaptureState::Idle);
        self.set_progress(0);
    }

    /// `Preparing -> Recording`: start the encoder, then play narration (and music) from zero.
    pub fn start_recording(&mut self) -> SlidecastResult<()> {
        if self.state != CaptureState::Preparing {
            return Err(SlidecastError::capture(format!(
                "cannot start recording from {:?}",
                self.state
            )));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(SlidecastError::capture("no capture session"));
        };

        let started = session
            .sink
            .begin(session.sink_config.clone())
            .and_then(|()| {
                session.narration.rewind();
                session.narration.play()
            });
        if let Err(e) = started {
            tracing::error!(error = %e, "export could not start");
            self.fail();
            return Err(e);
        }
        if let Some(music) = session.music.as_mut() {
            music.rewind();
            if let Err(e) = music.play() {
                tracing::warn!(error = %e, "music playback failed, exporting without it");
            }
        }
        session.pacer.reset();

        tracing::info!(
            duration_secs = session.total_duration,
            width = session.sink_config.width,
            height = session.sink_config.height,
            "recording started"
        );
        self.set_state(CaptureState::Recording);
        Ok(())
    }

    /// One render loop callback.
    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            CaptureState::Recording => {}
            CaptureState::Finalizing => return TickOutcome::ReadyToFinalize,
            _ => return TickOutcome::Inactive,
        }
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Inactive;
        };

        let elapsed = session.narration.current_time();
        if elapsed >= session.total_duration || !session.encoder_active {
            session.pad_to_duration();
            self.enter_finalizing();
            return TickOutcome::ReadyToFinalize;
        }

        let percent = ((elapsed / session.total_duration) * 100.0)
            .round()
            .clamp(0.0, 100.0) as u8;

        let idx = match session.record_frame(elapsed) {
            Ok(idx) => idx,
            Err(e) => {
                session.mark_encoder_failed(&e);
                FrameIndex(session.frames_pushed)
            }
        };

        let mut tracks: Vec<&mut dyn Transport> = Vec::with_capacity(2);
        tracks.push(session.narration.as_mut());
        if let Some(music) = session.music.as_mut() {
            tracks.push(music.as_mut());
        }
        session.pacer.next_frame(&mut tracks);

        self.set_progress(percent);
        TickOutcome::Rendered {
            frame: idx,
            time: elapsed,
        }
    }

    fn enter_finalizing(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pause_tracks();
        }
        self.set_progress(100);
        self.set_state(CaptureState::Finalizing);
    }

    /// `Finalizing -> Idle`: stop the encoder, deliver the container and release the session.
    ///
    /// Runs even when no frame was rendered. The pipeline is `Idle` afterwards whether or not
    /// the encoder stopped cleanly.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn finalize(&mut self) -> SlidecastResult<ExportReport> {
        if self.state == CaptureState::Recording {
            self.enter_finalizing();
        }
        if self.state != CaptureState::Finalizing {
            return Err(SlidecastError::capture(format!(
                "cannot finalize from {:?}",
                self.state
            )));
        }
        let Some(mut session) = self.session.take() else {
            self.set_state(CaptureState::Idle);
            return Err(SlidecastError::capture("no capture session"));
        };

        let result = session.sink.end().and_then(|artifact| {
            let (output, artifact) = match session.output.as_deref() {
                Some(out) => (Some(deliver_artifact(artifact, out)?), None),
                None => (None, Some(artifact)),
            };
            Ok(ExportReport {
                output,
                artifact,
                frames: session.frames_pushed,
                duration_secs: session.total_duration,
                encoder_failed: session.encoder_failed,
            })
        });
        drop(session);
        self.set_state(CaptureState::Idle);

        match &result {
            Ok(report) => tracing::info!(
                frames = report.frames,
                output = ?report.output,
                encoder_failed = report.encoder_failed,
                "export finished"
            ),
            Err(e) => tracing::error!(error = %e, "export could not be finalized"),
        }
        result
    }

    /// Abort any export and return to `Idle`. Safe in every state, including mid-preparation
    /// and after the session is gone.
    pub fn cancel(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.pause_tracks();
            tracing::info!(frames = session.frames_pushed, "export cancelled");
        }
        if self.state != CaptureState::Idle {
            self.set_state(CaptureState::Idle);
            self.set_progress(0);
        }
    }

    /// Drive a whole export: prepare, record until the narration ends, finalize.
    pub fn run(
        &mut self,
        inputs: CaptureInputs,
        sink: Box<dyn FrameSink>,
        output: Option<PathBuf>,
    ) -> SlidecastResult<ExportReport> {
        self.prepare(inputs, sink, output)?;
        self.start_recording()?;
        loop {
            match self.tick() {
                TickOutcome::Rendered { .. } => {}
                TickOutcome::ReadyToFinalize => return self.finalize(),
                TickOutcome::Inactive => {
                    self.cancel();
                    return Err(SlidecastError::capture("export stopped unexpectedly"));
                }
            }
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn build_session(
    settings: &CaptureSettings,
    inputs: CaptureInputs,
    sink: Box<dyn FrameSink>,
    output: Option<PathBuf>,
) -> SlidecastResult<CaptureSession> {
    let surface = Surface::new(settings.canvas)
        .map_err(|e| SlidecastError::capture(format!("cannot create drawing surface: {e}")))?;

    let slides = decode_slides(&inputs.images)?;

    let narration_pcm = inputs.narration.decode()?;
    let total_duration = narration_pcm.duration_secs();
    let music_pcm = inputs.music.as_ref().and_then(|m| match m.decode() {
        Ok(pcm) => Some(pcm),
        Err(e) => {
            tracing::warn!(source = %m.label(), error = %e, "music could not be decoded, exporting without it");
            None
        }
    });

    let (mix_file, audio) = write_mix(
        narration_pcm,
        music_pcm.clone(),
        inputs.config.music_volume,
    )?;

    let font = if inputs.subtitles.is_empty() {
        None
    } else {
        match SubtitleFont::resolve(settings.font_path.as_deref()) {
            Ok(font) => font,
            Err(e) => {
                tracing::warn!(error = %e, "subtitle font could not be loaded");
                None
            }
        }
    };
    let renderer = FrameRenderer::new(inputs.config, inputs.subtitles)
        .with_background(settings.background)
        .with_font(font.as_ref(), settings.subtitle_style);

    let music_duration = music_pcm.as_ref().map(|p| p.duration_secs());
    let (narration, music) = make_transports(settings, total_duration, music_duration);

    Ok(CaptureSession {
        total_duration,
        narration,
        music,
        pacer: FramePacer::new(settings.pacing, settings.fps),
        surface,
        renderer,
        slides,
        sink,
        sink_config: SinkConfig {
            width: settings.canvas.width,
            height: settings.canvas.height,
            fps: settings.fps,
            audio: Some(audio),
        },
        output,
        encoder_active: true,
        encoder_failed: false,
        frames_pushed: 0,
        fps: settings.fps,
        pacing: settings.pacing,
        last_frame: None,
        _mix_file: mix_file,
    })
}

#[tracing::instrument(level = "debug", skip_all, fields(count = images.len()))]
fn decode_slides(images: &[ImageSource]) -> SlidecastResult<Vec<Option<Drawable>>> {
    images
        .par_iter()
        .map(|src| {
            let decoded = src.load()?;
            Drawable::from_decoded(&decoded).map(Some)
        })
        .collect()
}

fn write_mix(
    narration: Arc<AudioPcm>,
    music: Option<Arc<AudioPcm>>,
    music_volume: f32,
) -> SlidecastResult<(TempFileGuard, AudioInputConfig)> {
    let graph = MixGraph::new(narration, music, music_volume);
    let mixed = graph.render();
    let path = std::env::temp_dir().join(format!(
        "slidecast_mix_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    let guard = TempFileGuard(Some(path.clone()));
    write_mix_to_f32le_file(&mixed, &path)?;
    Ok((
        guard,
        AudioInputConfig {
            path,
            sample_rate: graph.sample_rate(),
            channels: graph.channels(),
        },
    ))
}

fn make_transports(
    settings: &CaptureSettings,
    narration_secs: f64,
    music_secs: Option<f64>,
) -> (Box<dyn Transport>, Option<Box<dyn Transport>>) {
    match settings.pacing {
        Pacing::Offline => (
            Box::new(SteppedTransport::new(narration_secs, settings.fps)),
            music_secs.map(|s| {
                Box::new(SteppedTransport::new(s, settings.fps).looping(true)) as Box<dyn Transport>
            }),
        ),
        Pacing::Realtime => (
            Box::new(WallTransport::new(narration_secs)),
            music_secs
                .map(|s| Box::new(WallTransport::new(s).looping(true)) as Box<dyn Transport>),
        ),
    }
}

#[cfg(test)]
#[path = "../tests/unit/capture.rs"]
mod tests;
