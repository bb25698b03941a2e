//! Session controller: owns the assets and settings and keeps preview and export mutually
//! exclusive.

use std::path::{Path, PathBuf};

use crate::{
    assets::{decode::ImageSource, library::MediaLibrary, media::AudioSource},
    capture::{
        CaptureInputs, CapturePipeline, CaptureSettings, ExportReport, PipelineObserver,
        TickOutcome,
    },
    encode::sink::FrameSink,
    foundation::error::{SlidecastError, SlidecastResult},
    playback::{
        preview::{PreviewPlayer, PreviewUpdate},
        transport::{FramePacer, Pacing, SteppedTransport, Transport, WallTransport},
    },
    render::{
        FrameRGBA,
        frame::{Drawable, FrameRenderer, Surface},
        text::SubtitleFont,
    },
    subtitle::{index::SubtitleCue, srt::load_srt_file},
    timeline::{Effect, SlideshowConfig},
};

/// Which side of the studio is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StudioMode {
    /// Neither previewing nor exporting.
    Idle,
    /// Preview playing.
    Previewing,
    /// Export in flight.
    Exporting,
}

/// One slideshow session.
pub struct Studio {
    library: MediaLibrary,
    config: SlideshowConfig,
    settings: CaptureSettings,
    preview_pacing: Pacing,
    preview: Option<PreviewPlayer>,
    pipeline: CapturePipeline,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("config", &self.config)
            .field("mode", &self.mode())
            .field("images", &self.library.image_count())
            .finish_non_exhaustive()
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(CaptureSettings::default())
    }
}

impl Studio {
    /// Empty session with default slideshow settings.
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            library: MediaLibrary::new(),
            config: SlideshowConfig::default(),
            pipeline: CapturePipeline::new(settings.clone()),
            settings,
            preview_pacing: Pacing::Realtime,
            preview: None,
        }
    }

    /// Pacing used by preview playback (wall clock by default).
    pub fn with_preview_pacing(mut self, pacing: Pacing) -> Self {
        self.preview_pacing = pacing;
        self
    }

    /// Receive export state and progress notifications.
    pub fn with_export_observer(mut self, observer: Box<dyn PipelineObserver>) -> Self {
        self.pipeline = CapturePipeline::new(self.settings.clone()).with_observer(observer);
        self
    }

    /// Loaded assets.
    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    /// Current slideshow settings.
    pub fn config(&self) -> &SlideshowConfig {
        &self.config
    }

    /// Export settings.
    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Active mode.
    pub fn mode(&self) -> StudioMode {
        if self.is_exporting() {
            StudioMode::Exporting
        } else if self.is_previewing() {
            StudioMode::Previewing
        } else {
            StudioMode::Idle
        }
    }

    /// `true` while the preview is playing.
    pub fn is_previewing(&self) -> bool {
        self.preview.as_ref().is_some_and(PreviewPlayer::is_playing)
    }

    /// `true` while an export is in flight.
    pub fn is_exporting(&self) -> bool {
        self.pipeline.is_active()
    }

    /// Narration loaded and at least one image selected.
    pub fn is_ready(&self) -> bool {
        self.library.is_ready()
    }

    /// Export progress in percent.
    pub fn export_progress(&self) -> u8 {
        self.pipeline.progress()
    }

    fn ensure_editable(&self, what: &str) -> SlidecastResult<()> {
        if self.is_exporting() {
            return Err(SlidecastError::busy(format!(
                "cannot change {what} while exporting"
            )));
        }
        Ok(())
    }

    /// Replace all slideshow settings.
    pub fn set_config(&mut self, config: SlideshowConfig) -> SlidecastResult<()> {
        self.ensure_editable("settings")?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Seconds each slide stays on screen.
    pub fn set_per_slide_duration(&mut self, secs: u32) -> SlidecastResult<()> {
        self.set_config(SlideshowConfig {
            per_slide_duration_secs: secs,
            ..self.config
        })
    }

    /// Pan/zoom effect.
    pub fn set_effect(&mut self, effect: Effect) -> SlidecastResult<()> {
        self.set_config(SlideshowConfig {
            effect,
            ..self.config
        })
    }

    /// Music gain in `0..=1`.
    pub fn set_music_volume(&mut self, volume: f32) -> SlidecastResult<()> {
        self.set_config(SlideshowConfig {
            music_volume: volume,
            ..self.config
        })
    }

    /// Replace the slide images. Stops a running preview.
    pub fn load_images(&mut self, images: Vec<ImageSource>) -> SlidecastResult<()> {
        self.ensure_editable("images")?;
        self.stop_preview();
        self.library.set_images(images);
        Ok(())
    }

    /// Replace the narration track. Stops a running preview.
    pub fn load_narration(&mut self, narration: AudioSource) -> SlidecastResult<()> {
        self.ensure_editable("narration")?;
        self.stop_preview();
        self.library.set_narration(narration);
        Ok(())
    }

    /// Replace or remove the background music. Stops a running preview.
    pub fn load_music(&mut self, music: Option<AudioSource>) -> SlidecastResult<()> {
        self.ensure_editable("music")?;
        self.stop_preview();
        self.library.set_music(music);
        Ok(())
    }

    /// Replace the subtitle cues.
    pub fn load_subtitles(&mut self, cues: Vec<SubtitleCue>) -> SlidecastResult<()> {
        self.ensure_editable("subtitles")?;
        self.library.set_subtitles(cues);
        self.sync_preview_subtitles();
        Ok(())
    }

    /// Parse an `.srt` file and replace the subtitle cues. Returns the number of cues kept.
    pub fn load_subtitles_file(&mut self, path: &Path) -> SlidecastResult<usize> {
        self.ensure_editable("subtitles")?;
        let cues = load_srt_file(path)?;
        let n = cues.len();
        self.library.set_subtitles(cues);
        self.sync_preview_subtitles();
        tracing::info!(path = %path.display(), cues = n, "subtitles loaded");
        Ok(n)
    }

    /// A running preview picks up replaced cues without restarting.
    fn sync_preview_subtitles(&mut self) {
        if let Some(player) = self.preview.as_mut() {
            player.set_subtitles(self.library.subtitles().clone());
        }
    }

    /// Stop any preview, then play from zero.
    pub fn start_preview(&mut self) -> SlidecastResult<()> {
        if self.is_exporting() {
            return Err(SlidecastError::busy("cannot preview while exporting"));
        }
        if !self.is_ready() {
            return Err(SlidecastError::not_ready(
                "preview needs narration and at least one image",
            ));
        }
        self.stop_preview();

        let narration_secs = self.library.narration_duration()?;
        let music_secs = match self.library.music_duration() {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "music duration unavailable, previewing without it");
                None
            }
        };

        let fps = self.settings.fps;
        let (narration, music): (Box<dyn Transport>, Option<Box<dyn Transport>>) =
            match self.preview_pacing {
                Pacing::Offline => (
                    Box::new(SteppedTransport::new(narration_secs, fps)),
                    music_secs.map(|s| {
                        Box::new(SteppedTransport::new(s, fps).looping(true)) as Box<dyn Transport>
                    }),
                ),
                Pacing::Realtime => (
                    Box::new(WallTransport::new(narration_secs)),
                    music_secs.map(|s| {
                        Box::new(WallTransport::new(s).looping(true)) as Box<dyn Transport>
                    }),
                ),
            };

        let mut player =
            PreviewPlayer::new(narration, music, FramePacer::new(self.preview_pacing, fps));
        player.start(
            self.config.slide_secs(),
            self.library.image_count(),
            self.library.subtitles().clone(),
        )?;
        self.preview = Some(player);
        Ok(())
    }

    /// Sample the preview. `None` when no preview is running; the preview is dropped once it
    /// reports it has stopped.
    pub fn poll_preview(&mut self) -> Option<PreviewUpdate> {
        let update = self.preview.as_mut()?.poll();
        if !update.playing {
            self.preview = None;
        }
        Some(update)
    }

    /// Wait for the next preview frame.
    pub fn advance_preview(&mut self) {
        if let Some(player) = self.preview.as_mut() {
            player.advance();
        }
    }

    /// Stop the preview. Safe to call at any time.
    pub fn stop_preview(&mut self) {
        if let Some(mut player) = self.preview.take() {
            player.stop();
        }
    }

    /// Stop any preview and start an export into `sink`. With `output`, the finished container
    /// is moved there on [`Studio::finish_export`].
    pub fn begin_export(
        &mut self,
        sink: Box<dyn FrameSink>,
        output: Option<PathBuf>,
    ) -> SlidecastResult<()> {
        if self.is_exporting() {
            return Err(SlidecastError::busy("an export is already in progress"));
        }
        let Some(narration) = self.library.narration().cloned() else {
            return Err(SlidecastError::not_ready("export needs a narration track"));
        };
        self.stop_preview();

        let inputs = CaptureInputs {
            images: self.library.image_sources(),
            narration,
            music: self.library.music().cloned(),
            subtitles: self.library.subtitles().clone(),
            config: self.config,
        };
        self.pipeline.prepare(inputs, sink, output)?;
        self.pipeline.start_recording()
    }

    /// One render loop callback of the running export.
    pub fn pump_export(&mut self) -> TickOutcome {
        self.pipeline.tick()
    }

    /// Stop the encoder and deliver the container.
    pub fn finish_export(&mut self) -> SlidecastResult<ExportReport> {
        self.pipeline.finalize()
    }

    /// Abort the export. Safe to call at any time.
    pub fn cancel_export(&mut self) {
        self.pipeline.cancel();
    }

    /// Run a whole export.
    pub fn export(
        &mut self,
        sink: Box<dyn FrameSink>,
        output: Option<PathBuf>,
    ) -> SlidecastResult<ExportReport> {
        self.begin_export(sink, output)?;
        loop {
            match self.pump_export() {
                TickOutcome::Rendered { .. } => {}
                TickOutcome::ReadyToFinalize => return self.finish_export(),
                TickOutcome::Inactive => {
                    self.cancel_export();
                    return Err(SlidecastError::capture("export stopped unexpectedly"));
                }
            }
        }
    }

    /// Render the export frame at `t` seconds without audio.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn render_frame_at(&self, t: f64) -> SlidecastResult<FrameRGBA> {
        if self.library.image_count() == 0 {
            return Err(SlidecastError::not_ready("no images loaded"));
        }
        let slides = self
            .library
            .decode_all_images()?
            .iter()
            .map(|img| Drawable::from_decoded(img).map(Some))
            .collect::<SlidecastResult<Vec<_>>>()?;

        let subtitles = self.library.subtitles().clone();
        let font = if subtitles.is_empty() {
            None
        } else {
            SubtitleFont::resolve(self.settings.font_path.as_deref())?
        };
        let mut renderer = FrameRenderer::new(self.config, subtitles)
            .with_background(self.settings.background)
            .with_font(font.as_ref(), self.settings.subtitle_style);
        let mut surface = Surface::new(self.settings.canvas)?;
        renderer.render_frame(&mut surface, t, &slides)
    }

    /// Stop everything, drop all assets and restore default settings.
    pub fn reset(&mut self) {
        self.cancel_export();
        self.stop_preview();
        self.library.clear();
        self.config = SlideshowConfig::default();
        tracing::debug!("studio reset");
    }
}

#[cfg(test)]
#[path = "../tests/unit/studio.rs"]
mod tests;
