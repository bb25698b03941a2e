//! Slidecast renders narrated slideshows to video.
//!
//! A session pairs an ordered list of still images with a narration track, optional background
//! music and optional SRT subtitles:
//!
//! - Load assets into a [`Studio`] (directly or from a [`ProjectFile`])
//! - Preview: narration time drives slide and subtitle selection ([`PreviewPlayer`])
//! - Export: frames rendered in lock-step with the narration clock are streamed, together with
//!   the mixed audio, into a [`FrameSink`] ([`CapturePipeline`], [`FfmpegSink`])
//!
//! Narration time is the only clock. Slide index at `t` is `floor(t / per_slide) mod images`,
//! and the subtitle at `t` is the first cue in file order whose `[start, end]` contains `t`.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assets;
mod audio;
mod foundation;
mod subtitle;

/// Export state machine.
pub mod capture;
pub(crate) mod encode;
pub(crate) mod playback;
/// JSON project files.
pub mod project;
pub(crate) mod render;
/// Session controller.
pub mod studio;
pub(crate) mod timeline;
pub(crate) mod transform;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{SlidecastError, SlidecastResult};

pub use crate::assets::decode::{DecodedImage, ImageSource, decode_image};
pub use crate::assets::library::{HandleId, HandleLedger, MediaLibrary};
pub use crate::assets::media::{
    AudioPcm, AudioSource, MIX_SAMPLE_RATE, decode_audio_f32_stereo, is_ffmpeg_on_path,
    is_ffprobe_on_path, probe_audio_duration,
};
pub use crate::audio::mix::{MixGraph, write_mix_to_f32le_file};
pub use crate::capture::{
    CaptureInputs, CapturePipeline, CaptureSettings, CaptureState, ExportReport,
    PipelineObserver, TickOutcome,
};
pub use crate::encode::ffmpeg::{
    DEFAULT_OUTPUT_NAME, FfmpegSink, FfmpegSinkOpts, deliver_artifact, partial_path_for,
};
pub use crate::encode::sink::{Artifact, AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::playback::preview::{PreviewPlayer, PreviewState, PreviewUpdate};
pub use crate::playback::transport::{
    FramePacer, Pacing, SteppedTransport, Transport, WallTransport,
};
pub use crate::project::ProjectFile;
pub use crate::render::FrameRGBA;
pub use crate::render::frame::{Drawable, FrameRenderer, Surface};
pub use crate::render::text::{
    FONT_ENV_VAR, SubtitleFont, SubtitleStyle, SubtitleTypesetter, TextMeasure, wrap_words,
};
pub use crate::studio::{Studio, StudioMode};
pub use crate::subtitle::index::{SubtitleCue, SubtitleIndex};
pub use crate::subtitle::srt::{load_srt_file, parse_srt, parse_srt_timestamp};
pub use crate::timeline::{Effect, SlideshowConfig, Timeline};
pub use crate::transform::{Placement, compute_transform};
