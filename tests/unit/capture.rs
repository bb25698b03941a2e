use std::{
    io::Cursor,
    sync::{Arc, Mutex},
    time::Duration,
};

use super::*;
use crate::{
    encode::sink::InMemorySink, render::FrameRGBA, subtitle::index::SubtitleCue,
    timeline::Effect,
};

fn png_source(label: &str, rgba: [u8; 4]) -> ImageSource {
    let img = image::RgbaImage::from_pixel(16, 9, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageSource::Encoded {
        label: label.to_string(),
        bytes: Arc::new(buf),
    }
}

fn settings() -> CaptureSettings {
    CaptureSettings {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        fps: Fps::new(10, 1).unwrap(),
        ..CaptureSettings::default()
    }
}

fn inputs(narration_secs: f64) -> CaptureInputs {
    CaptureInputs {
        images: vec![
            png_source("red.png", [255, 0, 0, 255]),
            png_source("blue.png", [0, 0, 255, 255]),
        ],
        narration: AudioSource::Pcm(Arc::new(AudioPcm::silence(8_000, narration_secs))),
        music: None,
        subtitles: SubtitleIndex::default(),
        config: SlideshowConfig {
            per_slide_duration_secs: 1,
            effect: Effect::ZoomIn,
            music_volume: 0.5,
        },
    }
}

#[derive(Default)]
struct Recorded {
    config: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
}

/// Sink sharing what it receives with the test; optionally fails after `fail_after` frames
/// and sleeps `delay` per frame.
struct SharedSink {
    seen: Arc<Mutex<Recorded>>,
    fail_after: Option<usize>,
    delay: Duration,
}

impl FrameSink for SharedSink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        self.seen.lock().unwrap().config = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        std::thread::sleep(self.delay);
        let mut seen = self.seen.lock().unwrap();
        if self.fail_after.is_some_and(|n| seen.frames.len() >= n) {
            return Err(SlidecastError::encode("disk full"));
        }
        seen.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<Artifact> {
        let mut seen = self.seen.lock().unwrap();
        seen.ended = true;
        Ok(Artifact::Bytes(vec![0u8; seen.frames.len()]))
    }
}

fn shared_sink(fail_after: Option<usize>) -> (Box<dyn FrameSink>, Arc<Mutex<Recorded>>) {
    let seen = Arc::new(Mutex::new(Recorded::default()));
    (
        Box::new(SharedSink {
            seen: seen.clone(),
            fail_after,
            delay: Duration::ZERO,
        }),
        seen,
    )
}

fn slow_sink(delay: Duration) -> (Box<dyn FrameSink>, Arc<Mutex<Recorded>>) {
    let seen = Arc::new(Mutex::new(Recorded::default()));
    (
        Box::new(SharedSink {
            seen: seen.clone(),
            fail_after: None,
            delay,
        }),
        seen,
    )
}

#[derive(Default)]
struct Events {
    states: Vec<(CaptureState, CaptureState)>,
    progress: Vec<u8>,
}

struct Recorder(Arc<Mutex<Events>>);

impl PipelineObserver for Recorder {
    fn on_state_change(&mut self, from: CaptureState, to: CaptureState) {
        self.0.lock().unwrap().states.push((from, to));
    }

    fn on_progress(&mut self, percent: u8) {
        self.0.lock().unwrap().progress.push(percent);
    }
}

#[test]
fn export_renders_one_frame_per_period_until_narration_ends() {
    let events = Arc::new(Mutex::new(Events::default()));
    let mut pipeline =
        CapturePipeline::new(settings()).with_observer(Box::new(Recorder(events.clone())));
    let (sink, seen) = shared_sink(None);

    let report = pipeline.run(inputs(1.0), sink, None).unwrap();

    assert_eq!(report.frames, 10);
    assert!(!report.encoder_failed);
    assert_eq!(report.duration_secs, 1.0);
    assert!(report.output.is_none());
    assert_eq!(report.artifact.unwrap().len().unwrap(), 10);

    let seen = seen.lock().unwrap();
    assert!(seen.ended);
    let cfg = seen.config.as_ref().unwrap();
    assert_eq!((cfg.width, cfg.height), (64, 36));
    assert!(cfg.audio.is_some());
    let indices: Vec<u64> = seen.frames.iter().map(|(i, _)| i.0).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    assert!(
        seen.frames
            .iter()
            .all(|(_, f)| (f.width, f.height) == (64, 36))
    );

    let events = events.lock().unwrap();
    assert_eq!(
        events.states,
        vec![
            (CaptureState::Idle, CaptureState::Preparing),
            (CaptureState::Preparing, CaptureState::Recording),
            (CaptureState::Recording, CaptureState::Finalizing),
            (CaptureState::Finalizing, CaptureState::Idle),
        ]
    );
    assert_eq!(events.progress.last(), Some(&100));
    assert!(events.progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(pipeline.state(), CaptureState::Idle);
    assert_eq!(pipeline.progress(), 100);
}

#[test]
fn slides_switch_at_slide_boundaries() {
    let mut pipeline = CapturePipeline::new(settings());
    let (sink, seen) = shared_sink(None);
    pipeline.run(inputs(2.0), sink, None).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.frames.len(), 20);
    let center = |f: &FrameRGBA| f.pixel(32, 18).unwrap();
    let first = center(&seen.frames[5].1);
    let second = center(&seen.frames[15].1);
    assert!(first[0] > 200 && first[2] < 50, "{first:?}");
    assert!(second[2] > 200 && second[0] < 50, "{second:?}");
}

#[test]
fn second_prepare_while_busy_is_rejected() {
    let mut pipeline = CapturePipeline::new(settings());
    let (sink, _) = shared_sink(None);
    pipeline.prepare(inputs(1.0), sink, None).unwrap();
    assert_eq!(pipeline.state(), CaptureState::Preparing);

    let err = pipeline
        .prepare(inputs(1.0), Box::new(InMemorySink::new()), None)
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Busy(_)));
    assert_eq!(pipeline.state(), CaptureState::Preparing);

    pipeline.cancel();
    assert_eq!(pipeline.state(), CaptureState::Idle);
    pipeline.cancel();
    assert_eq!(pipeline.state(), CaptureState::Idle);
}

#[test]
fn undecodable_image_aborts_through_failed() {
    let events = Arc::new(Mutex::new(Events::default()));
    let mut pipeline =
        CapturePipeline::new(settings()).with_observer(Box::new(Recorder(events.clone())));
    let mut bad = inputs(1.0);
    bad.images.push(ImageSource::Encoded {
        label: "broken.png".to_string(),
        bytes: Arc::new(b"not an image".to_vec()),
    });
    let (sink, seen) = shared_sink(None);

    assert!(pipeline.prepare(bad, sink, None).is_err());
    assert_eq!(pipeline.state(), CaptureState::Idle);
    assert!(seen.lock().unwrap().config.is_none());
    assert_eq!(
        events.lock().unwrap().states,
        vec![
            (CaptureState::Idle, CaptureState::Preparing),
            (CaptureState::Preparing, CaptureState::Failed),
            (CaptureState::Failed, CaptureState::Idle),
        ]
    );

    let (sink, _) = shared_sink(None);
    assert!(pipeline.run(inputs(0.5), sink, None).is_ok());
}

#[test]
fn readiness_and_config_are_checked_before_preparing() {
    let mut pipeline = CapturePipeline::new(settings());

    let mut no_images = inputs(1.0);
    no_images.images.clear();
    let err = pipeline
        .prepare(no_images, Box::new(InMemorySink::new()), None)
        .unwrap_err();
    assert!(matches!(err, SlidecastError::NotReady(_)));

    let mut bad_duration = inputs(1.0);
    bad_duration.config.per_slide_duration_secs = 0;
    let err = pipeline
        .prepare(bad_duration, Box::new(InMemorySink::new()), None)
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Validation(_)));
    assert_eq!(pipeline.state(), CaptureState::Idle);
}

#[test]
fn encoder_failure_finishes_early() {
    let mut pipeline = CapturePipeline::new(settings());
    let (sink, seen) = shared_sink(Some(3));
    let report = pipeline.run(inputs(1.0), sink, None).unwrap();
    assert!(report.encoder_failed);
    assert_eq!(report.frames, 3);
    assert!(seen.lock().unwrap().ended);
    assert_eq!(pipeline.state(), CaptureState::Idle);
}

#[test]
fn realtime_export_with_a_slow_encoder_keeps_narration_length() {
    let mut pipeline = CapturePipeline::new(CaptureSettings {
        pacing: Pacing::Realtime,
        ..settings()
    });
    let (sink, seen) = slow_sink(Duration::from_millis(120));
    let report = pipeline.run(inputs(1.0), sink, None).unwrap();

    assert!(!report.encoder_failed);
    assert_eq!(report.frames, 10);
    let seen = seen.lock().unwrap();
    let indices: Vec<u64> = seen.frames.iter().map(|(idx, _)| idx.0).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    assert!(seen.ended);
    assert_eq!(pipeline.state(), CaptureState::Idle);
}

#[test]
fn realtime_export_with_a_fast_encoder_pushes_every_frame_once() {
    let mut pipeline = CapturePipeline::new(CaptureSettings {
        pacing: Pacing::Realtime,
        ..settings()
    });
    let (sink, seen) = shared_sink(None);
    let report = pipeline.run(inputs(0.5), sink, None).unwrap();
    assert_eq!(report.frames, 5);
    assert_eq!(seen.lock().unwrap().frames.len(), 5);
}

#[test]
fn zero_length_narration_still_finalizes() {
    let mut pipeline = CapturePipeline::new(settings());
    let (sink, seen) = shared_sink(None);
    let report = pipeline.run(inputs(0.0), sink, None).unwrap();
    assert_eq!(report.frames, 0);
    assert!(seen.lock().unwrap().ended);
    assert_eq!(pipeline.progress(), 100);
}

#[test]
fn subtitles_without_a_font_do_not_stop_the_export() {
    let mut pipeline = CapturePipeline::new(CaptureSettings {
        font_path: Some(std::path::PathBuf::from("/nonexistent/font.ttf")),
        ..settings()
    });
    let mut with_cues = inputs(1.0);
    with_cues.subtitles = SubtitleIndex::new(vec![SubtitleCue {
        id: 1,
        start: 0.0,
        end: 1.0,
        text: "hello".to_string(),
    }]);
    let (sink, _) = shared_sink(None);
    let report = pipeline.run(with_cues, sink, None).unwrap();
    assert_eq!(report.frames, 10);
}

#[test]
fn tick_outside_recording_is_inactive() {
    let mut pipeline = CapturePipeline::new(settings());
    assert_eq!(pipeline.tick(), TickOutcome::Inactive);
    assert!(pipeline.finalize().is_err());
    assert!(pipeline.start_recording().is_err());
}
