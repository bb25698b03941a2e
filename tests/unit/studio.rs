use std::{io::Cursor, sync::Arc};

use super::*;
use crate::{
    assets::media::AudioPcm,
    encode::sink::InMemorySink,
    foundation::core::{Canvas, Fps},
};

fn png_source(rgba: [u8; 4]) -> ImageSource {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageSource::Encoded {
        label: "slide.png".to_string(),
        bytes: Arc::new(buf),
    }
}

fn pcm(secs: f64) -> AudioSource {
    AudioSource::Pcm(Arc::new(AudioPcm::silence(4_000, secs)))
}

fn studio() -> Studio {
    Studio::new(CaptureSettings {
        canvas: Canvas {
            width: 32,
            height: 18,
        },
        fps: Fps::new(4, 1).unwrap(),
        ..CaptureSettings::default()
    })
    .with_preview_pacing(Pacing::Offline)
}

fn loaded(narration_secs: f64) -> Studio {
    let mut s = studio();
    s.load_images(vec![png_source([255, 0, 0, 255]), png_source([0, 255, 0, 255])])
        .unwrap();
    s.load_narration(pcm(narration_secs)).unwrap();
    s.set_per_slide_duration(1).unwrap();
    s
}

#[test]
fn preview_and_export_need_assets() {
    let mut s = studio();
    assert!(matches!(
        s.start_preview().unwrap_err(),
        SlidecastError::NotReady(_)
    ));
    assert!(matches!(
        s.begin_export(Box::new(InMemorySink::new()), None)
            .unwrap_err(),
        SlidecastError::NotReady(_)
    ));
    assert_eq!(s.mode(), StudioMode::Idle);
}

#[test]
fn preview_runs_until_narration_ends() {
    let mut s = loaded(2.0);
    s.start_preview().unwrap();
    assert_eq!(s.mode(), StudioMode::Previewing);

    let mut slides = Vec::new();
    while let Some(u) = s.poll_preview() {
        if !u.playing {
            break;
        }
        slides.push(u.slide_index);
        s.advance_preview();
    }
    assert_eq!(slides, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    assert!(!s.is_previewing());
    assert!(s.poll_preview().is_none());
}

#[test]
fn subtitles_replaced_during_preview_show_up_immediately() {
    let mut s = loaded(3.0);
    let cue = |text: &str| SubtitleCue {
        id: 1,
        start: 0.0,
        end: 3.0,
        text: text.to_string(),
    };
    s.load_subtitles(vec![cue("before")]).unwrap();
    s.start_preview().unwrap();
    assert_eq!(s.poll_preview().unwrap().subtitle, "before");
    s.advance_preview();

    s.load_subtitles(vec![cue("after")]).unwrap();
    assert!(s.is_previewing());
    let u = s.poll_preview().unwrap();
    assert!(u.playing);
    assert_eq!(u.subtitle, "after");
    assert!(u.time > 0.0);
}

#[test]
fn export_stops_preview_and_locks_settings() {
    let mut s = loaded(1.0);
    s.start_preview().unwrap();
    s.begin_export(Box::new(InMemorySink::new()), None).unwrap();
    assert!(!s.is_previewing());
    assert_eq!(s.mode(), StudioMode::Exporting);

    assert!(matches!(
        s.set_effect(Effect::Pan).unwrap_err(),
        SlidecastError::Busy(_)
    ));
    assert!(matches!(
        s.load_music(Some(pcm(1.0))).unwrap_err(),
        SlidecastError::Busy(_)
    ));
    assert!(matches!(s.start_preview().unwrap_err(), SlidecastError::Busy(_)));
    assert!(matches!(
        s.begin_export(Box::new(InMemorySink::new()), None)
            .unwrap_err(),
        SlidecastError::Busy(_)
    ));

    s.cancel_export();
    s.cancel_export();
    assert_eq!(s.mode(), StudioMode::Idle);
    s.set_effect(Effect::Pan).unwrap();
}

#[test]
fn export_reaches_full_progress() {
    let mut s = loaded(1.0);
    let report = s.export(Box::new(InMemorySink::new()), None).unwrap();
    assert_eq!(report.frames, 4);
    assert_eq!(s.export_progress(), 100);
    assert!(!s.is_exporting());
}

#[test]
fn invalid_settings_are_rejected_without_change() {
    let mut s = studio();
    assert!(s.set_per_slide_duration(0).is_err());
    assert!(s.set_music_volume(1.5).is_err());
    assert_eq!(*s.config(), SlideshowConfig::default());
    s.set_music_volume(0.0).unwrap();
    assert_eq!(s.config().music_volume, 0.0);
}

#[test]
fn reset_clears_everything() {
    let mut s = loaded(3.0);
    s.set_effect(Effect::None).unwrap();
    s.start_preview().unwrap();
    s.reset();
    assert_eq!(s.mode(), StudioMode::Idle);
    assert!(!s.is_ready());
    assert_eq!(s.library().live_handles(), 0);
    assert_eq!(*s.config(), SlideshowConfig::default());
}

#[test]
fn single_frame_render_needs_only_images() {
    let mut s = studio();
    s.load_images(vec![png_source([0, 0, 255, 255])]).unwrap();
    let frame = s.render_frame_at(0.5).unwrap();
    assert_eq!((frame.width, frame.height), (32, 18));
    assert_eq!(frame.pixel(16, 9).unwrap(), [0, 0, 255, 255]);
}
