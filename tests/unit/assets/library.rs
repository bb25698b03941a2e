use std::io::Cursor;

use super::*;
use crate::assets::media::AudioPcm;

fn png_source(label: &str, w: u32, h: u32) -> ImageSource {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    ImageSource::Encoded {
        label: label.to_string(),
        bytes: Arc::new(buf),
    }
}

fn pcm(secs: f64) -> AudioSource {
    AudioSource::Pcm(Arc::new(AudioPcm::silence(1000, secs)))
}

#[test]
fn ready_needs_narration_and_an_image() {
    let mut lib = MediaLibrary::new();
    assert!(!lib.is_ready());
    lib.set_images(vec![png_source("a", 2, 2)]);
    assert!(!lib.is_ready());
    lib.set_narration(pcm(10.0));
    assert!(lib.is_ready());
    assert_eq!(lib.narration_duration().unwrap(), 10.0);
}

#[test]
fn narration_duration_without_narration_is_not_ready() {
    let lib = MediaLibrary::new();
    let err = lib.narration_duration().unwrap_err();
    assert!(matches!(err, SlidecastError::NotReady(_)));
}

#[test]
fn replacing_assets_releases_old_handles_once() {
    let mut lib = MediaLibrary::new();
    lib.set_images(vec![png_source("a", 1, 1), png_source("b", 1, 1)]);
    lib.set_narration(pcm(1.0));
    lib.set_music(Some(pcm(2.0)));
    assert_eq!(lib.live_handles(), 4);

    lib.set_images(vec![png_source("c", 1, 1)]);
    assert_eq!(lib.live_handles(), 3);
    assert_eq!(lib.ledger().released_total(), 2);

    lib.set_narration(pcm(3.0));
    lib.set_music(None);
    assert_eq!(lib.live_handles(), 2);
    assert_eq!(lib.ledger().released_total(), 4);

    lib.clear();
    assert_eq!(lib.live_handles(), 0);
    assert_eq!(lib.ledger().released_total(), 6);
    assert!(!lib.is_ready());

    lib.clear();
    assert_eq!(lib.ledger().released_total(), 6);
}

#[test]
fn ledger_release_is_idempotent() {
    let mut ledger = HandleLedger::default();
    let a = ledger.acquire();
    let b = ledger.acquire();
    assert_ne!(a, b);
    assert!(ledger.release(a));
    assert!(!ledger.release(a));
    assert_eq!(ledger.live(), 1);
}

#[test]
fn decode_all_keeps_selection_order() {
    let mut lib = MediaLibrary::new();
    lib.set_images(vec![
        png_source("wide", 4, 2),
        png_source("tall", 2, 5),
        png_source("square", 3, 3),
    ]);
    let decoded = lib.decode_all_images().unwrap();
    let dims: Vec<_> = decoded.iter().map(|d| (d.width, d.height)).collect();
    assert_eq!(dims, vec![(4, 2), (2, 5), (3, 3)]);

    let again = lib.decoded_image(1).unwrap();
    assert!(Arc::ptr_eq(&again, &decoded[1]));
}

#[test]
fn decode_all_fails_on_any_bad_image() {
    let mut lib = MediaLibrary::new();
    lib.set_images(vec![
        png_source("ok", 1, 1),
        ImageSource::Encoded {
            label: "broken.png".to_string(),
            bytes: Arc::new(vec![1, 2, 3]),
        },
    ]);
    let err = lib.decode_all_images().unwrap_err();
    assert!(format!("{err:#}").contains("broken.png"));
}

#[test]
fn subtitles_and_music_duration() {
    let mut lib = MediaLibrary::new();
    assert_eq!(lib.music_duration().unwrap(), None);
    lib.set_music(Some(pcm(4.0)));
    assert_eq!(lib.music_duration().unwrap(), Some(4.0));

    lib.set_subtitles(vec![SubtitleCue {
        id: 1,
        start: 0.0,
        end: 1.0,
        text: "Hi".to_string(),
    }]);
    assert_eq!(lib.subtitles().active_cue_at(0.5), "Hi");
    lib.clear();
    assert!(lib.subtitles().is_empty());
}
