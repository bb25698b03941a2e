use super::*;
use crate::{
    foundation::core::Fps,
    playback::transport::{Pacing, SteppedTransport},
    subtitle::index::SubtitleCue,
};

fn fps1() -> Fps {
    Fps::new(1, 1).unwrap()
}

fn player(narration_secs: f64, music_secs: Option<f64>) -> PreviewPlayer {
    PreviewPlayer::new(
        Box::new(SteppedTransport::new(narration_secs, fps1())),
        music_secs
            .map(|s| Box::new(SteppedTransport::new(s, fps1()).looping(true)) as Box<dyn Transport>),
        FramePacer::new(Pacing::Offline, fps1()),
    )
}

fn cues() -> SubtitleIndex {
    SubtitleIndex::new(vec![
        SubtitleCue {
            id: 1,
            start: 1.0,
            end: 2.5,
            text: "first".to_string(),
        },
        SubtitleCue {
            id: 2,
            start: 4.0,
            end: 5.0,
            text: "second".to_string(),
        },
    ])
}

/// Transport whose `play` always fails.
struct Refusing;

impl Transport for Refusing {
    fn play(&mut self) -> SlidecastResult<()> {
        Err(SlidecastError::playback("not allowed"))
    }
    fn pause(&mut self) {}
    fn rewind(&mut self) {}
    fn current_time(&self) -> f64 {
        0.0
    }
    fn duration(&self) -> f64 {
        5.0
    }
    fn has_ended(&self) -> bool {
        false
    }
    fn is_playing(&self) -> bool {
        false
    }
}

#[test]
fn slides_and_subtitles_follow_narration_time() {
    let mut p = player(10.0, None);
    p.start(2.0, 3, cues()).unwrap();

    let mut seen = Vec::new();
    loop {
        let u = p.poll();
        if !u.playing {
            break;
        }
        seen.push((u.time, u.slide_index, u.subtitle));
        p.advance();
    }

    let expected: Vec<(f64, usize, &str)> = vec![
        (0.0, 0, ""),
        (1.0, 0, "first"),
        (2.0, 1, "first"),
        (3.0, 1, ""),
        (4.0, 2, "second"),
        (5.0, 2, "second"),
        (6.0, 0, ""),
        (7.0, 0, ""),
        (8.0, 1, ""),
        (9.0, 1, ""),
    ];
    let got: Vec<(f64, usize, &str)> = seen
        .iter()
        .map(|(t, i, s)| (*t, *i, s.as_str()))
        .collect();
    assert_eq!(got, expected);
    assert_eq!(p.state(), PreviewState::Idle);
}

#[test]
fn narration_end_resets_everything() {
    let mut p = player(3.0, Some(1.0));
    p.start(1.0, 2, cues()).unwrap();
    for _ in 0..3 {
        p.poll();
        p.advance();
    }
    let u = p.poll();
    assert!(!u.playing);
    assert_eq!(u.slide_index, 0);
    assert_eq!(u.subtitle, "");
    assert_eq!(p.current_time(), 0.0);
}

#[test]
fn stop_is_idempotent_and_resets() {
    let mut p = player(10.0, None);
    p.stop();
    p.start(1.0, 2, cues()).unwrap();
    for _ in 0..2 {
        p.poll();
        p.advance();
    }
    assert_eq!(p.poll().slide_index, 0);
    p.advance();
    assert_eq!(p.poll().slide_index, 1);
    p.stop();
    p.stop();
    assert!(!p.is_playing());
    assert_eq!(p.slide_index(), 0);
    assert_eq!(p.subtitle(), "");
}

#[test]
fn restart_always_begins_from_zero() {
    let mut p = player(10.0, None);
    p.start(1.0, 4, SubtitleIndex::default()).unwrap();
    for _ in 0..3 {
        p.poll();
        p.advance();
    }
    assert_eq!(p.poll().slide_index, 3);
    p.start(1.0, 4, SubtitleIndex::default()).unwrap();
    let u = p.poll();
    assert_eq!((u.time, u.slide_index), (0.0, 0));
}

#[test]
fn start_without_images_is_rejected() {
    let mut p = player(10.0, None);
    let err = p.start(1.0, 0, SubtitleIndex::default()).unwrap_err();
    assert!(matches!(err, SlidecastError::NotReady(_)));
    assert!(!p.is_playing());
}

#[test]
fn narration_failure_leaves_player_idle() {
    let mut p = PreviewPlayer::new(
        Box::new(Refusing),
        None,
        FramePacer::new(Pacing::Offline, fps1()),
    );
    let err = p.start(1.0, 1, SubtitleIndex::default()).unwrap_err();
    assert!(matches!(err, SlidecastError::Playback(_)));
    assert_eq!(p.state(), PreviewState::Idle);
}

#[test]
fn music_failure_only_warns() {
    let mut p = PreviewPlayer::new(
        Box::new(SteppedTransport::new(2.0, fps1())),
        Some(Box::new(Refusing)),
        FramePacer::new(Pacing::Offline, fps1()),
    );
    p.start(1.0, 1, SubtitleIndex::default()).unwrap();
    assert!(p.is_playing());
}
