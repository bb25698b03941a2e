use super::*;
use crate::timeline::Effect;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "slidecast_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn missing_fields_take_defaults() {
    let p = ProjectFile::from_reader(r#"{ "images": ["a.png"] }"#.as_bytes()).unwrap();
    assert_eq!(p.images, vec![PathBuf::from("a.png")]);
    assert_eq!(p.settings, SlideshowConfig::default());
    assert!(p.narration.is_none());
}

#[test]
fn settings_are_parsed_and_validated() {
    let p = ProjectFile::from_reader(
        r#"{ "settings": { "per_slide_duration_secs": 3, "effect": "zoom-out" } }"#.as_bytes(),
    )
    .unwrap();
    assert_eq!(p.settings.per_slide_duration_secs, 3);
    assert_eq!(p.settings.effect, Effect::ZoomOut);
    assert_eq!(p.settings.music_volume, 0.5);

    let err = ProjectFile::from_reader(
        r#"{ "settings": { "per_slide_duration_secs": 31 } }"#.as_bytes(),
    )
    .unwrap_err();
    assert!(matches!(err, SlidecastError::Validation(_)));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = ProjectFile::from_reader(r#"{ "imagez": [] }"#.as_bytes()).unwrap_err();
    assert!(matches!(err, SlidecastError::Serde(_)));
}

#[test]
fn relative_paths_resolve_against_project_dir() {
    let p = ProjectFile {
        images: vec![PathBuf::from("a.png"), PathBuf::from("/abs/b.png")],
        narration: Some(PathBuf::from("voice.wav")),
        output: Some(PathBuf::from("out/video.mp4")),
        ..ProjectFile::default()
    }
    .resolved_against(Path::new("/projects/demo"));
    assert_eq!(
        p.images,
        vec![
            PathBuf::from("/projects/demo/a.png"),
            PathBuf::from("/abs/b.png")
        ]
    );
    assert_eq!(p.narration, Some(PathBuf::from("/projects/demo/voice.wav")));
    assert_eq!(p.output, Some(PathBuf::from("/projects/demo/out/video.mp4")));
    assert!(p.music.is_none());
}

#[test]
fn load_and_apply_fill_the_studio() {
    let dir = temp_dir("project_apply");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("talk.srt"),
        "1\n00:00:00,000 --> 00:00:01,000\nHi\n\n2\n00:00:01,000 --> 00:00:02,000\nBye\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("project.json"),
        r#"{
            "images": ["one.png", "two.png"],
            "narration": "voice.wav",
            "subtitles": "talk.srt",
            "settings": { "per_slide_duration_secs": 4, "effect": "none", "music_volume": 0.2 }
        }"#,
    )
    .unwrap();

    let project = ProjectFile::load(dir.join("project.json")).unwrap();
    assert_eq!(project.subtitles, Some(dir.join("talk.srt")));

    let mut studio = Studio::default();
    project.apply(&mut studio).unwrap();
    assert!(studio.is_ready());
    assert_eq!(studio.library().image_count(), 2);
    assert_eq!(studio.library().subtitles().len(), 2);
    assert_eq!(studio.config().effect, Effect::None);

    let _ = std::fs::remove_dir_all(&dir);
}
