use super::*;

/// Every character is 10 px wide.
struct Mono;

impl TextMeasure for Mono {
    fn measure(&mut self, text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }
}

#[test]
fn short_text_stays_on_one_line() {
    assert_eq!(wrap_words("Hello world", 200.0, &mut Mono), vec!["Hello world"]);
}

#[test]
fn wrap_measures_candidate_with_trailing_space() {
    // "aaaa bbbb " is 100 px: fits exactly at 100, overflows at 99.
    assert_eq!(wrap_words("aaaa bbbb", 100.0, &mut Mono), vec!["aaaa bbbb"]);
    assert_eq!(wrap_words("aaaa bbbb", 99.0, &mut Mono), vec!["aaaa", "bbbb"]);
}

#[test]
fn greedy_fill_across_several_lines() {
    let lines = wrap_words("one two three four five six", 110.0, &mut Mono);
    assert_eq!(lines, vec!["one two", "three four", "five six"]);
}

#[test]
fn first_word_is_always_accepted() {
    let lines = wrap_words("supercalifragilistic ok", 50.0, &mut Mono);
    assert_eq!(lines, vec!["supercalifragilistic", "ok"]);
}

#[test]
fn empty_text_yields_one_empty_line() {
    assert_eq!(wrap_words("", 100.0, &mut Mono), vec![String::new()]);
}

#[test]
fn baselines_are_bottom_anchored() {
    let style = SubtitleStyle::default();
    // 720 - 2*48 - 36 = 588
    assert_eq!(style.baselines(2, 720.0), vec![588.0, 636.0]);
    assert_eq!(style.baselines(1, 720.0), vec![636.0]);
    assert_eq!(style.max_width(1280.0), 1152.0);
}

#[test]
fn default_style_matches_overlay_look() {
    let style = SubtitleStyle::default();
    assert_eq!(style.font_size_px, 36.0);
    assert_eq!(style.line_height_px, 48.0);
    assert_eq!(style.fill, [255, 255, 255, 255]);
    assert_eq!(style.shadow[3], 230);
}

#[test]
fn explicit_missing_font_is_an_error() {
    let err = SubtitleFont::resolve(Some(Path::new("/definitely/not/a/font.ttf"))).unwrap_err();
    assert!(format!("{err:#}").contains("font.ttf"));
}

#[test]
fn system_font_shapes_and_measures_when_available() {
    let Some(font) = SubtitleFont::system_bold_sans() else {
        eprintln!("skipping: no system sans-serif font");
        return;
    };
    let mut ts = SubtitleTypesetter::new(&font, SubtitleStyle::default()).unwrap();
    let short = ts.measure("Hi ");
    let long = ts.measure("Hello there, friend ");
    assert!(short > 0.0);
    assert!(long > short);

    let shaped = ts.shape_line("Hello");
    assert!(!shaped.glyphs.is_empty());
    assert!(shaped.width > 0.0);
    assert!(shaped.baseline > 0.0);
}

#[test]
fn garbage_font_bytes_are_rejected() {
    let font = SubtitleFont::from_bytes(vec![0, 1, 2, 3], 0, "junk");
    assert!(SubtitleTypesetter::new(&font, SubtitleStyle::default()).is_err());
}
