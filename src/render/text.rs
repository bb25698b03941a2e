use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Environment variable naming a subtitle font file.
pub const FONT_ENV_VAR: &str = "SLIDECAST_FONT";

/// Width measurement used by word wrapping.
pub trait TextMeasure {
    /// Advance width of `text` in pixels, trailing whitespace included.
    fn measure(&mut self, text: &str) -> f32;
}

/// Greedy word wrap.
///
/// Words are split on single spaces. A word joins the current line when the line plus the word
/// and a trailing space still fits in `max_width`; the first word of a line is always accepted,
/// so a single over-long word gets a line of its own. Returned lines have trailing spaces trimmed.
pub fn wrap_words<M: TextMeasure + ?Sized>(
    text: &str,
    max_width: f32,
    measure: &mut M,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split(' ') {
        let candidate = format!("{line}{word} ");
        if !line.is_empty() && measure.measure(&candidate) > max_width {
            lines.push(line.trim().to_string());
            line = format!("{word} ");
        } else {
            line = candidate;
        }
    }
    lines.push(line.trim().to_string());
    lines
}

/// Visual style of the subtitle overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubtitleStyle {
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Distance between consecutive baselines.
    pub line_height_px: f32,
    /// Wrap width as a fraction of the surface width.
    pub max_width_ratio: f32,
    /// Gap below the block as a fraction of the surface height.
    pub bottom_margin_ratio: f32,
    /// Text fill, straight RGBA8.
    pub fill: [u8; 4],
    /// Shadow color, straight RGBA8.
    pub shadow: [u8; 4],
    /// Shadow softness, in canvas `shadowBlur` units.
    pub shadow_blur: f32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_size_px: 36.0,
            line_height_px: 48.0,
            max_width_ratio: 0.9,
            bottom_margin_ratio: 0.05,
            fill: [255, 255, 255, 255],
            shadow: [0, 0, 0, 230],
            shadow_blur: 6.0,
        }
    }
}

impl SubtitleStyle {
    /// Wrap width on a surface `surface_width` pixels wide.
    pub fn max_width(&self, surface_width: f32) -> f32 {
        surface_width * self.max_width_ratio
    }

    /// Baseline y of each of `line_count` lines on a surface `surface_height` pixels tall.
    ///
    /// The block is bottom-anchored: `top = H - n * line_height - margin * H`, line `i` sits at
    /// `top + i * line_height`.
    pub fn baselines(&self, line_count: usize, surface_height: f32) -> Vec<f32> {
        let top = surface_height
            - line_count as f32 * self.line_height_px
            - surface_height * self.bottom_margin_ratio;
        (0..line_count)
            .map(|i| top + i as f32 * self.line_height_px)
            .collect()
    }
}

/// Font used for subtitles: raw bytes plus face index within a collection.
#[derive(Clone, Debug)]
pub struct SubtitleFont {
    /// Font file contents.
    pub bytes: Arc<Vec<u8>>,
    /// Face index within `bytes`.
    pub index: u32,
    /// Where the font came from, for logs.
    pub origin: String,
}

impl SubtitleFont {
    /// Wrap in-memory font bytes.
    pub fn from_bytes(bytes: Vec<u8>, index: u32, origin: impl Into<String>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            index,
            origin: origin.into(),
        }
    }

    /// Load a font file.
    pub fn from_file(path: &Path) -> SlidecastResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        Ok(Self::from_bytes(bytes, 0, path.display().to_string()))
    }

    /// Pick the subtitle font: `explicit`, then `$SLIDECAST_FONT`, then a bold system sans-serif.
    ///
    /// An unreadable explicit path is an error. `Ok(None)` means no font could be found and
    /// subtitles will not be drawn.
    #[tracing::instrument(level = "debug")]
    pub fn resolve(explicit: Option<&Path>) -> SlidecastResult<Option<Self>> {
        if let Some(path) = explicit {
            return Self::from_file(path).map(Some);
        }

        if let Some(env_path) = std::env::var_os(FONT_ENV_VAR).map(PathBuf::from) {
            match Self::from_file(&env_path) {
                Ok(font) => return Ok(Some(font)),
                Err(e) => tracing::warn!(
                    path = %env_path.display(),
                    error = %e,
                    "{FONT_ENV_VAR} is not a readable font, falling back to system fonts"
                ),
            }
        }

        Ok(Self::system_bold_sans())
    }

    /// Bold sans-serif face from the system font database.
    pub fn system_bold_sans() -> Option<Self> {
        use usvg::fontdb;

        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let query = fontdb::Query {
            families: &[fontdb::Family::Name("Inter"), fontdb::Family::SansSerif],
            weight: fontdb::Weight::BOLD,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        let id = db.query(&query)?;
        let origin = db
            .face(id)
            .map(|f| {
                f.families
                    .first()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| f.post_script_name.clone())
            })
            .unwrap_or_else(|| "system font".to_string());
        db.with_face_data(id, |data, index| {
            Self::from_bytes(data.to_vec(), index, origin)
        })
    }
}

/// One laid-out subtitle line ready for glyph drawing.
pub(crate) struct ShapedLine {
    /// Line width in pixels.
    pub(crate) width: f32,
    /// Baseline offset from the top of the layout.
    pub(crate) baseline: f32,
    /// Font size the runs were shaped at.
    pub(crate) font_size: f32,
    /// Glyphs positioned relative to the layout origin.
    pub(crate) glyphs: Vec<vello_cpu::Glyph>,
}

/// Parley-backed shaper for subtitle text in one font.
pub struct SubtitleTypesetter {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<[u8; 4]>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
    style: SubtitleStyle,
}

impl std::fmt::Debug for SubtitleTypesetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleTypesetter")
            .field("family_name", &self.family_name)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

impl SubtitleTypesetter {
    /// Register `font` with a fresh Parley context.
    pub fn new(font: &SubtitleFont, style: SubtitleStyle) -> SlidecastResult<Self> {
        if !style.font_size_px.is_finite() || style.font_size_px <= 0.0 {
            return Err(SlidecastError::validation(
                "subtitle font size must be finite and > 0",
            ));
        }

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes.as_ref().clone()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            SlidecastError::validation(format!(
                "no font families registered from '{}'",
                font.origin
            ))
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| SlidecastError::validation("registered font family has no name"))?
            .to_string();

        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
            font.index,
        );

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font: data,
            style,
        })
    }

    /// Style the typesetter was built with.
    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    pub(crate) fn font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    fn layout(&mut self, text: &str) -> parley::Layout<[u8; 4]> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(
            self.style.font_size_px,
        ));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::Brush(self.style.fill));

        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Shape one line (no wrapping) into positioned glyphs.
    pub(crate) fn shape_line(&mut self, text: &str) -> ShapedLine {
        let layout = self.layout(text);
        let mut shaped = ShapedLine {
            width: layout.width(),
            baseline: 0.0,
            font_size: self.style.font_size_px,
            glyphs: Vec::new(),
        };
        if let Some(line) = layout.lines().next() {
            shaped.baseline = line.metrics().baseline;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                shaped.font_size = run.run().font_size();
                shaped
                    .glyphs
                    .extend(run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    }));
            }
        }
        shaped
    }
}

impl TextMeasure for SubtitleTypesetter {
    fn measure(&mut self, text: &str) -> f32 {
        self.layout(text).full_width()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
