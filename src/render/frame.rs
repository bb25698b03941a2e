use std::sync::Arc;

use crate::{
    assets::decode::DecodedImage,
    foundation::{
        core::Canvas,
        error::{SlidecastError, SlidecastResult},
    },
    render::{
        FrameRGBA,
        blur::{blur_rgba8_premul, shadow_blur_params},
        composite::{over_in_place, tint_coverage_in_place},
        text::{SubtitleFont, SubtitleStyle, SubtitleTypesetter, wrap_words},
    },
    subtitle::index::SubtitleIndex,
    timeline::{SlideshowConfig, Timeline},
    transform::compute_transform,
};

/// Fixed-size drawing target.
pub struct Surface {
    canvas: Canvas,
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("canvas", &self.canvas)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(canvas: Canvas) -> SlidecastResult<Self> {
        let (width, height) = canvas.as_u16()?;
        Ok(Self {
            canvas,
            width,
            height,
            pixmap: vello_cpu::Pixmap::new(width, height),
        })
    }

    /// Surface dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Copy the current pixels out as a premultiplied frame.
    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }
}

/// Slide image prepared as a rasterizer paint.
#[derive(Clone)]
pub struct Drawable {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for Drawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drawable")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Drawable {
    /// Convert a decoded image into a paint.
    pub fn from_decoded(image: &DecodedImage) -> SlidecastResult<Self> {
        let w: u16 = image
            .width
            .try_into()
            .map_err(|_| SlidecastError::validation("image width exceeds u16"))?;
        let h: u16 = image
            .height
            .try_into()
            .map_err(|_| SlidecastError::validation("image height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(SlidecastError::validation("image has zero width or height"));
        }
        if image.rgba8_premul.len() != image.width as usize * image.height as usize * 4 {
            return Err(SlidecastError::validation("decoded image byte length mismatch"));
        }

        let mut may_have_opacities = false;
        let pixels: Vec<_> = image
            .rgba8_premul
            .chunks_exact(4)
            .map(|px| {
                may_have_opacities |= px[3] != 255;
                vello_cpu::peniko::color::PremulRgba8 {
                    r: px[0],
                    g: px[1],
                    b: px[2],
                    a: px[3],
                }
            })
            .collect();
        let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);

        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: image.width,
            height: image.height,
        })
    }

    /// Natural width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Natural height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Pre-rendered subtitle band: white text and its blurred shadow, reused while the cue is
/// unchanged.
struct SubtitleOverlay {
    text: String,
    top: i64,
    height: u32,
    text_layer: Vec<u8>,
    shadow_layer: Vec<u8>,
}

/// Draws slideshow frames: background, current slide at its placement, subtitle overlay.
pub struct FrameRenderer {
    config: SlideshowConfig,
    subtitles: SubtitleIndex,
    background: [u8; 4],
    typesetter: Option<SubtitleTypesetter>,
    overlay: Option<SubtitleOverlay>,
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("config", &self.config)
            .field("cues", &self.subtitles.len())
            .field("background", &self.background)
            .field("subtitles_enabled", &self.typesetter.is_some())
            .finish_non_exhaustive()
    }
}

impl FrameRenderer {
    /// Renderer over a black background with subtitles disabled until a font is set.
    pub fn new(config: SlideshowConfig, subtitles: SubtitleIndex) -> Self {
        Self {
            config,
            subtitles,
            background: [0, 0, 0, 255],
            typesetter: None,
            overlay: None,
        }
    }

    /// Straight RGBA8 background color; alpha is forced opaque.
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = [rgba[0], rgba[1], rgba[2], 255];
        self
    }

    /// Enable subtitles with `font`. With no usable font, subtitles are skipped and a single
    /// warning is logged if there are cues to show.
    pub fn with_font(mut self, font: Option<&SubtitleFont>, style: SubtitleStyle) -> Self {
        self.overlay = None;
        self.typesetter = match font.map(|f| SubtitleTypesetter::new(f, style)) {
            Some(Ok(ts)) => {
                tracing::debug!(font = %font.map(|f| f.origin.as_str()).unwrap_or(""), "subtitle font ready");
                Some(ts)
            }
            Some(Err(e)) => {
                if !self.subtitles.is_empty() {
                    tracing::warn!(error = %e, "subtitle font unusable, subtitles will not be drawn");
                }
                None
            }
            None => {
                if !self.subtitles.is_empty() {
                    tracing::warn!("no subtitle font found, subtitles will not be drawn");
                }
                None
            }
        };
        self
    }

    /// Whether subtitle text will be drawn.
    pub fn subtitles_enabled(&self) -> bool {
        self.typesetter.is_some()
    }

    /// Render the frame at `t` seconds onto `surface` and return its pixels.
    ///
    /// A slide slot without a drawable is skipped; the frame still gets its background and
    /// subtitle.
    pub fn render_frame(
        &mut self,
        surface: &mut Surface,
        t: f64,
        slides: &[Option<Drawable>],
    ) -> SlidecastResult<FrameRGBA> {
        let canvas = surface.canvas;
        let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));

        let mut ctx = vello_cpu::RenderContext::new(surface.width, surface.height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        let [r, g, b, a] = self.background;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, cw, ch));

        let slide = Timeline::slide_index_at(t, self.config.slide_secs(), slides.len())
            .and_then(|i| slides.get(i))
            .and_then(Option::as_ref);
        if let Some(slide) = slide {
            let (iw, ih) = (f64::from(slide.width), f64::from(slide.height));
            let progress = Timeline::local_progress(t, self.config.slide_secs());
            let placement = compute_transform(self.config.effect, progress, cw, ch, iw, ih);
            ctx.set_transform(affine_to_cpu(placement.to_affine(iw, ih)));
            ctx.set_paint(slide.paint.clone());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut surface.pixmap);

        let text = self.subtitles.active_cue_at(t).to_string();
        if !text.is_empty() {
            self.draw_subtitle(surface, &text)?;
        }

        Ok(surface.snapshot())
    }

    fn draw_subtitle(&mut self, surface: &mut Surface, text: &str) -> SlidecastResult<()> {
        let Some(typesetter) = self.typesetter.as_mut() else {
            return Ok(());
        };
        let stale = self.overlay.as_ref().is_none_or(|o| o.text != text);
        if stale {
            self.overlay = Some(build_overlay(typesetter, text, surface.canvas)?);
        }
        let Some(overlay) = self.overlay.as_ref() else {
            return Ok(());
        };

        let row_bytes = surface.canvas.width as usize * 4;
        let surface_h = i64::from(surface.canvas.height);
        let data = surface.pixmap.data_as_u8_slice_mut();
        for band_y in 0..i64::from(overlay.height) {
            let y = overlay.top + band_y;
            if y < 0 || y >= surface_h {
                continue;
            }
            let dst = &mut data[y as usize * row_bytes..(y as usize + 1) * row_bytes];
            let src = band_y as usize * row_bytes..(band_y as usize + 1) * row_bytes;
            over_in_place(dst, &overlay.shadow_layer[src.clone()], 1.0)?;
            over_in_place(dst, &overlay.text_layer[src], 1.0)?;
        }
        Ok(())
    }
}

fn build_overlay(
    typesetter: &mut SubtitleTypesetter,
    text: &str,
    canvas: Canvas,
) -> SlidecastResult<SubtitleOverlay> {
    let style = *typesetter.style();
    let (cw, ch) = (canvas.width as f32, canvas.height as f32);
    let lines = wrap_words(text, style.max_width(cw), typesetter);
    let baselines = style.baselines(lines.len(), ch);
    let (radius, sigma) = shadow_blur_params(style.shadow_blur);

    let first = baselines.first().copied().unwrap_or(ch);
    let last = baselines.last().copied().unwrap_or(ch);
    let top = (first - style.line_height_px).floor() as i64 - i64::from(radius);
    let bottom = (last + style.line_height_px * 0.5).ceil() as i64 + i64::from(radius);
    let height: u16 = (bottom - top)
        .clamp(1, i64::from(u16::MAX))
        .try_into()
        .map_err(|_| SlidecastError::validation("subtitle band height exceeds u16"))?;
    let (width, _) = canvas.as_u16()?;

    let shaped: Vec<_> = lines.iter().map(|l| typesetter.shape_line(l)).collect();
    let font = typesetter.font().clone();

    let mut band = vello_cpu::Pixmap::new(width, height);
    let mut ctx = vello_cpu::RenderContext::new(width, height);
    let [r, g, b, a] = style.fill;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    for (line, baseline) in shaped.into_iter().zip(baselines) {
        let x = f64::from((cw - line.width) / 2.0);
        let y = f64::from(baseline - line.baseline) - top as f64;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
        ctx.glyph_run(&font)
            .font_size(line.font_size)
            .fill_glyphs(line.glyphs.into_iter());
    }
    ctx.flush();
    ctx.render_to_pixmap(&mut band);

    let text_layer = band.data_as_u8_slice().to_vec();
    let mut shadow = text_layer.clone();
    let [sr, sg, sb, sa] = style.shadow;
    tint_coverage_in_place(&mut shadow, [sr, sg, sb], sa);
    let shadow_layer =
        blur_rgba8_premul(&shadow, u32::from(width), u32::from(height), radius, sigma)?;

    Ok(SubtitleOverlay {
        text: text.to_string(),
        top,
        height: u32::from(height),
        text_layer,
        shadow_layer,
    })
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
