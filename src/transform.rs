//! Per-instant slide placement.
//!
//! [`compute_transform`] is pure: the same effect, progress and geometry always produce the same
//! [`Placement`], so preview and export agree on where a slide lands.

use kurbo::{Affine, Rect, Vec2};

use crate::timeline::Effect;

const ZOOM_RANGE: f64 = 0.1;
const PAN_SCALE: f64 = 1.15;
const PAN_TRAVEL: f64 = 0.04;

/// Slide placement on the canvas for one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Effect scale applied on top of the cover-fit size.
    pub scale: f64,
    /// Horizontal offset from centered, in canvas pixels.
    pub dx: f64,
    /// Vertical offset from centered, in canvas pixels.
    pub dy: f64,
    /// Cover-fit width before the effect scale.
    pub base_width: f64,
    /// Cover-fit height before the effect scale.
    pub base_height: f64,
    canvas_width: f64,
    canvas_height: f64,
}

impl Placement {
    /// Rendered width (`base_width * scale`).
    pub fn final_width(&self) -> f64 {
        self.base_width * self.scale
    }

    /// Rendered height (`base_height * scale`).
    pub fn final_height(&self) -> f64 {
        self.base_height * self.scale
    }

    /// Top-left corner of the rendered slide.
    pub fn origin(&self) -> Vec2 {
        Vec2::new(
            (self.canvas_width - self.final_width()) / 2.0 + self.dx,
            (self.canvas_height - self.final_height()) / 2.0 + self.dy,
        )
    }

    /// Destination rectangle in canvas coordinates.
    pub fn final_rect(&self) -> Rect {
        let o = self.origin();
        Rect::new(o.x, o.y, o.x + self.final_width(), o.y + self.final_height())
    }

    /// Map image pixel space `(0,0)-(img_w,img_h)` onto [`Placement::final_rect`].
    pub fn to_affine(&self, img_width: f64, img_height: f64) -> Affine {
        if img_width <= 0.0 || img_height <= 0.0 {
            return Affine::translate(self.origin());
        }
        Affine::translate(self.origin())
            * Affine::scale_non_uniform(
                self.final_width() / img_width,
                self.final_height() / img_height,
            )
    }
}

/// Compute the placement of a slide at local `progress` in `[0, 1)`.
///
/// The base size is a cover fit: images wider than the canvas fit by height and overflow
/// horizontally, all others fit by width and overflow vertically. Every effect scale is >= 1, so
/// the canvas is always fully covered.
pub fn compute_transform(
    effect: Effect,
    progress: f64,
    canvas_width: f64,
    canvas_height: f64,
    img_width: f64,
    img_height: f64,
) -> Placement {
    let (scale, dx, dy) = match effect {
        Effect::ZoomIn => (1.0 + progress * ZOOM_RANGE, 0.0, 0.0),
        Effect::ZoomOut => (1.0 + ZOOM_RANGE - progress * ZOOM_RANGE, 0.0, 0.0),
        Effect::Pan => (
            PAN_SCALE,
            (progress - 0.5) * canvas_width * PAN_TRAVEL,
            (progress - 0.5) * canvas_height * PAN_TRAVEL,
        ),
        Effect::None => (1.0, 0.0, 0.0),
    };

    let (base_width, base_height) = cover_fit(canvas_width, canvas_height, img_width, img_height);

    Placement {
        scale,
        dx,
        dy,
        base_width,
        base_height,
        canvas_width,
        canvas_height,
    }
}

fn cover_fit(canvas_width: f64, canvas_height: f64, img_width: f64, img_height: f64) -> (f64, f64) {
    if img_width <= 0.0 || img_height <= 0.0 || canvas_height <= 0.0 {
        return (canvas_width, canvas_height);
    }
    let img_aspect = img_width / img_height;
    let canvas_aspect = canvas_width / canvas_height;
    if img_aspect > canvas_aspect {
        (canvas_height * img_aspect, canvas_height)
    } else {
        (canvas_width, canvas_width / img_aspect)
    }
}

#[cfg(test)]
#[path = "../tests/unit/transform.rs"]
mod tests;
