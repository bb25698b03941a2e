use crate::foundation::{
    error::{SlidecastError, SlidecastResult},
    math::mul_div255_u8,
};

/// Premultiplied RGBA8 pixel.
pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over of one premultiplied pixel at `opacity`.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite `src` over `dst` pixel by pixel. Buffers must have equal RGBA8 length.
pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> SlidecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Replace every pixel's color with `rgb` keeping coverage, then scale alpha by `alpha`.
///
/// Turns a rendered glyph mask into a tinted shadow layer.
pub(crate) fn tint_coverage_in_place(buf: &mut [u8], rgb: [u8; 3], alpha: u8) {
    for px in buf.chunks_exact_mut(4) {
        let a = mul_div255_u8(u16::from(px[3]), u16::from(alpha));
        px[0] = mul_div255_u8(u16::from(rgb[0]), u16::from(a));
        px[1] = mul_div255_u8(u16::from(rgb[1]), u16::from(a));
        px[2] = mul_div255_u8(u16::from(rgb[2]), u16::from(a));
        px[3] = a;
    }
}
