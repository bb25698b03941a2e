pub(crate) mod blur;
pub(crate) mod composite;
pub(crate) mod frame;
pub(crate) mod text;

/// One rendered frame in RGBA8 form.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 bytes.
    pub data: Vec<u8>,
    /// `true` when `data` is premultiplied by alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data
            .get(i..i + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    /// Copy with alpha divided out of the color channels.
    pub fn to_straight(&self) -> FrameRGBA {
        if !self.premultiplied {
            return self.clone();
        }
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        FrameRGBA {
            width: self.width,
            height: self.height,
            data,
            premultiplied: false,
        }
    }
}
