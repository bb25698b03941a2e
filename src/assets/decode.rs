use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::foundation::error::SlidecastResult;

/// Decoded still image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Where a slide image comes from.
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Image file on disk.
    File(PathBuf),
    /// Encoded image bytes already in memory (PNG, JPEG, ...).
    Encoded {
        /// Name used in logs and errors.
        label: String,
        /// Encoded file contents.
        bytes: Arc<Vec<u8>>,
    },
}

impl ImageSource {
    /// Name used in logs and errors.
    pub fn label(&self) -> String {
        match self {
            ImageSource::File(p) => p.display().to_string(),
            ImageSource::Encoded { label, .. } => label.clone(),
        }
    }

    /// Read (if needed) and decode the image.
    pub fn load(&self) -> SlidecastResult<DecodedImage> {
        match self {
            ImageSource::File(path) => decode_image_file(path),
            ImageSource::Encoded { label, bytes } => {
                decode_image(bytes)
                    .with_context(|| format!("decode image '{label}'"))
                    .map_err(Into::into)
            }
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::File(path)
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> SlidecastResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn decode_image_file(path: &Path) -> SlidecastResult<DecodedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
        .with_context(|| format!("decode image '{}'", path.display()))
        .map_err(Into::into)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
