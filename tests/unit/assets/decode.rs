use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let decoded = decode_image(&png_bytes(1, 1, [100, 50, 200, 128])).unwrap();
    assert_eq!(decoded.width, 1);
    assert_eq!(decoded.height, 1);
    assert_eq!(
        decoded.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn encoded_source_reports_natural_size() {
    let src = ImageSource::Encoded {
        label: "wide.png".to_string(),
        bytes: Arc::new(png_bytes(8, 2, [255, 0, 0, 255])),
    };
    let decoded = src.load().unwrap();
    assert_eq!((decoded.width, decoded.height), (8, 2));
    assert_eq!(decoded.rgba8_premul.len(), 8 * 2 * 4);
}

#[test]
fn garbage_bytes_fail_with_label_in_message() {
    let src = ImageSource::Encoded {
        label: "broken.jpg".to_string(),
        bytes: Arc::new(b"not an image".to_vec()),
    };
    let err = src.load().unwrap_err();
    assert!(format!("{err:#}").contains("broken.jpg"));
}

#[test]
fn missing_file_is_an_error() {
    let src = ImageSource::File(PathBuf::from("target/definitely/missing.png"));
    assert!(src.load().is_err());
}
