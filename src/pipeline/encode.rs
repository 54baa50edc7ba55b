//! Image encoding: `DynamicImage` → PNG bytes, bytes → base64.
//!
//! Images come out of pdfium as decoded bitmaps regardless of how they were
//! stored in the PDF (DCT, Flate, JBIG2, ...). Re-encoding everything as PNG
//! gives the renderer and the vision API one lossless format to deal with.

use crate::output::{ExtractedImage, ImageFormat};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a decoded image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} PNG bytes",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

pub fn to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// `data:` URI for inlining an image in Markdown.
pub fn data_uri(image: &ExtractedImage) -> String {
    format!("data:{};base64,{}", image.format.mime(), to_base64(&image.data))
}

/// Wrap an extracted image for a vision request.
///
/// `detail: "high"` lets GPT-4-class models tile the image instead of
/// downscaling it to a single 512 px overview, so chart labels stay legible.
pub fn to_image_data(image: &ExtractedImage) -> ImageData {
    ImageData::new(to_base64(&image.data), image.format.mime()).with_detail("high")
}

/// Sniff the format from magic bytes.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let bytes = encode_png(&red_square()).expect("encode should succeed");
        assert_eq!(sniff_format(&bytes), Some(ImageFormat::Png));
    }

    #[test]
    fn data_uri_has_mime_prefix() {
        let img = ExtractedImage::new(1, 0, vec![1, 2, 3], ImageFormat::Jpeg);
        assert_eq!(data_uri(&img), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn image_data_round_trips_base64() {
        let bytes = encode_png(&red_square()).unwrap();
        let img = ExtractedImage::new(1, 0, bytes.clone(), ImageFormat::Png);
        let data = to_image_data(&img);
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&data.data).unwrap(), bytes);
    }

    #[test]
    fn sniff_unknown() {
        assert_eq!(sniff_format(b"GIF89a"), None);
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
    }
}
