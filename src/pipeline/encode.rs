//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! PNG over JPEG: lossless compression keeps rendered text crisp, and
//! crisp text is what decides vision-model transcription accuracy.
//! `detail: "high"` lets GPT-4-class models use their full image tile
//! budget so small print and table cells stay legible.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG ready for the vision model.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_produces_valid_base64_png() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        // PNG signature
        assert_eq!(&decoded[..4], &[0x89, b'P', b'N', b'G']);
    }
}
