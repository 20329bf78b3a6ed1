//! Output encoding helpers

use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Encode an RGBA image as PNG bytes, alpha channel preserved.
///
/// # Errors
/// - `Image` on encoder failures
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Encode an RGBA image as a `data:image/png;base64,...` URI.
///
/// # Errors
/// - `Image` on encoder failures
pub fn png_data_uri(image: &RgbaImage) -> Result<String> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_encode_png_round_trips_alpha() {
        let mut img = RgbaImage::from_pixel(5, 5, Rgba([10, 20, 30, 255]));
        img.put_pixel(2, 2, Rgba([1, 2, 3, 40]));

        let png = encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (5, 5));
        assert_eq!(decoded.get_pixel(2, 2).0, [1, 2, 3, 40]);
    }

    #[test]
    fn test_data_uri_prefix() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let uri = png_data_uri(&img).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(uri.len() > "data:image/png;base64,".len());
    }
}
