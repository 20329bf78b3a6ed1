//! Alpha-aware background composition
//!
//! Takes the RGBA output of a segmentation backend and flattens it over a
//! caller-supplied background: either a solid color parsed from a hex string
//! or an uploaded image resized to match the foreground.

use crate::error::{RemovalError, Result};
use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};

/// Background specification for the compositing stage.
///
/// When a request carries both a color and an image, the image wins.
#[derive(Debug, Clone)]
pub enum BackgroundSpec {
    /// Opaque solid color background
    Color([u8; 3]),
    /// Uploaded background image, resized to the foreground dimensions
    Image(DynamicImage),
}

impl BackgroundSpec {
    /// Build a background spec from the optional request fields.
    ///
    /// Returns `None` when neither field is present. An uploaded image takes
    /// precedence over a color.
    ///
    /// # Errors
    /// - `Decode` if the background image bytes are not a valid image
    /// - `InvalidColorFormat` if the color string is malformed
    pub fn from_request(bg_color: Option<&str>, bg_image: Option<&[u8]>) -> Result<Option<Self>> {
        if let Some(bytes) = bg_image {
            let img = image::load_from_memory(bytes)
                .map_err(|e| RemovalError::decode(format!("background image: {e}")))?;
            return Ok(Some(Self::Image(img)));
        }
        if let Some(color) = bg_color {
            return Ok(Some(Self::Color(parse_hex_color(color)?)));
        }
        Ok(None)
    }
}

/// Parse a `#RRGGBB` color string into an RGB triple.
///
/// The leading `#` is optional; anything other than exactly 6 hex digits
/// after stripping it is rejected.
///
/// # Errors
/// - `InvalidColorFormat` on wrong length or non-hex characters
pub fn parse_hex_color(color: &str) -> Result<[u8; 3]> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RemovalError::invalid_color(format!(
            "expected 6 hex digits, got {color:?}"
        )));
    }
    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(hex.get(range).unwrap_or_default(), 16)
            .map_err(|e| RemovalError::invalid_color(format!("{color:?}: {e}")))
    };
    Ok([component(0..2)?, component(2..4)?, component(4..6)?])
}

/// Composite a foreground over the given background.
///
/// With no spec the foreground is returned unchanged. Otherwise a background
/// canvas matching the foreground dimensions is built (solid color, or the
/// uploaded image resized with Lanczos resampling) and the foreground is
/// blended over it. Residual foreground transparency survives in the output
/// alpha channel; it is not forced to opaque.
#[must_use]
pub fn apply(foreground: RgbaImage, spec: Option<&BackgroundSpec>) -> RgbaImage {
    let Some(spec) = spec else {
        return foreground;
    };

    let (width, height) = foreground.dimensions();
    let background: RgbaImage = match spec {
        BackgroundSpec::Color([r, g, b]) => {
            RgbaImage::from_pixel(width, height, Rgba([*r, *g, *b, 255]))
        },
        BackgroundSpec::Image(img) => {
            image::imageops::resize(&img.to_rgba8(), width, height, FilterType::Lanczos3)
        },
    };

    composite_over(&foreground, &background)
}

/// Standard "over" alpha blend of `fg` onto `bg`.
///
/// Both images must share dimensions. Each output channel is
/// `fg * a + bg * (1 - a)` weighted by the foreground alpha; the output
/// alpha is `fg_a + bg_a * (1 - fg_a)`.
fn composite_over(fg: &RgbaImage, bg: &RgbaImage) -> RgbaImage {
    debug_assert_eq!(fg.dimensions(), bg.dimensions());

    let mut out = RgbaImage::new(fg.width(), fg.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let f = fg.get_pixel(x, y).0;
        let b = bg.get_pixel(x, y).0;
        let fa = u32::from(f[3]);
        let inv = 255 - fa;

        let blend = |fc: u8, bc: u8| -> u8 {
            ((u32::from(fc) * fa + u32::from(bc) * inv + 127) / 255) as u8
        };

        *pixel = Rgba([
            blend(f[0], b[0]),
            blend(f[1], b[1]),
            blend(f[2], b[2]),
            (fa + u32::from(b[3]) * inv / 255) as u8,
        ]);
    }
    out
}
