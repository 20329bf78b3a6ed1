//! Shared image preprocessing and mask post-processing
//!
//! All ONNX-backed tiers share the same pipeline shape: square resize to the
//! model resolution, per-channel normalization into an NCHW f32 tensor, and
//! on the way back a single-channel probability map that is resized to the
//! source resolution and applied as the alpha channel of the original image.

use crate::error::{RemovalError, Result};
use image::{imageops::FilterType, DynamicImage, GrayImage, RgbaImage};
use ndarray::Array4;

/// How raw model output values are mapped into [0, 1] mask probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskActivation {
    /// Sigmoid over raw logits (BiRefNet-style heads)
    Sigmoid,
    /// Min-max normalization of an already-bounded saliency map (U²-Net family)
    MinMax,
}

/// Per-model preprocessing constants.
#[derive(Debug, Clone)]
pub struct PreprocessingConfig {
    /// Square model input resolution
    pub target_size: u32,
    /// Per-channel normalization mean
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization std
    pub normalization_std: [f32; 3],
    /// Output activation applied before mask construction
    pub activation: MaskActivation,
}

/// Convert an image to a normalized NCHW tensor at the model resolution.
///
/// The resize is an exact square resize; aspect ratio is intentionally not
/// preserved, matching how the wrapped models were trained to be fed.
#[must_use]
pub fn image_to_tensor(image: &DynamicImage, config: &PreprocessingConfig) -> Array4<f32> {
    let size = config.target_size;
    let resized = image::imageops::resize(&image.to_rgb8(), size, size, FilterType::Triangle);

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let normalized = (f32::from(pixel[c]) / 255.0 - config.normalization_mean[c])
                / config.normalization_std[c];
            tensor[[0, c, y as usize, x as usize]] = normalized;
        }
    }
    tensor
}

/// Convert a `(1, 1, H, W)` output tensor into an 8-bit mask at the original
/// image dimensions.
///
/// The activation runs at tensor resolution; the resulting map is resized
/// back to `original_dimensions` so the mask always matches the source image,
/// never the inference-time copy.
///
/// # Errors
/// - `Processing` if the tensor is not a single-channel 4D map
pub fn tensor_to_mask(
    tensor: &Array4<f32>,
    activation: MaskActivation,
    original_dimensions: (u32, u32),
) -> Result<GrayImage> {
    let shape = tensor.shape();
    if shape[0] != 1 || shape[1] != 1 {
        return Err(RemovalError::processing(format!(
            "expected (1, 1, H, W) output tensor, got {shape:?}"
        )));
    }
    let (height, width) = (shape[2], shape[3]);

    let values: Vec<f32> = match activation {
        MaskActivation::Sigmoid => tensor.iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect(),
        MaskActivation::MinMax => {
            let max = tensor.iter().copied().fold(f32::MIN, f32::max);
            let min = tensor.iter().copied().fold(f32::MAX, f32::min);
            let range = (max - min).max(f32::EPSILON);
            tensor.iter().map(|v| (v - min) / range).collect()
        },
    };

    let mut mask = GrayImage::new(width as u32, height as u32);
    for (value, pixel) in values.iter().zip(mask.pixels_mut()) {
        pixel.0[0] = (value.clamp(0.0, 1.0) * 255.0) as u8;
    }

    let (orig_width, orig_height) = original_dimensions;
    if mask.dimensions() != original_dimensions {
        mask = image::imageops::resize(&mask, orig_width, orig_height, FilterType::CatmullRom);
    }
    Ok(mask)
}

/// Apply a mask as the alpha channel of the original image.
///
/// The mask must already match the image dimensions; color channels are
/// taken from the source image untouched.
#[must_use]
pub fn apply_alpha_mask(image: &DynamicImage, mask: &GrayImage) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    for (x, y, pixel) in rgba.enumerate_pixels_mut() {
        pixel.0[3] = mask.get_pixel(x, y).0[0];
    }
    rgba
}

/// Edge-refinement pass over a mask ("alpha matting").
///
/// Smooths the hard foreground/background boundary by blurring the mask and
/// keeping the blurred values only inside the transition band. Solid
/// foreground and solid background stay untouched.
#[must_use]
pub fn feather_mask(mask: &GrayImage) -> GrayImage {
    const SOLID_FG: u8 = 250;
    const SOLID_BG: u8 = 5;

    let blurred = image::imageops::blur(mask, 2.0);
    let mut out = mask.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let original = pixel.0[0];
        if original < SOLID_FG && original > SOLID_BG {
            pixel.0[0] = blurred.get_pixel(x, y).0[0];
        }
    }
    out
}
