//! Mock backend for testing
//!
//! Lets dispatcher and HTTP tests run without model weights or external
//! tools. The mock produces a soft circular mask centered on the image, so
//! outputs have both fully transparent corners and partially transparent
//! edge pixels to assert against.

use crate::backends::SegmentationBackend;
use crate::error::{RemovalError, Result};
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Configurable in-memory segmentation backend.
pub struct MockBackend {
    id: String,
    label: String,
    available: bool,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Create a mock that succeeds with a circular mask.
    #[must_use]
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            available: true,
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock whose `segment` always fails.
    #[must_use]
    pub fn failing(id: &str, label: &str) -> Self {
        let mut backend = Self::new(id, label);
        backend.should_fail = true;
        backend
    }

    /// Create a mock that reports itself unavailable.
    #[must_use]
    pub fn unavailable(id: &str, label: &str) -> Self {
        let mut backend = Self::new(id, label);
        backend.available = false;
        backend
    }

    /// Number of `segment` invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentationBackend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn segment(&self, image: &DynamicImage) -> Result<RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(RemovalError::backend(format!(
                "mock backend '{}' configured to fail",
                self.id
            )));
        }

        let (width, height) = image.dimensions();
        let mut rgba = image.to_rgba8();

        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 3.0).max(1.0);

        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let dx = x as f32 - center_x;
            let dy = y as f32 - center_y;
            let distance = (dx * dx + dy * dy).sqrt();
            let alpha = if distance < radius {
                ((radius - distance) / radius).clamp(0.0, 1.0)
            } else {
                0.0
            };
            pixel.0[3] = (alpha * 255.0) as u8;
        }
        Ok(rgba)
    }
}
