//! Segmentation backend adapters
//!
//! Each external segmentation provider sits behind the same capability:
//! [`SegmentationBackend::segment`] takes a decoded image and returns an
//! RGBA image whose alpha channel encodes the foreground/background
//! separation. Adapters differ only in how the provider is invoked; the
//! dispatcher treats them interchangeably.

use crate::error::Result;
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};

pub mod birefnet;
pub mod external;
pub mod mock;
pub mod onnx;
pub mod rembg;

pub use birefnet::BirefnetBackend;
pub use external::ExternalCliBackend;
pub use mock::MockBackend;
pub use rembg::{RembgBackend, RembgTier};

/// Uniform capability every segmentation provider is wrapped behind.
#[async_trait]
pub trait SegmentationBackend: Send + Sync {
    /// Stable identifier used in requests and the `/models` listing
    fn id(&self) -> &str;

    /// Human-readable label for the `/models` listing
    fn label(&self) -> &str;

    /// Availability probe, evaluated once at process start
    fn is_available(&self) -> bool;

    /// Segment the image, returning RGBA output at the input's dimensions.
    ///
    /// # Errors
    /// - `BackendUnavailable` if required weights or binaries are missing
    /// - `BackendFailure` on inference errors, non-zero exits, or timeouts
    async fn segment(&self, image: &DynamicImage) -> Result<RgbaImage>;
}
