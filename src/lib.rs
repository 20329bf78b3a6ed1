//! # BgRemove API
//!
//! HTTP background removal service built on pluggable segmentation
//! backends. An uploaded image is decoded, dispatched to one of several
//! external segmentation providers, optionally composited over a custom
//! background, and returned as PNG (single image), ZIP (batch), or a
//! multi-model comparison payload.
//!
//! The segmentation itself is delegated entirely to external collaborators:
//! the U²-Net model family and BiRefNet run in-process through ONNX Runtime,
//! and the `backgroundremover` CLI runs as a subprocess. The service's own
//! logic is dispatch-by-name with graceful degradation and alpha-aware
//! background composition.
//!
//! ## Dispatch policy
//!
//! Unknown or unavailable model identifiers resolve to the default tier
//! rather than erroring, and any backend failure triggers one fallback to
//! the default tier. Only a failure of the default tier itself fails the
//! request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bgremove_api::{download::ModelFetcher, registry::ModelRegistry, server};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fetcher = Arc::new(ModelFetcher::new()?);
//! let registry = ModelRegistry::bootstrap(&fetcher);
//! let state = Arc::new(server::AppState::new(registry));
//! server::serve(state, [0, 0, 0, 0].into(), 8001).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Library usage
//!
//! The pipeline is usable without the HTTP layer:
//!
//! ```rust,no_run
//! use bgremove_api::{
//!     download::ModelFetcher, registry::ModelRegistry, remove_background_from_bytes,
//!     Dispatcher,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
//! let fetcher = Arc::new(ModelFetcher::new()?);
//! let registry = Arc::new(ModelRegistry::bootstrap(&fetcher));
//! let dispatcher = Dispatcher::new(registry);
//! let png = remove_background_from_bytes(&upload, "rembg", &dispatcher).await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod compositor;
pub mod dispatcher;
pub mod download;
pub mod error;
pub mod format;
pub mod preprocessing;
pub mod registry;
pub mod server;

pub use compositor::{parse_hex_color, BackgroundSpec};
pub use dispatcher::Dispatcher;
pub use download::ModelFetcher;
pub use error::{RemovalError, Result};
pub use registry::{ModelDescriptor, ModelRegistry, DEFAULT_MODEL};

/// Remove the background from encoded image bytes and return PNG bytes.
///
/// Decodes the upload, dispatches segmentation by model identifier (with
/// the usual fallback policy), and re-encodes the RGBA result as PNG. No
/// background compositing is applied.
///
/// # Errors
/// - `Decode` if the bytes are not a decodable image
/// - `Processing` if the default backend fails
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    model_id: &str,
    dispatcher: &Dispatcher,
) -> Result<Vec<u8>> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| RemovalError::decode(e.to_string()))?;
    let segmented = dispatcher.segment(&image, model_id).await?;
    format::encode_png(&segmented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockBackend, SegmentationBackend};
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_remove_background_from_bytes() {
        let registry = ModelRegistry::with_backends(vec![Arc::new(MockBackend::new(
            DEFAULT_MODEL,
            "Mock",
        ))
            as Arc<dyn SegmentationBackend>]);
        let dispatcher = Dispatcher::new(Arc::new(registry));

        let img = RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();

        let out = remove_background_from_bytes(&png.into_inner(), "rembg", &dispatcher)
            .await
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 16));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_a_decode_error() {
        let registry = ModelRegistry::with_backends(vec![]);
        let dispatcher = Dispatcher::new(Arc::new(registry));

        let err = remove_background_from_bytes(b"not an image", "rembg", &dispatcher)
            .await
            .unwrap_err();
        assert!(matches!(err, RemovalError::Decode(_)));
    }
}
