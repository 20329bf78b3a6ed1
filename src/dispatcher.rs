//! Model dispatch with graceful degradation
//!
//! Maps a requested model identifier to a backend and runs it, falling back
//! to the default tier whenever the requested backend is unknown,
//! unavailable, or fails. Backend unavailability must never fail a request
//! that the default path can still serve; only a failure of the default
//! tier itself reaches the caller.

use crate::error::{RemovalError, Result};
use crate::registry::{ModelRegistry, DEFAULT_MODEL};
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Request-facing dispatch over the backend registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a boot-time registry.
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Segment `image` with the requested model.
    ///
    /// Resolution per request: the named backend if registered and
    /// available, else the default tier. A failure of the resolved backend
    /// triggers one fallback to the default tier; there are no retries
    /// beyond that substitution.
    ///
    /// # Errors
    /// - `Processing` if the default tier itself fails or is not registered
    pub async fn segment(&self, image: &DynamicImage, model_id: &str) -> Result<RgbaImage> {
        let backend = match self.registry.get(model_id) {
            Some(backend) => backend,
            None => {
                if model_id != DEFAULT_MODEL {
                    debug!(
                        requested = model_id,
                        "unknown or unavailable model, using default"
                    );
                }
                self.default_backend()?
            },
        };

        match backend.segment(image).await {
            Ok(result) => Ok(result),
            Err(err) if backend.id() != DEFAULT_MODEL => {
                warn!(
                    model = backend.id(),
                    error = %err,
                    "backend failed, falling back to default"
                );
                let default = self.default_backend()?;
                default
                    .segment(image)
                    .await
                    .map_err(|e| Self::default_failure(&e))
            },
            Err(err) => Err(Self::default_failure(&err)),
        }
    }

    fn default_backend(&self) -> Result<Arc<dyn crate::backends::SegmentationBackend>> {
        self.registry.get_unchecked(DEFAULT_MODEL).ok_or_else(|| {
            RemovalError::processing(format!("default backend '{DEFAULT_MODEL}' is not registered"))
        })
    }

    fn default_failure(err: &RemovalError) -> RemovalError {
        RemovalError::processing(format!("default backend '{DEFAULT_MODEL}' failed: {err}"))
    }
}
