//! Capability registry for segmentation backends
//!
//! Built once during process initialization: every adapter is registered and
//! probed for availability exactly once. The dispatcher and the `/models`
//! listing both read from this registry; nothing re-probes per request and
//! the descriptor set never mutates after boot.

use crate::backends::{
    BirefnetBackend, ExternalCliBackend, RembgBackend, RembgTier, SegmentationBackend,
};
use crate::download::ModelFetcher;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Identifier of the guaranteed fallback tier.
pub const DEFAULT_MODEL: &str = "rembg";

/// Immutable description of one registered backend.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    /// Request identifier
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Availability, probed once at boot
    pub available: bool,
}

struct Registered {
    descriptor: ModelDescriptor,
    backend: Arc<dyn SegmentationBackend>,
}

/// Process-wide set of segmentation backends.
pub struct ModelRegistry {
    entries: Vec<Registered>,
}

impl ModelRegistry {
    /// Register the full production backend set, probing availability once.
    #[must_use]
    pub fn bootstrap(fetcher: &Arc<ModelFetcher>) -> Self {
        Self::with_backends(vec![
            Arc::new(RembgBackend::new(RembgTier::Standard, Arc::clone(fetcher))),
            Arc::new(RembgBackend::new(RembgTier::Fast, Arc::clone(fetcher))),
            Arc::new(RembgBackend::new(RembgTier::Anime, Arc::clone(fetcher))),
            Arc::new(ExternalCliBackend::from_env()),
            Arc::new(BirefnetBackend::new(Arc::clone(fetcher))),
        ])
    }

    /// Build a registry from explicit backends (test and embedding hook).
    #[must_use]
    pub fn with_backends(backends: Vec<Arc<dyn SegmentationBackend>>) -> Self {
        let entries: Vec<Registered> = backends
            .into_iter()
            .map(|backend| {
                let descriptor = ModelDescriptor {
                    id: backend.id().to_string(),
                    label: backend.label().to_string(),
                    available: backend.is_available(),
                };
                Registered {
                    descriptor,
                    backend,
                }
            })
            .collect();

        for entry in &entries {
            info!(
                model = %entry.descriptor.id,
                available = entry.descriptor.available,
                "registered backend"
            );
        }
        Self { entries }
    }

    /// Look up an available backend by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn SegmentationBackend>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id && e.descriptor.available)
            .map(|e| Arc::clone(&e.backend))
    }

    /// Look up a backend regardless of its availability probe.
    ///
    /// Used for the default tier: a stale probe must not prevent the
    /// fallback attempt, whose own failure is surfaced instead.
    #[must_use]
    pub fn get_unchecked(&self, id: &str) -> Option<Arc<dyn SegmentationBackend>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| Arc::clone(&e.backend))
    }

    /// Label of a registered backend, if any.
    #[must_use]
    pub fn label(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| e.descriptor.label.as_str())
    }

    /// All registered descriptors.
    #[must_use]
    pub fn descriptors(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Descriptors for available backends only, in registration order.
    #[must_use]
    pub fn available(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.descriptors().filter(|d| d.available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;

    fn registry() -> ModelRegistry {
        ModelRegistry::with_backends(vec![
            Arc::new(MockBackend::new("rembg", "Mock Standard")),
            Arc::new(MockBackend::new("rembg-fast", "Mock Fast")),
            Arc::new(MockBackend::unavailable("backgroundremover", "Mock CLI")),
        ])
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = registry();
        assert!(registry.get("rembg").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_unavailable_backends_are_hidden() {
        let registry = registry();
        assert!(registry.get("backgroundremover").is_none());
        assert!(registry.get_unchecked("backgroundremover").is_some());

        let available: Vec<_> = registry.available().map(|d| d.id.clone()).collect();
        assert_eq!(available, vec!["rembg", "rembg-fast"]);
    }

    #[test]
    fn test_labels() {
        let registry = registry();
        assert_eq!(registry.label("rembg-fast"), Some("Mock Fast"));
        assert_eq!(registry.label("nope"), None);
    }
}
