//! In-process U²-Net family tiers
//!
//! The three library-style tiers run saliency models directly through ONNX
//! Runtime. They share one code path and differ only in weight set, input
//! resolution, and whether the edge-refinement pass runs on the mask.

use crate::backends::onnx::LazySession;
use crate::backends::SegmentationBackend;
use crate::download::{ModelFetcher, ModelWeights};
use crate::error::Result;
use crate::preprocessing::{self, MaskActivation, PreprocessingConfig};
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::sync::Arc;
use tracing::debug;

const U2NET_WEIGHTS: ModelWeights = ModelWeights {
    file_name: "u2net.onnx",
    url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2net.onnx",
};

const U2NETP_WEIGHTS: ModelWeights = ModelWeights {
    file_name: "u2netp.onnx",
    url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2netp.onnx",
};

const ANIME_WEIGHTS: ModelWeights = ModelWeights {
    file_name: "isnet-anime.onnx",
    url: "https://github.com/danielgatis/rembg/releases/download/v0.0.0/isnet-anime.onnx",
};

/// Which weight set and post-processing a [`RembgBackend`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RembgTier {
    /// Standard U²-Net weights with edge refinement. The default tier.
    Standard,
    /// U²-Net-P: smaller weights, faster, no refinement pass.
    Fast,
    /// ISNet weights trained on anime imagery, with edge refinement.
    Anime,
}

impl RembgTier {
    fn weights(self) -> ModelWeights {
        match self {
            Self::Standard => U2NET_WEIGHTS,
            Self::Fast => U2NETP_WEIGHTS,
            Self::Anime => ANIME_WEIGHTS,
        }
    }

    fn preprocessing(self) -> PreprocessingConfig {
        match self {
            Self::Standard | Self::Fast => PreprocessingConfig {
                target_size: 320,
                normalization_mean: [0.485, 0.456, 0.406],
                normalization_std: [0.229, 0.224, 0.225],
                activation: MaskActivation::MinMax,
            },
            Self::Anime => PreprocessingConfig {
                target_size: 1024,
                normalization_mean: [0.5, 0.5, 0.5],
                normalization_std: [1.0, 1.0, 1.0],
                activation: MaskActivation::MinMax,
            },
        }
    }

    fn alpha_matting(self) -> bool {
        matches!(self, Self::Standard | Self::Anime)
    }

    fn id(self) -> &'static str {
        match self {
            Self::Standard => "rembg",
            Self::Fast => "rembg-fast",
            Self::Anime => "rembg-anime",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Standard => "Rembg (U-2-Net) - Fast & Accurate",
            Self::Fast => "Rembg Fast (U-2-Net-P) - Faster, Smaller Model",
            Self::Anime => "Rembg Anime - Specialized for Anime",
        }
    }
}

/// ONNX-backed saliency tier.
pub struct RembgBackend {
    tier: RembgTier,
    fetcher: Arc<ModelFetcher>,
    session: LazySession,
}

impl RembgBackend {
    /// Create a backend for the given tier sharing the process-wide fetcher.
    #[must_use]
    pub fn new(tier: RembgTier, fetcher: Arc<ModelFetcher>) -> Self {
        Self {
            tier,
            fetcher,
            session: LazySession::new(),
        }
    }
}

#[async_trait]
impl SegmentationBackend for RembgBackend {
    fn id(&self) -> &str {
        self.tier.id()
    }

    fn label(&self) -> &str {
        self.tier.label()
    }

    fn is_available(&self) -> bool {
        self.fetcher.is_obtainable(&self.tier.weights())
    }

    async fn segment(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let weights = self.tier.weights();
        let model_path = self.fetcher.ensure(&weights).await?;

        let config = self.tier.preprocessing();
        let tensor = preprocessing::image_to_tensor(image, &config);
        let output = self.session.run(&model_path, &tensor).await?;

        let mut mask =
            preprocessing::tensor_to_mask(&output, config.activation, image.dimensions())?;
        if self.tier.alpha_matting() {
            debug!(model = self.id(), "applying edge refinement");
            mask = preprocessing::feather_mask(&mask);
        }
        Ok(preprocessing::apply_alpha_mask(image, &mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_identifiers() {
        assert_eq!(RembgTier::Standard.id(), "rembg");
        assert_eq!(RembgTier::Fast.id(), "rembg-fast");
        assert_eq!(RembgTier::Anime.id(), "rembg-anime");
    }

    #[test]
    fn test_tier_configuration_differs() {
        assert_eq!(RembgTier::Standard.preprocessing().target_size, 320);
        assert_eq!(RembgTier::Anime.preprocessing().target_size, 1024);
        assert!(RembgTier::Standard.alpha_matting());
        assert!(!RembgTier::Fast.alpha_matting());
        assert_ne!(
            RembgTier::Standard.weights().file_name,
            RembgTier::Fast.weights().file_name
        );
    }
}
