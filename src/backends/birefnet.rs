//! BiRefNet heavyweight tier
//!
//! Hub-downloaded dichotomous segmentation model. The input is resized to a
//! fixed 1024x1024 square and normalized with ImageNet statistics; the raw
//! logits go through a sigmoid, and the resulting probability map is resized
//! back to the source resolution and applied as the alpha channel of the
//! original image, never of the model-resized copy.

use crate::backends::onnx::LazySession;
use crate::backends::SegmentationBackend;
use crate::download::{ModelFetcher, ModelWeights};
use crate::error::Result;
use crate::preprocessing::{self, MaskActivation, PreprocessingConfig};
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::sync::Arc;

const BIREFNET_WEIGHTS: ModelWeights = ModelWeights {
    file_name: "birefnet-lite.onnx",
    url: "https://huggingface.co/onnx-community/BiRefNet_lite/resolve/main/onnx/model.onnx",
};

const PREPROCESSING: PreprocessingConfig = PreprocessingConfig {
    target_size: 1024,
    normalization_mean: [0.485, 0.456, 0.406],
    normalization_std: [0.229, 0.224, 0.225],
    activation: MaskActivation::Sigmoid,
};

/// Heavyweight hub-model tier.
///
/// The session is large and loads lazily on first use; the shared lock in
/// [`LazySession`] keeps concurrent first requests from initializing it
/// twice and serializes inference so memory use stays bounded.
pub struct BirefnetBackend {
    fetcher: Arc<ModelFetcher>,
    session: LazySession,
}

impl BirefnetBackend {
    /// Create the backend sharing the process-wide fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<ModelFetcher>) -> Self {
        Self {
            fetcher,
            session: LazySession::new(),
        }
    }
}

#[async_trait]
impl SegmentationBackend for BirefnetBackend {
    fn id(&self) -> &str {
        "birefnet"
    }

    fn label(&self) -> &str {
        "BiRefNet - State-of-the-art 2024"
    }

    fn is_available(&self) -> bool {
        self.fetcher.is_obtainable(&BIREFNET_WEIGHTS)
    }

    async fn segment(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let model_path = self.fetcher.ensure(&BIREFNET_WEIGHTS).await?;

        let tensor = preprocessing::image_to_tensor(image, &PREPROCESSING);
        let output = self.session.run(&model_path, &tensor).await?;

        let mask =
            preprocessing::tensor_to_mask(&output, PREPROCESSING.activation, image.dimensions())?;
        Ok(preprocessing::apply_alpha_mask(image, &mask))
    }
}
