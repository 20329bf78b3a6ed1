//! ONNX Runtime session handling shared by the in-process model tiers
//!
//! Sessions are created lazily on first use and memoized behind an async
//! mutex; the lock both guards one-time initialization under concurrent
//! first requests and serializes inference per tier, which bounds how many
//! heavyweight model invocations can run at once.

use crate::error::{RemovalError, Result};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use tracing::debug;

/// Lazily-initialized ONNX Runtime session.
#[derive(Debug, Default)]
pub struct LazySession {
    slot: tokio::sync::Mutex<Option<Session>>,
}

impl LazySession {
    /// Create an empty slot; the session loads on first [`run`](Self::run).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run inference, loading the session from `model_path` first if this is
    /// the first call.
    ///
    /// # Errors
    /// - `BackendFailure` on session creation or inference errors
    pub async fn run(&self, model_path: &Path, input: &Array4<f32>) -> Result<Array4<f32>> {
        let mut guard = self.slot.lock().await;
        if guard.is_none() {
            debug!(model = %model_path.display(), "loading ONNX session");
            *guard = Some(load_session(model_path)?);
        }
        let session = guard
            .as_mut()
            .ok_or_else(|| RemovalError::backend("ONNX session missing after initialization"))?;
        infer(session, input)
    }
}

fn load_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| RemovalError::backend(format!("failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| RemovalError::backend(format!("failed to set optimization level: {e}")))?
        .commit_from_file(model_path)
        .map_err(|e| {
            RemovalError::backend(format!("failed to load {}: {e}", model_path.display()))
        })
}

/// Run one inference pass, converting between `ndarray` and ort values.
fn infer(session: &mut Session, input: &Array4<f32>) -> Result<Array4<f32>> {
    let input_value = Value::from_array(input.clone())
        .map_err(|e| RemovalError::backend(format!("failed to convert input tensor: {e}")))?;

    let outputs = session
        .run(ort::inputs![input_value])
        .map_err(|e| RemovalError::backend(format!("inference failed: {e}")))?;

    // Positional output access: the first output is the saliency map for
    // every model tier this service wraps.
    let keys: Vec<_> = outputs.keys().collect();
    let first_key = keys
        .first()
        .ok_or_else(|| RemovalError::backend("no output tensors found"))?;
    let output_tensor = outputs
        .get(first_key)
        .ok_or_else(|| RemovalError::backend("first output tensor not found"))?
        .try_extract_array::<f32>()
        .map_err(|e| RemovalError::backend(format!("failed to extract output tensor: {e}")))?;

    let shape = output_tensor.shape();
    if shape.len() != 4 {
        return Err(RemovalError::backend(format!(
            "expected 4D output tensor, got {}D",
            shape.len()
        )));
    }
    let dims = (
        shape.first().copied().unwrap_or(1),
        shape.get(1).copied().unwrap_or(1),
        shape.get(2).copied().unwrap_or(1),
        shape.get(3).copied().unwrap_or(1),
    );
    let data = output_tensor.view().to_owned();
    Array4::from_shape_vec(dims, data.into_raw_vec_and_offset().0)
        .map_err(|e| RemovalError::backend(format!("failed to reshape output tensor: {e}")))
}
