use std::path::Path;

use ndarray::Array4;
use thiserror::Error;
use tract_core::prelude::TractError;
use tract_onnx::prelude::*;

use crate::preprocess::PreprocessOptions;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file '{0}' not found")]
    NotFound(String),
    #[error("failed to load ONNX model: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model produced an empty output")]
    EmptyOutput,
}

/// A binary classifier: one preprocessed image in, one sigmoid score out.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: Array4<f32>) -> Result<f32, ModelError>;
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxClassifier {
    plan: Plan,
}

impl OnnxClassifier {
    /// Loads, optimizes and plans the model at `path` for the input shape `opts` produces.
    pub fn load(path: impl AsRef<Path>, opts: &PreprocessOptions) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }

        let load_err = |e: TractError| ModelError::Load(format!("{:#}", e));

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_err)?
            .with_input_fact(0, f32::fact(opts.input_shape()).into())
            .map_err(load_err)?
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        tracing::debug!(path = %path.display(), layout = %opts.layout, "ONNX plan ready");

        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: Array4<f32>) -> Result<f32, ModelError> {
        let result = self
            .plan
            .run(tvec!(input.into_tensor().into()))
            .map_err(|e| ModelError::Inference(format!("{:#}", e)))?;

        let output = result
            .first()
            .ok_or(ModelError::EmptyOutput)?
            .to_array_view::<f32>()
            .map_err(|e| ModelError::Inference(format!("{:#}", e)))?;

        output.iter().next().copied().ok_or(ModelError::EmptyOutput)
    }
}
