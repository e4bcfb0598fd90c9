//! Inference backend capability
//!
//! The harness only needs three things from a runtime: load an artifact under
//! a hardware affinity, describe the loaded model's declared inputs, and run
//! one inference call. Backends live in their own crate and are chosen by the
//! embedding application.

use crate::{HardwareAffinity, InputBuffer, TensorShape};
use std::path::Path;
use thiserror::Error;

/// Errors raised by a backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Model artifact not found: {0}")]
    NotFound(String),

    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BackendError::NotFound(err.to_string())
        } else {
            BackendError::LoadFailed(err.to_string())
        }
    }
}

/// Constraint a model declares for one input
#[derive(Debug, Clone, PartialEq)]
pub enum InputConstraint {
    /// Dense 32-bit float tensor with a fully known shape
    Dense(TensorShape),
    /// Anything the synthetic generator cannot fill (non-float, symbolic dims, ...)
    Unsupported(String),
}

/// One declared model input
#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    pub name: String,
    pub constraint: InputConstraint,
}

impl InputDescriptor {
    /// Dense input with a known shape
    pub fn dense(name: impl Into<String>, shape: TensorShape) -> Self {
        Self {
            name: name.into(),
            constraint: InputConstraint::Dense(shape),
        }
    }

    /// Input that carries no usable shape constraint
    pub fn unsupported(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: InputConstraint::Unsupported(reason.into()),
        }
    }

    /// Declared shape, if dense
    pub fn shape(&self) -> Option<&TensorShape> {
        match &self.constraint {
            InputConstraint::Dense(shape) => Some(shape),
            InputConstraint::Unsupported(_) => None,
        }
    }
}

/// A runtime able to load model artifacts
pub trait InferenceBackend: Send + Sync + 'static {
    /// Loaded model type; dropping it releases the model
    type Model: LoadedModel;

    /// Short backend name for logs and reports
    fn name(&self) -> &'static str;

    /// File extension (without dot) marking artifacts this backend loads
    fn artifact_extension(&self) -> &'static str;

    /// Load an artifact configured for the given compute units
    fn load(&self, path: &Path, affinity: HardwareAffinity) -> Result<Self::Model, BackendError>;
}

/// A model bound to one hardware affinity for its whole lifetime
pub trait LoadedModel {
    /// Input converted once into the backend's native representation
    type Input;

    /// Declared inputs, in the order the backend exposes them
    ///
    /// The order is backend-determined (graph declaration order for ONNX
    /// runtimes). It is not sorted by name.
    fn input_schema(&self) -> Vec<InputDescriptor>;

    /// Bind a generated buffer to the named input
    fn prepare_input(&self, name: &str, buffer: InputBuffer) -> Result<Self::Input, BackendError>;

    /// Execute one inference call; outputs are discarded
    fn infer(&mut self, input: &Self::Input) -> Result<(), BackendError>;
}
