//! Benchmark Error Types

use crate::ArtifactId;
use thiserror::Error;

/// Failures surfaced to whoever requested a benchmark run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BenchError {
    /// Request carried an empty artifact id
    #[error("Please select a model.")]
    NoArtifactSelected,

    /// Artifact missing, or the backend could not parse/compile it
    #[error("Failed to load model '{artifact}': {reason}")]
    ModelLoad { artifact: ArtifactId, reason: String },

    /// No usable input declared by the model
    #[error("Could not retrieve input shape for '{artifact}': {reason}")]
    ContractIntrospection { artifact: ArtifactId, reason: String },

    /// Input buffer too large or malformed
    #[error("Failed to create random input tensor: {0}")]
    InputAllocation(String),

    /// Another run is in flight on the same orchestrator
    #[error("A benchmark is already running")]
    AlreadyRunning,

    /// Background worker panicked or was cancelled
    #[error("Benchmark worker failed: {0}")]
    Worker(String),
}

impl BenchError {
    /// Stable tag for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            BenchError::NoArtifactSelected => "no_artifact_selected",
            BenchError::ModelLoad { .. } => "model_load",
            BenchError::ContractIntrospection { .. } => "contract_introspection",
            BenchError::InputAllocation(_) => "input_allocation",
            BenchError::AlreadyRunning => "already_running",
            BenchError::Worker(_) => "worker",
        }
    }
}
