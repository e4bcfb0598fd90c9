//! Inference Latency Benchmark Core
//!
//! Backend-agnostic building blocks for timing compiled model artifacts:
//! - Hardware affinity, artifact ids and tensor shapes
//! - The inference backend capability (load, describe inputs, infer)
//! - Input contract introspection
//! - Synthetic random input generation
//! - Per-call latency aggregation

pub mod backend;
pub mod contract;
mod error;
pub mod latency;
pub mod synthetic;
mod types;

pub use backend::{BackendError, InferenceBackend, InputConstraint, InputDescriptor, LoadedModel};
pub use contract::{ModelContractInspector, ResolvedInput};
pub use error::BenchError;
pub use latency::{AverageLatencyMs, LatencyAggregator};
pub use synthetic::{InputBuffer, SyntheticInputGenerator};
pub use types::{ArtifactId, HardwareAffinity, TensorShape};
