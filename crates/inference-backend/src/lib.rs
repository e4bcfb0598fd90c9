//! Inference Backends
//!
//! Runtimes that load model artifacts for latency benchmarking:
//! - tract (pure Rust, CPU)
//! - ONNX Runtime (feature `onnxruntime`, execution providers per affinity)
//! - an in-process mock for tests

mod mock;
#[cfg(feature = "onnxruntime")]
mod onnxruntime;
mod tract;

pub use mock::{MockBackend, MockModel};
#[cfg(feature = "onnxruntime")]
pub use onnxruntime::{OrtBackend, OrtInput, OrtModel};
pub use tract::{TractBackend, TractModel, TractPlan};
