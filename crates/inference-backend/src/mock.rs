//! In-process mock backend for tests and dry runs

use bench_core::{
    BackendError, HardwareAffinity, InferenceBackend, InputBuffer, InputDescriptor, LoadedModel,
    TensorShape,
};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Backend whose models sleep for a fixed time per call
///
/// Loads succeed for any existing path unless `fail_load` is set. The path
/// content is never read.
#[derive(Debug, Clone)]
pub struct MockBackend {
    inputs: Vec<InputDescriptor>,
    call_latency: Duration,
    load_latency: Duration,
    fail_load: bool,
    fail_calls: bool,
    extension: &'static str,
    calls: Arc<AtomicU32>,
}

impl Default for MockBackend {
    fn default() -> Self {
        let inputs = TensorShape::new(vec![1, 3, 4, 4])
            .map(|shape| vec![InputDescriptor::dense("input", shape)])
            .unwrap_or_default();
        Self {
            inputs,
            call_latency: Duration::ZERO,
            load_latency: Duration::ZERO,
            fail_load: false,
            fail_calls: false,
            extension: "mock",
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl MockBackend {
    /// Create a mock with a single `[1, 3, 4, 4]` input
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the declared inputs
    pub fn with_inputs(mut self, inputs: Vec<InputDescriptor>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sleep this long in every inference call
    pub fn with_call_latency(mut self, latency: Duration) -> Self {
        self.call_latency = latency;
        self
    }

    /// Sleep this long while loading
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    /// Make every load fail
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Make every inference call fail
    pub fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    /// Artifact extension the mock claims
    pub fn with_extension(mut self, extension: &'static str) -> Self {
        self.extension = extension;
        self
    }

    /// Inference calls issued across all models loaded by this backend
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl InferenceBackend for MockBackend {
    type Model = MockModel;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn artifact_extension(&self) -> &'static str {
        self.extension
    }

    fn load(&self, path: &Path, affinity: HardwareAffinity) -> Result<MockModel, BackendError> {
        info!("Mock load of {} (affinity={})", path.display(), affinity);

        if !path.exists() {
            return Err(BackendError::NotFound(path.display().to_string()));
        }
        if !self.load_latency.is_zero() {
            std::thread::sleep(self.load_latency);
        }
        if self.fail_load {
            return Err(BackendError::LoadFailed("mock configured to fail loading".to_string()));
        }

        Ok(MockModel {
            inputs: self.inputs.clone(),
            call_latency: self.call_latency,
            fail_calls: self.fail_calls,
            calls: Arc::clone(&self.calls),
        })
    }
}

/// Model produced by [`MockBackend`]
pub struct MockModel {
    inputs: Vec<InputDescriptor>,
    call_latency: Duration,
    fail_calls: bool,
    calls: Arc<AtomicU32>,
}

impl LoadedModel for MockModel {
    type Input = InputBuffer;

    fn input_schema(&self) -> Vec<InputDescriptor> {
        self.inputs.clone()
    }

    fn prepare_input(&self, name: &str, buffer: InputBuffer) -> Result<InputBuffer, BackendError> {
        let declared = self
            .inputs
            .iter()
            .find(|input| input.name == name)
            .and_then(|input| input.shape())
            .ok_or_else(|| BackendError::InvalidInput(format!("model has no dense input '{}'", name)))?;

        if declared != buffer.shape() {
            return Err(BackendError::InvalidInput(format!(
                "expected {}, got {}",
                declared,
                buffer.shape()
            )));
        }
        Ok(buffer)
    }

    fn infer(&mut self, _input: &InputBuffer) -> Result<(), BackendError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.call_latency.is_zero() {
            std::thread::sleep(self.call_latency);
        }
        if self.fail_calls {
            debug!("Mock call {} failing", call);
            return Err(BackendError::InferenceFailed("mock configured to fail".to_string()));
        }
        Ok(())
    }
}
