//! ONNX Runtime backend (feature `onnxruntime`)

use bench_core::{
    BackendError, HardwareAffinity, InferenceBackend, InputBuffer, InputDescriptor, LoadedModel,
    TensorShape,
};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider, DirectMLExecutionProvider,
    ExecutionProviderDispatch, TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use std::path::Path;
use tracing::{error, info};

/// ONNX Runtime backend mapping affinity to execution providers
#[derive(Debug, Clone, Default)]
pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Execution providers tried in order; unavailable ones are skipped by the runtime
fn execution_providers(affinity: HardwareAffinity) -> Vec<ExecutionProviderDispatch> {
    let cpu = CPUExecutionProvider::default().build();
    match affinity {
        HardwareAffinity::CpuOnly => vec![cpu],
        HardwareAffinity::CpuAndAccelerator => vec![CUDAExecutionProvider::default().build(), cpu],
        HardwareAffinity::AllAvailable => vec![
            TensorRTExecutionProvider::default().build(),
            CUDAExecutionProvider::default().build(),
            CoreMLExecutionProvider::default().build(),
            DirectMLExecutionProvider::default().build(),
            cpu,
        ],
    }
}

impl InferenceBackend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn artifact_extension(&self) -> &'static str {
        "onnx"
    }

    fn load(&self, path: &Path, affinity: HardwareAffinity) -> Result<OrtModel, BackendError> {
        if !path.exists() {
            return Err(BackendError::NotFound(path.display().to_string()));
        }

        info!("Loading ONNX Runtime session from {} (affinity={})", path.display(), affinity);

        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_execution_providers(execution_providers(affinity)))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                error!("Failed to create ONNX Runtime session: {}", e);
                BackendError::LoadFailed(e.to_string())
            })?;

        let inputs = session.inputs.iter().map(|input| describe(&input.name, &input.input_type)).collect();

        Ok(OrtModel { session, inputs })
    }
}

fn describe(name: &str, value_type: &ValueType) -> InputDescriptor {
    match value_type {
        ValueType::Tensor { ty: TensorElementType::Float32, dimensions, .. } => {
            if dimensions.iter().any(|&d| d < 1) {
                return InputDescriptor::unsupported(name, format!("dynamic dimensions {:?}", dimensions));
            }
            let dims = dimensions.iter().map(|&d| d as usize).collect();
            match TensorShape::new(dims) {
                Ok(shape) => InputDescriptor::dense(name, shape),
                Err(reason) => InputDescriptor::unsupported(name, reason),
            }
        }
        ValueType::Tensor { ty, .. } => {
            InputDescriptor::unsupported(name, format!("element type {:?} is not f32", ty))
        }
        other => InputDescriptor::unsupported(name, format!("{:?} is not a tensor", other)),
    }
}

/// A committed ONNX Runtime session
pub struct OrtModel {
    session: Session,
    inputs: Vec<InputDescriptor>,
}

/// Named input tensor built once per run
pub struct OrtInput {
    name: String,
    tensor: Tensor<f32>,
}

impl LoadedModel for OrtModel {
    type Input = OrtInput;

    fn input_schema(&self) -> Vec<InputDescriptor> {
        self.inputs.clone()
    }

    fn prepare_input(&self, name: &str, buffer: InputBuffer) -> Result<OrtInput, BackendError> {
        let (shape, data) = buffer.into_parts();
        let dims: Vec<i64> = shape.dims().iter().map(|&d| d as i64).collect();
        let tensor = Tensor::from_array((dims, data))
            .map_err(|e| BackendError::InvalidInput(e.to_string()))?;

        Ok(OrtInput {
            name: name.to_string(),
            tensor,
        })
    }

    fn infer(&mut self, input: &OrtInput) -> Result<(), BackendError> {
        let inputs = ort::inputs![input.name.as_str() => input.tensor.view()]
            .map_err(|e| BackendError::InvalidInput(e.to_string()))?;

        self.session
            .run(inputs)
            .map(|_| ())
            .map_err(|e| BackendError::InferenceFailed(e.to_string()))
    }
}
