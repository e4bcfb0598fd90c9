//! tract ONNX backend

use bench_core::{
    BackendError, HardwareAffinity, InferenceBackend, InputBuffer, InputDescriptor, LoadedModel,
    TensorShape,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Optimized, runnable tract plan
pub type TractPlan = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Pure-Rust ONNX backend; executes on CPU regardless of affinity
#[derive(Debug, Clone)]
pub struct TractBackend {
    optimize: bool,
}

impl Default for TractBackend {
    fn default() -> Self {
        Self { optimize: true }
    }
}

impl TractBackend {
    /// Create a backend that optimizes graphs before running them
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip graph optimization (faster load, slower calls)
    pub fn without_optimization() -> Self {
        Self { optimize: false }
    }
}

impl InferenceBackend for TractBackend {
    type Model = TractModel;

    fn name(&self) -> &'static str {
        "tract"
    }

    fn artifact_extension(&self) -> &'static str {
        "onnx"
    }

    fn load(&self, path: &Path, affinity: HardwareAffinity) -> Result<TractModel, BackendError> {
        if !path.exists() {
            return Err(BackendError::NotFound(path.display().to_string()));
        }

        info!("Loading ONNX model with tract from {}", path.display());
        if affinity.allows_accelerator() {
            info!("tract runs on CPU only; affinity '{}' is served by the CPU", affinity);
        }

        let typed = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.into_typed())
            .map_err(|e| BackendError::LoadFailed(format!("{:#}", e)))?;

        TractModel::from_typed(typed, self.optimize)
            .map_err(|e| BackendError::LoadFailed(format!("{:#}", e)))
    }
}

/// A tract plan plus the input schema read before optimization
pub struct TractModel {
    plan: TractPlan,
    inputs: Vec<InputDescriptor>,
}

impl TractModel {
    /// Describe inputs, then optimize and plan the graph
    pub fn from_typed(model: TypedModel, optimize: bool) -> TractResult<Self> {
        let inputs = describe_inputs(&model)?;
        let model = if optimize { model.into_optimized()? } else { model };
        let plan = model.into_runnable()?;

        debug!("tract plan ready with {} input(s)", inputs.len());
        Ok(Self { plan, inputs })
    }
}

impl LoadedModel for TractModel {
    type Input = TValue;

    fn input_schema(&self) -> Vec<InputDescriptor> {
        self.inputs.clone()
    }

    fn prepare_input(&self, name: &str, buffer: InputBuffer) -> Result<TValue, BackendError> {
        if !self.inputs.iter().any(|input| input.name == name) {
            return Err(BackendError::InvalidInput(format!("model has no input '{}'", name)));
        }

        let (shape, data) = buffer.into_parts();
        let tensor = Tensor::from_shape(shape.dims(), &data)
            .map_err(|e| BackendError::InvalidInput(format!("{:#}", e)))?;

        Ok(TValue::Const(Arc::new(tensor)))
    }

    fn infer(&mut self, input: &TValue) -> Result<(), BackendError> {
        self.plan
            .run(tvec!(input.clone()))
            .map(|_| ())
            .map_err(|e| BackendError::InferenceFailed(format!("{:#}", e)))
    }
}

/// Inputs in graph declaration order
fn describe_inputs(model: &TypedModel) -> TractResult<Vec<InputDescriptor>> {
    model
        .input_outlets()?
        .iter()
        .map(|outlet| {
            let name = model.node(outlet.node).name.clone();
            let fact = model.outlet_fact(*outlet)?;

            if fact.datum_type != DatumType::F32 {
                return Ok(InputDescriptor::unsupported(
                    name,
                    format!("element type {:?} is not f32", fact.datum_type),
                ));
            }

            let descriptor = match fact.shape.as_concrete() {
                Some(dims) => match TensorShape::new(dims.to_vec()) {
                    Ok(shape) => InputDescriptor::dense(name, shape),
                    Err(reason) => InputDescriptor::unsupported(name, reason),
                },
                None => InputDescriptor::unsupported(name, format!("symbolic shape {:?}", fact.shape)),
            };
            Ok(descriptor)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::{InputConstraint, SyntheticInputGenerator};

    fn identity_model(input: TypedFact) -> TypedModel {
        let mut model = TypedModel::default();
        let source = model.add_source("input", input).unwrap();
        model.set_output_outlets(&[source]).unwrap();
        model
    }

    #[test]
    fn test_schema_from_source_fact() {
        let model = TractModel::from_typed(identity_model(f32::fact([1, 3, 4, 4])), true).unwrap();
        let schema = model.input_schema();

        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].name, "input");
        assert_eq!(schema[0].shape().map(|s| s.dims().to_vec()), Some(vec![1, 3, 4, 4]));
    }

    #[test]
    fn test_non_float_input_is_unsupported() {
        let model = TractModel::from_typed(identity_model(i64::fact([1, 8])), false).unwrap();
        let schema = model.input_schema();

        assert!(matches!(schema[0].constraint, InputConstraint::Unsupported(_)));
    }

    #[test]
    fn test_infer_identity_plan() {
        let mut model = TractModel::from_typed(identity_model(f32::fact([1, 3, 4, 4])), true).unwrap();
        let shape = TensorShape::new(vec![1, 3, 4, 4]).unwrap();
        let buffer = SyntheticInputGenerator::default().generate(&shape).unwrap();

        let input = model.prepare_input("input", buffer).unwrap();
        for _ in 0..3 {
            model.infer(&input).unwrap();
        }
    }

    #[test]
    fn test_prepare_unknown_input() {
        let model = TractModel::from_typed(identity_model(f32::fact([2])), false).unwrap();
        let shape = TensorShape::new(vec![2]).unwrap();
        let buffer = SyntheticInputGenerator::default().generate(&shape).unwrap();

        assert!(matches!(
            model.prepare_input("other", buffer),
            Err(BackendError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_missing_artifact() {
        let result = TractBackend::new().load(Path::new("/nonexistent/model.onnx"), HardwareAffinity::CpuOnly);

        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }

    #[test]
    fn test_load_undecodable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.onnx");
        std::fs::write(&path, b"\xffnot an onnx graph\x00\x01\x02").unwrap();

        for backend in [TractBackend::new(), TractBackend::without_optimization()] {
            let result = backend.load(&path, HardwareAffinity::CpuOnly);
            assert!(matches!(result, Err(BackendError::LoadFailed(_))));
        }
    }

    #[test]
    fn test_unoptimized_plan_runs() {
        let backend = TractBackend::without_optimization();
        assert!(!backend.optimize);

        let mut model = TractModel::from_typed(identity_model(f32::fact([1, 4])), backend.optimize).unwrap();
        let shape = TensorShape::new(vec![1, 4]).unwrap();
        let buffer = SyntheticInputGenerator::default().generate(&shape).unwrap();

        let input = model.prepare_input("input", buffer).unwrap();
        assert!(model.infer(&input).is_ok());
    }
}
