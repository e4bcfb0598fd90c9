//! Model input contract introspection

use crate::backend::{InputConstraint, InputDescriptor, LoadedModel};
use crate::TensorShape;
use tracing::{debug, warn};

/// Input chosen for a benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub name: String,
    pub shape: TensorShape,
}

/// Reads a loaded model's declared input schema
pub struct ModelContractInspector;

impl ModelContractInspector {
    /// Name of the first declared input, `None` when the model declares none
    ///
    /// "First" follows the backend's schema order, not name order.
    pub fn first_input_name<M: LoadedModel>(model: &M) -> Option<String> {
        model.input_schema().into_iter().next().map(|input| input.name)
    }

    /// Shape of the named input, `None` when it is missing or has no dense shape
    pub fn input_shape<M: LoadedModel>(model: &M, name: &str) -> Option<TensorShape> {
        model
            .input_schema()
            .into_iter()
            .find(|input| input.name == name)
            .and_then(|input| input.shape().cloned())
    }

    /// Pick the benchmarked input and its shape, explaining any failure
    ///
    /// Uses `preferred` when given, otherwise the first declared input.
    pub fn resolve<M: LoadedModel>(
        model: &M,
        preferred: Option<&str>,
    ) -> Result<ResolvedInput, String> {
        let schema = model.input_schema();
        debug!("Model declares {} input(s)", schema.len());

        let input = match preferred {
            Some(name) => find_named(&schema, name)?,
            None => schema
                .first()
                .ok_or_else(|| "model declares no inputs".to_string())?,
        };

        if schema.len() > 1 {
            warn!(
                "Model declares {} inputs; only '{}' is fed during the benchmark",
                schema.len(),
                input.name
            );
        }

        match &input.constraint {
            InputConstraint::Dense(shape) => Ok(ResolvedInput {
                name: input.name.clone(),
                shape: shape.clone(),
            }),
            InputConstraint::Unsupported(reason) => Err(format!(
                "input '{}' has no dense tensor shape: {}",
                input.name, reason
            )),
        }
    }
}

fn find_named<'a>(schema: &'a [InputDescriptor], name: &str) -> Result<&'a InputDescriptor, String> {
    schema.iter().find(|input| input.name == name).ok_or_else(|| {
        let declared: Vec<_> = schema.iter().map(|i| i.name.as_str()).collect();
        format!("input '{}' is not declared (model inputs: {:?})", name, declared)
    })
}
