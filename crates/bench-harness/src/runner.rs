//! Timed inference runner

use crate::catalog::ArtifactCatalog;
use bench_core::{
    ArtifactId, AverageLatencyMs, BenchError, HardwareAffinity, InferenceBackend,
    LatencyAggregator, LoadedModel, ModelContractInspector, SyntheticInputGenerator, TensorShape,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default number of timed calls
pub const DEFAULT_NUM_CALLS: u32 = 100;

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Timed inference calls per run (at least 1)
    pub num_calls: u32,
    /// Untimed calls issued before the clock starts
    pub warmup_calls: u32,
    /// Benchmark this input instead of the first declared one
    pub input_name: Option<String>,
    /// Largest synthetic input accepted, in elements
    pub max_input_elements: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            num_calls: DEFAULT_NUM_CALLS,
            warmup_calls: 0,
            input_name: None,
            max_input_elements: bench_core::synthetic::DEFAULT_MAX_ELEMENTS,
        }
    }
}

impl RunnerConfig {
    /// Small call count for tests and smoke runs
    pub fn quick() -> Self {
        Self {
            num_calls: 10,
            ..Default::default()
        }
    }

    /// Override the timed call count
    pub fn with_num_calls(mut self, num_calls: u32) -> Self {
        self.num_calls = num_calls;
        self
    }
}

/// Raw timing of one timed loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTiming {
    /// Wall-clock time spanning the timed loop only
    pub total_elapsed: Duration,
    /// Calls issued inside the loop
    pub num_calls: u32,
    /// Calls whose error was swallowed
    pub failed_calls: u32,
}

impl RunTiming {
    /// Whether no call in the loop succeeded
    pub fn all_calls_failed(&self) -> bool {
        self.failed_calls == self.num_calls
    }
}

/// Outcome of a successful benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub artifact: ArtifactId,
    pub affinity: HardwareAffinity,
    pub backend: String,
    pub input_name: String,
    pub input_shape: TensorShape,
    pub num_calls: u32,
    pub total_elapsed_secs: f64,
    pub average_latency_ms: AverageLatencyMs,
    /// Swallowed per-call inference failures
    pub failed_calls: u32,
    pub started_at: DateTime<Utc>,
}

impl BenchmarkReport {
    /// Whether every timed call failed, making the average meaningless
    pub fn all_calls_failed(&self) -> bool {
        self.failed_calls == self.num_calls
    }

    /// Warning to show next to the latency figure, if any
    pub fn warning(&self) -> Option<String> {
        if self.all_calls_failed() {
            Some(format!(
                "all {} inference calls failed; the average does not measure inference",
                self.num_calls
            ))
        } else if self.failed_calls > 0 {
            Some(format!(
                "{} of {} inference calls failed",
                self.failed_calls, self.num_calls
            ))
        } else {
            None
        }
    }
}

/// Loads a model, builds one synthetic input and times repeated inference
pub struct InferenceRunner<B: InferenceBackend> {
    backend: Arc<B>,
    catalog: ArtifactCatalog,
    config: RunnerConfig,
    generator: SyntheticInputGenerator,
}

impl<B: InferenceBackend> InferenceRunner<B> {
    /// Create a runner; a zero call count is raised to one
    pub fn new(backend: Arc<B>, catalog: ArtifactCatalog, mut config: RunnerConfig) -> Self {
        if config.num_calls == 0 {
            warn!("num_calls = 0 is not allowed, using 1");
            config.num_calls = 1;
        }
        info!(
            "Creating inference runner: backend={}, num_calls={}, warmup_calls={}",
            backend.name(),
            config.num_calls,
            config.warmup_calls
        );
        Self {
            generator: SyntheticInputGenerator::new(config.max_input_elements),
            backend,
            catalog,
            config,
        }
    }

    /// Artifact catalog used to resolve ids
    pub fn catalog(&self) -> &ArtifactCatalog {
        &self.catalog
    }

    /// Runner configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Load, introspect and build the input; nothing is timed yet
    pub fn prepare(
        &self,
        artifact: &ArtifactId,
        affinity: HardwareAffinity,
    ) -> Result<PreparedRun<B::Model>, BenchError> {
        let path = self.catalog.resolve(artifact).ok_or_else(|| BenchError::ModelLoad {
            artifact: artifact.clone(),
            reason: format!(
                "no '{}.{}' in {}",
                artifact,
                self.catalog.extension(),
                self.catalog.root().display()
            ),
        })?;

        let model = self.backend.load(&path, affinity).map_err(|e| {
            error!("Failed to load {}: {}", artifact, e);
            BenchError::ModelLoad {
                artifact: artifact.clone(),
                reason: e.to_string(),
            }
        })?;

        let resolved = ModelContractInspector::resolve(&model, self.config.input_name.as_deref())
            .map_err(|reason| {
                error!("Contract introspection failed for {}: {}", artifact, reason);
                BenchError::ContractIntrospection {
                    artifact: artifact.clone(),
                    reason,
                }
            })?;
        info!("Benchmarking input '{}' with shape {}", resolved.name, resolved.shape);

        let buffer = self.generator.generate(&resolved.shape)?;
        let input = model
            .prepare_input(&resolved.name, buffer)
            .map_err(|e| BenchError::InputAllocation(e.to_string()))?;

        Ok(PreparedRun {
            model,
            input,
            artifact: artifact.clone(),
            affinity,
            backend: self.backend.name(),
            input_name: resolved.name,
            input_shape: resolved.shape,
            num_calls: self.config.num_calls,
            warmup_calls: self.config.warmup_calls,
        })
    }

    /// Prepare and time in one go, returning the raw timing
    pub fn run(&self, artifact: &ArtifactId, affinity: HardwareAffinity) -> Result<RunTiming, BenchError> {
        Ok(self.prepare(artifact, affinity)?.time())
    }
}

/// A loaded model and its input, ready for the timed loop
///
/// Dropping it releases the model.
pub struct PreparedRun<M: LoadedModel> {
    model: M,
    input: M::Input,
    artifact: ArtifactId,
    affinity: HardwareAffinity,
    backend: &'static str,
    input_name: String,
    input_shape: TensorShape,
    num_calls: u32,
    warmup_calls: u32,
}

impl<M: LoadedModel> PreparedRun<M> {
    /// Declared input being benchmarked
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Shape of the generated input
    pub fn input_shape(&self) -> &TensorShape {
        &self.input_shape
    }

    /// Run the timed loop, consuming the model
    ///
    /// Per-call failures do not stop the loop; they are counted in
    /// [`RunTiming::failed_calls`].
    pub fn time(mut self) -> RunTiming {
        for call in 0..self.warmup_calls {
            if let Err(e) = self.model.infer(&self.input) {
                debug!("Warm-up call {} failed: {}", call, e);
            }
        }

        let mut failed_calls = 0u32;
        let start = Instant::now();
        for call in 0..self.num_calls {
            if let Err(e) = self.model.infer(&self.input) {
                failed_calls += 1;
                debug!("Inference call {} failed: {}", call, e);
            }
        }
        let total_elapsed = start.elapsed();

        let timing = RunTiming {
            total_elapsed,
            num_calls: self.num_calls,
            failed_calls,
        };

        if timing.all_calls_failed() {
            error!("All {} inference calls failed for {}", timing.num_calls, self.artifact);
        } else if failed_calls > 0 {
            warn!(
                "{} of {} inference calls failed for {}",
                failed_calls, timing.num_calls, self.artifact
            );
        }
        timing
    }

    /// Run the timed loop and aggregate it into a report
    pub fn into_report(self) -> BenchmarkReport {
        let started_at = Utc::now();
        let artifact = self.artifact.clone();
        let affinity = self.affinity;
        let backend = self.backend;
        let input_name = self.input_name.clone();
        let input_shape = self.input_shape.clone();

        let timing = self.time();
        let total_elapsed_secs = timing.total_elapsed.as_secs_f64();
        let average_latency_ms = LatencyAggregator::average(total_elapsed_secs, timing.num_calls);

        metrics::counter!(
            "latency_bench_failed_calls_total",
            "backend" => backend,
            "affinity" => affinity.as_str()
        )
        .increment(u64::from(timing.failed_calls));
        metrics::histogram!(
            "latency_bench_average_ms",
            "backend" => backend,
            "affinity" => affinity.as_str()
        )
        .record(average_latency_ms.value());

        info!(
            "{} on {} ({}): {} ms/call over {} calls",
            artifact, backend, affinity, average_latency_ms, timing.num_calls
        );

        BenchmarkReport {
            artifact,
            affinity,
            backend: backend.to_string(),
            input_name,
            input_shape,
            num_calls: timing.num_calls,
            total_elapsed_secs,
            average_latency_ms,
            failed_calls: timing.failed_calls,
            started_at,
        }
    }
}
