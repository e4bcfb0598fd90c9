//! Inference Latency Benchmark Harness
//!
//! Discovers model artifacts, loads one under a hardware affinity, feeds it a
//! synthetic input and reports the average per-call latency.

pub mod catalog;
pub mod config;
pub mod orchestrator;
pub mod runner;

pub use catalog::ArtifactCatalog;
pub use config::{BackendKind, HarnessConfig};
pub use orchestrator::{BenchmarkOrchestrator, BenchmarkOutcome, BenchmarkPhase, BenchmarkStatus};
pub use runner::{BenchmarkReport, InferenceRunner, PreparedRun, RunTiming, RunnerConfig};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
