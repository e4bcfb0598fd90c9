//! Inference Latency Benchmark - Main Entry Point

use anyhow::Context;
use bench_core::InferenceBackend;
use bench_harness::{
    init_logging, ArtifactCatalog, BackendKind, BenchmarkOrchestrator, HarnessConfig, InferenceRunner,
};
use inference_backend::TractBackend;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HarnessConfig::load().context("failed to load configuration")?;
    let level = config.tracing_level();
    init_logging(level.unwrap_or(Level::INFO))?;

    info!("=== Inference Latency Bench v{} ===", env!("CARGO_PKG_VERSION"));
    if level.is_none() {
        warn!("Unknown log_level '{}', using info", config.log_level);
    }

    match config.backend {
        BackendKind::Tract => run(TractBackend::new(), &config).await,
        BackendKind::Onnxruntime => run_onnxruntime(&config).await,
    }
}

#[cfg(feature = "onnxruntime")]
async fn run_onnxruntime(config: &HarnessConfig) -> anyhow::Result<()> {
    run(inference_backend::OrtBackend::new(), config).await
}

#[cfg(not(feature = "onnxruntime"))]
async fn run_onnxruntime(_config: &HarnessConfig) -> anyhow::Result<()> {
    anyhow::bail!("backend 'onnxruntime' requires building with the `onnxruntime` feature")
}

async fn run<B: InferenceBackend>(backend: B, config: &HarnessConfig) -> anyhow::Result<()> {
    let extension = config
        .artifact_extension
        .clone()
        .unwrap_or_else(|| backend.artifact_extension().to_string());
    let catalog = ArtifactCatalog::new(&config.artifact_root, extension);
    let runner = InferenceRunner::new(Arc::new(backend), catalog, config.runner.clone());
    let orchestrator = BenchmarkOrchestrator::new(runner);

    let artifacts = orchestrator.list_artifacts();
    info!("{} artifact(s) in {}", artifacts.len(), config.artifact_root.display());
    for artifact in &artifacts {
        println!("{}", artifact);
    }

    let Some(model) = config.model.clone() else {
        info!("No model configured; set `model` to run a benchmark");
        return Ok(());
    };

    let report = orchestrator.run_benchmark(model, config.affinity).await?;

    if config.json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Hardware: {}", report.affinity.label());
        println!("Average Inference Time: {} ms", report.average_latency_ms);
        if let Some(warning) = report.warning() {
            println!("Warning: {}", warning);
        }
    }

    Ok(())
}
