use bench_core::{ArtifactId, BenchError, HardwareAffinity};
use bench_harness::{
    ArtifactCatalog, BenchmarkOrchestrator, BenchmarkPhase, InferenceRunner, RunnerConfig,
};
use inference_backend::MockBackend;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn artifact_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        fs::write(dir.path().join(format!("{}.mock", name)), b"").unwrap();
    }
    dir
}

fn build_orchestrator(dir: &TempDir, backend: MockBackend, config: RunnerConfig) -> BenchmarkOrchestrator<MockBackend> {
    let catalog = ArtifactCatalog::new(dir.path(), "mock");
    BenchmarkOrchestrator::new(InferenceRunner::new(Arc::new(backend), catalog, config))
}

#[tokio::test]
async fn test_lists_artifacts() {
    let dir = artifact_dir(&["m1", "m2"]);
    let orchestrator = build_orchestrator(&dir, MockBackend::new(), RunnerConfig::quick());

    let first = orchestrator.list_artifacts();
    let names: HashSet<_> = first.iter().map(|id| id.as_str().to_string()).collect();

    assert_eq!(names, HashSet::from(["m1".to_string(), "m2".to_string()]));
    assert_eq!(orchestrator.list_artifacts(), first);
}

#[tokio::test]
async fn test_constant_latency_average() {
    let dir = artifact_dir(&["m1"]);
    let backend = MockBackend::new().with_call_latency(Duration::from_millis(4));
    let orchestrator = build_orchestrator(&dir, backend, RunnerConfig::quick());

    let report = orchestrator
        .run_benchmark(ArtifactId::new("m1"), HardwareAffinity::CpuOnly)
        .await
        .unwrap();

    assert_eq!(report.num_calls, 10);
    assert_eq!(report.failed_calls, 0);
    assert_eq!(report.input_shape.dims(), &[1, 3, 4, 4]);
    assert!(report.total_elapsed_secs >= 0.040);
    assert!(report.average_latency_ms.value() >= 4.0);
    assert!(report.average_latency_ms.value() < 40.0);
    assert!(report.warning().is_none());

    let status = orchestrator.status();
    assert_eq!(status.phase, BenchmarkPhase::Idle);
    assert!(!status.running());
    assert!(status.result_text().ends_with(" ms"));
}

#[tokio::test]
async fn test_rejects_concurrent_request() {
    let dir = artifact_dir(&["m1", "m2"]);
    let backend = MockBackend::new().with_call_latency(Duration::from_millis(20));
    let orchestrator = build_orchestrator(&dir, backend.clone(), RunnerConfig::quick());
    let mut updates = orchestrator.subscribe();

    let first = orchestrator
        .spawn_benchmark(ArtifactId::new("m1"), HardwareAffinity::CpuOnly)
        .unwrap();
    assert!(orchestrator.is_running());

    let second = orchestrator.spawn_benchmark(ArtifactId::new("m2"), HardwareAffinity::AllAvailable);
    assert!(matches!(second, Err(BenchError::AlreadyRunning)));
    assert!(orchestrator.is_running());

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.artifact, ArtifactId::new("m1"));
    assert_eq!(report.failed_calls, 0);
    assert_eq!(backend.call_count(), 10);

    updates.changed().await.unwrap();
    assert!(!updates.borrow().running());

    let again = orchestrator
        .run_benchmark(ArtifactId::new("m2"), HardwareAffinity::CpuOnly)
        .await
        .unwrap();
    assert_eq!(again.artifact, ArtifactId::new("m2"));
}

#[tokio::test]
async fn test_rejects_request_while_loading() {
    let dir = artifact_dir(&["m1"]);
    let backend = MockBackend::new().with_load_latency(Duration::from_millis(300));
    let orchestrator = build_orchestrator(&dir, backend.clone(), RunnerConfig::quick());

    let first = orchestrator
        .spawn_benchmark(ArtifactId::new("m1"), HardwareAffinity::CpuOnly)
        .unwrap();
    assert_eq!(orchestrator.status().phase, BenchmarkPhase::Loading);

    let second = orchestrator.spawn_benchmark(ArtifactId::new("m1"), HardwareAffinity::CpuOnly);
    assert!(matches!(second, Err(BenchError::AlreadyRunning)));
    assert_eq!(orchestrator.status().phase, BenchmarkPhase::Loading);
    assert_eq!(backend.call_count(), 0);

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.num_calls, 10);
    assert_eq!(backend.call_count(), 10);
}

#[tokio::test]
async fn test_no_inputs_fails_before_timing() {
    let dir = artifact_dir(&["m1"]);
    let backend = MockBackend::new().with_inputs(vec![]);
    let orchestrator = build_orchestrator(&dir, backend.clone(), RunnerConfig::quick());

    let err = orchestrator
        .run_benchmark(ArtifactId::new("m1"), HardwareAffinity::CpuOnly)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::ContractIntrospection { .. }));
    assert_eq!(backend.call_count(), 0);

    let status = orchestrator.status();
    assert_eq!(status.phase, BenchmarkPhase::Idle);
    assert!(matches!(status.last_outcome, Some(Err(BenchError::ContractIntrospection { .. }))));
}

#[tokio::test]
async fn test_every_call_failing_completes() {
    let dir = artifact_dir(&["m1"]);
    let backend = MockBackend::new().failing_calls();
    let orchestrator = build_orchestrator(&dir, backend, RunnerConfig::quick());

    let report = orchestrator
        .run_benchmark(ArtifactId::new("m1"), HardwareAffinity::CpuAndAccelerator)
        .await
        .unwrap();

    assert_eq!(report.failed_calls, report.num_calls);
    assert!(report.all_calls_failed());
    assert!(orchestrator.status().result_text().contains("all 10 inference calls failed"));
}

#[tokio::test]
async fn test_load_failures() {
    let dir = artifact_dir(&["broken"]);
    let orchestrator = build_orchestrator(&dir, MockBackend::new().failing_load(), RunnerConfig::quick());

    let missing = orchestrator
        .run_benchmark(ArtifactId::new("absent"), HardwareAffinity::CpuOnly)
        .await
        .unwrap_err();
    let broken = orchestrator
        .run_benchmark(ArtifactId::new("broken"), HardwareAffinity::CpuOnly)
        .await
        .unwrap_err();

    assert_eq!(missing.kind(), "model_load");
    assert_eq!(broken.kind(), "model_load");
    assert!(broken.to_string().contains("mock configured to fail loading"));
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_empty_selection() {
    let dir = artifact_dir(&["m1"]);
    let orchestrator = build_orchestrator(&dir, MockBackend::new(), RunnerConfig::quick());

    let err = orchestrator
        .run_benchmark(ArtifactId::new(""), HardwareAffinity::CpuOnly)
        .await
        .unwrap_err();

    assert_eq!(err, BenchError::NoArtifactSelected);
    assert_eq!(err.to_string(), "Please select a model.");
    assert!(orchestrator.status().last_outcome.is_none());
}

#[test]
fn test_failure_messages_are_distinct() {
    let artifact = ArtifactId::new("m1");
    let errors = [
        BenchError::NoArtifactSelected,
        BenchError::ModelLoad {
            artifact: artifact.clone(),
            reason: "x".to_string(),
        },
        BenchError::ContractIntrospection {
            artifact,
            reason: "x".to_string(),
        },
        BenchError::InputAllocation("x".to_string()),
        BenchError::AlreadyRunning,
        BenchError::Worker("x".to_string()),
    ];

    let messages: HashSet<_> = errors.iter().map(|e| e.to_string()).collect();
    let kinds: HashSet<_> = errors.iter().map(|e| e.kind()).collect();
    assert_eq!(messages.len(), errors.len());
    assert_eq!(kinds.len(), errors.len());
}
