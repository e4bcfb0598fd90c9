//! Benchmark orchestration
//!
//! One request/response cycle per run: IDLE → LOADING → TIMING → DONE, or
//! FAILED from LOADING/TIMING, then back to IDLE. The pipeline runs on a
//! blocking worker; observers watch the published [`BenchmarkStatus`].

use crate::runner::{BenchmarkReport, InferenceRunner};
use bench_core::{ArtifactId, BenchError, HardwareAffinity, InferenceBackend};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Orchestrator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkPhase {
    Idle,
    Loading,
    Timing,
    Done,
    Failed,
}

impl BenchmarkPhase {
    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        matches!(self, BenchmarkPhase::Loading | BenchmarkPhase::Timing)
    }

    /// DONE and FAILED are not running, so a new run may claim them directly
    fn can_move_to(&self, next: BenchmarkPhase) -> bool {
        use BenchmarkPhase::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Done, Loading)
                | (Failed, Loading)
                | (Loading, Timing)
                | (Loading, Failed)
                | (Timing, Done)
                | (Timing, Failed)
                | (Done, Idle)
                | (Failed, Idle)
        )
    }
}

/// Outcome of the most recent finished run
pub type BenchmarkOutcome = Result<BenchmarkReport, BenchError>;

/// What a presentation layer observes
#[derive(Debug, Clone)]
pub struct BenchmarkStatus {
    pub phase: BenchmarkPhase,
    pub last_outcome: Option<BenchmarkOutcome>,
}

impl BenchmarkStatus {
    /// Running indicator
    pub fn running(&self) -> bool {
        self.phase.is_running()
    }

    /// Latency text or error message, "N/A" before the first run
    pub fn result_text(&self) -> String {
        match &self.last_outcome {
            None => "N/A".to_string(),
            Some(Ok(report)) => match report.warning() {
                Some(warning) => format!("{} ms ({})", report.average_latency_ms, warning),
                None => format!("{} ms", report.average_latency_ms),
            },
            Some(Err(e)) => e.to_string(),
        }
    }
}

impl Default for BenchmarkStatus {
    fn default() -> Self {
        Self {
            phase: BenchmarkPhase::Idle,
            last_outcome: None,
        }
    }
}

/// Cloneable handle performing every phase transition
#[derive(Clone)]
struct StatusCell(Arc<watch::Sender<BenchmarkStatus>>);

impl StatusCell {
    /// Claim the session for a new run; false if one is in flight
    fn try_begin(&self) -> bool {
        self.0.send_if_modified(|status| {
            if !status.phase.can_move_to(BenchmarkPhase::Loading) {
                return false;
            }
            status.phase = BenchmarkPhase::Loading;
            true
        })
    }

    fn transition(&self, next: BenchmarkPhase, outcome: Option<BenchmarkOutcome>) {
        self.0.send_if_modified(|status| {
            if !status.phase.can_move_to(next) {
                warn!("Ignoring transition {:?} -> {:?}", status.phase, next);
                return false;
            }
            debug!("Benchmark phase {:?} -> {:?}", status.phase, next);
            status.phase = next;
            if outcome.is_some() {
                status.last_outcome = outcome;
            }
            true
        });
    }

    /// Publish the terminal phase, then return to IDLE
    fn finish(&self, outcome: &BenchmarkOutcome) {
        let terminal = if outcome.is_ok() {
            BenchmarkPhase::Done
        } else {
            BenchmarkPhase::Failed
        };
        self.transition(terminal, Some(outcome.clone()));
        self.return_to_idle(terminal);
    }

    /// Leave `terminal` for IDLE unless a new run has already claimed the session
    fn return_to_idle(&self, terminal: BenchmarkPhase) {
        self.0.send_if_modified(|status| {
            if status.phase != terminal {
                return false;
            }
            debug!("Benchmark phase {:?} -> {:?}", terminal, BenchmarkPhase::Idle);
            status.phase = BenchmarkPhase::Idle;
            true
        });
    }

    fn phase(&self) -> BenchmarkPhase {
        self.0.borrow().phase
    }
}

/// Resets the session if the worker unwinds before finishing
struct FinishGuard {
    status: StatusCell,
    finished: bool,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if !self.finished && self.status.phase().is_running() {
            warn!("Benchmark worker exited without finishing");
            self.status
                .finish(&Err(BenchError::Worker("benchmark worker panicked".to_string())));
        }
    }
}

/// Runs at most one benchmark at a time for a session
pub struct BenchmarkOrchestrator<B: InferenceBackend> {
    runner: Arc<InferenceRunner<B>>,
    status: StatusCell,
}

impl<B: InferenceBackend> BenchmarkOrchestrator<B> {
    /// Create an idle orchestrator around a runner
    pub fn new(runner: InferenceRunner<B>) -> Self {
        let (tx, _rx) = watch::channel(BenchmarkStatus::default());
        Self {
            runner: Arc::new(runner),
            status: StatusCell(Arc::new(tx)),
        }
    }

    /// Artifacts available for selection
    pub fn list_artifacts(&self) -> Vec<ArtifactId> {
        self.runner.catalog().list_artifacts()
    }

    /// Snapshot of the current status
    pub fn status(&self) -> BenchmarkStatus {
        self.status.0.borrow().clone()
    }

    /// Whether a run is in flight
    pub fn is_running(&self) -> bool {
        self.status.phase().is_running()
    }

    /// Receiver notified on every phase change
    pub fn subscribe(&self) -> watch::Receiver<BenchmarkStatus> {
        self.status.0.subscribe()
    }

    /// Start a run on a blocking worker and return its handle
    ///
    /// Rejects the request with `AlreadyRunning` while another run is in
    /// LOADING or TIMING. Must be called from within a tokio runtime.
    pub fn spawn_benchmark(
        &self,
        artifact: ArtifactId,
        affinity: HardwareAffinity,
    ) -> Result<JoinHandle<BenchmarkOutcome>, BenchError> {
        if artifact.is_empty() {
            return Err(BenchError::NoArtifactSelected);
        }
        if !self.status.try_begin() {
            info!("Rejecting benchmark of {}: a run is in flight", artifact);
            return Err(BenchError::AlreadyRunning);
        }

        info!("Starting benchmark of {} (affinity={})", artifact, affinity);
        let runner = Arc::clone(&self.runner);
        let status = self.status.clone();

        Ok(tokio::task::spawn_blocking(move || {
            let mut guard = FinishGuard {
                status: status.clone(),
                finished: false,
            };

            let outcome = runner.prepare(&artifact, affinity).map(|prepared| {
                status.transition(BenchmarkPhase::Timing, None);
                prepared.into_report()
            });

            if let Err(e) = &outcome {
                warn!("Benchmark of {} failed ({}): {}", artifact, e.kind(), e);
            }
            status.finish(&outcome);
            guard.finished = true;
            outcome
        }))
    }

    /// Run one benchmark to completion
    pub async fn run_benchmark(
        &self,
        artifact: ArtifactId,
        affinity: HardwareAffinity,
    ) -> BenchmarkOutcome {
        let handle = self.spawn_benchmark(artifact, affinity)?;
        handle.await.map_err(|e| BenchError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        use BenchmarkPhase::*;

        assert!(Idle.can_move_to(Loading));
        assert!(Loading.can_move_to(Failed));
        assert!(Timing.can_move_to(Done));
        assert!(Done.can_move_to(Idle));
        assert!(Failed.can_move_to(Loading));
        assert!(!Loading.can_move_to(Loading));
        assert!(!Timing.can_move_to(Loading));
        assert!(!Idle.can_move_to(Done));
    }

    #[test]
    fn test_status_text_before_first_run() {
        let status = BenchmarkStatus::default();

        assert!(!status.running());
        assert_eq!(status.result_text(), "N/A");
    }

    #[test]
    fn test_status_text_for_failure() {
        let status = BenchmarkStatus {
            phase: BenchmarkPhase::Idle,
            last_outcome: Some(Err(BenchError::AlreadyRunning)),
        };

        assert_eq!(status.result_text(), "A benchmark is already running");
    }

    #[test]
    fn test_finished_session_accepts_next_run() {
        let (tx, _rx) = watch::channel(BenchmarkStatus::default());
        let cell = StatusCell(Arc::new(tx));

        assert!(cell.try_begin());
        assert!(!cell.try_begin());
        cell.transition(BenchmarkPhase::Timing, None);
        cell.transition(
            BenchmarkPhase::Failed,
            Some(Err(BenchError::Worker("boom".to_string()))),
        );

        assert!(cell.try_begin());
        cell.return_to_idle(BenchmarkPhase::Failed);

        assert_eq!(cell.phase(), BenchmarkPhase::Loading);
        assert!(cell.0.borrow().last_outcome.is_some());
    }
}
