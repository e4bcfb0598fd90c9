//! Latency aggregation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Average latency of one inference call, in milliseconds, rounded to 0.01
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AverageLatencyMs(f64);

impl AverageLatencyMs {
    /// Milliseconds per call
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for AverageLatencyMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Turns a total loop duration into a per-call figure
pub struct LatencyAggregator;

impl LatencyAggregator {
    /// `(total_elapsed_secs / num_calls) * 1000`, rounded to two decimals
    ///
    /// # Panics
    ///
    /// Panics when `num_calls` is zero. Runners always issue at least one call,
    /// so a zero count is a programming error.
    pub fn average(total_elapsed_secs: f64, num_calls: u32) -> AverageLatencyMs {
        assert!(num_calls > 0, "latency average requires at least one call");

        let per_call_ms = (total_elapsed_secs / f64::from(num_calls)) * 1000.0;
        AverageLatencyMs((per_call_ms.max(0.0) * 100.0).round() / 100.0)
    }
}
