//! Harness configuration

use crate::runner::RunnerConfig;
use bench_core::{ArtifactId, HardwareAffinity};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default configuration file, looked up relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "latency-bench.toml";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "LATENCY_BENCH_CONFIG";

/// Environment prefix for individual settings (`LATENCY_BENCH__RUNNER__NUM_CALLS`)
pub const ENV_PREFIX: &str = "LATENCY_BENCH";

/// Inference runtime selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Tract,
    Onnxruntime,
}

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding model artifacts
    pub artifact_root: PathBuf,
    /// Artifact type marker; defaults to the backend's own
    pub artifact_extension: Option<String>,
    /// Runtime used to load artifacts
    pub backend: BackendKind,
    /// Compute units for the run
    pub affinity: HardwareAffinity,
    /// Artifact to benchmark; only list artifacts when unset
    pub model: Option<ArtifactId>,
    /// Timed loop settings
    pub runner: RunnerConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Print the report as JSON
    pub json_output: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from("./models"),
            artifact_extension: None,
            backend: BackendKind::default(),
            affinity: HardwareAffinity::default(),
            model: None,
            runner: RunnerConfig::default(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl HarnessConfig {
    /// Load from the default file (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load from `path` (optional file) layered under the environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Tracing level parsed from `log_level`, `None` when it is not a level name
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        self.log_level.parse().ok()
    }
}
