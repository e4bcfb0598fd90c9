//! Benchmark domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a model artifact with its type marker stripped (e.g. `resnet50`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Create an artifact id from a base name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the base name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no artifact is selected
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ArtifactId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Compute units a backend may use for one model load
///
/// Serializes as the snake_case variant name; deserializes through
/// [`FromStr`], so the short names are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum HardwareAffinity {
    /// CPU only
    CpuOnly,
    /// CPU plus a GPU-class accelerator
    CpuAndAccelerator,
    /// Every compute unit the backend knows about
    #[default]
    AllAvailable,
}

impl HardwareAffinity {
    /// All options, in selector order
    pub const ALL: [HardwareAffinity; 3] = [
        HardwareAffinity::CpuOnly,
        HardwareAffinity::CpuAndAccelerator,
        HardwareAffinity::AllAvailable,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareAffinity::CpuOnly => "cpu_only",
            HardwareAffinity::CpuAndAccelerator => "cpu_and_accelerator",
            HardwareAffinity::AllAvailable => "all_available",
        }
    }

    /// Human label for a hardware selector
    pub fn label(&self) -> &'static str {
        match self {
            HardwareAffinity::CpuOnly => "CPU",
            HardwareAffinity::CpuAndAccelerator => "CPU and GPU",
            HardwareAffinity::AllAvailable => "All (Neural Engine, CPU, GPU)",
        }
    }

    /// Whether non-CPU compute units are allowed
    pub fn allows_accelerator(&self) -> bool {
        !matches!(self, HardwareAffinity::CpuOnly)
    }
}

impl fmt::Display for HardwareAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareAffinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "cpu_only" => Ok(HardwareAffinity::CpuOnly),
            "cpu_and_accelerator" | "cpu_and_gpu" => Ok(HardwareAffinity::CpuAndAccelerator),
            "all" | "all_available" => Ok(HardwareAffinity::AllAvailable),
            other => Err(format!("unknown hardware affinity '{}'", other)),
        }
    }
}

impl TryFrom<String> for HardwareAffinity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Dimensions of one dense tensor, e.g. `[1, 3, 224, 224]`
///
/// Always non-empty with every dimension greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct TensorShape(Vec<usize>);

impl TensorShape {
    /// Validate and wrap a dimension list
    pub fn new(dims: Vec<usize>) -> Result<Self, String> {
        if dims.is_empty() {
            return Err("tensor shape has no dimensions".to_string());
        }
        if let Some(pos) = dims.iter().position(|&d| d == 0) {
            return Err(format!("dimension {} of {:?} is zero", pos, dims));
        }
        Ok(Self(dims))
    }

    /// Dimension sizes
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Product of all dimensions, `None` on u64 overflow
    pub fn element_count(&self) -> Option<u64> {
        self.0
            .iter()
            .try_fold(1u64, |acc, &d| acc.checked_mul(d as u64))
    }
}

impl TryFrom<Vec<usize>> for TensorShape {
    type Error = String;

    fn try_from(dims: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(dims)
    }
}

impl From<TensorShape> for Vec<usize> {
    fn from(shape: TensorShape) -> Self {
        shape.0
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
