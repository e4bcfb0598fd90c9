//! Model artifact discovery

use bench_core::ArtifactId;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Read-only view of a directory holding compiled model artifacts
///
/// Artifacts are entries named `<id>.<extension>`; they may be files or
/// directories (compiled bundles).
#[derive(Debug, Clone)]
pub struct ArtifactCatalog {
    root: PathBuf,
    extension: String,
}

impl ArtifactCatalog {
    /// Create a catalog for `root`, matching entries ending in `.<extension>`
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact type marker, without the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Ids of every artifact under the root, sorted by name
    ///
    /// A missing or unreadable root yields an empty list.
    pub fn list_artifacts(&self) -> Vec<ArtifactId> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read artifact root {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut ids: Vec<ArtifactId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| self.artifact_id(&entry.path()))
            .collect();
        ids.sort();

        debug!("Found {} artifact(s) in {}", ids.len(), self.root.display());
        ids
    }

    /// Location of an artifact, `None` when it does not exist
    pub fn resolve(&self, id: &ArtifactId) -> Option<PathBuf> {
        let name = id.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return None;
        }

        let path = self.root.join(format!("{}.{}", name, self.extension));
        path.exists().then_some(path)
    }

    fn artifact_id(&self, path: &Path) -> Option<ArtifactId> {
        if path.extension()?.to_str()? != self.extension {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        (!stem.is_empty()).then(|| ArtifactId::new(stem))
    }
}
