//! Manifest Store - Logical Names To Resolved Paths
//!
//! The manifest is a read-only snapshot of the *previous* build's output,
//! consumed during the current build's template render, then written anew
//! once the current build has emitted its assets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::render::AssetResolver;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Malformed manifest {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Immutable logical-name -> resolved-path mapping, loaded once per build.
///
/// Empty in development mode (no fingerprinting has happened), populated
/// from a prior build's `manifest.json` in production mode. Read-only for
/// the duration of a build, so it may be shared by reference across
/// parallel entry-point compilations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestStore {
    entries: BTreeMap<String, String>,
}

impl ManifestStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a manifest from disk.
    ///
    /// A wholly absent file is "empty", not an error: the first-ever build
    /// has nothing to resolve against. A present-but-malformed file aborts
    /// the build, since a corrupt manifest makes every resolution
    /// unreliable.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no manifest present, starting empty");
            return Ok(Self::empty());
        }
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = serde_json::from_str(&content).map_err(|source| ManifestError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { entries })
    }

    /// Resolve a logical asset name to its output path.
    ///
    /// Missing keys fall back to the literal name. This is a deliberate
    /// permissive policy: requiring every referenced asset to pre-exist in
    /// the manifest would break cold-start builds.
    pub fn resolve<'a>(&'a self, logical: &'a str) -> &'a str {
        match self.entries.get(logical) {
            Some(resolved) => resolved,
            None => {
                tracing::debug!(logical, "asset not in manifest, falling back to literal name");
                logical
            }
        }
    }

    pub fn insert(&mut self, logical: String, resolved: String) {
        self.entries.insert(logical, resolved);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolved paths of every entry, in key order.
    pub fn resolved_paths(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Write the manifest to its well-known location for the next build.
    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            ManifestError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl AssetResolver for ManifestStore {
    fn resolve(&self, logical: &str) -> String {
        ManifestStore::resolve(self, logical).to_string()
    }
}
