//! Fingerprinting & Emission
//!
//! Assigns every build output its final filename (content-hashed in
//! production, stable in development), writes the bytes, and writes the
//! fresh manifest once all entries have been emitted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::hashing::{fingerprint_digest, sha256_hex};
use crate::manifest::{ManifestError, ManifestStore};
use crate::MANIFEST_FILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => write!(f, "development"),
            BuildMode::Production => write!(f, "production"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!(
                "unknown mode `{other}` (expected development or production)"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One emitted build output. The set of these records across one build
/// invocation forms the new manifest and feeds the stale-output cleaner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmittedAsset {
    pub logical_name: String,
    pub resolved_path: String,
    pub file_name: String,
    pub hash: String,
}

/// Writes build outputs into the output directory under their final names.
pub struct Emitter {
    out_dir: PathBuf,
    mode: BuildMode,
    public_path: String,
}

impl Emitter {
    pub fn new(out_dir: &Path, mode: BuildMode, public_path: &str) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
            mode,
            public_path: public_path.to_string(),
        }
    }

    /// Emit one output. Write failures are build-fatal: a manifest must
    /// never reference a file that failed to hit disk.
    pub fn emit(&self, logical_name: &str, content: &[u8]) -> Result<EmittedAsset, EmitError> {
        let file_name = output_file_name(logical_name, content, self.mode);
        let path = self.out_dir.join(&file_name);
        fs::write(&path, content).map_err(|source| EmitError::Write { path, source })?;

        tracing::debug!(logical = logical_name, file = %file_name, "emitted asset");
        Ok(EmittedAsset {
            logical_name: logical_name.to_string(),
            resolved_path: format!("{}{}", self.public_path, file_name),
            file_name,
            hash: sha256_hex(content),
        })
    }

    /// Write the fresh manifest for the next build invocation. Must run
    /// after every emission has completed.
    pub fn write_manifest(&self, assets: &[EmittedAsset]) -> Result<ManifestStore, ManifestError> {
        let mut manifest = ManifestStore::empty();
        for asset in assets {
            manifest.insert(asset.logical_name.clone(), asset.resolved_path.clone());
        }
        manifest.write(&self.out_dir.join(MANIFEST_FILE))?;
        Ok(manifest)
    }
}

/// Final filename for a logical output name.
///
/// Production: `{stem}.{digest}.{ext}`. Development: the logical name
/// unchanged, so dev-server caching stays simple.
pub fn output_file_name(logical_name: &str, content: &[u8], mode: BuildMode) -> String {
    match mode {
        BuildMode::Development => logical_name.to_string(),
        BuildMode::Production => {
            let digest = fingerprint_digest(content);
            match logical_name.rsplit_once('.') {
                Some((stem, ext)) => format!("{stem}.{digest}.{ext}"),
                None => format!("{logical_name}.{digest}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_name_is_stable() {
        assert_eq!(
            output_file_name("app.js", b"whatever", BuildMode::Development),
            "app.js"
        );
    }

    #[test]
    fn test_production_name_embeds_digest() {
        let name = output_file_name("app.js", b"console.log(1)", BuildMode::Production);
        let digest = fingerprint_digest(b"console.log(1)");
        assert_eq!(name, format!("app.{digest}.js"));
    }

    #[test]
    fn test_production_name_deterministic() {
        let a = output_file_name("style.css", b"body{}", BuildMode::Production);
        let b = output_file_name("style.css", b"body{}", BuildMode::Production);
        assert_eq!(a, b);
    }

    #[test]
    fn test_production_name_changes_with_content() {
        let a = output_file_name("style.css", b"body{}", BuildMode::Production);
        let b = output_file_name("style.css", b"body{ }", BuildMode::Production);
        assert_ne!(a, b);
    }

    #[test]
    fn test_emit_writes_bytes_and_prefixes_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = Emitter::new(dir.path(), BuildMode::Production, "/");
        let asset = emitter.emit("app.js", b"console.log(1)").unwrap();

        assert_eq!(asset.logical_name, "app.js");
        assert_eq!(asset.resolved_path, format!("/{}", asset.file_name));
        let written = std::fs::read(dir.path().join(&asset.file_name)).unwrap();
        assert_eq!(written, b"console.log(1)");
    }

    #[test]
    fn test_write_manifest_maps_logical_to_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = Emitter::new(dir.path(), BuildMode::Production, "/");
        let asset = emitter.emit("app.js", b"x").unwrap();
        let manifest = emitter.write_manifest(std::slice::from_ref(&asset)).unwrap();

        assert_eq!(manifest.resolve("app.js"), asset.resolved_path);
        assert!(dir.path().join(crate::MANIFEST_FILE).exists());
    }
}
