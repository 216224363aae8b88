//! Build Pipeline - Single Entry Point
//!
//! Control flow: load the previous manifest -> render the template entries
//! against it -> compile script/stylesheet entries through their external
//! collaborators -> emit everything and write the fresh manifest -> clean
//! stale outputs (production only, strictly after all emission).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use chrono::{DateTime, Utc};

use crate::clean::clean_stale_outputs;
use crate::fingerprint::{BuildMode, EmitError, EmittedAsset, Emitter};
use crate::manifest::{ManifestError, ManifestStore};
use crate::render::{DependencySet, RenderOutcome, TemplateRenderer, TemplateSource};
use crate::MANIFEST_FILE;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Missing entry source {path}: {source}")]
    EntryMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Entry {name} failed to compile: {message}")]
    EntryCompile { name: String, message: String },

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to clean output directory {path}: {source}")]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Template,
    Script,
    Stylesheet,
}

/// One build entry point: a source file compiled into one logical output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Logical output name, e.g. "index.html". Manifest key.
    pub name: String,
    /// Source file, relative to the source directory.
    pub source: PathBuf,
    pub kind: EntryKind,
}

impl EntryPoint {
    pub fn new(name: &str, source: &str, kind: EntryKind) -> Self {
        Self {
            name: name.to_string(),
            source: PathBuf::from(source),
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub src_dir: PathBuf,
    pub out_dir: PathBuf,
    pub mode: BuildMode,
    #[serde(default = "default_public_path")]
    pub public_path: String,
    #[serde(default = "default_entries")]
    pub entries: Vec<EntryPoint>,
}

fn default_public_path() -> String {
    "/".to_string()
}

fn default_entries() -> Vec<EntryPoint> {
    vec![
        EntryPoint::new("index.html", "index.ejs", EntryKind::Template),
        EntryPoint::new("app.js", "app.js", EntryKind::Script),
        EntryPoint::new("style.css", "style.css", EntryKind::Stylesheet),
    ]
}

impl BuildConfig {
    pub fn new(src_dir: &Path, out_dir: &Path, mode: BuildMode) -> Self {
        Self {
            src_dir: src_dir.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            mode,
            public_path: default_public_path(),
            entries: default_entries(),
        }
    }
}

/// External collaborator seam for the script bundler and stylesheet
/// compiler. This crate does not bundle or minify; the default
/// implementation passes source bytes through untouched.
pub trait EntryCompiler {
    fn compile(&self, source: Vec<u8>) -> anyhow::Result<Vec<u8>>;
}

struct PassthroughCompiler;

impl EntryCompiler for PassthroughCompiler {
    fn compile(&self, source: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        Ok(source)
    }
}

/// A localized template failure, reported but not build-fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderIssue {
    pub entry: String,
    pub file: PathBuf,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub created_at: DateTime<Utc>,
    pub assets: Vec<EmittedAsset>,
    /// Per-template fragment dependencies, for the surrounding watcher.
    pub dependencies: BTreeMap<String, Vec<PathBuf>>,
    pub render_errors: Vec<RenderIssue>,
    pub removed: Vec<PathBuf>,
}

/// The build pipeline - single entry point for one build invocation.
pub struct BuildPipeline {
    renderer: TemplateRenderer,
    script_compiler: Box<dyn EntryCompiler>,
    stylesheet_compiler: Box<dyn EntryCompiler>,
}

impl BuildPipeline {
    pub fn new() -> Self {
        Self {
            renderer: TemplateRenderer::new(),
            script_compiler: Box::new(PassthroughCompiler),
            stylesheet_compiler: Box::new(PassthroughCompiler),
        }
    }

    pub fn with_script_compiler(mut self, compiler: Box<dyn EntryCompiler>) -> Self {
        self.script_compiler = compiler;
        self
    }

    pub fn with_stylesheet_compiler(mut self, compiler: Box<dyn EntryCompiler>) -> Self {
        self.stylesheet_compiler = compiler;
        self
    }

    /// Run one build invocation.
    ///
    /// Fatal errors (malformed manifest, missing entry source, write
    /// failure) abort. Template render errors do not: the broken entry is
    /// emitted as its original source behind a visible error marker and
    /// recorded in the report, so sibling entries still ship.
    pub fn build(&self, config: &BuildConfig) -> Result<BuildReport, BuildError> {
        fs::create_dir_all(&config.out_dir).map_err(|source| BuildError::OutputDir {
            path: config.out_dir.clone(),
            source,
        })?;

        // The previous build's manifest, for resolution during this one.
        // Development never fingerprints, so there is nothing to resolve.
        let previous = if config.mode.is_production() {
            ManifestStore::load(&config.out_dir.join(MANIFEST_FILE))?
        } else {
            ManifestStore::empty()
        };

        let emitter = Emitter::new(&config.out_dir, config.mode, &config.public_path);
        let mut assets = Vec::with_capacity(config.entries.len());
        let mut dependencies = BTreeMap::new();
        let mut render_errors = Vec::new();

        for entry in &config.entries {
            let src_path = config.src_dir.join(&entry.source);
            let content = match entry.kind {
                EntryKind::Template => {
                    let mut deps = DependencySet::new();
                    let html =
                        self.render_entry(entry, &src_path, &previous, &mut deps, &mut render_errors)?;
                    dependencies.insert(
                        entry.name.clone(),
                        deps.into_iter().collect::<Vec<_>>(),
                    );
                    html.into_bytes()
                }
                EntryKind::Script | EntryKind::Stylesheet => {
                    let raw = fs::read(&src_path).map_err(|source| BuildError::EntryMissing {
                        path: src_path.clone(),
                        source,
                    })?;
                    let compiler = match entry.kind {
                        EntryKind::Script => &self.script_compiler,
                        _ => &self.stylesheet_compiler,
                    };
                    compiler
                        .compile(raw)
                        .map_err(|err| BuildError::EntryCompile {
                            name: entry.name.clone(),
                            message: err.to_string(),
                        })?
                }
            };
            assets.push(emitter.emit(&entry.name, &content)?);
        }

        emitter.write_manifest(&assets)?;

        // Cleaning is serialized behind emission: every output of this
        // build is on disk before anything gets deleted.
        let removed = if config.mode.is_production() {
            let keep: BTreeSet<String> = assets.iter().map(|a| a.file_name.clone()).collect();
            clean_stale_outputs(&config.out_dir, &keep).map_err(|source| BuildError::Clean {
                path: config.out_dir.clone(),
                source,
            })?
        } else {
            Vec::new()
        };

        Ok(BuildReport {
            mode: config.mode,
            created_at: Utc::now(),
            assets,
            dependencies,
            render_errors,
            removed,
        })
    }

    fn render_entry(
        &self,
        entry: &EntryPoint,
        src_path: &Path,
        manifest: &ManifestStore,
        deps: &mut DependencySet,
        render_errors: &mut Vec<RenderIssue>,
    ) -> Result<String, BuildError> {
        let source =
            TemplateSource::read(src_path).map_err(|source| BuildError::EntryMissing {
                path: src_path.to_path_buf(),
                source,
            })?;

        match self.renderer.render(&source, manifest, deps) {
            RenderOutcome::Rendered(html) => Ok(html),
            RenderOutcome::Failed { error, original } => {
                tracing::warn!(
                    file = %src_path.display(),
                    %error,
                    "template render failed, emitting original source"
                );
                render_errors.push(RenderIssue {
                    entry: entry.name.clone(),
                    file: src_path.to_path_buf(),
                    message: error.to_string(),
                });
                Ok(format!(
                    "<!-- staticpress: template error: {error} -->\n{original}"
                ))
            }
        }
    }
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new()
    }
}
