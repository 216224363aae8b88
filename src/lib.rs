//! StaticPress Core - Static Asset Build Pipeline
//!
//! # The Five Laws (Non-Negotiable)
//! 1. The Manifest Resolves, It Never Rejects
//! 2. Fingerprints Are Content, Not Sequence
//! 3. A Broken Template Ships Visibly Broken, Never Silently Missing
//! 4. Every Included Fragment Is A Recorded Dependency
//! 5. The Cleaner Deletes Only What It Fingerprinted

pub mod manifest;
pub mod render;
pub mod hashing;
pub mod fingerprint;
pub mod clean;
pub mod pipeline;

pub use manifest::ManifestStore;
pub use render::{
    AssetResolver, DependencySet, RenderOutcome, TemplateError, TemplateRenderer, TemplateSource,
};
pub use hashing::{fingerprint_digest, sha256_hex};
pub use fingerprint::{BuildMode, EmittedAsset, Emitter};
pub use clean::clean_stale_outputs;
pub use pipeline::{BuildConfig, BuildError, BuildPipeline, BuildReport, EntryCompiler, EntryKind};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known manifest filename inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";
