//! Stale-Output Cleaner
//!
//! After a production build, fingerprinted files from earlier builds are
//! dead weight: nothing references them and they accumulate without bound.
//! The cleaner removes exactly those, and nothing else.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hashing::FINGERPRINT_LEN;

/// True when `name` looks like `{stem}.{digest}.{ext}` with a digest of
/// the fingerprint length in lowercase hex.
///
/// The pattern is the safety bound on blast radius: files that other
/// tooling dropped into the output directory never match it.
pub fn is_fingerprinted_name(name: &str) -> bool {
    let Some((rest, _ext)) = name.rsplit_once('.') else {
        return false;
    };
    let Some((stem, digest)) = rest.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && digest.len() == FINGERPRINT_LEN
        && digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Remove fingerprint-patterned files in `out_dir` that are not in `keep`
/// (the current build's emitted filenames). Returns the removed paths.
///
/// Must run only after every emission in the current build has completed,
/// so a late-finishing parallel compilation never loses its output.
pub fn clean_stale_outputs(
    out_dir: &Path,
    keep: &BTreeSet<String>,
) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_fingerprinted_name(&name) || keep.contains(&name) {
            continue;
        }
        let path = entry.path();
        fs::remove_file(&path)?;
        tracing::warn!(file = %path.display(), "removed stale fingerprinted output");
        removed.push(path);
    }

    removed.sort();
    Ok(removed)
}
