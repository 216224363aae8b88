//! End-To-End Build Flow
//!
//! Successive production builds over the same output directory: the
//! manifest written by one build resolves asset references in the next,
//! and the cleaner reconciles the directory against the newest manifest.

use std::fs;
use std::path::Path;

use staticpress_core::{BuildConfig, BuildMode, BuildPipeline, ManifestStore};

fn write_fixture(src: &Path) {
    fs::create_dir_all(src).unwrap();
    fs::write(
        src.join("index.ejs"),
        "<script src=\"<%= asset('app.js') %>\"></script>",
    )
    .unwrap();
    fs::write(src.join("app.js"), "console.log(1);").unwrap();
    fs::write(src.join("style.css"), "body { margin: 0 }").unwrap();
}

fn build(src: &Path, out: &Path) -> staticpress_core::BuildReport {
    BuildPipeline::new()
        .build(&BuildConfig::new(src, out, BuildMode::Production))
        .unwrap()
}

#[test]
fn cold_start_build_falls_back_then_next_build_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let (src, out) = (dir.path().join("src"), dir.path().join("dist"));
    write_fixture(&src);

    // Build 1: no manifest exists yet, so the reference degrades to the
    // literal logical name instead of failing the cold start.
    let first = build(&src, &out);
    let index_1 = first
        .assets
        .iter()
        .find(|a| a.logical_name == "index.html")
        .unwrap()
        .file_name
        .clone();
    let html = fs::read_to_string(out.join(&index_1)).unwrap();
    assert!(html.contains("src=\"app.js\""));

    // Build 2: resolves against build 1's manifest.
    let second = build(&src, &out);
    let app_1 = first
        .assets
        .iter()
        .find(|a| a.logical_name == "app.js")
        .unwrap();
    let index_2 = second
        .assets
        .iter()
        .find(|a| a.logical_name == "index.html")
        .unwrap()
        .file_name
        .clone();
    let html = fs::read_to_string(out.join(&index_2)).unwrap();
    assert!(html.contains(&format!("src=\"{}\"", app_1.resolved_path)));
}

#[test]
fn unchanged_sources_fingerprint_identically_across_builds() {
    let dir = tempfile::tempdir().unwrap();
    let (src, out_a, out_b) = (
        dir.path().join("src"),
        dir.path().join("dist-a"),
        dir.path().join("dist-b"),
    );
    write_fixture(&src);

    let a = build(&src, &out_a);
    let b = build(&src, &out_b);

    for (asset_a, asset_b) in a.assets.iter().zip(&b.assets) {
        assert_eq!(asset_a.file_name, asset_b.file_name);
        assert_eq!(asset_a.hash, asset_b.hash);
    }
}

#[test]
fn cleaner_reconciles_output_against_newest_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (src, out) = (dir.path().join("src"), dir.path().join("dist"));
    write_fixture(&src);
    // A bystander file other tooling put in the output directory.
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("robots.txt"), "User-agent: *").unwrap();

    let first = build(&src, &out);
    let app_old = first
        .assets
        .iter()
        .find(|a| a.logical_name == "app.js")
        .unwrap()
        .file_name
        .clone();

    // Change the script so its fingerprint moves.
    fs::write(src.join("app.js"), "console.log(2);").unwrap();
    let second = build(&src, &out);
    let app_new = second
        .assets
        .iter()
        .find(|a| a.logical_name == "app.js")
        .unwrap()
        .file_name
        .clone();

    assert_ne!(app_old, app_new);
    assert!(second.removed.contains(&out.join(&app_old)));
    assert!(!out.join(&app_old).exists());
    assert!(out.join(&app_new).exists());
    assert!(out.join("manifest.json").exists());
    assert!(out.join("robots.txt").exists());

    // The new manifest reflects exactly the current build.
    let manifest = ManifestStore::load(&out.join("manifest.json")).unwrap();
    assert_eq!(manifest.resolve("app.js"), format!("/{app_new}"));
    assert_eq!(manifest.len(), 3);
}
