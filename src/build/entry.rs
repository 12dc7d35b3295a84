//! Generated deployment artifacts: `manifest.json` and the server entry.

use crate::fingerprint::Manifest;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

pub fn manifest_path(output: &Path) -> PathBuf {
    output.join(MANIFEST_FILE)
}

/// Write `<output>/manifest.json`.
pub fn save_manifest(output: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let path = manifest_path(output);
    let json = serde_json::to_string_pretty(manifest).context("failed to encode manifest")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Read `<output>/manifest.json` produced by a previous build.
pub fn load_manifest(output: &Path) -> Result<Manifest> {
    let path = manifest_path(output);
    let json = fs::read_to_string(&path).with_context(|| {
        format!(
            "failed to read {} (run `hallmark build` first)",
            path.display()
        )
    })?;
    serde_json::from_str(&json).with_context(|| format!("invalid manifest {}", path.display()))
}

/// Rust source embedding both tables as static data.
///
/// The production binary includes it and hands its app to `serve`, which
/// attaches `manifest()` so the resolver and ETag lookup need no rebuild:
///
/// ```ignore
/// include!("../dist/serve.rs");
///
/// fn main() -> anyhow::Result<()> {
///     serve(my_site::app())
/// }
/// ```
pub fn render(manifest: &Manifest) -> String {
    let mut src = String::new();
    src.push_str("// @generated by `hallmark build`. Do not edit.\n\n");

    render_table(&mut src, "URLS", manifest.urls.iter());
    render_table(&mut src, "ETAGS", manifest.etags.iter());

    src.push_str("pub fn manifest() -> hallmark::Manifest {\n");
    src.push_str("    hallmark::Manifest::from_static(URLS, ETAGS)\n");
    src.push_str("}\n\n");
    src.push_str("/// Serve `app` in production with the tables above.\n");
    src.push_str("pub fn serve(app: hallmark::App) -> anyhow::Result<()> {\n");
    src.push_str("    app.with_manifest(manifest()).serve()\n");
    src.push_str("}\n");
    src
}

fn render_table<'a>(src: &mut String, name: &str, rows: impl Iterator<Item = (&'a str, &'a str)>) {
    let _ = writeln!(src, "pub static {name}: &[(&str, &str)] = &[");
    for (key, value) in rows {
        // Debug formatting of str is a valid Rust string literal
        let _ = writeln!(src, "    ({key:?}, {value:?}),");
    }
    src.push_str("];\n\n");
}

/// Write the server entry to `<output>/<file_name>`.
pub fn write_entry(output: &Path, file_name: &str, manifest: &Manifest) -> Result<PathBuf> {
    let path = output.join(file_name);
    fs::write(&path, render(manifest))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
