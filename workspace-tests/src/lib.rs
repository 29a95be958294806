//! Helpers shared by the cross-crate workspace tests

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Library crates checked by the manifest tests
pub const MEMBER_CRATES: [&str; 2] = ["intercept-common", "intercept-core"];

pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".."))
}

pub fn read_manifest(path: &Path) -> anyhow::Result<toml::Value> {
    let content = fs::read_to_string(path)?;
    Ok(content.parse::<toml::Value>()?)
}

/// Dependency name -> whether it inherits from `[workspace.dependencies]`,
/// across the regular, dev and build dependency tables.
pub fn dependency_inheritance(manifest: &toml::Value) -> HashMap<String, bool> {
    let mut dependencies = HashMap::new();
    for section in ["dependencies", "dev-dependencies", "build-dependencies"] {
        let Some(table) = manifest.get(section).and_then(|v| v.as_table()) else {
            continue;
        };
        for (name, spec) in table {
            let uses_workspace = spec
                .get("workspace")
                .and_then(|w| w.as_bool())
                .unwrap_or(false);
            dependencies.insert(name.clone(), uses_workspace);
        }
    }
    dependencies
}

/// Names declared under `[workspace.dependencies]`
pub fn workspace_dependencies(root: &toml::Value) -> Vec<String> {
    root.get("workspace")
        .and_then(|w| w.get("dependencies"))
        .and_then(|d| d.as_table())
        .map(|t| t.keys().cloned().collect())
        .unwrap_or_default()
}
