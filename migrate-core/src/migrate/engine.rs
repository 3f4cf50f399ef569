//! Engine discovery and path resolution

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::BuildError;
use super::types::{InstalledEngine, Platform};

/// Engine/Build/Build.version (partial)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BuildVersion {
    major_version: u64,
    minor_version: u64,
    patch_version: u64,
}

/// Get the RunUAT launcher path for the engine
pub fn uat_script_path(engine_root: &Path, platform: Platform) -> PathBuf {
    engine_root
        .join("Engine")
        .join("Build")
        .join("BatchFiles")
        .join(platform.uat_script_name())
}

/// Get engine version from Build.version file
pub fn engine_version(engine_root: &Path) -> Option<String> {
    let version_file = engine_root.join("Engine").join("Build").join("Build.version");
    let content = fs::read_to_string(version_file).ok()?;
    let version: BuildVersion = serde_json::from_str(&content).ok()?;
    Some(format!(
        "{}.{}.{}",
        version.major_version, version.minor_version, version.patch_version
    ))
}

/// Well-known install locations per platform
fn default_search_roots(platform: Platform) -> Vec<PathBuf> {
    match platform {
        Platform::Windows => vec![
            PathBuf::from("C:\\Program Files\\Epic Games"),
            PathBuf::from("C:\\Program Files (x86)\\Epic Games"),
        ],
        Platform::Mac => vec![
            PathBuf::from("/Users/Shared/Epic Games"),
            PathBuf::from("/Applications/Epic Games"),
            PathBuf::from("/Applications"),
        ],
        Platform::Linux => {
            let mut roots = vec![PathBuf::from("/opt/UnrealEngine"), PathBuf::from("/opt")];
            if let Some(base) = directories::BaseDirs::new() {
                roots.push(base.home_dir().to_path_buf());
            }
            roots
        }
    }
}

fn looks_like_engine_folder(name: &str) -> bool {
    name.starts_with("UE_") || name.starts_with("UnrealEngine")
}

fn engine_id(name: &str) -> String {
    name.trim_start_matches("UE_")
        .trim_start_matches("UnrealEngine")
        .trim_start_matches('-')
        .to_string()
}

/// Discover engine installations under `extra_roots` and the platform's
/// default locations.
///
/// A root that is itself an engine (has RunUAT) is reported directly,
/// otherwise its `UE_*` / `UnrealEngine*` children are checked. Only engines
/// whose RunUAT launcher exists are returned, newest version first; the first
/// one is marked default.
pub fn discover_engines(extra_roots: &[PathBuf], platform: Platform) -> Vec<InstalledEngine> {
    let mut seen = HashSet::new();
    let mut engines = Vec::new();

    let roots = extra_roots
        .iter()
        .cloned()
        .chain(default_search_roots(platform));

    for root in roots {
        let mut candidates = Vec::new();
        if uat_script_path(&root, platform).is_file() {
            candidates.push(root.clone());
        } else if let Ok(entries) = fs::read_dir(&root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if looks_like_engine_folder(&name) && entry.path().is_dir() {
                    candidates.push(entry.path());
                }
            }
        }

        for path in candidates {
            if !uat_script_path(&path, platform).is_file() || !seen.insert(path.clone()) {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let version = engine_version(&path);
            let id = engine_id(&name);
            let display_name = match &version {
                Some(v) => format!("UE {}", v),
                None if id.is_empty() => name.clone(),
                None => format!("UE {}", id),
            };

            engines.push(InstalledEngine {
                id,
                display_name,
                path,
                version,
                is_default: false,
            });
        }
    }

    // Newest first; unknown versions sort last
    engines.sort_by(|a, b| parsed_version(b).cmp(&parsed_version(a)));

    if let Some(first) = engines.first_mut() {
        first.is_default = true;
    }

    engines
}

fn parsed_version(engine: &InstalledEngine) -> Option<semver::Version> {
    engine
        .version
        .as_deref()
        .and_then(|v| semver::Version::parse(v).ok())
}

/// .uplugin file structure (partial - only what the log banner shows)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PluginDescriptor {
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub engine_version: Option<String>,
}

impl PluginDescriptor {
    pub fn read(path: &Path) -> Result<Self, BuildError> {
        let content = fs::read_to_string(path).map_err(|source| BuildError::ReadDescriptor {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| BuildError::ParseDescriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// "Name 1.2.0", falling back to the file stem of `path`
    pub fn label(&self, path: &Path) -> String {
        let name = self.friendly_name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        match &self.version_name {
            Some(version) => format!("{} {}", name, version),
            None => name,
        }
    }
}
