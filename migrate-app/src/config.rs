//! Layered settings: built-in defaults, then the user's settings.toml, then
//! `UPLUGIN_MIGRATE_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;

use migrate_core::directory::Directory;

const DEFAULT_SETTINGS: &str = include_str!("../defaults/settings.toml");
pub const SETTINGS_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "UPLUGIN_MIGRATE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    /// Engine used when `--engine` is not given
    pub engine_root: Option<PathBuf>,
    /// Extra directories scanned for engine installations
    pub engine_search_paths: Vec<PathBuf>,
    /// Kill RunUAT after this many seconds; unset means no limit
    pub timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            engine_root: None,
            engine_search_paths: Vec::new(),
            timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl MigratorConfig {
    pub fn load() -> Result<Self> {
        let settings = Directory::config_directory().map(|dir| dir.join(SETTINGS_FILE));
        Self::load_from(settings.as_deref())
    }

    /// Load with `settings` as the user file; a missing file is not an error.
    pub fn load_from(settings: Option<&Path>) -> Result<Self> {
        Self::load_with_env(settings, None)
    }

    /// `env` replaces the process environment when given
    fn load_with_env(settings: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

        if let Some(path) = settings {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("engine_search_paths")
                    .source(env),
            )
            .build()
            .context("failed to read settings")?;

        config
            .try_deserialize()
            .context("invalid settings")
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_user_file() {
        let temp = TempDir::new().unwrap();
        let config = MigratorConfig::load_from(Some(&temp.path().join("absent.toml"))).unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.timeout(), None);
        assert!(config.engine_search_paths.is_empty());
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        std::fs::write(
            &path,
            r#"
engine_root = "/opt/UnrealEngine/UE_5.3"
engine_search_paths = ["/mnt/engines"]
timeout_secs = 90
"#,
        )
        .unwrap();

        let config = MigratorConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.engine_root, Some(PathBuf::from("/opt/UnrealEngine/UE_5.3")));
        assert_eq!(config.engine_search_paths, vec![PathBuf::from("/mnt/engines")]);
        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_environment_overrides_user_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        std::fs::write(&path, "timeout_secs = 90\nengine_search_paths = [\"/mnt/engines\"]\n")
            .unwrap();

        let env = Map::from([
            ("UPLUGIN_MIGRATE_TIMEOUT_SECS".to_string(), "30".to_string()),
            (
                "UPLUGIN_MIGRATE_ENGINE_SEARCH_PATHS".to_string(),
                "/opt/epic,/srv/engines".to_string(),
            ),
            ("UPLUGIN_MIGRATE_LOG_LEVEL".to_string(), "debug".to_string()),
        ]);
        let config = MigratorConfig::load_with_env(Some(&path), Some(env)).unwrap();

        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.engine_search_paths,
            vec![PathBuf::from("/opt/epic"), PathBuf::from("/srv/engines")]
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.engine_root, None);
    }

    #[test]
    fn test_invalid_user_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();

        assert!(MigratorConfig::load_from(Some(&path)).is_err());
    }
}
