use std::path::PathBuf;

use directories::ProjectDirs;

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "uplugin-migrate";
const APPLICATION: &str = "uplugin-migrate";

/// Well-known per-user directories, created on first access.
pub struct Directory {}

impl Directory {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
    }

    /// Directory holding `settings.toml`
    pub fn config_directory() -> Option<PathBuf> {
        let dir = Self::project_dirs()?.config_dir().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).ok()?;
        }
        Some(dir)
    }

    /// Directory for the rolling log files
    pub fn logs_directory() -> Option<PathBuf> {
        let dir = Self::project_dirs()?.data_local_dir().join("logs");
        if !dir.exists() {
            std::fs::create_dir_all(&dir).ok()?;
        }
        Some(dir)
    }
}
