//! RunUAT command construction

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use super::engine::uat_script_path;
use super::error::BuildError;
use super::types::{MigrationRequest, Platform, ResolvedCommand};

/// RunUAT subcommand that compiles and packages a plugin
pub const BUILD_PLUGIN_COMMAND: &str = "BuildPlugin";

/// Subfolder of the destination that receives the packaged plugin
pub const MIGRATED_DIR_NAME: &str = "Migrated";

/// Builds [`ResolvedCommand`]s for one target platform
#[derive(Debug, Clone, Copy)]
pub struct Builder {
    platform: Platform,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl Builder {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Resolve RunUAT, create `<destination>/Migrated` and assemble the
    /// argument vector.
    ///
    /// The existence check is a precondition only; if the script disappears
    /// before spawn the supervisor reports it as a launch failure.
    pub fn build(&self, request: &MigrationRequest) -> Result<ResolvedCommand, BuildError> {
        let executable_path = uat_script_path(request.engine_root_path(), self.platform);
        if !executable_path.is_file() {
            tracing::warn!("RunUAT not found at {}", executable_path.display());
            return Err(BuildError::NotFound {
                path: executable_path,
            });
        }

        let output_directory = request.destination_root_path().join(MIGRATED_DIR_NAME);
        fs::create_dir_all(&output_directory).map_err(|source| BuildError::CreateDir {
            path: output_directory.clone(),
            source,
        })?;

        let arguments = build_plugin_arguments(request.plugin_descriptor_path(), &output_directory);

        tracing::debug!(
            "Resolved {} with output directory {}",
            executable_path.display(),
            output_directory.display()
        );

        Ok(ResolvedCommand {
            executable_path,
            arguments,
            output_directory,
        })
    }
}

/// `BuildPlugin -plugin=<descriptor> -package=<output>`, one token each
fn build_plugin_arguments(plugin: &Path, output_directory: &Path) -> Vec<OsString> {
    let mut plugin_arg = OsString::from("-plugin=");
    plugin_arg.push(plugin);

    let mut package_arg = OsString::from("-package=");
    package_arg.push(output_directory);

    vec![OsString::from(BUILD_PLUGIN_COMMAND), plugin_arg, package_arg]
}

/// Build a command for the host platform (convenience function)
pub fn build(request: &MigrationRequest) -> Result<ResolvedCommand, BuildError> {
    Builder::default().build(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_engine(root: &Path, script: &str) -> PathBuf {
        let engine = root.join("UE_5.3");
        let batch_files = engine.join("Engine").join("Build").join("BatchFiles");
        fs::create_dir_all(&batch_files).unwrap();
        fs::write(batch_files.join(script), "#!/bin/sh\n").unwrap();
        engine
    }

    #[test]
    fn test_build_plugin_command() {
        let temp = TempDir::new().unwrap();
        let engine = create_engine(temp.path(), "RunUAT.sh");
        let destination = temp.path().join("out");
        let request = MigrationRequest::new(
            "/home/u/MyPlugin/MyPlugin.uplugin",
            &destination,
            &engine,
        )
        .unwrap();

        let command = Builder::new(Platform::Linux).build(&request).unwrap();

        assert_eq!(
            command.executable_path,
            engine.join("Engine/Build/BatchFiles/RunUAT.sh")
        );
        let package = format!("-package={}", destination.join("Migrated").display());
        assert_eq!(
            command.arguments,
            [
                "BuildPlugin",
                "-plugin=/home/u/MyPlugin/MyPlugin.uplugin",
                package.as_str(),
            ]
            .map(OsString::from)
        );
        assert_eq!(command.output_directory, destination.join("Migrated"));
        assert!(destination.join("Migrated").is_dir());
    }

    #[test]
    fn test_paths_with_spaces_stay_single_tokens() {
        let temp = TempDir::new().unwrap();
        let engine = create_engine(temp.path(), "RunUAT.sh");
        let destination = temp.path().join("my output; dir");
        let request =
            MigrationRequest::new("/a b/My \"Plugin\".uplugin", &destination, &engine).unwrap();

        let command = Builder::new(Platform::Linux).build(&request).unwrap();

        assert_eq!(command.arguments.len(), 3);
        assert_eq!(command.arguments[1], "-plugin=/a b/My \"Plugin\".uplugin");
    }

    #[test]
    fn test_windows_script_name() {
        let temp = TempDir::new().unwrap();
        let engine = create_engine(temp.path(), "RunUAT.bat");
        let request =
            MigrationRequest::new("C:/P/P.uplugin", temp.path().join("out"), &engine).unwrap();

        let command = Builder::new(Platform::Windows).build(&request).unwrap();
        assert!(command.executable_path.ends_with("RunUAT.bat"));

        // Only the .bat exists, so the unix launcher is missing
        let err = Builder::new(Platform::Linux).build(&request).unwrap_err();
        assert!(matches!(err, BuildError::NotFound { .. }));
    }

    #[test]
    fn test_missing_executable_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out");
        let request =
            MigrationRequest::new("/p/P.uplugin", &destination, temp.path().join("NoEngine"))
                .unwrap();

        let err = Builder::new(Platform::Linux).build(&request).unwrap_err();
        match err {
            BuildError::NotFound { path } => assert!(path.ends_with("RunUAT.sh")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!destination.exists());
    }

    #[test]
    fn test_build_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let engine = create_engine(temp.path(), "RunUAT.sh");
        let destination = temp.path().join("out");
        let migrated = destination.join("Migrated");
        fs::create_dir_all(migrated.join("Binaries")).unwrap();
        fs::write(migrated.join("MyPlugin.uplugin"), "{}").unwrap();

        let request = MigrationRequest::new("/p/P.uplugin", &destination, &engine).unwrap();
        let builder = Builder::new(Platform::Linux);
        let first = builder.build(&request).unwrap();
        let second = builder.build(&request).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(migrated.join("MyPlugin.uplugin")).unwrap(), "{}");
        assert!(migrated.join("Binaries").is_dir());
        assert_eq!(fs::read_dir(&migrated).unwrap().count(), 2);
    }

    #[test]
    fn test_output_directory_error() {
        let temp = TempDir::new().unwrap();
        let engine = create_engine(temp.path(), "RunUAT.sh");
        // A file where the destination directory should be
        let destination = temp.path().join("occupied");
        fs::write(&destination, "not a directory").unwrap();

        let request = MigrationRequest::new("/p/P.uplugin", &destination, &engine).unwrap();
        let err = Builder::new(Platform::Linux).build(&request).unwrap_err();
        assert!(matches!(err, BuildError::CreateDir { .. }));
    }
}
