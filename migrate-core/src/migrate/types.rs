//! Migration types

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::BuildError;

/// Host platform, as far as the engine's batch file layout is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }

    /// File name of the RunUAT launcher under `Engine/Build/BatchFiles`
    pub fn uat_script_name(&self) -> &'static str {
        match self {
            Platform::Windows => "RunUAT.bat",
            Platform::Mac | Platform::Linux => "RunUAT.sh",
        }
    }
}

/// One of the three paths a migration needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    PluginDescriptor,
    Destination,
    EngineRoot,
}

impl RequestField {
    pub fn label(&self) -> &'static str {
        match self {
            RequestField::PluginDescriptor => "Plugin file",
            RequestField::Destination => "Destination folder",
            RequestField::EngineRoot => "UE root folder",
        }
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The three paths a migration is started from. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    plugin_descriptor_path: PathBuf,
    destination_root_path: PathBuf,
    engine_root_path: PathBuf,
}

impl MigrationRequest {
    /// Fails with [`BuildError::MissingFields`] listing every empty path.
    pub fn new(
        plugin_descriptor_path: impl Into<PathBuf>,
        destination_root_path: impl Into<PathBuf>,
        engine_root_path: impl Into<PathBuf>,
    ) -> Result<Self, BuildError> {
        let request = Self {
            plugin_descriptor_path: plugin_descriptor_path.into(),
            destination_root_path: destination_root_path.into(),
            engine_root_path: engine_root_path.into(),
        };

        let missing: Vec<RequestField> = [
            (RequestField::PluginDescriptor, &request.plugin_descriptor_path),
            (RequestField::Destination, &request.destination_root_path),
            (RequestField::EngineRoot, &request.engine_root_path),
        ]
        .into_iter()
        .filter(|(_, path)| path.as_os_str().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(BuildError::MissingFields(missing));
        }

        Ok(request)
    }

    pub fn plugin_descriptor_path(&self) -> &Path {
        &self.plugin_descriptor_path
    }

    pub fn destination_root_path(&self) -> &Path {
        &self.destination_root_path
    }

    pub fn engine_root_path(&self) -> &Path {
        &self.engine_root_path
    }
}

/// A ready-to-launch RunUAT invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub executable_path: PathBuf,
    /// Discrete argument tokens, passed to the OS without a shell
    pub arguments: Vec<OsString>,
    /// `<destination>/Migrated`, already created
    pub output_directory: PathBuf,
}

impl ResolvedCommand {
    /// Human readable form of the command line, for logs only.
    pub fn display_command(&self) -> String {
        let mut line = format!("\"{}\"", self.executable_path.display());
        for arg in &self.arguments {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Why a run did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The tool ran and exited with a non-zero code
    ExitCode(i32),
    /// The tool was stopped by a signal and has no exit code
    Terminated { signal: Option<i32> },
    /// The executable was gone at spawn time
    ExecutableNotFound(PathBuf),
    /// The OS refused to start the process
    Launch(String),
    /// Reading output or waiting on the child failed after launch
    Io(String),
    Cancelled,
    TimedOut(Duration),
}

impl FailureReason {
    /// True when no process was ever started.
    pub fn is_launch_error(&self) -> bool {
        matches!(
            self,
            FailureReason::ExecutableNotFound(_) | FailureReason::Launch(_)
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ExitCode(code) => write!(f, "process exited with code {}", code),
            FailureReason::Terminated { signal: Some(signal) } => {
                write!(f, "process terminated by signal {}", signal)
            }
            FailureReason::Terminated { signal: None } => write!(f, "process terminated"),
            FailureReason::ExecutableNotFound(path) => {
                write!(f, "executable not found: {}", path.display())
            }
            FailureReason::Launch(message) => write!(f, "failed to launch process: {}", message),
            FailureReason::Io(message) => write!(f, "process I/O failed: {}", message),
            FailureReason::Cancelled => write!(f, "migration cancelled"),
            FailureReason::TimedOut(after) => {
                write!(f, "process timed out after {:.1}s", after.as_secs_f32())
            }
        }
    }
}

/// Terminal result of a supervised run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success {
        output: Vec<String>,
    },
    Failure {
        output: Vec<String>,
        reason: FailureReason,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    /// Every captured line, in the order the child wrote them
    pub fn output(&self) -> &[String] {
        match self {
            ExecutionOutcome::Success { output } | ExecutionOutcome::Failure { output, .. } => {
                output
            }
        }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure { reason, .. } => Some(reason),
        }
    }

    /// Captured output joined by newlines. A failure without output falls
    /// back to the reason, e.g. `process exited with code 3`.
    pub fn summary(&self) -> String {
        let joined = self.output().join("\n");
        match self {
            ExecutionOutcome::Failure { reason, .. } if joined.is_empty() => reason.to_string(),
            _ => joined,
        }
    }
}

/// An engine installation that ships the RunUAT launcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledEngine {
    /// Folder-derived identifier (e.g. "5.3")
    pub id: String,
    /// Display name (e.g. "UE 5.3.2")
    pub display_name: String,
    /// Engine root directory
    pub path: PathBuf,
    /// Version from Build.version (e.g. "5.3.2")
    pub version: Option<String>,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_script_lookup() {
        assert_eq!(Platform::Windows.uat_script_name(), "RunUAT.bat");
        assert_eq!(Platform::Mac.uat_script_name(), "RunUAT.sh");
        assert_eq!(Platform::Linux.uat_script_name(), "RunUAT.sh");
    }

    #[test]
    fn test_request_rejects_empty_paths() {
        let err = MigrationRequest::new("", "/out", "").unwrap_err();
        match err {
            BuildError::MissingFields(fields) => assert_eq!(
                fields,
                vec![RequestField::PluginDescriptor, RequestField::EngineRoot]
            ),
            other => panic!("unexpected error: {other}"),
        }

        let request = MigrationRequest::new("/p/P.uplugin", "/out", "/ue").unwrap();
        assert_eq!(request.engine_root_path(), Path::new("/ue"));
    }

    #[test]
    fn test_display_command() {
        let command = ResolvedCommand {
            executable_path: PathBuf::from("/ue/RunUAT.sh"),
            arguments: vec!["BuildPlugin".into(), "-plugin=/a b/P.uplugin".into()],
            output_directory: PathBuf::from("/out/Migrated"),
        };
        assert_eq!(
            command.display_command(),
            "\"/ue/RunUAT.sh\" BuildPlugin -plugin=/a b/P.uplugin"
        );
    }

    #[test]
    fn test_outcome_summary() {
        let failed = ExecutionOutcome::Failure {
            output: Vec::new(),
            reason: FailureReason::ExitCode(3),
        };
        assert_eq!(failed.summary(), "process exited with code 3");
        assert_eq!(failed.reason(), Some(&FailureReason::ExitCode(3)));

        let failed_with_output = ExecutionOutcome::Failure {
            output: vec!["ERROR: bad".to_string(), "BUILD FAILED".to_string()],
            reason: FailureReason::ExitCode(1),
        };
        assert_eq!(failed_with_output.summary(), "ERROR: bad\nBUILD FAILED");

        let ok = ExecutionOutcome::Success {
            output: vec!["done".to_string()],
        };
        assert!(ok.is_success());
        assert_eq!(ok.reason(), None);
        assert_eq!(ok.summary(), "done");
    }

    #[test]
    fn test_launch_error_classification() {
        assert!(FailureReason::ExecutableNotFound(PathBuf::from("/x")).is_launch_error());
        assert!(FailureReason::Launch("denied".into()).is_launch_error());
        assert!(!FailureReason::ExitCode(1).is_launch_error());
        assert!(!FailureReason::Cancelled.is_launch_error());
    }
}
