//! Plugin migration through the Unreal Automation Tool
//!
//! - Command building: locate RunUAT and assemble the `BuildPlugin` invocation
//! - Process supervision with live, ordered output streaming
//! - Engine discovery and `.uplugin` descriptor reading

mod command;
mod engine;
mod error;
mod runner;
mod types;

pub use command::{
    build,
    Builder,
    BUILD_PLUGIN_COMMAND,
    MIGRATED_DIR_NAME,
};

pub use engine::{
    discover_engines,
    engine_version,
    uat_script_path,
    PluginDescriptor,
};

pub use error::BuildError;

pub use runner::{
    run,
    run_blocking,
    run_with_options,
    LineSink,
    RunOptions,
};

pub use types::{
    ExecutionOutcome,
    FailureReason,
    InstalledEngine,
    MigrationRequest,
    Platform,
    RequestField,
    ResolvedCommand,
};
