//! Migration execution with streaming events

use std::time::Instant;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use migrate_core::migrate::{
    build, run_with_options, BuildError, ExecutionOutcome, FailureReason, MigrationRequest,
    RunOptions,
};

/// Event emitted while a migration runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationEvent {
    pub event_type: MigrationEventType,
    pub message: String,
    pub timestamp: u64,
}

impl MigrationEvent {
    fn new(event_type: MigrationEventType, message: String) -> Self {
        Self {
            event_type,
            message,
            timestamp: now_ms(),
        }
    }
}

/// Types of migration events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationEventType {
    /// Nothing was launched: RunUAT missing or the destination unusable
    Rejected,
    Started,
    /// The command line about to be executed
    Command,
    /// One line of RunUAT output
    Output,
    Completed,
    Failed,
    Cancelled,
}

/// Runs migrations and reports progress over a channel, so a front end can
/// render the log live from another thread.
pub struct MigrationRunner {
    event_sender: Sender<MigrationEvent>,
}

impl MigrationRunner {
    pub fn new(event_sender: Sender<MigrationEvent>) -> Self {
        Self { event_sender }
    }

    fn emit(&self, event_type: MigrationEventType, message: String) {
        let _ = self.event_sender.send(MigrationEvent::new(event_type, message));
    }

    /// Build the RunUAT command and run it to completion.
    ///
    /// Precondition failures are returned as `Err` after a `Rejected` event;
    /// everything after launch is reported through the outcome. A `Failed`
    /// event carries the captured output, or the reason when there was none.
    pub async fn migrate(
        &self,
        request: &MigrationRequest,
        options: RunOptions,
    ) -> Result<ExecutionOutcome, BuildError> {
        let command = match build(request) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!("Migration not started: {}", e);
                self.emit(MigrationEventType::Rejected, e.to_string());
                return Err(e);
            }
        };

        let start_time = Instant::now();
        self.emit(
            MigrationEventType::Started,
            format!(
                "Migrating {} into {}",
                request.plugin_descriptor_path().display(),
                request.destination_root_path().display()
            ),
        );

        self.emit(MigrationEventType::Command, command.display_command());

        let event_sender = self.event_sender.clone();
        let outcome = run_with_options(
            &command,
            move |line: &str| {
                let _ = event_sender.send(MigrationEvent::new(
                    MigrationEventType::Output,
                    line.to_string(),
                ));
            },
            options,
        )
        .await;

        let duration = start_time.elapsed();
        match outcome.reason() {
            None => self.emit(
                MigrationEventType::Completed,
                format!(
                    "Plugin packaged into {} in {:.1}s",
                    command.output_directory.display(),
                    duration.as_secs_f32()
                ),
            ),
            Some(FailureReason::Cancelled) => self.emit(
                MigrationEventType::Cancelled,
                "Migration cancelled by user".to_string(),
            ),
            Some(reason) => {
                tracing::error!("Migration failed: {}", reason);
                self.emit(MigrationEventType::Failed, outcome.summary());
            }
        }

        Ok(outcome)
    }
}

/// Get current timestamp in ms
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
