//! Console log rendering

use std::io::{self, Write};

use crate::runner::{MigrationEvent, MigrationEventType};

pub const BANNER_WIDTH: usize = 50;
/// Failure details are cut to this many characters
pub const DETAILS_LIMIT: usize = 500;

pub fn banner() -> String {
    "=".repeat(BANNER_WIDTH)
}

/// The first `limit` characters of `text`
pub fn truncate_details(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Write one event the way the migration log shows it
pub fn render_event(event: &MigrationEvent, out: &mut impl Write) -> io::Result<()> {
    match event.event_type {
        MigrationEventType::Rejected => {
            writeln!(out, "✗ {}", event.message)?;
        }
        MigrationEventType::Started => {
            writeln!(out)?;
            writeln!(out, "{}", banner())?;
            writeln!(out, "Starting migration process...")?;
            writeln!(out, "{}", banner())?;
        }
        MigrationEventType::Command => {
            writeln!(out)?;
            writeln!(out, "Executing command:")?;
            writeln!(out, "{}", event.message)?;
            writeln!(out)?;
        }
        MigrationEventType::Output => {
            writeln!(out, "{}", event.message)?;
        }
        MigrationEventType::Completed => {
            writeln!(out)?;
            writeln!(out, "{}", banner())?;
            writeln!(out, "✓ SUCCESS: Plugin migrated successfully!")?;
            writeln!(out, "{}", event.message)?;
            writeln!(out, "{}", banner())?;
        }
        MigrationEventType::Failed => {
            writeln!(out)?;
            writeln!(out, "{}", banner())?;
            writeln!(out, "✗ ERROR: Migration failed!")?;
            writeln!(
                out,
                "Error details: {}",
                truncate_details(&event.message, DETAILS_LIMIT)
            )?;
            writeln!(out, "{}", banner())?;
        }
        MigrationEventType::Cancelled => {
            writeln!(out)?;
            writeln!(out, "{}", banner())?;
            writeln!(out, "✗ {}", event.message)?;
            writeln!(out, "{}", banner())?;
        }
    }
    Ok(())
}
