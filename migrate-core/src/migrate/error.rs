//! Errors reported before any process is spawned

use std::io;
use std::path::PathBuf;

use super::types::RequestField;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<RequestField>),

    #[error("build tool not found at: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to create output directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read plugin descriptor {}", .path.display())]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse plugin descriptor {}", .path.display())]
    ParseDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn join_fields(fields: &[RequestField]) -> String {
    fields
        .iter()
        .map(RequestField::label)
        .collect::<Vec<_>>()
        .join(", ")
}
