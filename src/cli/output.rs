//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::TreeError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &TreeError) -> String {
    match e {
        TreeError::UnknownObject(id) => format!("No object with id '{}' in the model", id),
        TreeError::Io(io) => format!("Could not read input: {}", io),
        TreeError::Timeout(ms) => format!(
            "Compositions were still resolving after {} ms; raise --timeout-ms to wait longer",
            ms
        ),
        other => other.to_string(),
    }
}
