//! Error types for forwarding-plane and netdev operations.

use std::io;
use thiserror::Error;

/// Result type alias for plane operations.
pub type PlaneResult<T> = Result<T, PlaneError>;

/// Errors surfaced by forwarding-plane and netdev clients.
///
/// Every failed external interaction is propagated immediately to the
/// caller of the enclosing operation; there is no retry layer.
#[derive(Debug, Error)]
pub enum PlaneError {
    /// The external command could not be spawned at all.
    #[error("Failed to execute '{command}': {source}")]
    Exec {
        /// The command that failed to spawn.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The external command ran and returned a non-zero exit code.
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// The command succeeded but its output could not be interpreted.
    #[error("Unparseable {what} output: {output:?}")]
    UnparseableOutput {
        /// What was being parsed (e.g. "ofport", "version").
        what: &'static str,
        /// The raw output.
        output: String,
    },

    /// A simulated or real datapath object the operation needs is absent.
    #[error("No such {kind}: {name}")]
    NoSuchObject {
        /// The object kind ("bridge", "port", "link").
        kind: &'static str,
        /// The object name.
        name: String,
    },

    /// Creation collided with an object that already exists.
    #[error("Duplicate {kind}: {name}")]
    AlreadyExists {
        /// The object kind ("bridge", "port", "link").
        kind: &'static str,
        /// The object name.
        name: String,
    },
}

impl PlaneError {
    /// Creates an unparseable-output error.
    pub fn unparseable(what: &'static str, output: impl Into<String>) -> Self {
        Self::UnparseableOutput {
            what,
            output: output.into(),
        }
    }

    /// Creates a missing-object error.
    pub fn no_such(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NoSuchObject {
            kind,
            name: name.into(),
        }
    }

    /// Creates a duplicate-object error.
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }
}
