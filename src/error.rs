use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure reported by a SNARK backend capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum TicketError {
    /// Rejected before any backend call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("relation compilation failed: {0}")]
    Compilation(#[source] BackendError),

    /// No key material was cached; a later `ensure_keys` retries from scratch.
    #[error("key setup failed: {0}")]
    Setup(#[source] BackendError),

    /// The assignment does not fit the compiled constraint system.
    #[error("witness construction failed: {0}")]
    WitnessConstruction(#[source] BackendError),

    #[error("proving failed: {0}")]
    Proving(#[source] BackendError),

    #[error("verification failed: {0}")]
    Verification(#[source] BackendError),

    #[error("failed to render verifier artifact: {0}")]
    ArtifactRender(#[source] BackendError),

    #[error("failed to write verifier artifact {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = TicketError> = std::result::Result<T, E>;
