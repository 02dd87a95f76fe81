//! Error types for ephys-gen
//!
//! Session-level failures (`InvalidIdentifier`, `NoSessionsFound`,
//! `SessionLoad`) stop one invocation or one session. Artifact-level failures
//! are caught by the generator and recorded in the session report.

use std::path::PathBuf;

use ephys_common::SessionId;
use thiserror::Error;

use crate::cache::ArtifactKind;
use crate::loader::LoaderError;
use crate::models::TableError;
use crate::services::ScanError;

/// Generator error type
#[derive(Debug, Error)]
pub enum GenError {
    /// Malformed session identifier
    #[error("{0} not a valid insertion UUID")]
    InvalidIdentifier(String),

    /// Raw data root holds no valid session directory
    #[error("No sessions found in {0}")]
    NoSessionsFound(PathBuf),

    /// Raw data root could not be scanned
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Data collaborator failed to initialize a session
    #[error("Failed to load session {session_id}: {source}")]
    SessionLoad {
        session_id: SessionId,
        #[source]
        source: LoaderError,
    },

    /// One image or table could not be produced
    #[error("Failed to generate {kind} for session {session_id}: {message}")]
    ArtifactGeneration {
        session_id: SessionId,
        kind: ArtifactKind,
        message: String,
    },

    /// A worker task panicked or was cancelled
    #[error("Task for session {session_id} failed: {message}")]
    TaskFailed { session_id: SessionId, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Columnar table encoding error
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ephys-common error
    #[error("Common error: {0}")]
    Common(ephys_common::Error),
}

impl From<ephys_common::Error> for GenError {
    fn from(err: ephys_common::Error) -> Self {
        match err {
            ephys_common::Error::InvalidIdentifier(token) => GenError::InvalidIdentifier(token),
            other => GenError::Common(other),
        }
    }
}

impl GenError {
    /// Wrap a lower-level failure as an artifact failure
    pub fn artifact(session_id: SessionId, kind: ArtifactKind, err: impl std::fmt::Display) -> Self {
        GenError::ArtifactGeneration {
            session_id,
            kind,
            message: err.to_string(),
        }
    }
}

/// Result type for generator operations
pub type GenResult<T> = Result<T, GenError>;
