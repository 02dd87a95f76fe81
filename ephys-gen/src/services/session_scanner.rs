//! Session directory scanner
//!
//! Every direct subdirectory of the raw data root whose name is a canonical
//! session identifier is one session. Symlinks to directories count as
//! sessions too. Other entries (README files, hidden folders, stray
//! uppercase copies) are ignored.

use std::path::{Path, PathBuf};

use ephys_common::uuid_utils::validate_id;
use ephys_common::SessionId;
use thiserror::Error;
use walkdir::WalkDir;

use crate::error::{GenError, GenResult};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// General I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Session directory scanner
#[derive(Debug, Clone, Default)]
pub struct SessionScanner {
    follow_links: bool,
}

impl SessionScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept session directories reached through symlinks
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Collect valid session identifiers under `root`, ascending
    pub fn scan(&self, root: &Path) -> Result<Vec<SessionId>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.follow_links);

        let mut ids = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(ScanError::IoError(e.to_string())),
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !validate_id(name) {
                tracing::debug!("Skipping non-session entry {}", entry.path().display());
                continue;
            }
            match SessionId::parse(name) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!("{}", e),
            }
        }

        ids.sort();
        tracing::debug!("Found {} sessions under {}", ids.len(), root.display());
        Ok(ids)
    }
}

/// Ascending session ids under `root`; an empty result is an error
pub fn list_session_ids(root: &Path) -> GenResult<Vec<SessionId>> {
    let ids = SessionScanner::new().follow_links(true).scan(root)?;
    if ids.is_empty() {
        return Err(GenError::NoSessionsFound(root.to_path_buf()));
    }
    Ok(ids)
}
