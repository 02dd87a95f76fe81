//! Cache path resolution
//!
//! Pure mapping from (session, artifact kind, entity index) to a file under
//! the cache root. Per-entity indices are zero-padded to four digits so
//! directory listings sort numerically.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ephys_common::SessionId;
use serde::Serialize;

/// Every artifact the generator writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum ArtifactKind {
    SessionDetails,
    TrialDetails(u32),
    ClusterDetails(u32),
    SessionOverviewImage,
    RawOverviewImage,
    TrialEventOverviewImage,
    TrialImage(u32),
    ClusterImage(u32),
    ClusterPixelTable,
    TrialIntervalTable,
}

impl ArtifactKind {
    /// File name inside the session cache directory
    pub fn file_name(&self) -> String {
        match self {
            ArtifactKind::SessionDetails => "session.json".to_string(),
            ArtifactKind::TrialDetails(idx) => format!("trial-{idx:04}.json"),
            ArtifactKind::ClusterDetails(idx) => format!("cluster-{idx:04}.json"),
            ArtifactKind::SessionOverviewImage => "overview.png".to_string(),
            ArtifactKind::RawOverviewImage => "raw_overview.png".to_string(),
            ArtifactKind::TrialEventOverviewImage => "trial_overview.png".to_string(),
            ArtifactKind::TrialImage(idx) => format!("trial-{idx:04}.png"),
            ArtifactKind::ClusterImage(idx) => format!("cluster-{idx:04}.png"),
            ArtifactKind::ClusterPixelTable => "cluster_pixels.pqt".to_string(),
            ArtifactKind::TrialIntervalTable => "trial_intervals.pqt".to_string(),
        }
    }

    /// Trial or cluster index for per-entity kinds
    pub fn index(&self) -> Option<u32> {
        match self {
            ArtifactKind::TrialDetails(idx)
            | ArtifactKind::ClusterDetails(idx)
            | ArtifactKind::TrialImage(idx)
            | ArtifactKind::ClusterImage(idx) => Some(*idx),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ArtifactKind::SessionDetails => "session details",
            ArtifactKind::TrialDetails(_) => "trial details",
            ArtifactKind::ClusterDetails(_) => "cluster details",
            ArtifactKind::SessionOverviewImage => "session overview plot",
            ArtifactKind::RawOverviewImage => "raw data plot",
            ArtifactKind::TrialEventOverviewImage => "trial event plot",
            ArtifactKind::TrialImage(_) => "trial plot",
            ArtifactKind::ClusterImage(_) => "cluster plot",
            ArtifactKind::ClusterPixelTable => "cluster pixel table",
            ArtifactKind::TrialIntervalTable => "trial interval table",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(idx) => write!(f, "{} #{idx:04}", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

/// Cache directory layout rooted at one directory
#[derive(Debug, Clone)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Session cache directory, created on first use
    pub fn session_dir(&self, session_id: &SessionId) -> io::Result<PathBuf> {
        let dir = self.root.join(session_id.to_string());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Location of one artifact; ensures the session directory exists
    pub fn path_for(&self, session_id: &SessionId, kind: ArtifactKind) -> io::Result<PathBuf> {
        Ok(self.session_dir(session_id)?.join(kind.file_name()))
    }
}
