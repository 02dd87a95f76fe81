//! Per-session generation report

use ephys_common::SessionId;
use serde::Serialize;

use crate::cache::ArtifactKind;

/// What happened to one artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Rendered and written in this run
    Generated,
    /// Already present in the cache
    Skipped,
    /// Unconditionally rewritten document
    Written,
    Failed(String),
}

impl ArtifactStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ArtifactStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

/// Outcomes of one session, in generation order
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl SessionReport {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: ArtifactKind, status: ArtifactStatus) {
        self.outcomes.push(ArtifactOutcome { kind, status });
    }

    fn count(&self, pred: impl Fn(&ArtifactStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn generated(&self) -> usize {
        self.count(|s| *s == ArtifactStatus::Generated)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| *s == ArtifactStatus::Skipped)
    }

    pub fn written(&self) -> usize {
        self.count(|s| *s == ArtifactStatus::Written)
    }

    pub fn failed(&self) -> usize {
        self.count(ArtifactStatus::is_failed)
    }

    /// Kinds that failed, for re-run hints
    pub fn failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failed())
    }

    pub fn status_of(&self, kind: ArtifactKind) -> Option<&ArtifactStatus> {
        self.outcomes.iter().find(|o| o.kind == kind).map(|o| &o.status)
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} generated, {} skipped, {} written, {} failed",
            self.generated(),
            self.skipped(),
            self.written(),
            self.failed()
        )
    }
}
