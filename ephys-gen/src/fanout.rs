//! Parallel fan-out over sessions
//!
//! One blocking task per session, at most `workers` in flight. Sessions share
//! nothing but the cache directory, and a failed or panicking session never
//! cancels its siblings: every outcome ends up in the [`RunReport`].

use std::sync::Arc;

use ephys_common::SessionId;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::cache::CachePaths;
use crate::error::{GenError, GenResult};
use crate::generator::{GenOptions, SessionGenerator, SessionReport};
use crate::loader::SessionSource;

/// Cores left free for the rest of the machine
const RESERVED_CORES: usize = 3;

/// Available parallelism minus the reserved cores, at least one
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(RESERVED_CORES).max(1)
}

/// Load one session and run every generation step on it
pub fn generate_session<S: SessionSource>(
    source: &S,
    paths: &CachePaths,
    session_id: SessionId,
    options: &GenOptions,
) -> GenResult<SessionReport> {
    let generator = SessionGenerator::new(source, paths.clone(), session_id)?;
    Ok(generator.make_all(options))
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub result: GenResult<SessionReport>,
}

/// Totals over all artifacts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactTotals {
    pub generated: usize,
    pub skipped: usize,
    pub written: usize,
    pub failed: usize,
}

/// Outcomes of a batch run, ordered by session id
#[derive(Debug, Default)]
pub struct RunReport {
    pub sessions: Vec<SessionOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.sessions.iter().filter(|s| s.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.sessions.len() - self.succeeded()
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&SessionOutcome> {
        self.sessions.iter().find(|s| &s.session_id == session_id)
    }

    pub fn artifact_totals(&self) -> ArtifactTotals {
        let mut totals = ArtifactTotals::default();
        for report in self.sessions.iter().filter_map(|s| s.result.as_ref().ok()) {
            totals.generated += report.generated();
            totals.skipped += report.skipped();
            totals.written += report.written();
            totals.failed += report.failed();
        }
        totals
    }

    pub fn display_string(&self) -> String {
        let t = self.artifact_totals();
        format!(
            "sessions: {} ok, {} failed; artifacts: {} generated, {} skipped, {} written, {} failed",
            self.succeeded(),
            self.failed(),
            t.generated,
            t.skipped,
            t.written,
            t.failed
        )
    }
}

/// Generate every session in `session_ids` with at most `workers` in flight
pub async fn run_batch<S: SessionSource>(
    source: Arc<S>,
    paths: CachePaths,
    session_ids: Vec<SessionId>,
    workers: usize,
    options: GenOptions,
) -> RunReport {
    let workers = workers.max(1);
    let total = session_ids.len();
    info!(sessions = total, workers, "Starting batch generation");

    let mut sessions: Vec<SessionOutcome> = stream::iter(session_ids)
        .map(|session_id| {
            let source = Arc::clone(&source);
            let paths = paths.clone();
            async move {
                let task = tokio::task::spawn_blocking(move || {
                    generate_session(source.as_ref(), &paths, session_id, &options)
                });
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(GenError::TaskFailed {
                        session_id,
                        message: e.to_string(),
                    }),
                };
                if let Err(e) = &result {
                    error!(session_id = %session_id, error = %e, "Session generation failed");
                }
                SessionOutcome { session_id, result }
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    sessions.sort_by_key(|s| s.session_id);
    let report = RunReport { sessions };
    info!("Batch finished: {}", report.display_string());
    report
}
