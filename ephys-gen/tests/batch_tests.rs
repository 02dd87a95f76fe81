//! Parallel fan-out across sessions

mod helpers;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use ephys_gen::generator::GenOptions;
use ephys_gen::loader::Plot;
use ephys_gen::{run_batch, CachePaths, GenError};
use helpers::{sid, FakeSession, FakeSource, SESSION_A, SESSION_B, SESSION_C};
use tempfile::TempDir;

fn mtimes(dir: &Path, ext: &str) -> BTreeMap<String, SystemTime> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
        .map(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::metadata(&p).unwrap().modified().unwrap())
        })
        .collect()
}

fn source() -> Arc<FakeSource> {
    Arc::new(
        FakeSource::new()
            .with_session(sid(SESSION_A), FakeSession::new(&[0, 1], &[0, 1]))
            .with_session(sid(SESSION_B), FakeSession::new(&[4], &[2])),
    )
}

#[tokio::test]
async fn test_second_batch_renders_nothing_but_rewrites_details() {
    let cache = TempDir::new().unwrap();
    let source = source();
    let paths = CachePaths::new(cache.path());
    let ids = vec![sid(SESSION_A), sid(SESSION_B)];

    let first = run_batch(Arc::clone(&source), paths.clone(), ids.clone(), 2, GenOptions::default()).await;
    assert_eq!(first.succeeded(), 2);
    assert_eq!(first.artifact_totals().failed, 0);

    let dir = cache.path().join(SESSION_A);
    let images = mtimes(&dir, "png");
    assert_eq!(images.len(), 6);
    let calls = source.plot_calls();

    // Tamper with the documents; the second run must restore them
    fs::write(dir.join("trial-0001.json"), "{}").unwrap();
    fs::write(dir.join("session.json"), "{}").unwrap();

    let second = run_batch(Arc::clone(&source), paths, ids, 2, GenOptions::default()).await;
    assert_eq!(second.succeeded(), 2);
    assert_eq!(second.artifact_totals().generated, 0);
    assert_eq!(second.artifact_totals().skipped, first.artifact_totals().generated);
    assert_eq!(source.plot_calls(), calls);
    assert_eq!(mtimes(&dir, "png"), images);

    assert_ne!(fs::read_to_string(dir.join("trial-0001.json")).unwrap(), "{}");
    assert_ne!(fs::read_to_string(dir.join("session.json")).unwrap(), "{}");
}

#[tokio::test]
async fn test_failed_sessions_do_not_affect_siblings() {
    let cache = TempDir::new().unwrap();
    let source = Arc::new(
        FakeSource::new()
            .with_session(sid(SESSION_A), FakeSession::new(&[0], &[0]).unloadable())
            .with_session(
                sid(SESSION_B),
                FakeSession::new(&[0, 1], &[]).failing(Plot::TrialRaster { trial: 0 }),
            )
            .with_session(sid(SESSION_C), FakeSession::new(&[3], &[3])),
    );
    // Ids the source does not know fail to load as well
    let unknown = sid("9b2d6e1a-3c4f-4a5b-8c7d-1e2f3a4b5c6d");
    let ids = vec![sid(SESSION_C), unknown, sid(SESSION_A), sid(SESSION_B)];

    let report = run_batch(source, CachePaths::new(cache.path()), ids, 3, GenOptions::default()).await;

    assert_eq!(report.sessions.len(), 4);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    // Ordered by id regardless of completion order
    let order: Vec<_> = report.sessions.iter().map(|s| s.session_id).collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);

    assert!(matches!(
        report.get(&sid(SESSION_A)).unwrap().result,
        Err(GenError::SessionLoad { .. })
    ));
    let b = report.get(&sid(SESSION_B)).unwrap().result.as_ref().unwrap();
    assert_eq!(b.failed(), 1);
    assert!(cache.path().join(SESSION_B).join("trial-0001.png").exists());
    assert!(cache.path().join(SESSION_C).join("cluster-0003.png").exists());
}

#[tokio::test]
async fn test_single_worker_still_completes_everything() {
    let cache = TempDir::new().unwrap();
    let ids = vec![sid(SESSION_B), sid(SESSION_A)];
    let report = run_batch(source(), CachePaths::new(cache.path()), ids, 0, GenOptions::default()).await;
    assert_eq!(report.succeeded(), 2);
    assert!(report.display_string().starts_with("sessions: 2 ok, 0 failed"));
}

#[tokio::test]
async fn test_panicking_session_is_contained() {
    let cache = TempDir::new().unwrap();
    let source = Arc::new(
        FakeSource::new()
            .with_session(
                sid(SESSION_A),
                FakeSession::new(&[0, 1], &[]).panicking(Plot::TrialRaster { trial: 1 }),
            )
            .with_session(sid(SESSION_B), FakeSession::new(&[4], &[2]))
            .with_session(sid(SESSION_C), FakeSession::new(&[3], &[3])),
    );
    let ids = vec![sid(SESSION_A), sid(SESSION_B), sid(SESSION_C)];

    let report = run_batch(source, CachePaths::new(cache.path()), ids, 2, GenOptions::default()).await;

    assert_eq!(report.sessions.len(), 3);
    assert_eq!(report.failed(), 1);
    match &report.get(&sid(SESSION_A)).unwrap().result {
        Err(GenError::TaskFailed { session_id, .. }) => assert_eq!(*session_id, sid(SESSION_A)),
        other => panic!("Expected TaskFailed, got {:?}", other),
    }
    // Work finished before the crash stays on disk
    assert!(cache.path().join(SESSION_A).join("trial-0000.png").exists());
    assert!(cache.path().join(SESSION_B).join("trial-0004.png").exists());
    assert!(cache.path().join(SESSION_B).join("cluster-0002.png").exists());
    assert!(cache.path().join(SESSION_C).join("cluster-0003.png").exists());
}
