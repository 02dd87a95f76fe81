//! Nearest-cluster lookup for clicks on a cluster figure
//!
//! Clicks arrive in canvas-normalized coordinates (origin bottom-left), the
//! same space as the stored cluster pixel table. A click snaps to the nearest
//! stored cluster only when it lands within [`CLUSTER_MATCH_THRESHOLD`]
//! (squared distance); anywhere else keeps the caller's current cluster.

use ephys_common::SessionId;
use tracing::debug;

use crate::cache::{ArtifactKind, CachePaths};
use crate::error::GenResult;
use crate::models::ClusterPixelTable;

/// Squared normalized distance; tied to the cluster figure size
pub const CLUSTER_MATCH_THRESHOLD: f64 = 0.005;

/// Result of a click lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterMatch {
    /// Click landed on a stored cluster
    Hit {
        cluster_id: i32,
        row: usize,
        distance_sq: f64,
    },
    /// No cluster close enough; rows holding the fallback id, possibly none
    Fallback { cluster_id: i32, rows: Vec<usize> },
}

impl ClusterMatch {
    pub fn cluster_id(&self) -> i32 {
        match self {
            ClusterMatch::Hit { cluster_id, .. } | ClusterMatch::Fallback { cluster_id, .. } => {
                *cluster_id
            }
        }
    }

    /// Table rows belonging to the returned cluster
    pub fn rows(&self) -> Vec<usize> {
        match self {
            ClusterMatch::Hit { row, .. } => vec![*row],
            ClusterMatch::Fallback { rows, .. } => rows.clone(),
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, ClusterMatch::Hit { .. })
    }
}

/// Resolve a click against an in-memory table
pub fn nearest_cluster(table: &ClusterPixelTable, x: f64, y: f64, fallback: i32) -> ClusterMatch {
    let nearest = table
        .rows
        .iter()
        .enumerate()
        .map(|(row, p)| (row, (p.x - x).powi(2) + (p.y - y).powi(2)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((row, distance_sq)) if distance_sq < CLUSTER_MATCH_THRESHOLD => ClusterMatch::Hit {
            cluster_id: table.rows[row].cluster_id,
            row,
            distance_sq,
        },
        _ => ClusterMatch::Fallback {
            cluster_id: fallback,
            rows: table
                .rows
                .iter()
                .enumerate()
                .filter(|(_, p)| p.cluster_id == fallback)
                .map(|(row, _)| row)
                .collect(),
        },
    }
}

/// Resolve a click using the session's cached cluster pixel table
///
/// A session whose table has not been written yet resolves every click to
/// the fallback cluster.
pub fn resolve_cluster_at(
    paths: &CachePaths,
    session_id: &SessionId,
    x: f64,
    y: f64,
    fallback: i32,
) -> GenResult<ClusterMatch> {
    let path = paths.path_for(session_id, ArtifactKind::ClusterPixelTable)?;
    if !path.exists() {
        debug!(session_id = %session_id, "No cluster pixel table yet");
        return Ok(ClusterMatch::Fallback {
            cluster_id: fallback,
            rows: Vec::new(),
        });
    }
    let table = ClusterPixelTable::read(&path)?;
    Ok(nearest_cluster(&table, x, y, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::write_atomic;
    use crate::models::ClusterPixel;
    use tempfile::TempDir;

    fn table() -> ClusterPixelTable {
        ClusterPixelTable::new(vec![
            ClusterPixel { cluster_id: 7, x: 0.2, y: 0.8 },
            ClusterPixel { cluster_id: 3, x: 0.25, y: 0.5 },
            ClusterPixel { cluster_id: 9, x: 0.6, y: 0.1 },
        ])
    }

    #[test]
    fn test_exact_point_hits() {
        let m = nearest_cluster(&table(), 0.25, 0.5, 7);
        assert_eq!(
            m,
            ClusterMatch::Hit { cluster_id: 3, row: 1, distance_sq: 0.0 }
        );
        assert_eq!(m.rows(), vec![1]);
    }

    #[test]
    fn test_near_point_hits_closest() {
        let m = nearest_cluster(&table(), 0.21, 0.78, 9);
        assert_eq!(m.cluster_id(), 7);
        assert!(m.is_hit());
    }

    #[test]
    fn test_far_point_falls_back() {
        // 0.1 away from every stored point: 0.01 squared, over the threshold
        let m = nearest_cluster(&table(), 0.6, 0.2, 7);
        assert_eq!(m, ClusterMatch::Fallback { cluster_id: 7, rows: vec![0] });

        let m = nearest_cluster(&table(), 0.9, 0.9, 42);
        assert_eq!(m.cluster_id(), 42);
        assert!(m.rows().is_empty());
    }

    #[test]
    fn test_empty_table_falls_back() {
        let m = nearest_cluster(&ClusterPixelTable::default(), 0.5, 0.5, 1);
        assert_eq!(m, ClusterMatch::Fallback { cluster_id: 1, rows: vec![] });
    }

    #[test]
    fn test_resolve_from_cache() {
        let temp = TempDir::new().unwrap();
        let paths = CachePaths::new(temp.path());
        let sid = SessionId::parse("c9bf9e57-1685-4c89-bafb-ff5af830be8a").unwrap();

        let m = resolve_cluster_at(&paths, &sid, 0.2, 0.8, 3).unwrap();
        assert!(!m.is_hit());

        let path = paths.path_for(&sid, ArtifactKind::ClusterPixelTable).unwrap();
        write_atomic(&path, &table().to_parquet().unwrap()).unwrap();
        let m = resolve_cluster_at(&paths, &sid, 0.2, 0.8, 3).unwrap();
        assert_eq!(m.cluster_id(), 7);
    }
}
