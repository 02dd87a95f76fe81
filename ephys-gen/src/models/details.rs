//! Structured detail documents
//!
//! These records are written as `session.json`, `trial-NNNN.json` and
//! `cluster-NNNN.json`. Unknown fields are rejected when reading them back.

use chrono::NaiveDate;
use ephys_common::SessionId;
use serde::{Deserialize, Serialize};

/// Session-level details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionDetails {
    pub pid: SessionId,
    pub subject: String,
    pub lab: String,
    /// Recording date, ISO-8601
    pub date: NaiveDate,
    pub probe: String,
    /// Session duration in seconds
    pub duration: f64,
    pub n_trials: usize,
    pub n_clusters: usize,
    pub n_good_clusters: usize,
    #[serde(rename = "_trial_ids")]
    pub trial_ids: Vec<u32>,
    #[serde(rename = "_cluster_ids")]
    pub cluster_ids: Vec<u32>,
}

impl SessionDetails {
    /// Trial indices in ascending order, duplicates removed
    pub fn sorted_trial_ids(&self) -> Vec<u32> {
        sorted_unique(&self.trial_ids)
    }

    /// Cluster indices in ascending order, duplicates removed
    pub fn sorted_cluster_ids(&self) -> Vec<u32> {
        sorted_unique(&self.cluster_ids)
    }
}

fn sorted_unique(ids: &[u32]) -> Vec<u32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Per-trial details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrialDetails {
    pub trial_idx: u32,
    pub t0: f64,
    pub t1: f64,
    pub stim_on: Option<f64>,
    pub first_movement: Option<f64>,
    pub feedback_time: Option<f64>,
    pub contrast_left: Option<f64>,
    pub contrast_right: Option<f64>,
    /// -1 (left), 0 (no-go), 1 (right)
    pub choice: i8,
    /// 1 correct, -1 incorrect
    pub feedback_type: i8,
    pub probability_left: f64,
    pub reaction_time: Option<f64>,
    pub n_spikes: usize,
}

/// Per-cluster details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterDetails {
    pub cluster_idx: u32,
    pub depth: f64,
    pub amplitude_uv: f64,
    pub channel: u32,
    pub brain_region: String,
    pub good: bool,
    pub n_spikes: usize,
    /// Spikes per second over the whole session
    pub firing_rate: f64,
    /// Fraction of inter-spike intervals under 1.5 ms
    pub isi_violations: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> SessionDetails {
        SessionDetails {
            pid: SessionId::parse("c9bf9e57-1685-4c89-bafb-ff5af830be8a").unwrap(),
            subject: "KS014".to_string(),
            lab: "cortexlab".to_string(),
            date: NaiveDate::from_ymd_opt(2019, 12, 4).unwrap(),
            probe: "probe00".to_string(),
            duration: 3600.0,
            n_trials: 3,
            n_clusters: 2,
            n_good_clusters: 1,
            trial_ids: vec![3, 1, 2, 1],
            cluster_ids: vec![9, 4],
        }
    }

    #[test]
    fn test_sorted_ids() {
        let d = details();
        assert_eq!(d.sorted_trial_ids(), vec![1, 2, 3]);
        assert_eq!(d.sorted_cluster_ids(), vec![4, 9]);
    }

    #[test]
    fn test_session_json_shape() {
        let value = serde_json::to_value(details()).unwrap();
        assert_eq!(value["date"], "2019-12-04");
        assert_eq!(value["_trial_ids"], serde_json::json!([3, 1, 2, 1]));
        assert_eq!(value["pid"], "c9bf9e57-1685-4c89-bafb-ff5af830be8a");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut value = serde_json::to_value(details()).unwrap();
        value["surprise"] = serde_json::json!(1);
        assert!(serde_json::from_value::<SessionDetails>(value).is_err());
    }
}
