//! File-backed data collaborator
//!
//! Each session lives in `<data_dir>/<session id>/`:
//!
//! | file                | required | contents                                  |
//! |---------------------|----------|-------------------------------------------|
//! | `session.json`      | yes      | descriptive fields, probe extent, regions |
//! | `trials.json`       | yes      | one record per trial                      |
//! | `clusters.json`     | yes      | one record per spike-sorted cluster       |
//! | `spikes.json`       | yes      | spike times, clusters, amplitudes, depths |
//! | `ap_rms.json`       | no       | AP band RMS heatmap                       |
//! | `lfp_spectrum.json` | no       | LFP power spectrum heatmap                |
//! | `raw.json`          | no       | four raw-trace snippets                   |

mod plots;

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ephys_common::SessionId;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{DataLoader, GoodClusters, LoaderError, Plot, SessionSource};
use crate::figure::{AxesId, Color, Figure};
use crate::models::{ClusterDetails, SessionDetails, TrialDetails, TrialInterval};

/// Intervals shorter than this count as refractory violations (seconds)
const ISI_VIOLATION_THRESHOLD: f64 = 0.0015;

fn default_depth_range() -> (f64, f64) {
    (20.0, 3840.0)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSession {
    subject: String,
    lab: String,
    date: NaiveDate,
    probe: String,
    duration: f64,
    #[serde(default = "default_depth_range")]
    probe_depth_range: (f64, f64),
    #[serde(default)]
    regions: Vec<BrainRegion>,
}

/// Depth band of the probe assigned to one brain region
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct BrainRegion {
    #[allow(dead_code)]
    acronym: String,
    depth_lo: f64,
    depth_hi: f64,
    color: Color,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTrial {
    index: u32,
    t0: f64,
    t1: f64,
    stim_on: Option<f64>,
    first_movement: Option<f64>,
    feedback_time: Option<f64>,
    contrast_left: Option<f64>,
    contrast_right: Option<f64>,
    choice: i8,
    feedback_type: i8,
    probability_left: f64,
}

impl RawTrial {
    fn reaction_time(&self) -> Option<f64> {
        Some(self.first_movement? - self.stim_on?)
    }

    fn signed_contrast(&self) -> f64 {
        self.contrast_right.unwrap_or(0.0) - self.contrast_left.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCluster {
    index: u32,
    depth: f64,
    /// Volts
    amp: f64,
    channel: u32,
    brain_region: String,
    good: bool,
    #[serde(default)]
    waveform: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpikes {
    times: Vec<f64>,
    clusters: Vec<u32>,
    /// Volts
    amps: Vec<f64>,
    depths: Vec<f64>,
}

/// Row-major matrix with its data extent `[x0, x1, y0, y1]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHeatmap {
    extent: [f64; 4],
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl RawHeatmap {
    /// `rows x cols` must hold exactly the stored values
    fn check_shape(&self) -> Result<(), String> {
        match self.rows.checked_mul(self.cols) {
            Some(n) if n == self.values.len() && n > 0 => Ok(()),
            _ => Err(format!(
                "{} values for a {}x{} heatmap",
                self.values.len(),
                self.rows,
                self.cols
            )),
        }
    }
}

/// Opens [`RawDataLoader`]s from a data root
#[derive(Debug, Clone)]
pub struct RawDataSource {
    data_dir: PathBuf,
}

impl RawDataSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl SessionSource for RawDataSource {
    type Loader = RawDataLoader;

    fn open(&self, session_id: &SessionId) -> Result<RawDataLoader, LoaderError> {
        RawDataLoader::open(&self.data_dir.join(session_id.to_string()), *session_id)
    }
}

/// All inputs of one session, loaded in memory
#[derive(Debug)]
pub struct RawDataLoader {
    session_id: SessionId,
    session: RawSession,
    trials: BTreeMap<u32, RawTrial>,
    clusters: BTreeMap<u32, RawCluster>,
    /// Sorted by time
    spikes: RawSpikes,
    /// Spike indices per cluster, in time order
    spikes_by_cluster: HashMap<u32, Vec<usize>>,
    ap_rms: Option<RawHeatmap>,
    lfp_spectrum: Option<RawHeatmap>,
    raw_snippets: Option<Vec<RawHeatmap>>,
}

impl RawDataLoader {
    /// Load every input file of the session in `dir`
    pub fn open(dir: &Path, session_id: SessionId) -> Result<Self, LoaderError> {
        if !dir.is_dir() {
            return Err(LoaderError::SessionNotFound(dir.to_path_buf()));
        }
        debug!(session_id = %session_id, "Loading raw data from {}", dir.display());

        let session: RawSession = read_json(&dir.join("session.json"))?;
        let trials: Vec<RawTrial> = read_json(&dir.join("trials.json"))?;
        let clusters: Vec<RawCluster> = read_json(&dir.join("clusters.json"))?;
        let spikes_path = dir.join("spikes.json");
        let spikes = sort_spikes(read_json(&spikes_path)?).map_err(|message| {
            LoaderError::Malformed {
                path: spikes_path,
                message,
            }
        })?;

        let mut spikes_by_cluster: HashMap<u32, Vec<usize>> = HashMap::new();
        for (i, &cluster) in spikes.clusters.iter().enumerate() {
            spikes_by_cluster.entry(cluster).or_default().push(i);
        }

        let ap_path = dir.join("ap_rms.json");
        let ap_rms: Option<RawHeatmap> = read_optional_json(&ap_path)?;
        check_heatmaps(&ap_path, ap_rms.iter())?;
        let lfp_path = dir.join("lfp_spectrum.json");
        let lfp_spectrum: Option<RawHeatmap> = read_optional_json(&lfp_path)?;
        check_heatmaps(&lfp_path, lfp_spectrum.iter())?;
        let raw_path = dir.join("raw.json");
        let raw_snippets: Option<Vec<RawHeatmap>> = read_optional_json(&raw_path)?;
        check_heatmaps(&raw_path, raw_snippets.iter().flatten())?;

        Ok(Self {
            session_id,
            session,
            trials: trials.into_iter().map(|t| (t.index, t)).collect(),
            clusters: clusters.into_iter().map(|c| (c.index, c)).collect(),
            spikes,
            spikes_by_cluster,
            ap_rms,
            lfp_spectrum,
            raw_snippets,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    fn trial(&self, trial: u32) -> Result<&RawTrial, LoaderError> {
        self.trials.get(&trial).ok_or(LoaderError::UnknownTrial(trial))
    }

    fn cluster(&self, cluster: u32) -> Result<&RawCluster, LoaderError> {
        self.clusters
            .get(&cluster)
            .ok_or(LoaderError::UnknownCluster(cluster))
    }

    /// Index range of all spikes with `t0 <= t < t1`
    fn spike_range(&self, t0: f64, t1: f64) -> Range<usize> {
        let times = &self.spikes.times;
        times.partition_point(|&t| t < t0)..times.partition_point(|&t| t < t1)
    }

    /// Spike times of one cluster, ascending
    fn cluster_times(&self, cluster: u32) -> Vec<f64> {
        self.spikes_by_cluster
            .get(&cluster)
            .map(|idx| idx.iter().map(|&i| self.spikes.times[i]).collect())
            .unwrap_or_default()
    }
}

fn sort_spikes(spikes: RawSpikes) -> Result<RawSpikes, String> {
    let n = spikes.times.len();
    if spikes.clusters.len() != n || spikes.amps.len() != n || spikes.depths.len() != n {
        return Err(format!(
            "column lengths differ: times={}, clusters={}, amps={}, depths={}",
            n,
            spikes.clusters.len(),
            spikes.amps.len(),
            spikes.depths.len()
        ));
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| spikes.times[a].total_cmp(&spikes.times[b]));
    Ok(RawSpikes {
        times: order.iter().map(|&i| spikes.times[i]).collect(),
        clusters: order.iter().map(|&i| spikes.clusters[i]).collect(),
        amps: order.iter().map(|&i| spikes.amps[i]).collect(),
        depths: order.iter().map(|&i| spikes.depths[i]).collect(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::MissingFile(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| LoaderError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LoaderError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

fn check_heatmaps<'a>(
    path: &Path,
    heatmaps: impl IntoIterator<Item = &'a RawHeatmap>,
) -> Result<(), LoaderError> {
    for heatmap in heatmaps {
        heatmap.check_shape().map_err(|message| LoaderError::Malformed {
            path: path.to_path_buf(),
            message,
        })?;
    }
    Ok(())
}

impl DataLoader for RawDataLoader {
    fn session_details(&self) -> Result<SessionDetails, LoaderError> {
        let s = &self.session;
        Ok(SessionDetails {
            pid: self.session_id,
            subject: s.subject.clone(),
            lab: s.lab.clone(),
            date: s.date,
            probe: s.probe.clone(),
            duration: s.duration,
            n_trials: self.trials.len(),
            n_clusters: self.clusters.len(),
            n_good_clusters: self.clusters.values().filter(|c| c.good).count(),
            trial_ids: self.trials.keys().copied().collect(),
            cluster_ids: self.clusters.keys().copied().collect(),
        })
    }

    fn trial_details(&self, trial: u32) -> Result<TrialDetails, LoaderError> {
        let t = self.trial(trial)?;
        Ok(TrialDetails {
            trial_idx: trial,
            t0: t.t0,
            t1: t.t1,
            stim_on: t.stim_on,
            first_movement: t.first_movement,
            feedback_time: t.feedback_time,
            contrast_left: t.contrast_left,
            contrast_right: t.contrast_right,
            choice: t.choice,
            feedback_type: t.feedback_type,
            probability_left: t.probability_left,
            reaction_time: t.reaction_time(),
            n_spikes: self.spike_range(t.t0, t.t1).len(),
        })
    }

    fn cluster_details(&self, cluster: u32) -> Result<ClusterDetails, LoaderError> {
        let c = self.cluster(cluster)?;
        let times = self.cluster_times(cluster);
        let violations = times
            .windows(2)
            .filter(|w| w[1] - w[0] < ISI_VIOLATION_THRESHOLD)
            .count();
        let isi_violations = if times.len() > 1 {
            violations as f64 / (times.len() - 1) as f64
        } else {
            0.0
        };
        let firing_rate = if self.session.duration > 0.0 {
            times.len() as f64 / self.session.duration
        } else {
            0.0
        };
        Ok(ClusterDetails {
            cluster_idx: cluster,
            depth: c.depth,
            amplitude_uv: c.amp * 1e6,
            channel: c.channel,
            brain_region: c.brain_region.clone(),
            good: c.good,
            n_spikes: times.len(),
            firing_rate,
            isi_violations,
        })
    }

    fn trial_intervals(&self) -> Vec<TrialInterval> {
        self.trials
            .values()
            .map(|t| TrialInterval { t0: t.t0, t1: t.t1 })
            .collect()
    }

    fn good_clusters(&self) -> GoodClusters {
        let mut good = GoodClusters::default();
        for c in self.clusters.values().filter(|c| c.good) {
            good.cluster_ids.push(c.index);
            good.amps.push(c.amp);
            good.depths.push(c.depth);
        }
        good
    }

    fn probe_depth_range(&self) -> (f64, f64) {
        self.session.probe_depth_range
    }

    fn plot(&self, plot: Plot, figure: &mut Figure, axes: &[AxesId]) -> Result<(), LoaderError> {
        self.draw(plot, figure, axes)
    }
}
