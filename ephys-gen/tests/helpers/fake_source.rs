//! In-memory data collaborator
//!
//! Sessions are described by their trial and cluster ids, their good
//! clusters and a list of render calls that should fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use ephys_common::SessionId;
use ephys_gen::figure::{colors, AxesId, Figure};
use ephys_gen::loader::{DataLoader, GoodClusters, LoaderError, Plot, SessionSource};
use ephys_gen::models::{ClusterDetails, SessionDetails, TrialDetails, TrialInterval};

#[derive(Debug, Clone, Default)]
pub struct FakeSession {
    pub trial_ids: Vec<u32>,
    pub cluster_ids: Vec<u32>,
    /// (cluster id, amplitude in volts, depth)
    pub good: Vec<(u32, f64, f64)>,
    pub failing_plots: Vec<Plot>,
    /// Render calls that crash the worker instead of returning an error
    pub panicking_plots: Vec<Plot>,
    pub fail_load: bool,
}

impl FakeSession {
    pub fn new(trial_ids: &[u32], cluster_ids: &[u32]) -> Self {
        let good = cluster_ids
            .iter()
            .map(|&c| (c, 20e-6 + f64::from(c) * 10e-6, 100.0 + f64::from(c) * 250.0))
            .collect();
        Self {
            trial_ids: trial_ids.to_vec(),
            cluster_ids: cluster_ids.to_vec(),
            good,
            ..Default::default()
        }
    }

    pub fn failing(mut self, plot: Plot) -> Self {
        self.failing_plots.push(plot);
        self
    }

    pub fn panicking(mut self, plot: Plot) -> Self {
        self.panicking_plots.push(plot);
        self
    }

    /// Add a good cluster drawn at (`amp`, `depth`)
    pub fn with_good(mut self, id: u32, amp: f64, depth: f64) -> Self {
        self.good.push((id, amp, depth));
        self
    }

    pub fn unloadable(mut self) -> Self {
        self.fail_load = true;
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeSource {
    sessions: HashMap<SessionId, FakeSession>,
    plot_calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, id: SessionId, session: FakeSession) -> Self {
        self.sessions.insert(id, session);
        self
    }

    /// Render calls made by every loader opened so far
    pub fn plot_calls(&self) -> usize {
        self.plot_calls.load(Ordering::SeqCst)
    }
}

impl SessionSource for FakeSource {
    type Loader = FakeLoader;

    fn open(&self, session_id: &SessionId) -> Result<FakeLoader, LoaderError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| LoaderError::SessionNotFound(session_id.to_string().into()))?;
        if session.fail_load {
            return Err(LoaderError::MissingFile("spikes.json".into()));
        }
        Ok(FakeLoader {
            session_id: *session_id,
            session: session.clone(),
            plot_calls: Arc::clone(&self.plot_calls),
        })
    }
}

pub struct FakeLoader {
    session_id: SessionId,
    session: FakeSession,
    plot_calls: Arc<AtomicUsize>,
}

impl DataLoader for FakeLoader {
    fn session_details(&self) -> Result<SessionDetails, LoaderError> {
        Ok(SessionDetails {
            pid: self.session_id,
            subject: "SWC_043".to_string(),
            lab: "hoferlab".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 9, 21).unwrap(),
            probe: "probe00".to_string(),
            duration: 3600.0,
            n_trials: self.session.trial_ids.len(),
            n_clusters: self.session.cluster_ids.len(),
            n_good_clusters: self.session.good.len(),
            trial_ids: self.session.trial_ids.clone(),
            cluster_ids: self.session.cluster_ids.clone(),
        })
    }

    fn trial_details(&self, trial: u32) -> Result<TrialDetails, LoaderError> {
        if !self.session.trial_ids.contains(&trial) {
            return Err(LoaderError::UnknownTrial(trial));
        }
        let t0 = f64::from(trial) * 5.0;
        Ok(TrialDetails {
            trial_idx: trial,
            t0,
            t1: t0 + 4.0,
            stim_on: Some(t0 + 0.5),
            first_movement: Some(t0 + 0.9),
            feedback_time: Some(t0 + 1.2),
            contrast_left: Some(1.0),
            contrast_right: None,
            choice: -1,
            feedback_type: 1,
            probability_left: 0.8,
            reaction_time: Some(0.4),
            n_spikes: 12,
        })
    }

    fn cluster_details(&self, cluster: u32) -> Result<ClusterDetails, LoaderError> {
        if !self.session.cluster_ids.contains(&cluster) {
            return Err(LoaderError::UnknownCluster(cluster));
        }
        Ok(ClusterDetails {
            cluster_idx: cluster,
            depth: 100.0 + f64::from(cluster) * 250.0,
            amplitude_uv: 20.0 + f64::from(cluster) * 10.0,
            channel: cluster * 4,
            brain_region: "CA1".to_string(),
            good: true,
            n_spikes: 1000,
            firing_rate: 1000.0 / 3600.0,
            isi_violations: 0.0,
        })
    }

    fn trial_intervals(&self) -> Vec<TrialInterval> {
        let mut ids = self.session.trial_ids.clone();
        ids.sort_unstable();
        ids.into_iter()
            .map(|t| TrialInterval {
                t0: f64::from(t) * 5.0,
                t1: f64::from(t) * 5.0 + 4.0,
            })
            .collect()
    }

    fn good_clusters(&self) -> GoodClusters {
        let mut good = GoodClusters::default();
        for &(id, amp, depth) in &self.session.good {
            good.cluster_ids.push(id);
            good.amps.push(amp);
            good.depths.push(depth);
        }
        good
    }

    fn probe_depth_range(&self) -> (f64, f64) {
        (20.0, 3840.0)
    }

    fn plot(&self, plot: Plot, figure: &mut Figure, axes: &[AxesId]) -> Result<(), LoaderError> {
        self.plot_calls.fetch_add(1, Ordering::SeqCst);
        plot.check_panels(axes)?;
        if self.session.panicking_plots.contains(&plot) {
            panic!("renderer crashed on {:?}", plot);
        }
        if self.session.failing_plots.contains(&plot) {
            return Err(LoaderError::NoData("injected failure"));
        }
        if let Plot::ClusterAmpDepth { .. } = plot {
            let (xs, ys): (Vec<f64>, Vec<f64>) =
                self.session.good.iter().map(|&(_, a, d)| (a * 1e6, d)).unzip();
            figure.axes_mut(axes[0]).scatter(&xs, &ys, colors::GREY, 5)?;
            return Ok(());
        }
        for (i, &ax) in axes.iter().enumerate() {
            let x = i as f64;
            figure
                .axes_mut(ax)
                .plot(&[0.0, 1.0 + x], &[x, 2.0 * x + 1.0], colors::BLACK)?;
        }
        Ok(())
    }
}
