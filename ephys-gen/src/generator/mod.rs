//! Per-session artifact generator
//!
//! A [`SessionGenerator`] owns one session's data loader and the ids it
//! reported at load time. Detail documents are rewritten on every run; images
//! are rendered only when their file is missing from the cache.
//!
//! Batch order is fixed: session overview, optional raw overview, trial event
//! overview, then every trial and every cluster in ascending index order. A
//! failure for one trial or cluster is logged and recorded, and iteration
//! moves on to the next index.

pub mod layout;
pub mod report;

use std::path::{Path, PathBuf};

use ephys_common::SessionId;
use tracing::{debug, error, info};

use crate::cache::{should_generate, write_atomic, write_json, ArtifactKind, CachePaths};
use crate::error::{GenError, GenResult};
use crate::figure::{AxesId, Figure};
use crate::loader::{DataLoader, Plot, SessionSource};
use crate::models::{ClusterPixel, ClusterPixelTable, SessionDetails, TrialIntervalTable};

pub use report::{ArtifactOutcome, ArtifactStatus, SessionReport};

/// Entities between progress log lines
const PROGRESS_EVERY: usize = 10;

/// Optional batch steps
#[derive(Debug, Clone, Copy, Default)]
pub struct GenOptions {
    /// Also render the raw data overview after the session overview
    pub raw_overview: bool,
}

pub struct SessionGenerator<L: DataLoader> {
    session_id: SessionId,
    loader: L,
    paths: CachePaths,
    details: SessionDetails,
    trial_ids: Vec<u32>,
    cluster_ids: Vec<u32>,
}

impl<L: DataLoader> SessionGenerator<L> {
    /// Open the session through `source` and persist its details
    pub fn new<S>(source: &S, paths: CachePaths, session_id: SessionId) -> GenResult<Self>
    where
        S: SessionSource<Loader = L>,
    {
        let loader = source
            .open(&session_id)
            .map_err(|source| GenError::SessionLoad { session_id, source })?;
        Self::with_loader(loader, paths, session_id)
    }

    /// Wrap an already opened loader and persist the session details
    pub fn with_loader(loader: L, paths: CachePaths, session_id: SessionId) -> GenResult<Self> {
        paths.session_dir(&session_id)?;
        let details = loader
            .session_details()
            .map_err(|source| GenError::SessionLoad { session_id, source })?;
        write_json(&paths.path_for(&session_id, ArtifactKind::SessionDetails)?, &details)?;

        let trial_ids = details.sorted_trial_ids();
        let cluster_ids = details.sorted_cluster_ids();
        info!(
            session_id = %session_id,
            trials = trial_ids.len(),
            clusters = cluster_ids.len(),
            "Session loaded"
        );

        Ok(Self {
            session_id,
            loader,
            paths,
            details,
            trial_ids,
            cluster_ids,
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn details(&self) -> &SessionDetails {
        &self.details
    }

    /// Trial indices, ascending
    pub fn trial_ids(&self) -> &[u32] {
        &self.trial_ids
    }

    /// Cluster indices, ascending
    pub fn cluster_ids(&self) -> &[u32] {
        &self.cluster_ids
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn path(&self, kind: ArtifactKind) -> GenResult<PathBuf> {
        Ok(self.paths.path_for(&self.session_id, kind)?)
    }

    /// Target path when the artifact still has to be produced
    fn gate(&self, kind: ArtifactKind) -> GenResult<Option<PathBuf>> {
        let path = self.path(kind)?;
        if should_generate(&path) {
            Ok(Some(path))
        } else {
            debug!(session_id = %self.session_id, artifact = %kind, "Already cached, skipping");
            Ok(None)
        }
    }

    fn artifact_error(&self, kind: ArtifactKind, err: impl std::fmt::Display) -> GenError {
        GenError::artifact(self.session_id, kind, err)
    }

    fn draw(&self, kind: ArtifactKind, plot: Plot, fig: &mut Figure, axes: &[AxesId]) -> GenResult<()> {
        self.loader
            .plot(plot, fig, axes)
            .map_err(|e| self.artifact_error(kind, e))
    }

    fn write_figure(&self, kind: ArtifactKind, path: &Path, fig: &Figure) -> GenResult<()> {
        let png = fig.render_png().map_err(|e| self.artifact_error(kind, e))?;
        write_atomic(path, &png)?;
        Ok(())
    }

    pub fn save_trial_details(&self, trial: u32) -> GenResult<()> {
        let kind = ArtifactKind::TrialDetails(trial);
        let details = self
            .loader
            .trial_details(trial)
            .map_err(|e| self.artifact_error(kind, e))?;
        write_json(&self.path(kind)?, &details)
    }

    pub fn save_cluster_details(&self, cluster: u32) -> GenResult<()> {
        let kind = ArtifactKind::ClusterDetails(cluster);
        let details = self
            .loader
            .cluster_details(cluster)
            .map_err(|e| self.artifact_error(kind, e))?;
        write_json(&self.path(kind)?, &details)
    }

    /// Composite session figure; failures are logged and leave no file
    pub fn make_session_overview(&self) -> ArtifactStatus {
        let kind = ArtifactKind::SessionOverviewImage;
        match self.try_session_overview() {
            Ok(status) => status,
            Err(e) => {
                error!(session_id = %self.session_id, artifact = %kind, error = %e, "Session overview failed");
                ArtifactStatus::Failed(e.to_string())
            }
        }
    }

    fn try_session_overview(&self) -> GenResult<ArtifactStatus> {
        let kind = ArtifactKind::SessionOverviewImage;
        let Some(path) = self.gate(kind)? else {
            return Ok(ArtifactStatus::Skipped);
        };
        let (mut fig, l) = layout::session_overview();
        self.draw(kind, Plot::GoodBadClusters, &mut fig, &l.good_bad)?;
        self.draw(kind, Plot::AmpDepthFiringRate, &mut fig, &l.amp_depth_fr)?;
        self.draw(kind, Plot::SessionRaster { trial: None }, &mut fig, &[l.raster])?;
        self.draw(kind, Plot::ApRms, &mut fig, &l.ap_rms)?;
        self.draw(kind, Plot::LfpSpectrum, &mut fig, &l.lfp)?;
        self.draw(kind, Plot::BrainRegions, &mut fig, &[l.regions])?;
        self.draw(kind, Plot::PsychometricCurve, &mut fig, &l.psychometric)?;
        self.draw(kind, Plot::ChronometricCurve, &mut fig, &[l.chronometric])?;
        self.draw(kind, Plot::ReactionTime, &mut fig, &[l.reaction_time])?;
        self.write_figure(kind, &path, &fig)?;
        Ok(ArtifactStatus::Generated)
    }

    /// Raw trace panels with the region column clipped to the probe extent
    pub fn make_raw_data_overview(&self) -> GenResult<ArtifactStatus> {
        let kind = ArtifactKind::RawOverviewImage;
        let Some(path) = self.gate(kind)? else {
            return Ok(ArtifactStatus::Skipped);
        };
        let (mut fig, l) = layout::raw_overview();
        self.draw(kind, Plot::RawData, &mut fig, &l.panels)?;
        self.draw(kind, Plot::BrainRegions, &mut fig, &[l.regions])?;
        let (lo, hi) = self.loader.probe_depth_range();
        fig.axes_mut(l.regions).set_ylim(lo, hi);
        self.write_figure(kind, &path, &fig)?;
        Ok(ArtifactStatus::Generated)
    }

    /// Event-aligned heatmaps; also writes the trial interval table
    pub fn make_trial_event_overview(&self) -> GenResult<ArtifactStatus> {
        let kind = ArtifactKind::TrialEventOverviewImage;
        let Some(path) = self.gate(kind)? else {
            return Ok(ArtifactStatus::Skipped);
        };
        let (mut fig, l) = layout::trial_event_overview();
        self.draw(kind, Plot::EventAlignedActivity, &mut fig, &l.panels)?;
        self.draw(kind, Plot::BrainRegions, &mut fig, &[l.regions])?;

        // Table before image: the image is what marks this step as done
        self.save_trial_intervals()?;
        self.write_figure(kind, &path, &fig)?;
        Ok(ArtifactStatus::Generated)
    }

    fn save_trial_intervals(&self) -> GenResult<()> {
        let kind = ArtifactKind::TrialIntervalTable;
        let table = TrialIntervalTable::new(self.loader.trial_intervals());
        let bytes = table.to_parquet().map_err(|e| self.artifact_error(kind, e))?;
        write_atomic(&self.path(kind)?, &bytes)?;
        debug!(session_id = %self.session_id, rows = table.rows.len(), "Trial intervals written");
        Ok(())
    }

    pub fn make_trial_overview(&self, trial: u32) -> GenResult<ArtifactStatus> {
        let kind = ArtifactKind::TrialImage(trial);
        let Some(path) = self.gate(kind)? else {
            return Ok(ArtifactStatus::Skipped);
        };
        let (mut fig, l) = layout::trial_overview();
        self.draw(kind, Plot::SessionRaster { trial: Some(trial) }, &mut fig, &l.panels[..1])?;
        self.draw(kind, Plot::TrialRaster { trial }, &mut fig, &l.panels[1..])?;
        self.draw(kind, Plot::BrainRegions, &mut fig, &[l.regions])?;
        self.write_figure(kind, &path, &fig)?;
        Ok(ArtifactStatus::Generated)
    }

    /// Cluster figure; the first success also stores the cluster pixel table
    pub fn make_cluster_overview(&self, cluster: u32) -> GenResult<ArtifactStatus> {
        let kind = ArtifactKind::ClusterImage(cluster);
        let Some(path) = self.gate(kind)? else {
            return Ok(ArtifactStatus::Skipped);
        };
        let (mut fig, l) = layout::cluster_overview();
        self.draw(kind, Plot::ClusterAmpDepth { cluster }, &mut fig, &[l.amp_depth])?;
        for &(contrast, panels) in &l.contrasts {
            self.draw(kind, Plot::ClusterRaster { cluster, contrast }, &mut fig, &panels)?;
            fig.share_x(panels[0], panels[1]);
        }
        fig.harmonize_ylim(&l.rate_panels());
        self.draw(kind, Plot::ClusterWaveforms { cluster }, &mut fig, &[l.waveforms])?;
        self.draw(kind, Plot::ChannelProbeLocation { cluster }, &mut fig, &[l.probe_location])?;
        self.draw(kind, Plot::Autocorrelogram { cluster }, &mut fig, &[l.autocorrelogram])?;
        self.draw(kind, Plot::InterSpikeInterval { cluster }, &mut fig, &[l.isi])?;
        self.draw(kind, Plot::ClusterAmplitude { cluster }, &mut fig, &[l.amplitude])?;

        let table_path = self.path(ArtifactKind::ClusterPixelTable)?;
        if !should_generate(&table_path) {
            self.write_figure(kind, &path, &fig)?;
            return Ok(ArtifactStatus::Generated);
        }

        // Good clusters as drawn on the amplitude/depth chart, deepest first
        let good = self.loader.good_clusters();
        let mut order: Vec<usize> = (0..good.cluster_ids.len()).collect();
        order.sort_by(|&a, &b| good.depths[b].total_cmp(&good.depths[a]));
        let ids = order
            .iter()
            .map(|&i| {
                i32::try_from(good.cluster_ids[i]).map_err(|_| {
                    self.artifact_error(
                        kind,
                        format!("cluster id {} does not fit the pixel table", good.cluster_ids[i]),
                    )
                })
            })
            .collect::<GenResult<Vec<i32>>>()?;
        let points: Vec<(f64, f64)> = order
            .iter()
            .map(|&i| (good.amps[i] * 1e6, good.depths[i]))
            .collect();

        let rendered = fig
            .render_locating(l.amp_depth, &points)
            .map_err(|e| self.artifact_error(kind, e))?;
        let table = ClusterPixelTable::new(
            ids.into_iter()
                .zip(rendered.located)
                .map(|(cluster_id, (x, y))| ClusterPixel { cluster_id, x, y })
                .collect(),
        );
        let bytes = table
            .to_parquet()
            .map_err(|e| self.artifact_error(ArtifactKind::ClusterPixelTable, e))?;
        write_atomic(&table_path, &bytes)?;
        info!(session_id = %self.session_id, rows = table.len(), "Cluster pixel table written");
        write_atomic(&path, &rendered.png)?;
        Ok(ArtifactStatus::Generated)
    }

    /// Run every step in batch order and report each artifact
    pub fn make_all(&self, options: &GenOptions) -> SessionReport {
        let mut report = SessionReport::new(self.session_id);
        report.push(ArtifactKind::SessionDetails, ArtifactStatus::Written);

        report.push(ArtifactKind::SessionOverviewImage, self.make_session_overview());
        if options.raw_overview {
            let status = self.settle(ArtifactKind::RawOverviewImage, self.make_raw_data_overview());
            report.push(ArtifactKind::RawOverviewImage, status);
        }
        let status = self.settle(
            ArtifactKind::TrialEventOverviewImage,
            self.make_trial_event_overview(),
        );
        report.push(ArtifactKind::TrialEventOverviewImage, status);

        for (n, &trial) in self.trial_ids.iter().enumerate() {
            let outcome = self
                .save_trial_details(trial)
                .map_err(|e| (ArtifactKind::TrialDetails(trial), e))
                .and_then(|()| {
                    self.make_trial_overview(trial)
                        .map_err(|e| (ArtifactKind::TrialImage(trial), e))
                });
            self.record_entity(
                &mut report,
                ArtifactKind::TrialDetails(trial),
                ArtifactKind::TrialImage(trial),
                outcome,
            );
            self.progress("trials", n + 1, self.trial_ids.len());
        }

        for (n, &cluster) in self.cluster_ids.iter().enumerate() {
            let outcome = self
                .save_cluster_details(cluster)
                .map_err(|e| (ArtifactKind::ClusterDetails(cluster), e))
                .and_then(|()| {
                    self.make_cluster_overview(cluster)
                        .map_err(|e| (ArtifactKind::ClusterImage(cluster), e))
                });
            self.record_entity(
                &mut report,
                ArtifactKind::ClusterDetails(cluster),
                ArtifactKind::ClusterImage(cluster),
                outcome,
            );
            self.progress("clusters", n + 1, self.cluster_ids.len());
        }

        info!(session_id = %self.session_id, "Session done: {}", report.display_string());
        report
    }

    /// Turn a step result into a status, logging failures
    fn settle(&self, kind: ArtifactKind, result: GenResult<ArtifactStatus>) -> ArtifactStatus {
        result.unwrap_or_else(|e| {
            self.log_failure(kind, &e);
            ArtifactStatus::Failed(e.to_string())
        })
    }

    fn record_entity(
        &self,
        report: &mut SessionReport,
        details: ArtifactKind,
        image: ArtifactKind,
        outcome: Result<ArtifactStatus, (ArtifactKind, GenError)>,
    ) {
        match outcome {
            Ok(status) => {
                report.push(details, ArtifactStatus::Written);
                report.push(image, status);
            }
            Err((kind, e)) => {
                self.log_failure(kind, &e);
                if kind == image {
                    report.push(details, ArtifactStatus::Written);
                }
                report.push(kind, ArtifactStatus::Failed(e.to_string()));
            }
        }
    }

    fn log_failure(&self, kind: ArtifactKind, e: &GenError) {
        error!(
            session_id = %self.session_id,
            artifact = %kind,
            index = ?kind.index(),
            error = %e,
            "Artifact generation failed"
        );
    }

    fn progress(&self, what: &str, done: usize, total: usize) {
        if done % PROGRESS_EVERY == 0 || done == total {
            info!(session_id = %self.session_id, "{} {}/{}", what, done, total);
        }
    }
}
