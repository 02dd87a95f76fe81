//! Panel drawing for the file-backed collaborator
//!
//! Drawings are deliberately plain: scatter rasters, binned heatmaps and
//! histograms computed straight from the loaded arrays.

use std::collections::BTreeMap;

use tracing::debug;

use super::{RawDataLoader, RawHeatmap, RawTrial};
use crate::figure::{colors, AxesId, Color, Extent, Figure};
use crate::loader::{Contrast, LoaderError, Plot};

/// Upper bound on points drawn by whole-session rasters
const MAX_RASTER_POINTS: usize = 20_000;

/// Peri-event window in seconds
const WINDOW: (f64, f64) = (-0.5, 1.0);
const RATE_BIN: f64 = 0.02;
const EVENT_TIME_BINS: usize = 30;
const EVENT_DEPTH_BINS: usize = 40;

const CORRELOGRAM_WINDOW: f64 = 0.05;
const CORRELOGRAM_BIN: f64 = 0.001;
const ISI_MAX: f64 = 0.1;
const ISI_BIN: f64 = 0.001;

const GROUP_COLORS: [Color; 2] = [colors::BLUE, colors::RED];
const BLOCK_COLORS: [Color; 3] = [colors::ORANGE, colors::BLACK, colors::PURPLE];

impl RawDataLoader {
    pub(super) fn draw(&self, plot: Plot, fig: &mut Figure, axes: &[AxesId]) -> Result<(), LoaderError> {
        plot.check_panels(axes)?;
        match plot {
            Plot::GoodBadClusters => self.good_bad_clusters(fig, axes[0], axes[1]),
            Plot::AmpDepthFiringRate => self.amp_depth_firing_rate(fig, axes[0], axes[1]),
            Plot::SessionRaster { trial } => self.session_raster(fig, axes[0], trial),
            Plot::ApRms => heatmap_with_colorbar(fig, axes[0], axes[1], self.ap_rms.as_ref(), "ap_rms"),
            Plot::LfpSpectrum => {
                heatmap_with_colorbar(fig, axes[0], axes[1], self.lfp_spectrum.as_ref(), "lfp_spectrum")
            }
            Plot::BrainRegions => self.brain_regions(fig, axes[0]),
            Plot::PsychometricCurve => self.psychometric(fig, axes[0], axes[1]),
            Plot::ChronometricCurve => self.chronometric(fig, axes[0]),
            Plot::ReactionTime => self.reaction_times(fig, axes[0]),
            Plot::RawData => self.raw_traces(fig, axes),
            Plot::EventAlignedActivity => self.event_aligned(fig, axes),
            Plot::TrialRaster { trial } => self.trial_raster(fig, axes[0], trial),
            Plot::ClusterAmpDepth { cluster } => self.cluster_amp_depth(fig, axes[0], cluster),
            Plot::ClusterRaster { cluster, contrast } => {
                self.cluster_raster(fig, axes[0], axes[1], cluster, contrast)
            }
            Plot::ClusterWaveforms { cluster } => self.waveforms(fig, axes[0], cluster),
            Plot::ChannelProbeLocation { cluster } => self.probe_location(fig, axes[0], cluster),
            Plot::Autocorrelogram { cluster } => self.autocorrelogram(fig, axes[0], cluster),
            Plot::InterSpikeInterval { cluster } => self.inter_spike_interval(fig, axes[0], cluster),
            Plot::ClusterAmplitude { cluster } => self.cluster_amplitude(fig, axes[0], cluster),
        }
    }

    fn good_bad_clusters(&self, fig: &mut Figure, ax: AxesId, legend: AxesId) -> Result<(), LoaderError> {
        for (good, color) in [(true, colors::GREEN), (false, colors::RED)] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = self
                .clusters
                .values()
                .filter(|c| c.good == good)
                .map(|c| (c.amp * 1e6, c.depth))
                .unzip();
            fig.axes_mut(ax).scatter(&xs, &ys, color, 5)?;
        }
        let legend = fig.axes_mut(legend);
        legend.scatter(&[0.0], &[1.0], colors::GREEN, 7)?;
        legend.scatter(&[0.0], &[0.0], colors::RED, 7)?;
        legend.remove_frame();
        Ok(())
    }

    fn amp_depth_firing_rate(&self, fig: &mut Figure, ax: AxesId, cbar: AxesId) -> Result<(), LoaderError> {
        let duration = self.session.duration.max(f64::EPSILON);
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut rates = Vec::new();
        for c in self.clusters.values() {
            xs.push(c.amp * 1e6);
            ys.push(c.depth);
            let n = self.spikes_by_cluster.get(&c.index).map_or(0, Vec::len);
            rates.push(n as f64 / duration);
        }
        fig.axes_mut(ax).scatter_values(&xs, &ys, &rates, 5)?;
        colorbar(fig, cbar)
    }

    fn session_raster(&self, fig: &mut Figure, ax: AxesId, trial: Option<u32>) -> Result<(), LoaderError> {
        let axes = fig.axes_mut(ax);
        if let Some(trial) = trial {
            let t = self.trial(trial)?;
            axes.axvspan(t.t0, t.t1, colors::GREY);
        }
        let stride = (self.spikes.times.len() / MAX_RASTER_POINTS).max(1);
        let xs: Vec<f64> = self.spikes.times.iter().step_by(stride).copied().collect();
        let ys: Vec<f64> = self.spikes.depths.iter().step_by(stride).copied().collect();
        axes.scatter(&xs, &ys, colors::BLACK, 1)?;
        Ok(())
    }

    fn brain_regions(&self, fig: &mut Figure, ax: AxesId) -> Result<(), LoaderError> {
        let (lo, hi) = self.session.probe_depth_range;
        let axes = fig.axes_mut(ax);
        for region in &self.session.regions {
            axes.axhspan(region.depth_lo, region.depth_hi, region.color);
        }
        axes.set_xlim(0.0, 1.0);
        axes.set_ylim(lo, hi);
        axes.hide_xaxis();
        Ok(())
    }

    fn psychometric(&self, fig: &mut Figure, ax: AxesId, legend: AxesId) -> Result<(), LoaderError> {
        let blocks = group_by_key(self.trials.values(), |t| t.probability_left);
        for (i, trials) in blocks.values().enumerate() {
            let by_contrast = group_by_key(trials.iter().copied(), RawTrial::signed_contrast);
            let (xs, ys): (Vec<f64>, Vec<f64>) = by_contrast
                .iter()
                .map(|(&key, group)| {
                    let right = group.iter().filter(|t| t.choice > 0).count();
                    (from_key(key), right as f64 / group.len() as f64)
                })
                .unzip();
            let color = BLOCK_COLORS[i % BLOCK_COLORS.len()];
            fig.axes_mut(ax).plot(&xs, &ys, color)?;
            fig.axes_mut(legend).scatter(&[0.0], &[-(i as f64)], color, 7)?;
        }
        fig.axes_mut(ax).set_ylim(0.0, 1.0);
        fig.axes_mut(legend).remove_frame();
        Ok(())
    }

    fn chronometric(&self, fig: &mut Figure, ax: AxesId) -> Result<(), LoaderError> {
        let by_contrast = group_by_key(self.trials.values(), RawTrial::signed_contrast);
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (key, group) in by_contrast {
            let rts: Vec<f64> = group.iter().filter_map(|t| t.reaction_time()).collect();
            if let Some(m) = median(rts) {
                xs.push(from_key(key));
                ys.push(m);
            }
        }
        fig.axes_mut(ax).plot(&xs, &ys, colors::BLACK)?;
        Ok(())
    }

    fn reaction_times(&self, fig: &mut Figure, ax: AxesId) -> Result<(), LoaderError> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = self
            .trials
            .values()
            .filter_map(|t| Some((t.index as f64, t.reaction_time()?)))
            .unzip();
        fig.axes_mut(ax).scatter(&xs, &ys, colors::BLACK, 2)?;
        Ok(())
    }

    fn raw_traces(&self, fig: &mut Figure, axes: &[AxesId]) -> Result<(), LoaderError> {
        let snippets = self.raw_snippets.as_ref().ok_or(LoaderError::NoData("raw"))?;
        for (&ax, snippet) in axes.iter().zip(snippets) {
            draw_heatmap(fig, ax, snippet)?;
        }
        Ok(())
    }

    fn event_aligned(&self, fig: &mut Figure, axes: &[AxesId]) -> Result<(), LoaderError> {
        let (dmin, dmax) = self.session.probe_depth_range;
        let events: [fn(&RawTrial) -> Option<f64>; 3] =
            [|t: &RawTrial| t.stim_on, |t: &RawTrial| t.first_movement, |t: &RawTrial| t.feedback_time];
        let time_bin = (WINDOW.1 - WINDOW.0) / EVENT_TIME_BINS as f64;
        let depth_bin = (dmax - dmin) / EVENT_DEPTH_BINS as f64;

        for (&ax, event) in axes[..3].iter().zip(events) {
            let mut counts = vec![0.0; EVENT_DEPTH_BINS * EVENT_TIME_BINS];
            let mut n_trials = 0usize;
            for t in self.trials.values() {
                let Some(e) = event(t) else { continue };
                n_trials += 1;
                for i in self.spike_range(e + WINDOW.0, e + WINDOW.1) {
                    let col = ((self.spikes.times[i] - e - WINDOW.0) / time_bin) as usize;
                    let row = ((self.spikes.depths[i] - dmin) / depth_bin).floor();
                    if row < 0.0 || row >= EVENT_DEPTH_BINS as f64 || col >= EVENT_TIME_BINS {
                        continue;
                    }
                    counts[row as usize * EVENT_TIME_BINS + col] += 1.0;
                }
            }
            if n_trials > 0 {
                let scale = 1.0 / (n_trials as f64 * time_bin);
                counts.iter_mut().for_each(|c| *c *= scale);
            }
            fig.axes_mut(ax).imshow(
                &counts,
                EVENT_DEPTH_BINS,
                EVENT_TIME_BINS,
                Extent { x0: WINDOW.0, x1: WINDOW.1, y0: dmin, y1: dmax },
            )?;
        }
        colorbar(fig, axes[3])
    }

    fn trial_raster(&self, fig: &mut Figure, ax: AxesId, trial: u32) -> Result<(), LoaderError> {
        let t = self.trial(trial)?;
        let range = self.spike_range(t.t0, t.t1);
        let xs: Vec<f64> = self.spikes.times[range.clone()].iter().map(|s| s - t.t0).collect();
        let ys = &self.spikes.depths[range];
        let axes = fig.axes_mut(ax);
        axes.scatter(&xs, ys, colors::BLACK, 1)?;
        axes.set_xlim(0.0, (t.t1 - t.t0).max(f64::EPSILON));
        Ok(())
    }

    fn cluster_amp_depth(&self, fig: &mut Figure, ax: AxesId, cluster: u32) -> Result<(), LoaderError> {
        let selected = self.cluster(cluster)?;
        let good = self.good_clusters_uv();
        let axes = fig.axes_mut(ax);
        axes.scatter(&good.0, &good.1, colors::GREY, 5)?;
        axes.scatter(&[selected.amp * 1e6], &[selected.depth], colors::RED, 9)?;
        Ok(())
    }

    fn good_clusters_uv(&self) -> (Vec<f64>, Vec<f64>) {
        self.clusters
            .values()
            .filter(|c| c.good)
            .map(|c| (c.amp * 1e6, c.depth))
            .unzip()
    }

    fn cluster_raster(
        &self,
        fig: &mut Figure,
        rate_ax: AxesId,
        raster_ax: AxesId,
        cluster: u32,
        contrast: Contrast,
    ) -> Result<(), LoaderError> {
        self.cluster(cluster)?;
        let times = self.cluster_times(cluster);
        let n_bins = ((WINDOW.1 - WINDOW.0) / RATE_BIN).round() as usize;
        let centers: Vec<f64> = (0..n_bins)
            .map(|b| WINDOW.0 + (b as f64 + 0.5) * RATE_BIN)
            .collect();

        let mut row = 0.0;
        for (group, color) in split_trials(self.trials.values(), contrast).iter().zip(GROUP_COLORS) {
            let mut counts = vec![0.0; n_bins];
            let mut raster_x = Vec::new();
            let mut raster_y = Vec::new();
            for t in group {
                let Some(onset) = t.stim_on else { continue };
                let lo = times.partition_point(|&s| s < onset + WINDOW.0);
                let hi = times.partition_point(|&s| s < onset + WINDOW.1);
                for &s in &times[lo..hi] {
                    let rel = s - onset;
                    let bin = ((rel - WINDOW.0) / RATE_BIN) as usize;
                    if bin < n_bins {
                        counts[bin] += 1.0;
                    }
                    raster_x.push(rel);
                    raster_y.push(row);
                }
                row += 1.0;
            }
            let n = group.iter().filter(|t| t.stim_on.is_some()).count().max(1) as f64;
            let rates: Vec<f64> = counts.iter().map(|c| c / (n * RATE_BIN)).collect();
            fig.axes_mut(rate_ax).plot(&centers, &rates, color)?;
            fig.axes_mut(raster_ax).scatter(&raster_x, &raster_y, color, 1)?;
        }
        fig.axes_mut(raster_ax).set_xlim(WINDOW.0, WINDOW.1);
        fig.axes_mut(rate_ax).set_xlim(WINDOW.0, WINDOW.1);
        Ok(())
    }

    fn waveforms(&self, fig: &mut Figure, ax: AxesId, cluster: u32) -> Result<(), LoaderError> {
        let c = self.cluster(cluster)?;
        if c.waveform.is_empty() {
            debug!(cluster, "No waveform template");
            return Ok(());
        }
        let xs: Vec<f64> = (0..c.waveform.len()).map(|i| i as f64).collect();
        let ys: Vec<f64> = c.waveform.iter().map(|v| v * 1e6).collect();
        fig.axes_mut(ax).plot(&xs, &ys, colors::BLACK)?;
        Ok(())
    }

    fn probe_location(&self, fig: &mut Figure, ax: AxesId, cluster: u32) -> Result<(), LoaderError> {
        let selected = self.cluster(cluster)?;
        let depths: Vec<f64> = self.clusters.values().map(|c| c.depth).collect();
        let zeros = vec![0.0; depths.len()];
        let (lo, hi) = self.session.probe_depth_range;
        let axes = fig.axes_mut(ax);
        axes.scatter(&zeros, &depths, colors::GREY, 3)?;
        axes.scatter(&[0.0], &[selected.depth], colors::RED, 7)?;
        axes.set_ylim(lo, hi);
        axes.hide_xaxis();
        Ok(())
    }

    fn autocorrelogram(&self, fig: &mut Figure, ax: AxesId, cluster: u32) -> Result<(), LoaderError> {
        self.cluster(cluster)?;
        let times = self.cluster_times(cluster);
        let half = (CORRELOGRAM_WINDOW / CORRELOGRAM_BIN).round() as i64;
        let mut counts = vec![0.0; (2 * half + 1) as usize];
        for (i, &t) in times.iter().enumerate() {
            for &u in times[i + 1..].iter().take_while(|&&u| u - t <= CORRELOGRAM_WINDOW) {
                let lag = ((u - t) / CORRELOGRAM_BIN).round() as i64;
                if lag == 0 || lag > half {
                    continue;
                }
                counts[(half + lag) as usize] += 1.0;
                counts[(half - lag) as usize] += 1.0;
            }
        }
        let xs: Vec<f64> = (-half..=half).map(|k| k as f64 * CORRELOGRAM_BIN).collect();
        fig.axes_mut(ax).bar(&xs, &counts, CORRELOGRAM_BIN, colors::BLACK)?;
        Ok(())
    }

    fn inter_spike_interval(&self, fig: &mut Figure, ax: AxesId, cluster: u32) -> Result<(), LoaderError> {
        self.cluster(cluster)?;
        let times = self.cluster_times(cluster);
        let n_bins = (ISI_MAX / ISI_BIN).round() as usize;
        let mut counts = vec![0.0; n_bins];
        for w in times.windows(2) {
            let bin = ((w[1] - w[0]) / ISI_BIN) as usize;
            if bin < n_bins {
                counts[bin] += 1.0;
            }
        }
        let xs: Vec<f64> = (0..n_bins).map(|b| (b as f64 + 0.5) * ISI_BIN).collect();
        fig.axes_mut(ax).bar(&xs, &counts, ISI_BIN, colors::BLACK)?;
        Ok(())
    }

    fn cluster_amplitude(&self, fig: &mut Figure, ax: AxesId, cluster: u32) -> Result<(), LoaderError> {
        self.cluster(cluster)?;
        let idx = self.spikes_by_cluster.get(&cluster).cloned().unwrap_or_default();
        let stride = (idx.len() / MAX_RASTER_POINTS).max(1);
        let (xs, ys): (Vec<f64>, Vec<f64>) = idx
            .iter()
            .step_by(stride)
            .map(|&i| (self.spikes.times[i], self.spikes.amps[i] * 1e6))
            .unzip();
        fig.axes_mut(ax).scatter(&xs, &ys, colors::BLACK, 1)?;
        Ok(())
    }
}

fn colorbar(fig: &mut Figure, ax: AxesId) -> Result<(), LoaderError> {
    let gradient: Vec<f64> = (0..64).map(f64::from).collect();
    let axes = fig.axes_mut(ax);
    axes.imshow(&gradient, 1, 64, Extent { x0: 0.0, x1: 1.0, y0: 0.0, y1: 1.0 })?;
    axes.hide_yaxis();
    Ok(())
}

fn draw_heatmap(fig: &mut Figure, ax: AxesId, map: &RawHeatmap) -> Result<(), LoaderError> {
    let [x0, x1, y0, y1] = map.extent;
    fig.axes_mut(ax)
        .imshow(&map.values, map.rows, map.cols, Extent { x0, x1, y0, y1 })?;
    Ok(())
}

fn heatmap_with_colorbar(
    fig: &mut Figure,
    ax: AxesId,
    cbar: AxesId,
    map: Option<&RawHeatmap>,
    name: &'static str,
) -> Result<(), LoaderError> {
    match map {
        Some(map) => draw_heatmap(fig, ax, map)?,
        None => debug!("No {} data, leaving panel empty", name),
    }
    colorbar(fig, cbar)
}

/// Float keys are grouped at a 1e-3 resolution
fn to_key(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

fn from_key(k: i64) -> f64 {
    k as f64 / 1000.0
}

fn group_by_key<'a>(
    trials: impl Iterator<Item = &'a RawTrial>,
    key: impl Fn(&RawTrial) -> f64,
) -> BTreeMap<i64, Vec<&'a RawTrial>> {
    let mut groups: BTreeMap<i64, Vec<&RawTrial>> = BTreeMap::new();
    for t in trials {
        groups.entry(to_key(key(t))).or_default().push(t);
    }
    groups
}

/// Split trials in the two groups compared by `contrast`
fn split_trials<'a>(
    trials: impl Iterator<Item = &'a RawTrial>,
    contrast: Contrast,
) -> [Vec<&'a RawTrial>; 2] {
    let mut groups: [Vec<&RawTrial>; 2] = [Vec::new(), Vec::new()];
    for t in trials {
        let side = match contrast {
            Contrast::Block if t.probability_left > 0.5 => Some(0),
            Contrast::Block if t.probability_left < 0.5 => Some(1),
            Contrast::Block => None,
            Contrast::StimulusContrast => {
                let c = t.contrast_left.or(t.contrast_right).unwrap_or(0.0);
                Some(if c >= 0.25 { 0 } else { 1 })
            }
            Contrast::LeftRight if t.contrast_left.is_some() => Some(0),
            Contrast::LeftRight if t.contrast_right.is_some() => Some(1),
            Contrast::LeftRight => None,
            Contrast::CorrectIncorrect => Some(if t.feedback_type > 0 { 0 } else { 1 }),
        };
        if let Some(side) = side {
            groups[side].push(t);
        }
    }
    groups
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
