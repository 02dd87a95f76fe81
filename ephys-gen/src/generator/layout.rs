//! Panel layouts of the composite figures
//!
//! Each builder returns an empty [`Figure`] together with the handles of its
//! panels, grouped the way the data collaborator's render calls consume them.

use crate::figure::{AxesId, Figure, GridSpec};
use crate::loader::Contrast;

pub const SESSION_OVERVIEW_SIZE: (f64, f64) = (16.0, 10.0);
pub const RAW_OVERVIEW_SIZE: (f64, f64) = (14.0, 6.0);
pub const TRIAL_EVENT_SIZE: (f64, f64) = (14.0, 6.0);
pub const TRIAL_SIZE: (f64, f64) = (12.0, 6.0);
pub const CLUSTER_SIZE: (f64, f64) = (15.0, 10.0);

pub struct SessionOverviewLayout {
    pub good_bad: [AxesId; 2],
    pub amp_depth_fr: [AxesId; 2],
    pub raster: AxesId,
    pub ap_rms: [AxesId; 2],
    pub lfp: [AxesId; 2],
    pub regions: AxesId,
    pub psychometric: [AxesId; 2],
    pub chronometric: AxesId,
    pub reaction_time: AxesId,
}

/// Axes for a panel followed by a narrow side panel (legend or colorbar)
fn with_side_panel(fig: &mut Figure, grid: &GridSpec, row: usize, col: usize, ratio: f64) -> [AxesId; 2] {
    let inner = GridSpec::within(grid.cell(row, col), 1, 2)
        .width_ratios(&[ratio, 1.0])
        .wspace(0.05);
    [fig.add_axes(inner.cell(0, 0)), fig.add_axes(inner.cell(0, 1))]
}

pub fn session_overview() -> (Figure, SessionOverviewLayout) {
    let (w, h) = SESSION_OVERVIEW_SIZE;
    let mut fig = Figure::new(w, h);
    let grid = GridSpec::new(3, 4)
        .margins(0.05, 0.97, 0.05, 0.97)
        .wspace(0.3)
        .hspace(0.3);

    let good_bad = with_side_panel(&mut fig, &grid, 0, 0, 4.0);
    let amp_depth_fr = with_side_panel(&mut fig, &grid, 0, 1, 10.0);
    let raster = fig.add_axes(grid.span(0..1, 2..4));
    let ap_rms = with_side_panel(&mut fig, &grid, 1, 0, 10.0);
    let lfp = with_side_panel(&mut fig, &grid, 1, 1, 10.0);
    let regions = fig.add_axes(grid.cell(1, 2));
    let psychometric = with_side_panel(&mut fig, &grid, 1, 3, 4.0);
    let chronometric = fig.add_axes(grid.cell(2, 0));
    let reaction_time = fig.add_axes(grid.span(2..3, 1..3));

    let layout = SessionOverviewLayout {
        good_bad,
        amp_depth_fr,
        raster,
        ap_rms,
        lfp,
        regions,
        psychometric,
        chronometric,
        reaction_time,
    };
    (fig, layout)
}

/// Data panels followed by a brain-region column
pub struct StripLayout {
    pub panels: Vec<AxesId>,
    pub regions: AxesId,
}

fn strip(size: (f64, f64), ratios: &[f64]) -> (Figure, StripLayout) {
    let mut fig = Figure::new(size.0, size.1);
    let grid = GridSpec::new(1, ratios.len())
        .margins(0.05, 0.97, 0.08, 0.95)
        .width_ratios(ratios)
        .wspace(0.1);
    let panels = (0..ratios.len() - 1)
        .map(|col| fig.add_axes(grid.cell(0, col)))
        .collect();
    let regions = fig.add_axes(grid.cell(0, ratios.len() - 1));
    (fig, StripLayout { panels, regions })
}

/// Four trace panels and the region column
pub fn raw_overview() -> (Figure, StripLayout) {
    strip(RAW_OVERVIEW_SIZE, &[3.0, 3.0, 3.0, 3.0, 1.0])
}

/// Three event panels, a colorbar and the region column
pub fn trial_event_overview() -> (Figure, StripLayout) {
    strip(TRIAL_EVENT_SIZE, &[4.0, 4.0, 4.0, 0.3, 1.0])
}

/// Session raster, trial raster and the region column
pub fn trial_overview() -> (Figure, StripLayout) {
    strip(TRIAL_SIZE, &[6.0, 3.0, 1.0])
}

pub struct ClusterOverviewLayout {
    pub amp_depth: AxesId,
    /// (rate, raster) pair per contrast, in [`Contrast::ALL`] order
    pub contrasts: Vec<(Contrast, [AxesId; 2])>,
    pub waveforms: AxesId,
    pub probe_location: AxesId,
    pub autocorrelogram: AxesId,
    pub isi: AxesId,
    pub amplitude: AxesId,
}

impl ClusterOverviewLayout {
    /// The four upper (rate) panels
    pub fn rate_panels(&self) -> Vec<AxesId> {
        self.contrasts.iter().map(|(_, [rate, _])| *rate).collect()
    }
}

pub fn cluster_overview() -> (Figure, ClusterOverviewLayout) {
    let (w, h) = CLUSTER_SIZE;
    let mut fig = Figure::new(w, h);
    let grid = GridSpec::new(4, 5)
        .margins(0.05, 0.97, 0.05, 0.97)
        .height_ratios(&[1.0, 2.0, 1.5, 1.5])
        .wspace(0.3)
        .hspace(0.3);

    let amp_depth = fig.add_axes(grid.span(0..2, 0..1));
    let contrasts = Contrast::ALL
        .iter()
        .enumerate()
        .map(|(i, &contrast)| {
            let rate = fig.add_axes(grid.cell(0, i + 1));
            let raster = fig.add_axes(grid.cell(1, i + 1));
            (contrast, [rate, raster])
        })
        .collect();
    let waveforms = fig.add_axes(grid.span(2..3, 0..2));
    let probe_location = fig.add_axes(grid.cell(2, 2));
    let autocorrelogram = fig.add_axes(grid.span(2..3, 3..5));
    let isi = fig.add_axes(grid.span(3..4, 0..2));
    let amplitude = fig.add_axes(grid.span(3..4, 2..5));

    let layout = ClusterOverviewLayout {
        amp_depth,
        contrasts,
        waveforms,
        probe_location,
        autocorrelogram,
        isi,
        amplitude,
    };
    (fig, layout)
}
