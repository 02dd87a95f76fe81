//! Data-loading and plotting collaborator
//!
//! The generator never looks at raw recordings itself. It asks a
//! [`DataLoader`] for detail records and tells it to draw into axes of a
//! [`Figure`]; what ends up in the panels is entirely the loader's business.

pub mod raw;

use std::path::PathBuf;

use ephys_common::SessionId;
use thiserror::Error;

use crate::figure::{AxesId, Figure, FigureError};
use crate::models::{ClusterDetails, SessionDetails, TrialDetails, TrialInterval};

pub use raw::{RawDataLoader, RawDataSource};

/// Data collaborator errors
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Session directory is absent
    #[error("Session data not found: {0}")]
    SessionNotFound(PathBuf),

    /// A required input file is absent
    #[error("Missing data file: {0}")]
    MissingFile(PathBuf),

    /// An input file could not be parsed
    #[error("Malformed data file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown trial #{0}")]
    UnknownTrial(u32),

    #[error("Unknown cluster #{0}")]
    UnknownCluster(u32),

    /// A plot was handed the wrong number of panels
    #[error("{plot:?} expects {expected} panels, got {got}")]
    PanelCount {
        plot: Plot,
        expected: usize,
        got: usize,
    },

    /// Optional data needed by a plot is absent
    #[error("No data for {0}")]
    NoData(&'static str),

    #[error(transparent)]
    Figure(#[from] FigureError),
}

/// Experimental contrast used to split a cluster's trials in two groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contrast {
    /// Left-biased vs right-biased block
    Block,
    /// High vs low stimulus contrast
    StimulusContrast,
    /// Stimulus on the left vs on the right
    LeftRight,
    /// Correct vs incorrect response
    CorrectIncorrect,
}

impl Contrast {
    pub const ALL: [Contrast; 4] = [
        Contrast::Block,
        Contrast::StimulusContrast,
        Contrast::LeftRight,
        Contrast::CorrectIncorrect,
    ];
}

/// Render calls understood by a loader, with the panels each one fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plot {
    /// [scatter, legend]
    GoodBadClusters,
    /// [scatter, colorbar]
    AmpDepthFiringRate,
    /// [raster]; highlights one trial when given
    SessionRaster { trial: Option<u32> },
    /// [heatmap, colorbar]
    ApRms,
    /// [heatmap, colorbar]
    LfpSpectrum,
    /// [regions]
    BrainRegions,
    /// [curves, legend]
    PsychometricCurve,
    ChronometricCurve,
    ReactionTime,
    /// Four trace panels
    RawData,
    /// Three event panels and a colorbar
    EventAlignedActivity,
    TrialRaster { trial: u32 },
    /// Good clusters in (amplitude uV, depth) data space
    ClusterAmpDepth { cluster: u32 },
    /// [rate, raster]
    ClusterRaster { cluster: u32, contrast: Contrast },
    ClusterWaveforms { cluster: u32 },
    ChannelProbeLocation { cluster: u32 },
    Autocorrelogram { cluster: u32 },
    InterSpikeInterval { cluster: u32 },
    ClusterAmplitude { cluster: u32 },
}

impl Plot {
    /// Number of axes this render call fills
    pub fn panel_count(&self) -> usize {
        match self {
            Plot::GoodBadClusters
            | Plot::AmpDepthFiringRate
            | Plot::ApRms
            | Plot::LfpSpectrum
            | Plot::PsychometricCurve
            | Plot::ClusterRaster { .. } => 2,
            Plot::RawData | Plot::EventAlignedActivity => 4,
            _ => 1,
        }
    }

    /// Fail unless exactly `panel_count` axes were supplied
    pub fn check_panels(&self, axes: &[AxesId]) -> Result<(), LoaderError> {
        if axes.len() != self.panel_count() {
            return Err(LoaderError::PanelCount {
                plot: *self,
                expected: self.panel_count(),
                got: axes.len(),
            });
        }
        Ok(())
    }
}

/// Good clusters in the units they are plotted in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoodClusters {
    pub cluster_ids: Vec<u32>,
    /// Amplitudes in volts
    pub amps: Vec<f64>,
    /// Depths in micrometers along the probe
    pub depths: Vec<f64>,
}

/// Per-session data collaborator
pub trait DataLoader {
    fn session_details(&self) -> Result<SessionDetails, LoaderError>;

    fn trial_details(&self, trial: u32) -> Result<TrialDetails, LoaderError>;

    fn cluster_details(&self, cluster: u32) -> Result<ClusterDetails, LoaderError>;

    /// Trial (start, end) pairs in session time, in trial order
    fn trial_intervals(&self) -> Vec<TrialInterval>;

    fn good_clusters(&self) -> GoodClusters;

    /// Full (min, max) probe depth extent
    fn probe_depth_range(&self) -> (f64, f64);

    /// Draw `plot` into the given axes of `figure`
    fn plot(&self, plot: Plot, figure: &mut Figure, axes: &[AxesId]) -> Result<(), LoaderError>;
}

/// Opens one loader per session
pub trait SessionSource: Send + Sync + 'static {
    type Loader: DataLoader;

    fn open(&self, session_id: &SessionId) -> Result<Self::Loader, LoaderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Rect;

    #[test]
    fn test_panel_counts() {
        assert_eq!(Plot::RawData.panel_count(), 4);
        assert_eq!(Plot::EventAlignedActivity.panel_count(), 4);
        assert_eq!(
            Plot::ClusterRaster { cluster: 1, contrast: Contrast::Block }.panel_count(),
            2
        );
        assert_eq!(Plot::BrainRegions.panel_count(), 1);
    }

    #[test]
    fn test_check_panels() {
        let mut fig = Figure::new(1.0, 1.0);
        let a = fig.add_axes(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(Plot::BrainRegions.check_panels(&[a]).is_ok());
        match Plot::ApRms.check_panels(&[a]) {
            Err(LoaderError::PanelCount { expected, got, .. }) => {
                assert_eq!((expected, got), (2, 1));
            }
            other => panic!("Expected PanelCount, got {:?}", other),
        }
    }
}
