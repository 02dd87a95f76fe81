//! Data models for cached artifacts
//!
//! - Detail documents (JSON) for sessions, trials and clusters
//! - Columnar tables (Parquet) read back by the presentation layer

pub mod details;
pub mod tables;

pub use details::{ClusterDetails, SessionDetails, TrialDetails};
pub use tables::{ClusterPixel, ClusterPixelTable, TableError, TrialInterval, TrialIntervalTable};
