//! ephys-gen: derived artifact generation for electrophysiology sessions
//!
//! Turns per-session raw recordings into a write-once cache of detail
//! documents, overview images and columnar tables, one directory per session.

pub mod cache;
pub mod error;
pub mod fanout;
pub mod figure;
pub mod generator;
pub mod loader;
pub mod locator;
pub mod models;
pub mod services;

pub use crate::cache::{ArtifactKind, CachePaths};
pub use crate::error::{GenError, GenResult};
pub use crate::fanout::{default_workers, generate_session, run_batch, RunReport, SessionOutcome};
pub use crate::generator::{ArtifactStatus, GenOptions, SessionGenerator, SessionReport};
pub use crate::loader::{DataLoader, RawDataSource, SessionSource};
pub use crate::locator::{resolve_cluster_at, ClusterMatch};
pub use crate::services::list_session_ids;
