//! On-disk artifact cache
//!
//! One directory per session under the cache root. Presence of a file is the
//! only record that an artifact was generated; nothing is ever deleted.

pub mod gate;
pub mod paths;

pub use gate::{should_generate, write_atomic, write_json};
pub use paths::{ArtifactKind, CachePaths};
