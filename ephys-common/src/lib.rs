//! # Ephys Common Library
//!
//! Shared code for the ephys atlas cache tools including:
//! - Session identifier validation
//! - Configuration loading and directory resolution
//! - Numeric normalization helpers
//! - Common error type

pub mod config;
pub mod error;
pub mod normalize;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use normalize::{normalize, Normalized, NormalizeTarget};
pub use uuid_utils::SessionId;
