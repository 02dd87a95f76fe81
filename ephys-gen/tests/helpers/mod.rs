//! Test Helper Utilities
//!
//! Shared utilities for testing ephys-gen

#![allow(dead_code)]

pub mod fake_source;
pub mod log_capture;
pub mod raw_fixture;

pub use fake_source::{FakeLoader, FakeSession, FakeSource};
pub use log_capture::{capture_logs, LogCapture};
pub use raw_fixture::write_raw_session;

use ephys_common::SessionId;

pub const SESSION_A: &str = "c9bf9e57-1685-4c89-bafb-ff5af830be8a";
pub const SESSION_B: &str = "0a5f7b0e-4ab5-4f8d-8a4a-7a1b2c3d4e5f";
pub const SESSION_C: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";

pub fn sid(token: &str) -> SessionId {
    SessionId::parse(token).unwrap()
}
