//! Filesystem-facing services

pub mod session_scanner;

pub use session_scanner::{list_session_ids, ScanError, SessionScanner};
