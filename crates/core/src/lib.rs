//! rufnetz-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die Bausteine bereit, die sowohl vom Protokoll als
//! auch vom Signaling-Service genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{CallState, EndpointId};
