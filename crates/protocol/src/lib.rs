//! rufnetz-protocol – Signaling-Protokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichten, die zwischen Browser-Client und
//! Server ueber die WebSocket-Verbindung ausgetauscht werden.

pub mod control;

pub use control::{CallErrorCode, ClientNachricht, RosterEintrag, ServerNachricht};
