//! rufnetz-signaling – WebSocket Signaling-Relay
//!
//! Dieser Crate implementiert den Signaling-Service fuer Rufnetz. Er
//! verwaltet WebSocket-Verbindungen, den Roster der beigetretenen
//! Endpunkte, den Anrufzustand je Endpunkt und leitet SDP-Angebote,
//! Antworten und ICE-Kandidaten zwischen zwei Endpunkten weiter.
//! Medien laufen nie ueber den Server.
//!
//! ## Architektur
//!
//! ```text
//! axum /ws (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Keepalive, JSON-Parsing, Send-Queue
//!     |
//!     v
//! RelayRouter
//!     |
//!     +-- LifecycleManager (verbunden, beitreten, getrennt)
//!     +-- call_state       (initiieren, beantworten, beenden)
//!
//! EndpointRegistry – Wer ist verbunden, wie heisst er, mit wem im Anruf
//! EventBroadcaster – Nachrichten an einzelne oder alle Endpunkte
//! ```

pub mod broadcast;
pub mod call_state;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use error::{SignalingError, SignalingResult};
pub use lifecycle::LifecycleManager;
pub use registry::{Endpoint, EndpointRegistry};
pub use router::RelayRouter;
pub use server_state::{SignalingConfig, SignalingState};
pub use ws::SignalingServer;
