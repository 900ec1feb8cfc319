//! Gemeinsame Identifikations- und Zustandstypen fuer Rufnetz
//!
//! IDs verwenden das Newtype-Pattern, damit Endpunkt-IDs nicht mit
//! beliebigen UUIDs verwechselt werden koennen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Endpunkt-ID (vom Server vergeben, stabil fuer die Verbindungsdauer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub Uuid);

impl EndpointId {
    /// Erstellt eine neue zufaellige EndpointId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "endpoint:{}", self.0)
    }
}

/// Anrufzustand eines Endpunkts
///
/// ```text
/// Idle -> RingingOut / RingingIn -> InCall -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallState {
    /// Kein Anruf
    #[default]
    Idle,
    /// Anrufer wartet auf Antwort
    RingingOut,
    /// Angerufener hat ein Angebot erhalten, aber noch nicht geantwortet
    RingingIn,
    /// Aushandlung abgeschlossen (aus Sicht des Relays)
    InCall,
}

impl CallState {
    /// Gibt true zurueck wenn der Endpunkt frei fuer einen neuen Anruf ist
    pub fn ist_frei(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RingingOut => "ringing-out",
            Self::RingingIn => "ringing-in",
            Self::InCall => "in-call",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_id_eindeutig() {
        let a = EndpointId::new();
        let b = EndpointId::new();
        assert_ne!(a, b, "Zwei neue EndpointIds muessen verschieden sein");
    }

    #[test]
    fn endpoint_id_display() {
        let id = EndpointId(Uuid::nil());
        assert!(id.to_string().starts_with("endpoint:"));
    }

    #[test]
    fn endpoint_id_wird_als_reine_uuid_serialisiert() {
        let id = EndpointId(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn call_state_kebab_case() {
        let json = serde_json::to_string(&CallState::RingingOut).unwrap();
        assert_eq!(json, "\"ringing-out\"");
        let zustand: CallState = serde_json::from_str("\"in-call\"").unwrap();
        assert_eq!(zustand, CallState::InCall);
        assert_eq!(CallState::RingingIn.to_string(), "ringing-in");
    }

    #[test]
    fn nur_idle_ist_frei() {
        assert!(CallState::Idle.ist_frei());
        assert!(!CallState::RingingOut.ist_frei());
        assert!(!CallState::RingingIn.ist_frei());
        assert!(!CallState::InCall.ist_frei());
    }
}
