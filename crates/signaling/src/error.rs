//! Fehlertypen fuer den Signaling-Service

use rufnetz_core::types::EndpointId;
use rufnetz_protocol::CallErrorCode;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Socket, Listener)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// JSON konnte nicht (de)serialisiert werden
    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpunkt existiert nicht (mehr)
    #[error("Endpunkt nicht gefunden: {0}")]
    NichtGefunden(EndpointId),

    /// Endpunkt ist bereits in einem Anruf
    #[error("Endpunkt ist belegt: {0}")]
    Belegt(EndpointId),

    /// Nachricht passt nicht zum Anrufzustand
    #[error("Ungueltiger Anrufzustand: {0}")]
    UngueltigerZustand(String),

    /// ID ist bereits registriert
    #[error("Endpunkt bereits registriert: {0}")]
    BereitsRegistriert(EndpointId),

    /// Protokollverletzung eines Clients (wird verworfen, nicht gemeldet)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Erstellt einen Zustandsfehler
    pub fn zustand(msg: impl Into<String>) -> Self {
        Self::UngueltigerZustand(msg.into())
    }

    /// Wire-Code fuer Fehler, die per `call-error` an den Ausloeser gehen
    ///
    /// `None` bedeutet: nur loggen, dem Client nichts melden.
    pub fn fehlercode(&self) -> Option<CallErrorCode> {
        match self {
            Self::NichtGefunden(_) => Some(CallErrorCode::NotFound),
            Self::Belegt(_) => Some(CallErrorCode::Busy),
            Self::UngueltigerZustand(_) => Some(CallErrorCode::InvalidState),
            _ => None,
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
