//! Signaling-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die zwischen Client und Server ausgetauscht
//! werden.
//!
//! ## Design
//! - Ein JSON-Objekt pro Text-Frame
//! - Tagged Enums: das Feld `type` unterscheidet die Nachrichtenart (kebab-case)
//! - Feldnamen in camelCase, wie sie der Browser-Client erwartet
//! - SDP- und ICE-Payloads sind opak (`serde_json::Value`) und werden
//!   unveraendert weitergereicht

use rufnetz_core::types::{CallState, EndpointId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Gruende fuer eine `call-error`-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallErrorCode {
    /// Ziel-Endpunkt existiert nicht (mehr)
    NotFound,
    /// Ziel oder Absender ist nicht frei
    Busy,
    /// Nachricht passt nicht zum aktuellen Anrufzustand
    InvalidState,
}

impl CallErrorCode {
    /// Kurzname fuer Logs und Metrik-Labels
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Busy => "BUSY",
            Self::InvalidState => "INVALID_STATE",
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Beitritt mit Anzeigename
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub display_name: String,
}

/// Chat-Nachricht an alle anderen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    pub text: String,
}

/// Anruf-Angebot (SDP-Offer)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOfferRequest {
    pub target_id: EndpointId,
    pub sdp_payload: Value,
}

/// Antwort auf ein Angebot (annehmen oder ablehnen)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnswerRequest {
    pub target_id: EndpointId,
    /// Bei Ablehnung darf der Payload fehlen
    #[serde(default)]
    pub sdp_payload: Option<Value>,
    pub accept: bool,
}

/// ICE-Kandidat fuer die Gegenstelle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateRequest {
    pub target_id: EndpointId,
    pub candidate_payload: Value,
}

/// Alle Nachrichten die ein Client senden darf
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientNachricht {
    Join(JoinRequest),
    ChatMessage(ChatMessageRequest),
    Typing,
    StopTyping,
    CallOffer(CallOfferRequest),
    CallAnswer(CallAnswerRequest),
    IceCandidate(IceCandidateRequest),
    CallTerminate,
}

impl ClientNachricht {
    /// Name der Nachrichtenart (entspricht dem `type`-Feld)
    pub fn art(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::ChatMessage(_) => "chat-message",
            Self::Typing => "typing",
            Self::StopTyping => "stop-typing",
            Self::CallOffer(_) => "call-offer",
            Self::CallAnswer(_) => "call-answer",
            Self::IceCandidate(_) => "ice-candidate",
            Self::CallTerminate => "call-terminate",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Eigene ID direkt nach dem Verbindungsaufbau
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdAssigned {
    pub id: EndpointId,
}

/// Ein Eintrag der Teilnehmerliste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEintrag {
    pub id: EndpointId,
    pub display_name: String,
    pub call_state: CallState,
}

/// Aktuelle Teilnehmerliste (alle benannten Endpunkte)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpdate {
    pub endpoints: Vec<RosterEintrag>,
}

/// Jemand ist beigetreten oder gegangen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerNotice {
    pub id: EndpointId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReceived {
    pub sender_id: EndpointId,
    pub sender_name: String,
    pub text: String,
    /// RFC 3339, vom Server gesetzt
    pub sent_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub sender_id: EndpointId,
    pub sender_name: String,
}

/// Eingehender Anruf mit dem Angebot des Anrufers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIncoming {
    pub caller_id: EndpointId,
    pub caller_name: String,
    pub sdp_payload: Value,
}

/// Der Angerufene hat angenommen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnswered {
    pub responder_id: EndpointId,
    pub sdp_payload: Option<Value>,
}

/// Ablehnung oder Ende eines Anrufs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPeerNotice {
    pub peer_id: EndpointId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateReceived {
    /// Vom Server verifizierte Absender-ID
    pub from: EndpointId,
    pub candidate_payload: Value,
}

/// Fehler einer Anruf-Operation (nur an den Ausloeser)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallError {
    pub reason: CallErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<EndpointId>,
    pub message: String,
}

/// Alle Nachrichten die der Server an Clients sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerNachricht {
    IdAssigned(IdAssigned),
    RosterUpdate(RosterUpdate),
    PeerJoined(PeerNotice),
    PeerLeft(PeerNotice),
    ChatReceived(ChatReceived),
    TypingNotice(TypingNotice),
    StopTypingNotice(TypingNotice),
    CallIncoming(CallIncoming),
    CallAnswered(CallAnswered),
    CallRejected(CallPeerNotice),
    CallEnded(CallPeerNotice),
    IceCandidateReceived(IceCandidateReceived),
    CallError(CallError),
}

impl ServerNachricht {
    /// Erstellt eine Fehlernachricht
    pub fn call_error(
        reason: CallErrorCode,
        target_id: Option<EndpointId>,
        message: impl Into<String>,
    ) -> Self {
        Self::CallError(CallError {
            reason,
            target_id,
            message: message.into(),
        })
    }

    /// Erstellt eine Roster-Nachricht aus einem Snapshot
    pub fn roster(endpoints: Vec<RosterEintrag>) -> Self {
        Self::RosterUpdate(RosterUpdate { endpoints })
    }

    /// Erstellt eine `call-ended`-Nachricht
    pub fn call_ended(peer_id: EndpointId) -> Self {
        Self::CallEnded(CallPeerNotice { peer_id })
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_aus_browser_json() {
        let msg = ClientNachricht::from_json(r#"{"type":"join","displayName":"alice"}"#).unwrap();
        match msg {
            ClientNachricht::Join(j) => assert_eq!(j.display_name, "alice"),
            andere => panic!("Erwartet Join, erhalten {andere:?}"),
        }
    }

    #[test]
    fn einheitsvarianten_ohne_felder() {
        let msg = ClientNachricht::from_json(r#"{"type":"stop-typing"}"#).unwrap();
        assert!(matches!(msg, ClientNachricht::StopTyping));
        let msg = ClientNachricht::from_json(r#"{"type":"call-terminate"}"#).unwrap();
        assert!(matches!(msg, ClientNachricht::CallTerminate));
        assert_eq!(msg.art(), "call-terminate");
    }

    #[test]
    fn call_offer_behaelt_opaken_payload() {
        let ziel = EndpointId::new();
        let json = format!(
            r#"{{"type":"call-offer","targetId":"{}","sdpPayload":{{"type":"offer","sdp":"v=0"}}}}"#,
            ziel.inner()
        );
        let msg = ClientNachricht::from_json(&json).unwrap();
        if let ClientNachricht::CallOffer(o) = msg {
            assert_eq!(o.target_id, ziel);
            assert_eq!(o.sdp_payload, json!({"type": "offer", "sdp": "v=0"}));
        } else {
            panic!("Erwartet CallOffer");
        }
    }

    #[test]
    fn call_answer_ablehnung_ohne_payload() {
        let ziel = EndpointId::new();
        let json = format!(
            r#"{{"type":"call-answer","targetId":"{}","accept":false}}"#,
            ziel.inner()
        );
        let msg = ClientNachricht::from_json(&json).unwrap();
        if let ClientNachricht::CallAnswer(a) = msg {
            assert!(!a.accept);
            assert!(a.sdp_payload.is_none());
        } else {
            panic!("Erwartet CallAnswer");
        }
    }

    #[test]
    fn unbekannter_typ_wird_abgelehnt() {
        assert!(ClientNachricht::from_json(r#"{"type":"kick","targetId":"x"}"#).is_err());
        assert!(ClientNachricht::from_json("kein json").is_err());
    }

    #[test]
    fn roster_update_wire_format() {
        let id = EndpointId::new();
        let msg = ServerNachricht::roster(vec![RosterEintrag {
            id,
            display_name: "bob".into(),
            call_state: CallState::InCall,
        }]);
        let wert: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(wert["type"], "roster-update");
        assert_eq!(wert["endpoints"][0]["displayName"], "bob");
        assert_eq!(wert["endpoints"][0]["callState"], "in-call");
        assert_eq!(wert["endpoints"][0]["id"], id.inner().to_string());
    }

    #[test]
    fn call_error_wire_format() {
        let msg = ServerNachricht::call_error(CallErrorCode::Busy, None, "Ziel ist belegt");
        let wert: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(wert["type"], "call-error");
        assert_eq!(wert["reason"], "BUSY");
        assert!(wert.get("targetId").is_none());
    }

    #[test]
    fn ice_candidate_received_traegt_absender() {
        let von = EndpointId::new();
        let msg = ServerNachricht::IceCandidateReceived(IceCandidateReceived {
            from: von,
            candidate_payload: json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host"}),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"ice-candidate-received\""));
        assert_eq!(ServerNachricht::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn error_code_kurznamen() {
        for code in [CallErrorCode::NotFound, CallErrorCode::Busy, CallErrorCode::InvalidState] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.als_str()));
        }
    }
}
