//! Relay-Router – Routet Client-Nachrichten an Zustandsautomat und Empfaenger
//!
//! Der Router empfaengt `ClientNachricht`en einer Verbindung, prueft sie
//! gegen Registry und Anrufzustand und leitet sie an den richtigen
//! Empfaenger weiter. SDP- und ICE-Payloads werden nie interpretiert.
//!
//! ## Routing
//! - `join`                 -> LifecycleManager
//! - `call-offer`           -> initiieren, dann `call-incoming` an das Ziel
//! - `call-answer`          -> beantworten, dann `call-answered` / `call-rejected`
//! - `call-terminate`       -> beenden, dann `call-ended` an die Gegenstelle
//! - `ice-candidate`        -> direkt an das Ziel (verworfen wenn weg)
//! - `chat-message`/`typing`/`stop-typing` -> an alle ausser den Absender
//!
//! Jeder erfolgreiche Anrufzustands-Wechsel verteilt den Roster neu.
//! Eine Annahme braucht einen SDP-Payload, eine Ablehnung nicht.
//! `rufnetz_relayed_messages_total` zaehlt nur Nachrichten, die
//! tatsaechlich an mindestens einen Empfaenger gingen.
//! Anruf-Fehler gehen als `call-error` nur an den Absender; Protokoll-
//! verletzungen (unbenannter Absender, leerer Text) werden verworfen.
//! Die Absender-ID stammt immer aus der Verbindung, nie aus der Nachricht.

use rufnetz_core::types::EndpointId;
use rufnetz_protocol::control::{
    CallAnswerRequest, CallAnswered, CallIncoming, CallOfferRequest, CallPeerNotice,
    ChatReceived, IceCandidateReceived, IceCandidateRequest, TypingNotice,
};
use rufnetz_protocol::{ClientNachricht, ServerNachricht};
use std::sync::Arc;

use crate::call_state;
use crate::error::{SignalingError, SignalingResult};
use crate::lifecycle::LifecycleManager;
use crate::registry::EndpointRegistry;
use crate::server_state::SignalingState;

/// Zentraler Relay-Router
#[derive(Clone)]
pub struct RelayRouter {
    state: Arc<SignalingState>,
    lifecycle: LifecycleManager,
}

impl RelayRouter {
    /// Erstellt einen neuen Router
    pub fn neu(state: Arc<SignalingState>) -> Self {
        let lifecycle = LifecycleManager::neu(Arc::clone(&state));
        Self { state, lifecycle }
    }

    /// Zugriff auf den Lebenszyklus-Manager (fuer Verbinden/Trennen)
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Verarbeitet eine eingehende Nachricht eines Endpunkts
    ///
    /// Schlaegt nie fehl: Fehler werden dem Absender gemeldet oder geloggt.
    pub fn verarbeiten(&self, absender: EndpointId, nachricht: ClientNachricht) {
        let art = nachricht.art();
        let ziel = match &nachricht {
            ClientNachricht::CallOffer(o) => Some(o.target_id),
            ClientNachricht::CallAnswer(a) => Some(a.target_id),
            ClientNachricht::IceCandidate(c) => Some(c.target_id),
            _ => None,
        };

        let ergebnis = match nachricht {
            ClientNachricht::Join(req) => self
                .lifecycle
                .beitreten(absender, &req.display_name)
                .map(|()| false),
            ClientNachricht::ChatMessage(req) => self.chat(absender, req.text),
            ClientNachricht::Typing => self.tippen(absender, true),
            ClientNachricht::StopTyping => self.tippen(absender, false),
            ClientNachricht::CallOffer(req) => self.angebot(absender, req),
            ClientNachricht::CallAnswer(req) => self.antwort(absender, req),
            ClientNachricht::IceCandidate(req) => self.kandidat(absender, req),
            ClientNachricht::CallTerminate => self.beenden(absender),
        };

        match ergebnis {
            Ok(true) => self.state.metrics.weitergeleitet(art),
            Ok(false) => {}
            Err(fehler) => self.fehler_melden(absender, ziel, art, fehler),
        }
    }

    // -----------------------------------------------------------------------
    // Anruf-Nachrichten
    // -----------------------------------------------------------------------

    fn angebot(&self, absender: EndpointId, req: CallOfferRequest) -> SignalingResult<bool> {
        let mut registry = self.state.registry();

        let anrufer_name = benannt(&registry, &absender)
            .ok_or_else(|| SignalingError::zustand("Anruf vor dem Beitritt"))?;
        // Unbenannte Ziele sind im Roster unsichtbar
        if benannt(&registry, &req.target_id).is_none() {
            return Err(SignalingError::NichtGefunden(req.target_id));
        }

        call_state::initiieren(&mut registry, absender, req.target_id)?;

        self.state.broadcaster.an_endpunkt_senden(
            &req.target_id,
            ServerNachricht::CallIncoming(CallIncoming {
                caller_id: absender,
                caller_name: anrufer_name,
                sdp_payload: req.sdp_payload,
            }),
        );
        self.state.roster_verteilen(&registry);

        tracing::debug!(von = %absender, an = %req.target_id, "Angebot weitergeleitet");
        Ok(true)
    }

    fn antwort(&self, absender: EndpointId, req: CallAnswerRequest) -> SignalingResult<bool> {
        let mut registry = self.state.registry();

        if registry.abrufen(&req.target_id).is_none() {
            return Err(SignalingError::NichtGefunden(req.target_id));
        }
        let eigener_peer = registry
            .abrufen(&absender)
            .ok_or(SignalingError::NichtGefunden(absender))?
            .peer_id;
        if eigener_peer != Some(req.target_id) {
            return Err(SignalingError::zustand("Kein eingehender Anruf von diesem Ziel"));
        }

        if req.accept && req.sdp_payload.is_none() {
            return Err(SignalingError::zustand("Annahme ohne SDP-Antwort"));
        }

        let anrufer = call_state::beantworten(&mut registry, absender, req.accept)?;

        let weiterleitung = if req.accept {
            ServerNachricht::CallAnswered(CallAnswered {
                responder_id: absender,
                sdp_payload: req.sdp_payload,
            })
        } else {
            ServerNachricht::CallRejected(CallPeerNotice { peer_id: absender })
        };
        self.state.broadcaster.an_endpunkt_senden(&anrufer, weiterleitung);
        self.state.roster_verteilen(&registry);

        tracing::debug!(
            von = %absender,
            an = %anrufer,
            angenommen = req.accept,
            "Antwort weitergeleitet"
        );
        Ok(true)
    }

    fn beenden(&self, absender: EndpointId) -> SignalingResult<bool> {
        let mut registry = self.state.registry();

        let Some(peer) = call_state::beenden(&mut registry, absender)? else {
            return Ok(false);
        };
        self.state
            .broadcaster
            .an_endpunkt_senden(&peer, ServerNachricht::call_ended(absender));
        self.state.roster_verteilen(&registry);
        tracing::debug!(endpoint = %absender, peer = %peer, "Anruf beendet");
        Ok(true)
    }

    fn kandidat(&self, absender: EndpointId, req: IceCandidateRequest) -> SignalingResult<bool> {
        // Lock haelt die Reihenfolge relativ zu Zustandswechseln ein
        let registry = self.state.registry();

        if registry.abrufen(&req.target_id).is_none() {
            // ICE toleriert Verluste
            tracing::trace!(von = %absender, an = %req.target_id, "ICE-Kandidat verworfen: Ziel getrennt");
            return Ok(false);
        }

        Ok(self.state.broadcaster.an_endpunkt_senden(
            &req.target_id,
            ServerNachricht::IceCandidateReceived(IceCandidateReceived {
                from: absender,
                candidate_payload: req.candidate_payload,
            }),
        ))
    }

    // -----------------------------------------------------------------------
    // Chat / Presence
    // -----------------------------------------------------------------------

    fn chat(&self, absender: EndpointId, text: String) -> SignalingResult<bool> {
        let registry = self.state.registry();

        let name = benannt(&registry, &absender)
            .ok_or_else(|| SignalingError::protokoll("Chat vor dem Beitritt"))?;
        if text.trim().is_empty() {
            return Err(SignalingError::protokoll("Leere Chat-Nachricht"));
        }
        if text.chars().count() > self.state.config.max_chat_laenge {
            return Err(SignalingError::protokoll("Chat-Nachricht zu lang"));
        }

        let empfaenger = self.state.broadcaster.an_alle_ausser_senden(
            &absender,
            ServerNachricht::ChatReceived(ChatReceived {
                sender_id: absender,
                sender_name: name,
                text,
                sent_at: chrono::Utc::now().to_rfc3339(),
            }),
        );
        tracing::debug!(von = %absender, empfaenger, "Chat-Nachricht verteilt");
        Ok(empfaenger > 0)
    }

    fn tippen(&self, absender: EndpointId, tippt: bool) -> SignalingResult<bool> {
        let registry = self.state.registry();

        let name = benannt(&registry, &absender)
            .ok_or_else(|| SignalingError::protokoll("Tipp-Hinweis vor dem Beitritt"))?;
        let hinweis = TypingNotice {
            sender_id: absender,
            sender_name: name,
        };
        let nachricht = if tippt {
            ServerNachricht::TypingNotice(hinweis)
        } else {
            ServerNachricht::StopTypingNotice(hinweis)
        };
        let empfaenger = self.state.broadcaster.an_alle_ausser_senden(&absender, nachricht);
        Ok(empfaenger > 0)
    }

    // -----------------------------------------------------------------------
    // Fehlerbehandlung
    // -----------------------------------------------------------------------

    fn fehler_melden(
        &self,
        absender: EndpointId,
        ziel: Option<EndpointId>,
        art: &str,
        fehler: SignalingError,
    ) {
        match fehler.fehlercode() {
            Some(code) => {
                tracing::debug!(
                    endpoint = %absender,
                    art,
                    grund = code.als_str(),
                    fehler = %fehler,
                    "Anruf-Fehler an Absender gemeldet"
                );
                self.state.metrics.anruf_fehler(code.als_str());
                self.state.broadcaster.an_endpunkt_senden(
                    &absender,
                    ServerNachricht::call_error(code, ziel, fehler.to_string()),
                );
            }
            None => {
                tracing::warn!(
                    endpoint = %absender,
                    art,
                    fehler = %fehler,
                    "Nachricht verworfen"
                );
            }
        }
    }
}

/// Anzeigename eines beigetretenen Endpunkts
fn benannt(registry: &EndpointRegistry, id: &EndpointId) -> Option<String> {
    registry.abrufen(id)?.display_name.clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
