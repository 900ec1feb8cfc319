//! Verbindungs-Lebenszyklus – Verbinden, Beitreten, Trennen
//!
//! ```text
//! verbunden ──> (unbenannt, Idle) ──beitreten──> benannt ──getrennt──> entfernt
//!     |                                                        ^
//!     +--------------------- getrennt -------------------------+
//! ```
//!
//! Unbenannte Endpunkte erscheinen nicht im Roster und loesen keine
//! Presence-Nachrichten aus. Beim Trennen wird ein laufender Anruf immer
//! beendet und die Gegenstelle mit `call-ended` benachrichtigt.

use rufnetz_core::types::EndpointId;
use rufnetz_protocol::control::{IdAssigned, PeerNotice};
use rufnetz_protocol::ServerNachricht;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::call_state;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Verwaltet Beitritt und Trennung von Endpunkten
#[derive(Clone)]
pub struct LifecycleManager {
    state: Arc<SignalingState>,
}

impl LifecycleManager {
    /// Erstellt einen neuen LifecycleManager
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Registriert eine neue Verbindung
    ///
    /// Vergibt die ID, legt den Endpunkt unbenannt an und teilt dem Client
    /// seine ID mit. Gibt die Empfangs-Queue fuer die Verbindung zurueck.
    pub fn verbunden(&self) -> SignalingResult<(EndpointId, mpsc::Receiver<ServerNachricht>)> {
        let mut registry = self.state.registry();

        if registry.anzahl() >= self.state.config.max_clients as usize {
            return Err(SignalingError::ServerVoll);
        }

        let id = EndpointId::new();
        registry.registrieren(id)?;
        let rx = self.state.broadcaster.client_registrieren(id);
        self.state
            .broadcaster
            .an_endpunkt_senden(&id, ServerNachricht::IdAssigned(IdAssigned { id }));

        self.state
            .metrics
            .connected_endpoints
            .set(registry.anzahl() as i64);
        tracing::info!(endpoint = %id, "Endpunkt verbunden");
        Ok((id, rx))
    }

    /// Join-Handshake: setzt den Anzeigenamen und kuendigt den Endpunkt an
    pub fn beitreten(&self, id: EndpointId, name: &str) -> SignalingResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SignalingError::protokoll("Leerer Anzeigename"));
        }
        if name.chars().count() > self.state.config.max_name_laenge {
            return Err(SignalingError::protokoll(format!(
                "Anzeigename laenger als {} Zeichen",
                self.state.config.max_name_laenge
            )));
        }

        let mut registry = self.state.registry();
        let endpunkt = registry
            .abrufen(&id)
            .ok_or(SignalingError::NichtGefunden(id))?;
        if endpunkt.ist_benannt() {
            return Err(SignalingError::protokoll("Bereits beigetreten"));
        }

        registry.name_setzen(&id, name)?;

        self.state.broadcaster.an_alle_ausser_senden(
            &id,
            ServerNachricht::PeerJoined(PeerNotice {
                id,
                display_name: name.to_string(),
            }),
        );
        self.state.roster_verteilen(&registry);

        tracing::info!(endpoint = %id, name = %name, "Endpunkt beigetreten");
        Ok(())
    }

    /// Raeumt einen getrennten Endpunkt auf
    ///
    /// Idempotent: ein bereits entfernter Endpunkt wird ignoriert.
    pub fn getrennt(&self, id: EndpointId) {
        let mut registry = self.state.registry();

        let name = match registry.abrufen(&id) {
            Some(e) => e.display_name.clone(),
            None => return,
        };

        if let Some(ref name) = name {
            self.state.broadcaster.an_alle_ausser_senden(
                &id,
                ServerNachricht::PeerLeft(PeerNotice {
                    id,
                    display_name: name.clone(),
                }),
            );
        }

        if let Some(peer) = call_state::bei_trennung_zuruecksetzen(&mut registry, id) {
            self.state
                .broadcaster
                .an_endpunkt_senden(&peer, ServerNachricht::call_ended(id));
            tracing::debug!(endpoint = %id, peer = %peer, "Anruf durch Trennung beendet");
        }

        registry.entfernen(&id);
        self.state.broadcaster.client_entfernen(&id);
        self.state.roster_verteilen(&registry);

        self.state
            .metrics
            .connected_endpoints
            .set(registry.anzahl() as i64);
        tracing::info!(endpoint = %id, name = ?name, "Endpunkt getrennt");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
