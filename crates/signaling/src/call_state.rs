//! Anrufzustands-Automat
//!
//! Erzwingt die erlaubten Uebergaenge pro Endpunkt und verhindert, dass ein
//! Angerufener doppelt belegt wird.
//!
//! ## Zustaende
//! ```text
//!            initiieren             annehmen
//! Idle ──────────────> RingingOut ──────────> InCall
//!   \                  RingingIn               |
//!    \                     | ablehnen / beenden | beenden / Trennung
//!     <────────────────────+<──────────────────+
//! ```
//!
//! Alle Funktionen arbeiten auf einer `&mut EndpointRegistry`, die der
//! Aufrufer unter dem Registry-Mutex haelt. Schlaegt eine Pruefung fehl,
//! wird nichts veraendert. Wer zuerst committet, gewinnt: ein zweites
//! `initiieren` auf denselben Endpunkt sieht den belegten Zustand und
//! scheitert mit `Belegt`.

use rufnetz_core::types::{CallState, EndpointId};

use crate::error::{SignalingError, SignalingResult};
use crate::registry::EndpointRegistry;

/// Startet einen Anruf von `anrufer` an `ziel`
///
/// Beide muessen Idle sein. Danach ist der Anrufer `RingingOut`, das Ziel
/// `RingingIn` und beide verweisen aufeinander.
pub fn initiieren(
    registry: &mut EndpointRegistry,
    anrufer: EndpointId,
    ziel: EndpointId,
) -> SignalingResult<()> {
    if anrufer == ziel {
        return Err(SignalingError::zustand("Anruf an sich selbst"));
    }

    let ziel_zustand = registry
        .abrufen(&ziel)
        .ok_or(SignalingError::NichtGefunden(ziel))?
        .call_state;
    let anrufer_zustand = registry
        .abrufen(&anrufer)
        .ok_or(SignalingError::NichtGefunden(anrufer))?
        .call_state;

    if !anrufer_zustand.ist_frei() {
        return Err(SignalingError::Belegt(anrufer));
    }
    if !ziel_zustand.ist_frei() {
        return Err(SignalingError::Belegt(ziel));
    }

    if let Some(e) = registry.abrufen_mut(&anrufer) {
        e.call_state = CallState::RingingOut;
        e.peer_id = Some(ziel);
    }
    if let Some(e) = registry.abrufen_mut(&ziel) {
        e.call_state = CallState::RingingIn;
        e.peer_id = Some(anrufer);
    }

    tracing::debug!(anrufer = %anrufer, ziel = %ziel, "Anruf initiiert");
    Ok(())
}

/// Beantwortet einen eingehenden Anruf
///
/// Nur aus `RingingIn` erlaubt. Bei Annahme wechseln beide Seiten nach
/// `InCall`, bei Ablehnung zurueck nach `Idle`. Gibt den Anrufer zurueck.
pub fn beantworten(
    registry: &mut EndpointRegistry,
    angerufener: EndpointId,
    annehmen: bool,
) -> SignalingResult<EndpointId> {
    let endpunkt = registry
        .abrufen(&angerufener)
        .ok_or(SignalingError::NichtGefunden(angerufener))?;

    if endpunkt.call_state != CallState::RingingIn {
        return Err(SignalingError::zustand(format!(
            "Antwort im Zustand {} nicht moeglich",
            endpunkt.call_state
        )));
    }
    let anrufer = endpunkt
        .peer_id
        .ok_or_else(|| SignalingError::zustand("Eingehender Anruf ohne Anrufer"))?;
    if registry.abrufen(&anrufer).is_none() {
        return Err(SignalingError::NichtGefunden(anrufer));
    }

    for id in [angerufener, anrufer] {
        if let Some(e) = registry.abrufen_mut(&id) {
            if annehmen {
                e.call_state = CallState::InCall;
            } else {
                e.zuruecksetzen();
            }
        }
    }

    tracing::debug!(
        angerufener = %angerufener,
        anrufer = %anrufer,
        angenommen = annehmen,
        "Anruf beantwortet"
    );
    Ok(anrufer)
}

/// Beendet den aktuellen Anruf eines Endpunkts
///
/// Setzt den Endpunkt und seine Gegenstelle auf Idle. Ist der Endpunkt
/// bereits Idle, passiert nichts (`Ok(None)`). Gibt die ehemalige
/// Gegenstelle zurueck, sofern sie noch existiert.
pub fn beenden(
    registry: &mut EndpointRegistry,
    id: EndpointId,
) -> SignalingResult<Option<EndpointId>> {
    if registry.abrufen(&id).is_none() {
        return Err(SignalingError::NichtGefunden(id));
    }
    Ok(zuruecksetzen_intern(registry, id))
}

/// Erzwingt Idle fuer einen Endpunkt, der gerade getrennt wird
///
/// Gleiche Wirkung wie `beenden`, schlaegt aber nie fehl.
pub fn bei_trennung_zuruecksetzen(
    registry: &mut EndpointRegistry,
    id: EndpointId,
) -> Option<EndpointId> {
    zuruecksetzen_intern(registry, id)
}

fn zuruecksetzen_intern(registry: &mut EndpointRegistry, id: EndpointId) -> Option<EndpointId> {
    let peer = {
        let endpunkt = registry.abrufen_mut(&id)?;
        if endpunkt.call_state.ist_frei() {
            return None;
        }
        let peer = endpunkt.peer_id;
        endpunkt.zuruecksetzen();
        peer?
    };

    // Gegenstelle nur zuruecksetzen wenn sie wirklich auf uns zeigt
    let peer_endpunkt = registry.abrufen_mut(&peer)?;
    if peer_endpunkt.peer_id == Some(id) {
        peer_endpunkt.zuruecksetzen();
    }

    tracing::debug!(endpoint = %id, peer = %peer, "Anruf beendet");
    Some(peer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
