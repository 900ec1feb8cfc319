//! Endpunkt-Registry – Wer ist verbunden, wie heisst er, in welchem Anruf
//!
//! Die Registry ist der einzige Besitzer des ephemeren Endpunkt-Zustands.
//! Andere Komponenten halten nur IDs und schlagen bei Bedarf nach. Sie ist
//! selbst nicht thread-safe; der `SignalingState` schuetzt sie mit einem
//! Mutex, sodass jede Nachricht als ein atomarer Schritt verarbeitet wird.

use rufnetz_core::types::{CallState, EndpointId};
use rufnetz_protocol::RosterEintrag;
use std::collections::HashMap;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Zustand eines verbundenen Clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub id: EndpointId,
    /// `None` bis der Join-Handshake abgeschlossen ist
    pub display_name: Option<String>,
    pub call_state: CallState,
    /// Gegenstelle im aktuellen Anruf, nur gesetzt wenn `call_state != Idle`
    pub peer_id: Option<EndpointId>,
    /// Verbindungsreihenfolge, bestimmt die Roster-Sortierung
    reihenfolge: u64,
}

impl Endpoint {
    /// Gibt true zurueck wenn der Join-Handshake abgeschlossen ist
    pub fn ist_benannt(&self) -> bool {
        self.display_name.is_some()
    }

    /// Setzt den Endpunkt auf Idle zurueck
    pub(crate) fn zuruecksetzen(&mut self) {
        self.call_state = CallState::Idle;
        self.peer_id = None;
    }
}

// ---------------------------------------------------------------------------
// EndpointRegistry
// ---------------------------------------------------------------------------

/// Zuordnung Verbindungs-ID -> Endpunkt
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpunkte: HashMap<EndpointId, Endpoint>,
    naechste_reihenfolge: u64,
}

impl EndpointRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen neuen, unbenannten Endpunkt im Zustand Idle an
    pub fn registrieren(&mut self, id: EndpointId) -> SignalingResult<Endpoint> {
        if self.endpunkte.contains_key(&id) {
            return Err(SignalingError::BereitsRegistriert(id));
        }

        let endpunkt = Endpoint {
            id,
            display_name: None,
            call_state: CallState::Idle,
            peer_id: None,
            reihenfolge: self.naechste_reihenfolge,
        };
        self.naechste_reihenfolge += 1;
        self.endpunkte.insert(id, endpunkt.clone());
        Ok(endpunkt)
    }

    /// Setzt den Anzeigenamen; ein zweiter Aufruf ueberschreibt
    pub fn name_setzen(&mut self, id: &EndpointId, name: impl Into<String>) -> SignalingResult<()> {
        let endpunkt = self
            .endpunkte
            .get_mut(id)
            .ok_or(SignalingError::NichtGefunden(*id))?;
        endpunkt.display_name = Some(name.into());
        Ok(())
    }

    /// Schlaegt einen Endpunkt nach; Abwesenheit ist kein Fehler
    pub fn abrufen(&self, id: &EndpointId) -> Option<&Endpoint> {
        self.endpunkte.get(id)
    }

    pub(crate) fn abrufen_mut(&mut self, id: &EndpointId) -> Option<&mut Endpoint> {
        self.endpunkte.get_mut(id)
    }

    /// Entfernt einen Endpunkt und gibt ihn zurueck
    pub fn entfernen(&mut self, id: &EndpointId) -> Option<Endpoint> {
        self.endpunkte.remove(id)
    }

    /// Roster-Sicht: alle benannten Endpunkte in Verbindungsreihenfolge
    ///
    /// Der Aufrufer erhaelt eine Kopie; spaetere Aenderungen sind darin
    /// nicht sichtbar.
    pub fn snapshot(&self) -> Vec<RosterEintrag> {
        let mut benannte: Vec<&Endpoint> = self
            .endpunkte
            .values()
            .filter(|e| e.ist_benannt())
            .collect();
        benannte.sort_by_key(|e| e.reihenfolge);

        benannte
            .into_iter()
            .filter_map(|e| {
                e.display_name.as_ref().map(|name| RosterEintrag {
                    id: e.id,
                    display_name: name.clone(),
                    call_state: e.call_state,
                })
            })
            .collect()
    }

    /// Anzahl aller verbundenen Endpunkte (auch unbenannte)
    pub fn anzahl(&self) -> usize {
        self.endpunkte.len()
    }

    /// Anzahl der beigetretenen Endpunkte
    pub fn benannte_anzahl(&self) -> usize {
        self.endpunkte.values().filter(|e| e.ist_benannt()).count()
    }

    /// Anzahl laufender Anrufe (ein Anruf = zwei gepaarte Endpunkte)
    pub fn aktive_anrufe(&self) -> usize {
        self.endpunkte
            .values()
            .filter(|e| match (e.call_state, e.peer_id) {
                (CallState::RingingOut, _) => true,
                // Jedes Paar nur einmal zaehlen
                (CallState::InCall, Some(p)) => e.id < p,
                _ => false,
            })
            .count()
    }

    /// Prueft die Anrufzustands-Invarianten
    ///
    /// - `Idle` genau dann wenn kein Peer gesetzt ist
    /// - Peers existieren und verweisen gegenseitig aufeinander
    /// - Zustaende passen zusammen (RingingOut <-> RingingIn, InCall <-> InCall)
    pub fn invarianten_pruefen(&self) -> SignalingResult<()> {
        for e in self.endpunkte.values() {
            match (e.call_state, e.peer_id) {
                (CallState::Idle, None) => {}
                (CallState::Idle, Some(p)) => {
                    return Err(SignalingError::intern(format!(
                        "{} ist Idle, verweist aber auf {}",
                        e.id, p
                    )));
                }
                (zustand, None) => {
                    return Err(SignalingError::intern(format!(
                        "{} ist {} ohne Peer",
                        e.id, zustand
                    )));
                }
                (zustand, Some(p)) => {
                    let peer = self.endpunkte.get(&p).ok_or_else(|| {
                        SignalingError::intern(format!("{} verweist auf fehlenden {}", e.id, p))
                    })?;
                    if peer.peer_id != Some(e.id) {
                        return Err(SignalingError::intern(format!(
                            "Peer-Verweis von {} auf {} ist nicht symmetrisch",
                            e.id, p
                        )));
                    }
                    let passend = matches!(
                        (zustand, peer.call_state),
                        (CallState::RingingOut, CallState::RingingIn)
                            | (CallState::RingingIn, CallState::RingingOut)
                            | (CallState::InCall, CallState::InCall)
                    );
                    if !passend {
                        return Err(SignalingError::intern(format!(
                            "Zustaende passen nicht: {} ist {}, {} ist {}",
                            e.id, zustand, p, peer.call_state
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_legt_idle_unbenannt_an() {
        let mut reg = EndpointRegistry::neu();
        let id = EndpointId::new();

        let e = reg.registrieren(id).unwrap();
        assert_eq!(e.call_state, CallState::Idle);
        assert!(e.display_name.is_none());
        assert!(e.peer_id.is_none());
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn doppelte_registrierung_schlaegt_fehl() {
        let mut reg = EndpointRegistry::neu();
        let id = EndpointId::new();
        reg.registrieren(id).unwrap();

        let fehler = reg.registrieren(id).unwrap_err();
        assert!(matches!(fehler, SignalingError::BereitsRegistriert(x) if x == id));
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn name_setzen_unbekannt_ist_not_found() {
        let mut reg = EndpointRegistry::neu();
        let fehler = reg.name_setzen(&EndpointId::new(), "alice").unwrap_err();
        assert!(matches!(fehler, SignalingError::NichtGefunden(_)));
    }

    #[test]
    fn name_setzen_ueberschreibt() {
        let mut reg = EndpointRegistry::neu();
        let id = EndpointId::new();
        reg.registrieren(id).unwrap();

        reg.name_setzen(&id, "alice").unwrap();
        reg.name_setzen(&id, "alicia").unwrap();
        assert_eq!(
            reg.abrufen(&id).unwrap().display_name.as_deref(),
            Some("alicia")
        );
    }

    #[test]
    fn entfernen_gibt_eintrag_zurueck() {
        let mut reg = EndpointRegistry::neu();
        let id = EndpointId::new();
        reg.registrieren(id).unwrap();

        assert_eq!(reg.entfernen(&id).map(|e| e.id), Some(id));
        assert!(reg.entfernen(&id).is_none());
        assert!(reg.abrufen(&id).is_none());
    }

    #[test]
    fn snapshot_ohne_unbenannte_in_verbindungsreihenfolge() {
        let mut reg = EndpointRegistry::neu();
        let ids: Vec<EndpointId> = (0..4).map(|_| EndpointId::new()).collect();
        for id in &ids {
            reg.registrieren(*id).unwrap();
        }
        // Beitritt in umgekehrter Reihenfolge, ids[1] tritt nie bei
        reg.name_setzen(&ids[3], "dora").unwrap();
        reg.name_setzen(&ids[2], "carl").unwrap();
        reg.name_setzen(&ids[0], "anna").unwrap();

        let namen: Vec<String> = reg.snapshot().into_iter().map(|r| r.display_name).collect();
        assert_eq!(namen, vec!["anna", "carl", "dora"]);
        assert_eq!(reg.benannte_anzahl(), 3);
    }

    #[test]
    fn snapshot_ist_eine_kopie() {
        let mut reg = EndpointRegistry::neu();
        let id = EndpointId::new();
        reg.registrieren(id).unwrap();
        reg.name_setzen(&id, "alice").unwrap();

        let vorher = reg.snapshot();
        reg.entfernen(&id);
        assert_eq!(vorher.len(), 1);
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn invarianten_erkennen_einseitigen_verweis() {
        let mut reg = EndpointRegistry::neu();
        let a = EndpointId::new();
        let b = EndpointId::new();
        reg.registrieren(a).unwrap();
        reg.registrieren(b).unwrap();
        assert!(reg.invarianten_pruefen().is_ok());

        if let Some(e) = reg.abrufen_mut(&a) {
            e.call_state = CallState::RingingOut;
            e.peer_id = Some(b);
        }
        assert!(reg.invarianten_pruefen().is_err());
    }
}
