//! Event-Broadcaster – Sendet Server-Nachrichten an verbundene Endpunkte
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen
//! Endpunkte. Jede `ClientConnection` liest aus ihrer Queue und schreibt in
//! den WebSocket.
//!
//! ## Selektives Broadcasting
//! - An einen Endpunkt: `an_endpunkt_senden`
//! - An alle: `an_alle_senden`
//! - An alle ausser einem: `an_alle_ausser_senden`
//!
//! Senden blockiert nie. Ist eine Queue voll, wird die Nachricht fuer
//! diesen Empfaenger verworfen.

use dashmap::DashMap;
use rufnetz_core::types::EndpointId;
use rufnetz_protocol::ServerNachricht;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standardgroesse der Send-Queue pro Endpunkt
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Endpunkts
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub endpoint_id: EndpointId,
    pub tx: mpsc::Sender<ServerNachricht>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Endpunkt
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerNachricht) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(endpoint = %self.endpoint_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(endpoint = %self.endpoint_id, "Send-Queue geschlossen (Endpunkt getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle verbundenen Endpunkte
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    clients: DashMap<EndpointId, ClientSender>,
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster mit gegebener Queue-Groesse
    pub fn neu(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                clients: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert einen Endpunkt und gibt seine Empfangs-Queue zurueck
    pub fn client_registrieren(&self, endpoint_id: EndpointId) -> mpsc::Receiver<ServerNachricht> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        let sender = ClientSender { endpoint_id, tx };
        self.inner.clients.insert(endpoint_id, sender);
        tracing::debug!(endpoint = %endpoint_id, "Endpunkt im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Endpunkt aus dem Broadcaster
    pub fn client_entfernen(&self, endpoint_id: &EndpointId) {
        self.inner.clients.remove(endpoint_id);
        tracing::debug!(endpoint = %endpoint_id, "Endpunkt aus Broadcaster entfernt");
    }

    /// Sendet eine Nachricht an einen einzelnen Endpunkt
    ///
    /// Gibt `true` zurueck wenn der Endpunkt gefunden und die Nachricht eingereiht wurde.
    pub fn an_endpunkt_senden(&self, endpoint_id: &EndpointId, nachricht: ServerNachricht) -> bool {
        match self.inner.clients.get(endpoint_id) {
            Some(sender) => sender.senden(nachricht),
            None => {
                tracing::debug!(endpoint = %endpoint_id, "Senden an unbekannten Endpunkt");
                false
            }
        }
    }

    /// Sendet eine Nachricht an alle verbundenen Endpunkte
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, nachricht: ServerNachricht) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|entry| {
            if entry.value().senden(nachricht.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Sendet eine Nachricht an alle verbundenen Endpunkte ausser einem
    pub fn an_alle_ausser_senden(
        &self,
        ausgeschlossen: &EndpointId,
        nachricht: ServerNachricht,
    ) -> usize {
        let mut gesendet = 0;
        self.inner.clients.iter().for_each(|entry| {
            if entry.key() == ausgeschlossen {
                return;
            }
            if entry.value().senden(nachricht.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Prueft ob ein Endpunkt registriert ist
    pub fn ist_registriert(&self, endpoint_id: &EndpointId) -> bool {
        self.inner.clients.contains_key(endpoint_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu(SEND_QUEUE_GROESSE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_nachricht() -> ServerNachricht {
        ServerNachricht::call_ended(EndpointId::new())
    }

    #[tokio::test]
    async fn client_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::default();
        let id = EndpointId::new();

        let mut rx = broadcaster.client_registrieren(id);
        assert!(broadcaster.ist_registriert(&id));

        let nachricht = test_nachricht();
        assert!(broadcaster.an_endpunkt_senden(&id, nachricht.clone()));

        let empfangen = rx.try_recv().expect("Nachricht muss vorhanden sein");
        assert_eq!(empfangen, nachricht);
    }

    #[tokio::test]
    async fn an_alle_ausser_senden() {
        let broadcaster = EventBroadcaster::default();
        let id1 = EndpointId::new();
        let id2 = EndpointId::new();
        let id3 = EndpointId::new();

        let mut rx1 = broadcaster.client_registrieren(id1);
        let mut rx2 = broadcaster.client_registrieren(id2);
        let mut rx3 = broadcaster.client_registrieren(id3);

        // id1 ist der Ausloeser und bekommt keine Nachricht
        assert_eq!(broadcaster.an_alle_ausser_senden(&id1, test_nachricht()), 2);

        assert!(rx1.try_recv().is_err(), "Ausloeser darf nichts empfangen");
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
    }

    #[tokio::test]
    async fn an_alle_senden() {
        let broadcaster = EventBroadcaster::default();

        let ids: Vec<EndpointId> = (0..5).map(|_| EndpointId::new()).collect();
        let mut receivers: Vec<_> = ids
            .iter()
            .map(|id| broadcaster.client_registrieren(*id))
            .collect();

        assert_eq!(broadcaster.an_alle_senden(test_nachricht()), 5);
        for rx in &mut receivers {
            assert!(rx.try_recv().is_ok());
        }
    }

    #[test]
    fn volle_queue_verwirft_statt_zu_blockieren() {
        let broadcaster = EventBroadcaster::neu(2);
        let id = EndpointId::new();
        let _rx = broadcaster.client_registrieren(id);

        assert!(broadcaster.an_endpunkt_senden(&id, test_nachricht()));
        assert!(broadcaster.an_endpunkt_senden(&id, test_nachricht()));
        assert!(!broadcaster.an_endpunkt_senden(&id, test_nachricht()));
    }

    #[test]
    fn geschlossene_queue_und_unbekannter_endpunkt() {
        let broadcaster = EventBroadcaster::default();
        let id = EndpointId::new();
        drop(broadcaster.client_registrieren(id));

        assert!(!broadcaster.an_endpunkt_senden(&id, test_nachricht()));
        assert!(!broadcaster.an_endpunkt_senden(&EndpointId::new(), test_nachricht()));
    }

    #[test]
    fn client_entfernen() {
        let broadcaster = EventBroadcaster::default();
        let id = EndpointId::new();
        let _rx = broadcaster.client_registrieren(id);
        assert!(broadcaster.ist_registriert(&id));

        broadcaster.client_entfernen(&id);
        assert!(!broadcaster.ist_registriert(&id));
        assert!(!broadcaster.an_endpunkt_senden(&id, test_nachricht()));
    }
}
