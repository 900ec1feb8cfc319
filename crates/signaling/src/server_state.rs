//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Broadcaster und Metriken. Wird als `Arc` zwischen den
//! Verbindungs-Tasks geteilt.
//!
//! ## Concurrency-Modell
//! Die Registry liegt hinter einem einzigen Mutex. Jede eingehende Nachricht
//! wird unter diesem Lock als ein atomarer Schritt verarbeitet, inklusive
//! dem Einreihen der ausgehenden Nachrichten. Dadurch sehen alle Empfaenger
//! die Schritte in derselben Reihenfolge. Unter dem Lock wird nie
//! `await`et; Senden ist `try_send`.

use parking_lot::{Mutex, MutexGuard};
use rufnetz_observability::RufnetzMetrics;
use rufnetz_protocol::ServerNachricht;
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::{EventBroadcaster, SEND_QUEUE_GROESSE};
use crate::registry::EndpointRegistry;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden (WebSocket-Ping)
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Groesse der Send-Queue pro Endpunkt
    pub send_queue_groesse: usize,
    /// Maximale Laenge eines Anzeigenamens (Zeichen)
    pub max_name_laenge: usize,
    /// Maximale Laenge einer Chat-Nachricht (Zeichen)
    pub max_chat_laenge: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_name_laenge: 64,
            max_chat_laenge: 4096,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Endpunkt-Registry inkl. Anrufzustand
    registry: Mutex<EndpointRegistry>,
    /// Event-Broadcaster (Nachrichten an Endpunkte senden)
    pub broadcaster: EventBroadcaster,
    /// Prometheus-Metriken
    pub metrics: RufnetzMetrics,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metrics: RufnetzMetrics) -> Arc<Self> {
        let broadcaster = EventBroadcaster::neu(config.send_queue_groesse);
        Arc::new(Self {
            config: Arc::new(config),
            registry: Mutex::new(EndpointRegistry::neu()),
            broadcaster,
            metrics,
            start_time: Instant::now(),
        })
    }

    /// Sperrt die Registry fuer einen atomaren Verarbeitungsschritt
    pub fn registry(&self) -> MutexGuard<'_, EndpointRegistry> {
        self.registry.lock()
    }

    /// Anzahl verbundener Endpunkte
    pub fn verbundene_anzahl(&self) -> usize {
        self.registry.lock().anzahl()
    }

    /// Verteilt den aktuellen Roster an alle Endpunkte
    ///
    /// Muss mit gehaltenem Registry-Lock aufgerufen werden, damit der
    /// Snapshot zum gerade abgeschlossenen Schritt passt.
    pub(crate) fn roster_verteilen(&self, registry: &EndpointRegistry) {
        debug_assert!(
            registry.invarianten_pruefen().is_ok(),
            "Anrufzustands-Invariante verletzt"
        );

        self.metrics.named_endpoints.set(registry.benannte_anzahl() as i64);
        self.metrics.active_calls.set(registry.aktive_anrufe() as i64);

        let empfaenger = self
            .broadcaster
            .an_alle_senden(ServerNachricht::roster(registry.snapshot()));
        tracing::trace!(empfaenger, "Roster verteilt");
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
