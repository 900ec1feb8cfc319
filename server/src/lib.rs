//! rufnetz-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use rufnetz_observability::{observability_server_starten, RufnetzMetrics};
use rufnetz_signaling::{SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Signaling-Zustand anlegen
    /// 2. Observability-Server starten (falls aktiviert)
    /// 3. WebSocket-Listener binden
    /// 4. Auf Ctrl-C warten, dann alle Verbindungen schliessen
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            ws = %self.config.ws_bind_adresse(),
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let metriken = RufnetzMetrics::neu().context("Metriken konnten nicht registriert werden")?;
        let state = SignalingState::neu(self.config.signaling_config(), metriken.clone());

        let observability = if self.config.observability.aktiviert {
            let addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(addr, metriken).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        let listener = TcpListener::bind(self.config.ws_bind_adresse())
            .await
            .with_context(|| format!("Bind auf {} fehlgeschlagen", self.config.ws_bind_adresse()))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
            }
            let _ = shutdown_tx.send(true);
        });

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        SignalingServer::neu(Arc::clone(&state))
            .starten(listener, shutdown_rx)
            .await?;

        if let Some(handle) = observability {
            handle.abort();
        }
        Ok(())
    }
}
