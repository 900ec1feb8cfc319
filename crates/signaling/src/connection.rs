//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Eingehende Text-Frames werden als `ClientNachricht`
//! geparst und an den `RelayRouter` gegeben; ausgehende Nachrichten kommen
//! aus der Queue des Broadcasters.
//!
//! ## Ablauf
//! ```text
//! Upgrade -> verbunden (id-assigned) -> Nachrichten-Loop -> getrennt
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Jeder empfangene Frame (auch Pong) zaehlt als Lebenszeichen
//! - Ohne Lebenszeichen fuer `verbindungs_timeout_sek` wird getrennt

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use rufnetz_protocol::ClientNachricht;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::error::SignalingError;
use crate::router::RelayRouter;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Keepalive ablaeuft oder ein
    /// Shutdown-Signal eingeht. Danach wird der Endpunkt immer aufgeraeumt.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        let router = RelayRouter::neu(Arc::clone(&self.state));
        let (mut sender, mut empfaenger) = socket.split();

        let (endpoint_id, mut sende_rx) = match router.lifecycle().verbunden() {
            Ok(v) => v,
            Err(SignalingError::ServerVoll) => {
                tracing::warn!(peer = %peer_addr, "Server voll – Verbindung abgelehnt");
                let _ = sender
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::AGAIN,
                        reason: "Server voll".into(),
                    })))
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(peer = %peer_addr, fehler = %e, "Registrierung fehlgeschlagen");
                return;
            }
        };

        tracing::info!(peer = %peer_addr, endpoint = %endpoint_id, "Neue Verbindung");

        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(peer = %peer_addr, endpoint = %endpoint_id, "Verbindungs-Timeout");
                break;
            }

            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehender Frame vom Client
                frame = empfaenger.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            match ClientNachricht::from_json(&text).map_err(SignalingError::from) {
                                Ok(nachricht) => {
                                    tracing::trace!(
                                        endpoint = %endpoint_id,
                                        art = nachricht.art(),
                                        "Nachricht empfangen"
                                    );
                                    router.verarbeiten(endpoint_id, nachricht);
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        endpoint = %endpoint_id,
                                        fehler = %e,
                                        "Ungueltige Nachricht verworfen"
                                    );
                                }
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            letzter_empfang = Instant::now();
                            tracing::warn!(endpoint = %endpoint_id, "Binaer-Frame verworfen");
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong
                            letzter_empfang = Instant::now();
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus dem Broadcaster
                ausgehend = sende_rx.recv() => {
                    let Some(ausgehend) = ausgehend else {
                        // Queue wurde vom Broadcaster entfernt
                        break;
                    };
                    let json = match ausgehend.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!(fehler = %e, "Serialisierung fehlgeschlagen");
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(json)).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        if let Err(e) = sender.send(Message::Ping(Vec::new())).await {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "Ping-Senden fehlgeschlagen"
                            );
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let _ = sender
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::AWAY,
                                reason: "Server wird heruntergefahren".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }
        }

        router.lifecycle().getrennt(endpoint_id);
        tracing::info!(peer = %peer_addr, endpoint = %endpoint_id, "Verbindung beendet");
    }
}
