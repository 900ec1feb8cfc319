//! WebSocket-Listener – Nimmt Upgrades entgegen und startet Verbindungen
//!
//! Der `SignalingServer` stellt `/ws` per axum bereit und startet fuer jede
//! erfolgreiche Upgrade-Anfrage eine `ClientConnection` in einem eigenen
//! tokio-Task. Ist das Client-Limit erreicht, wird das Upgrade mit
//! `503 Service Unavailable` abgelehnt.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// Zustand der axum-Handler
#[derive(Clone)]
struct AppState {
    state: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// WebSocket-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Baut den axum-Router mit der `/ws`-Route
    pub fn router(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .with_state(AppState {
                state: Arc::clone(&self.state),
                shutdown_rx,
            })
            .layer(TraceLayer::new_for_http())
    }

    /// Nimmt Verbindungen auf `listener` an
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt. Offene
    /// Verbindungen werden dann mit einem Close-Frame beendet.
    pub async fn starten(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "WebSocket Signaling-Server gestartet");

        let app = self.router(shutdown_rx.clone());
        let mut stop_rx = shutdown_rx;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            // Ein geschlossener Sender zaehlt ebenfalls als Stop
            let _ = stop_rx.wait_for(|stop| *stop).await;
            tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
        })
        .await?;

        tracing::info!(
            uptime_sek = self.state.uptime_sek(),
            "WebSocket Signaling-Server gestoppt"
        );
        Ok(())
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(app): State<AppState>,
) -> Response {
    let online = app.state.verbundene_anzahl();
    if online >= app.state.config.max_clients as usize {
        tracing::warn!(
            peer = %peer_addr,
            max = app.state.config.max_clients,
            "Server voll – Upgrade abgelehnt"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Server voll").into_response();
    }

    tracing::debug!(peer = %peer_addr, "Upgrade akzeptiert");
    let verbindung = ClientConnection::neu(Arc::clone(&app.state), peer_addr);
    let shutdown_rx = app.shutdown_rx.clone();
    ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}
