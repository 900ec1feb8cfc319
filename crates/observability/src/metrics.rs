//! Prometheus-kompatible Metriken fuer Rufnetz
//!
//! Registrierte Metriken:
//! - `rufnetz_connected_endpoints` – Gauge: Offene Verbindungen
//! - `rufnetz_named_endpoints` – Gauge: Beigetretene (benannte) Endpunkte
//! - `rufnetz_active_calls` – Gauge: Laufende Anrufe inkl. klingelnder
//! - `rufnetz_relayed_messages_total` – Counter: Weitergeleitete Nachrichten (kind)
//! - `rufnetz_call_errors_total` – Counter: Gemeldete `call-error`s (reason)

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Rufnetz-Prometheus-Metriken
///
/// Clone teilt dieselbe Registry.
#[derive(Clone)]
pub struct RufnetzMetrics {
    pub registry: Arc<Registry>,

    pub connected_endpoints: IntGauge,
    pub named_endpoints: IntGauge,
    pub active_calls: IntGauge,
    pub relayed_messages_total: IntCounterVec,
    pub call_errors_total: IntCounterVec,
}

impl RufnetzMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_endpoints = IntGauge::with_opts(Opts::new(
            "rufnetz_connected_endpoints",
            "Anzahl offener Signaling-Verbindungen",
        ))?;
        registry.register(Box::new(connected_endpoints.clone()))?;

        let named_endpoints = IntGauge::with_opts(Opts::new(
            "rufnetz_named_endpoints",
            "Anzahl beigetretener Endpunkte",
        ))?;
        registry.register(Box::new(named_endpoints.clone()))?;

        let active_calls = IntGauge::with_opts(Opts::new(
            "rufnetz_active_calls",
            "Anzahl laufender oder klingelnder Anrufe",
        ))?;
        registry.register(Box::new(active_calls.clone()))?;

        let relayed_messages_total = IntCounterVec::new(
            Opts::new(
                "rufnetz_relayed_messages_total",
                "Weitergeleitete Signaling-Nachrichten nach Art",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(relayed_messages_total.clone()))?;

        let call_errors_total = IntCounterVec::new(
            Opts::new(
                "rufnetz_call_errors_total",
                "An Clients gemeldete Anruf-Fehler nach Grund",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(call_errors_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_endpoints,
            named_endpoints,
            active_calls,
            relayed_messages_total,
            call_errors_total,
        })
    }

    /// Zaehlt eine weitergeleitete Nachricht
    pub fn weitergeleitet(&self, art: &str) {
        self.relayed_messages_total.with_label_values(&[art]).inc();
    }

    /// Zaehlt einen gemeldeten Anruf-Fehler
    pub fn anruf_fehler(&self, grund: &str) {
        self.call_errors_total.with_label_values(&[grund]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RufnetzMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(
    axum::extract::State(metriken): axum::extract::State<RufnetzMetrics>,
) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = RufnetzMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn zwei_instanzen_sind_unabhaengig() {
        let a = RufnetzMetrics::neu().unwrap();
        let b = RufnetzMetrics::neu().unwrap();
        a.connected_endpoints.set(3);
        assert_eq!(b.connected_endpoints.get(), 0);
    }

    #[test]
    fn counter_mit_labels() {
        let metriken = RufnetzMetrics::neu().unwrap();
        metriken.weitergeleitet("call-offer");
        metriken.weitergeleitet("call-offer");
        metriken.anruf_fehler("BUSY");
        assert_eq!(
            metriken
                .relayed_messages_total
                .with_label_values(&["call-offer"])
                .get(),
            2
        );
        assert_eq!(metriken.call_errors_total.with_label_values(&["BUSY"]).get(), 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = RufnetzMetrics::neu().unwrap();
        metriken.connected_endpoints.set(2);
        metriken.weitergeleitet("ice-candidate");

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("rufnetz_connected_endpoints 2"));
        assert!(output.contains("rufnetz_relayed_messages_total{kind=\"ice-candidate\"} 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
