//! Logging-Initialisierung via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, mit Fallback auf die vom
//! Aufrufer uebergebenen Werte:
//! - `SF_LOG_LEVEL`: EnvFilter-Direktiven (trace/debug/info/warn/error
//!   oder feingranular wie `sprechfunk_voice=debug`)
//! - `SF_LOG_FORMAT`: Ausgabeformat (text/json)

use anyhow::anyhow;
use tracing_subscriber::{fmt, EnvFilter};

/// Ausgabeformat des Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parst einen Format-Namen, `None` bei unbekanntem Wert
    pub fn parsen(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn filter_bauen(standard: &str) -> EnvFilter {
    EnvFilter::try_from_env("SF_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(standard))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn format_bestimmen(standard: &str) -> LogFormat {
    std::env::var("SF_LOG_FORMAT")
        .ok()
        .as_deref()
        .and_then(LogFormat::parsen)
        .or_else(|| LogFormat::parsen(standard))
        .unwrap_or(LogFormat::Text)
}

/// Initialisiert das globale Logging.
///
/// `level` und `format` sind die Standardwerte; `SF_LOG_LEVEL` und
/// `SF_LOG_FORMAT` uebersteuern sie. Schlaegt fehl wenn bereits ein
/// globaler Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = filter_bauen(level);
    let ergebnis = match format_bestimmen(format) {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|e| anyhow!("Logging bereits initialisiert: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsen() {
        assert_eq!(LogFormat::parsen("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parsen("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parsen("xml"), None);
        assert_eq!(LogFormat::parsen("JSON"), None); // Gross-/Kleinschreibung
    }

    #[test]
    fn filter_faellt_auf_standard_zurueck() {
        // Ungueltige Direktive: der Fallback auf "info" darf nicht panicken
        let _ = filter_bauen("!!kein-filter!!");
        let _ = filter_bauen("debug");
    }

    #[test]
    fn doppelte_initialisierung_schlaegt_fehl() {
        // Erster Aufruf setzt den globalen Subscriber, der zweite muss
        // einen Fehler liefern statt zu panicken
        assert!(logging_initialisieren("debug", "text").is_ok());
        assert!(logging_initialisieren("debug", "text").is_err());
    }
}
