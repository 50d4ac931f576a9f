//! Voice-Chat-Konfiguration
//!
//! Kann aus einer TOML-Datei geladen werden. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Konfiguration des Voice-Chat-Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceChatConfig {
    /// Startzustand des Mikrofon-Mutes
    pub initial_mute: bool,
    /// Anfangs-Eingangslautstaerke (0.0–1.0)
    pub initial_in_volume: f32,
    /// Anfangs-Ausgangslautstaerke (0.0–1.0)
    pub initial_out_volume: f32,
    /// Intervall der Pegelpruefung in Sekunden
    pub level_check_interval_seconds: f32,
    /// Ob vor der Mikrofon-Erkennung eine einmalige
    /// Berechtigungsabfrage noetig ist
    pub microphone_permission_check_required: bool,
}

impl Default for VoiceChatConfig {
    fn default() -> Self {
        Self {
            initial_mute: true,
            initial_in_volume: 1.0,
            initial_out_volume: 1.0,
            level_check_interval_seconds: 1.0,
            microphone_permission_check_required: false,
        }
    }
}

impl VoiceChatConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config.normalisiert())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Clamped Lautstaerken auf [0,1] und erzwingt ein positives
    /// Pruefintervall
    pub fn normalisiert(mut self) -> Self {
        self.initial_in_volume = volume_reparieren(self.initial_in_volume, 1.0);
        self.initial_out_volume = volume_reparieren(self.initial_out_volume, 1.0);
        if !(self.level_check_interval_seconds > 0.0) {
            self.level_check_interval_seconds = Self::default().level_check_interval_seconds;
        }
        self
    }

    /// Pruefintervall als Duration
    pub fn level_check_interval(&self) -> Duration {
        Duration::from_secs_f32(self.level_check_interval_seconds)
    }
}

/// Repariert eine konfigurierte Lautstaerke: NaN wird zum Standardwert,
/// alles andere auf [0.0, 1.0] geclampt
fn volume_reparieren(volume: f32, standard: f32) -> f32 {
    if volume.is_nan() {
        return standard;
    }
    volume.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config() {
        let cfg = VoiceChatConfig::default();
        assert!(cfg.initial_mute);
        assert!((cfg.initial_in_volume - 1.0).abs() < f32::EPSILON);
        assert!((cfg.initial_out_volume - 1.0).abs() < f32::EPSILON);
        assert!((cfg.level_check_interval_seconds - 1.0).abs() < f32::EPSILON);
        assert!(!cfg.microphone_permission_check_required);
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            initial_mute = false
            initial_out_volume = 0.5
        "#;
        let cfg: VoiceChatConfig = toml::from_str(toml).unwrap();
        assert!(!cfg.initial_mute);
        assert!((cfg.initial_out_volume - 0.5).abs() < f32::EPSILON);
        // Nicht angegebene Felder behalten Standardwerte
        assert!((cfg.initial_in_volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn normalisiert_clamped_lautstaerken() {
        let cfg = VoiceChatConfig {
            initial_in_volume: -0.5,
            initial_out_volume: 1.7,
            ..Default::default()
        }
        .normalisiert();
        assert_eq!(cfg.initial_in_volume, 0.0);
        assert_eq!(cfg.initial_out_volume, 1.0);
    }

    #[test]
    fn normalisiert_repariert_nan_lautstaerken() {
        let cfg = VoiceChatConfig {
            initial_in_volume: f32::NAN,
            initial_out_volume: f32::NAN,
            ..Default::default()
        }
        .normalisiert();
        assert_eq!(cfg.initial_in_volume, 1.0);
        assert_eq!(cfg.initial_out_volume, 1.0);
    }

    #[test]
    fn normalisiert_repariert_intervall() {
        let cfg = VoiceChatConfig {
            level_check_interval_seconds: 0.0,
            ..Default::default()
        }
        .normalisiert();
        assert!(cfg.level_check_interval_seconds > 0.0);
        assert_eq!(cfg.level_check_interval(), Duration::from_secs(1));
    }
}
