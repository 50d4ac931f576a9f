//! Mute und Lautstaerke
//!
//! Globales Mute sowie Ein- und Ausgangslautstaerke. Jede Aenderung
//! wirkt atomar auf alle bestehenden Pipelines und wird als Zustand
//! gespeichert, damit spaeter gebaute Pipelines denselben Wert
//! vorfinden.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use sprechfunk_core::BeobachterListe;

use crate::session::SitzungsZustand;

/// Steuert Mute und Lautstaerken ueber alle Pipelines hinweg
#[derive(Clone)]
pub struct MuteVolumeController {
    zustand: Arc<Mutex<SitzungsZustand>>,
    bei_mute: Arc<BeobachterListe<bool>>,
}

impl MuteVolumeController {
    pub(crate) fn neu(
        zustand: Arc<Mutex<SitzungsZustand>>,
        bei_mute: Arc<BeobachterListe<bool>>,
    ) -> Self {
        Self { zustand, bei_mute }
    }

    /// Schaltet das globale Mute um und meldet den neuen Zustand.
    /// Ohne Mikrofon ein No-op ohne Meldung; gibt dann `None` zurueck.
    pub fn mute_umschalten(&self) -> Option<bool> {
        let neu = {
            let mut z = self.zustand.lock();
            if !z.mikrofon {
                debug!("Mute-Umschalten ohne Mikrofon ignoriert");
                return None;
            }
            z.mute = !z.mute;
            let neu = z.mute;
            for (peer_id, eintrag) in z.eintraege.iter() {
                if let Some(kette) = &eintrag.pipeline.input {
                    if let Err(e) = kette.set_enabled(!neu) {
                        debug!(peer = %peer_id, fehler = %e,
                            "Sendespur-Zustand nicht setzbar");
                    }
                }
            }
            neu
        };
        debug!(mute = neu, "Mute umgeschaltet");
        // Meldung ausserhalb des Locks, Beobachter duerfen zurueckrufen
        self.bei_mute.melden(&neu);
        Some(neu)
    }

    /// Aktueller Mute-Zustand
    pub fn ist_gemutet(&self) -> bool {
        self.zustand.lock().mute
    }

    /// Setzt die Eingangslautstaerke, geclampt auf [0.0, 1.0]
    pub fn eingangs_lautstaerke_setzen(&self, volume: f32) {
        let volume = lautstaerke_begrenzen(volume);
        let mut z = self.zustand.lock();
        z.in_volume = volume;
        for eintrag in z.eintraege.values() {
            if let Some(kette) = &eintrag.pipeline.input {
                kette.set_volume(volume);
            }
        }
    }

    /// Setzt die Ausgangslautstaerke, geclampt auf [0.0, 1.0]
    pub fn ausgangs_lautstaerke_setzen(&self, volume: f32) {
        let volume = lautstaerke_begrenzen(volume);
        let mut z = self.zustand.lock();
        z.out_volume = volume;
        for eintrag in z.eintraege.values() {
            eintrag.pipeline.output.set_volume(volume);
        }
    }

    /// Aktuelle Eingangslautstaerke
    pub fn eingangs_lautstaerke(&self) -> f32 {
        self.zustand.lock().in_volume
    }

    /// Aktuelle Ausgangslautstaerke
    pub fn ausgangs_lautstaerke(&self) -> f32 {
        self.zustand.lock().out_volume
    }
}

/// Begrenzt eine Lautstaerke auf [0.0, 1.0]; NaN wird zu 0.0, damit der
/// gespeicherte Wert den Bereich nie verlaesst und der Schnappschuss-
/// Vergleich der Pegelueberwachung stabil bleibt
fn lautstaerke_begrenzen(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}
