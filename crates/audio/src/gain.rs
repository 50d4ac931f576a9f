//! Gain-Stufe der Audio-Ketten
//!
//! Clones teilen denselben Wert, damit Netzwerk-Pfad, Playback-Sink und
//! Pegelmesser dieselbe Verstaerkung sehen. Das Clampen des Wertebereichs
//! geschieht eine Ebene hoeher im MuteVolumeController.

use parking_lot::RwLock;
use std::sync::Arc;

/// Geteilte Gain-Stufe
#[derive(Clone)]
pub struct GainControl {
    wert: Arc<RwLock<f32>>,
}

impl GainControl {
    /// Erstellt eine Gain-Stufe mit dem gegebenen Anfangswert
    pub fn new(initial: f32) -> Self {
        Self {
            wert: Arc::new(RwLock::new(initial)),
        }
    }

    /// Setzt den Gain-Wert (wirkt sofort auf alle Clones)
    pub fn set(&self, v: f32) {
        *self.wert.write() = v;
    }

    /// Gibt den aktuellen Gain-Wert zurueck
    pub fn get(&self) -> f32 {
        *self.wert.read()
    }

    /// Wendet den Gain auf einen Sample-Buffer an
    pub fn apply(&self, samples: &mut [f32]) {
        let g = self.get();
        for s in samples.iter_mut() {
            *s *= g;
        }
    }
}
