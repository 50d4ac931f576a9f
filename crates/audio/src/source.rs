//! Abtast-Quellen – Schnittstelle zwischen Ketten und Medienquellen
//!
//! `SampleSource` liefert eine Momentaufnahme des juengsten
//! Sample-Fensters. Lesen ist nicht-destruktiv: Pegelmesser und
//! Playback-Sink koennen dieselbe Quelle unabhaengig abtasten.

use std::sync::Arc;

use crate::gain::GainControl;

/// Quelle von Audio-Samples (Capture-Session oder entfernte Spur)
pub trait SampleSource: Send + Sync {
    /// Kopiert die juengsten Samples in `out` und gibt die Anzahl der
    /// geschriebenen Samples zurueck. Nicht-destruktiv.
    fn read_window(&self, out: &mut [f32]) -> usize;
}

/// Quelle die dauerhaft Stille liefert
pub struct SilenceSource;

impl SampleSource for SilenceSource {
    fn read_window(&self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        out.len()
    }
}

/// Wrapper der eine Quelle durch eine Gain-Stufe zieht
///
/// Netzwerk-Pfad und Pegelmesser lesen durch denselben Wrapper, damit
/// beide dieselbe Verstaerkung sehen.
pub struct GainedSource {
    innen: Arc<dyn SampleSource>,
    gain: GainControl,
}

impl GainedSource {
    pub fn new(innen: Arc<dyn SampleSource>, gain: GainControl) -> Self {
        Self { innen, gain }
    }
}

impl SampleSource for GainedSource {
    fn read_window(&self, out: &mut [f32]) -> usize {
        let n = self.innen.read_window(out);
        self.gain.apply(&mut out[..n]);
        n
    }
}
