//! Pegelmessung
//!
//! Der Pegel ist die mittlere Absolut-Amplitude ueber ein festes Fenster
//! der juengsten Samples – ein einfacher Lautheits-Proxy, kein RMS.

/// Fenstergroesse des Pegelmessers in Samples.
/// Entspricht der Standard-FFT-Groesse eines WebAudio-Analysers.
pub const METER_WINDOW: usize = 2048;

/// Rechnet einen Pegel in Dezibel um, geclampt auf [-80, 0]
pub fn level_to_db(pegel: f32) -> f32 {
    if pegel <= 0.0 {
        return -80.0;
    }
    (20.0 * pegel.log10()).clamp(-80.0, 0.0)
}

/// Pegelmesser-Abgriff einer Audio-Kette
///
/// Das Fenster startet mit Stille; bevor die Kette eine Quelle hat,
/// liest der Pegel deshalb 0.
#[derive(Debug)]
pub struct MeterTap {
    fenster: Vec<f32>,
    pos: usize,
}

impl MeterTap {
    /// Erstellt einen Pegelmesser mit Standard-Fenstergroesse
    pub fn new() -> Self {
        Self::with_window(METER_WINDOW)
    }

    /// Erstellt einen Pegelmesser mit eigener Fenstergroesse (Tests)
    pub fn with_window(len: usize) -> Self {
        Self {
            fenster: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    /// Schreibt Samples in das rollende Fenster
    pub fn push(&mut self, samples: &[f32]) {
        // Nur die juengsten Samples behalten falls der Block groesser
        // als das Fenster ist
        let start = samples.len().saturating_sub(self.fenster.len());
        for &s in &samples[start..] {
            self.fenster[self.pos] = s;
            self.pos = (self.pos + 1) % self.fenster.len();
        }
    }

    /// Mittlere Absolut-Amplitude ueber das gesamte Fenster
    pub fn level(&self) -> f32 {
        let summe: f32 = self.fenster.iter().map(|s| s.abs()).sum();
        summe / self.fenster.len() as f32
    }

    /// Pegel in Dezibel, geclampt auf [-80, 0]
    pub fn level_db(&self) -> f32 {
        level_to_db(self.level())
    }

    /// Setzt das Fenster auf Stille zurueck
    pub fn reset(&mut self) {
        self.fenster.fill(0.0);
        self.pos = 0;
    }
}

impl Default for MeterTap {
    fn default() -> Self {
        Self::new()
    }
}
