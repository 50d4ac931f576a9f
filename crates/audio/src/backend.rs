//! Audio-Backend – Grenze zum Plattform-Audio
//!
//! Ein faehigkeits-polymorphes Interface mit zwei Implementierungen:
//! `NativeBackend` (cpal, native.rs) und `StummBackend` (capture-los).
//! Die Auswahl erfolgt einmal beim Start ueber die Faehigkeit des
//! Systems, nicht per Verzweigung an jeder Aufrufstelle.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AudioError, AudioResult};
use crate::source::SampleSource;

/// Ziel fuer die Wiedergabe einer entfernten Quelle
pub trait PlaybackSink: Send + Sync {
    /// Stoppt die Wiedergabe. Idempotent.
    fn stop(&self) -> AudioResult<()>;
}

/// Plattform-Audio-Kollaborateur
///
/// `start_capture` ist idempotent: existiert bereits eine
/// Capture-Session, wird dieselbe Quelle erneut herausgegeben.
/// Prozessweit gibt es hoechstens eine physische Capture-Session,
/// egal wie viele Eingangsketten sie teilen.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Einmalige Mikrofon-Erkennung. Darf eine asynchrone
    /// Berechtigungsabfrage ausloesen; verweigerte Berechtigung ergibt
    /// `false`, keinen Fehler.
    async fn probe_microphone(&self) -> bool;

    /// Ergebnis der letzten Mikrofon-Erkennung
    fn has_microphone(&self) -> bool;

    /// Startet die prozessweite Capture-Session (idempotent)
    async fn start_capture(&self) -> AudioResult<Arc<dyn SampleSource>>;

    /// Stoppt die Capture-Session. No-op falls keine laeuft.
    fn stop_capture(&self);

    /// Erstellt einen Playback-Sink der die gegebene Quelle abspielt
    fn create_playback_sink(
        &self,
        quelle: Arc<dyn SampleSource>,
    ) -> AudioResult<Box<dyn PlaybackSink>>;
}

/// Backend ohne Capture-Faehigkeit
///
/// Der Degraded-Mode fuer Systeme ohne Audio-Geraet: kein Mikrofon,
/// Playback-Sinks sind No-ops. Pipelines werden damit empfangsseitig
/// ausgehandelt und bleiben stumm – das ist kein Fehlerzustand.
pub struct StummBackend;

struct NullSink;

impl PlaybackSink for NullSink {
    fn stop(&self) -> AudioResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AudioBackend for StummBackend {
    async fn probe_microphone(&self) -> bool {
        false
    }

    fn has_microphone(&self) -> bool {
        false
    }

    async fn start_capture(&self) -> AudioResult<Arc<dyn SampleSource>> {
        Err(AudioError::KeinMikrofon)
    }

    fn stop_capture(&self) {}

    fn create_playback_sink(
        &self,
        _quelle: Arc<dyn SampleSource>,
    ) -> AudioResult<Box<dyn PlaybackSink>> {
        Ok(Box::new(NullSink))
    }
}
