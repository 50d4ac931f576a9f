//! Per-Peer Audio-Pipeline
//!
//! Buendelt die Audio-Ressourcen eines einzelnen Peers:
//! - Eingangskette: geteilte Capture-Quelle -> Gain -> Pegelmesser -> Sendespur
//! - Ausgangskette: entfernte Quelle -> Gain -> Pegelmesser -> Playback-Sink
//!
//! Die Ausgangskette wird sofort gebaut; die entfernte Quelle kommt
//! erst spaeter, asynchron, mit dem Spur-Ankunft-Ereignis des
//! Transports. Bis dahin liest ihr Pegel 0.
//!
//! Abbau ist pro Ressource isoliert: schlaegt das Stoppen einer
//! Ressource fehl, werden die uebrigen trotzdem freigegeben.

use std::sync::Arc;
use tracing::debug;

use sprechfunk_core::PeerId;

use crate::backend::PlaybackSink;
use crate::error::AudioResult;
use crate::gain::GainControl;
use crate::meter::{MeterTap, METER_WINDOW};
use crate::source::SampleSource;

/// Netzwerk-Sendesenke einer ausgehandelten Audiospur
pub trait SendTrack: Send + Sync {
    /// Aktiviert oder deaktiviert die Spur (Mute)
    fn set_enabled(&self, enabled: bool) -> AudioResult<()>;
    /// Stoppt die Spur endgueltig. Idempotent.
    fn stop(&self) -> AudioResult<()>;
}

// ---------------------------------------------------------------------------
// Eingangskette
// ---------------------------------------------------------------------------

/// Sende-Seite: Capture -> Gain -> Pegelmesser -> Sendespur
///
/// Existiert nur wenn beim Bau der Pipeline eine Capture-Quelle
/// verfuegbar war. `quelle` ist bereits der Gain-Wrapper, damit
/// Netzwerk-Pfad und Pegelmesser dieselbe Verstaerkung sehen.
pub struct InputChain {
    quelle: Arc<dyn SampleSource>,
    gain: GainControl,
    meter: MeterTap,
    track: Box<dyn SendTrack>,
}

impl InputChain {
    /// Erstellt die Eingangskette. `enabled == false` entspricht Mute.
    pub fn new(
        quelle: Arc<dyn SampleSource>,
        gain: GainControl,
        track: Box<dyn SendTrack>,
        enabled: bool,
    ) -> Self {
        if let Err(e) = track.set_enabled(enabled) {
            debug!(fehler = %e, "Sendespur-Zustand nicht setzbar");
        }
        Self {
            quelle,
            gain,
            meter: MeterTap::new(),
            track,
        }
    }

    /// Setzt die Eingangslautstaerke (bereits geclampt)
    pub fn set_volume(&self, v: f32) {
        self.gain.set(v);
    }

    /// Aktiviert/deaktiviert die Sendespur
    pub fn set_enabled(&self, enabled: bool) -> AudioResult<()> {
        self.track.set_enabled(enabled)
    }

    /// Tastet die Kette ab und gibt den aktuellen Pegel zurueck
    pub fn level(&mut self) -> f32 {
        let mut fenster = [0.0f32; METER_WINDOW];
        let n = self.quelle.read_window(&mut fenster);
        self.meter.push(&fenster[..n]);
        self.meter.level()
    }

    /// Gibt alle Ressourcen der Kette frei
    pub fn release(&mut self) {
        if let Err(e) = self.track.stop() {
            debug!(fehler = %e, "Sendespur-Stop fehlgeschlagen, Abbau laeuft weiter");
        }
        self.meter.reset();
    }
}

// ---------------------------------------------------------------------------
// Ausgangskette
// ---------------------------------------------------------------------------

/// Empfangs-Seite: entfernte Quelle -> Gain -> Pegelmesser -> Playback
///
/// Gain und Pegelmesser existieren sofort; Quelle und Sink kommen mit
/// dem Spur-Ankunft-Ereignis.
pub struct OutputChain {
    gain: GainControl,
    meter: MeterTap,
    quelle: Option<Arc<dyn SampleSource>>,
    sink: Option<Box<dyn PlaybackSink>>,
}

impl OutputChain {
    /// Erstellt die Ausgangskette mit der aktuellen Ausgangslautstaerke
    pub fn new(volume: f32) -> Self {
        Self {
            gain: GainControl::new(volume),
            meter: MeterTap::new(),
            quelle: None,
            sink: None,
        }
    }

    /// Gain-Stufe der Kette (geteilt mit dem Playback-Pfad)
    pub fn gain(&self) -> GainControl {
        self.gain.clone()
    }

    /// Verdrahtet die entfernte Quelle. `quelle` ist bereits der
    /// Gain-Wrapper; `sink` darf fehlen (Kette bleibt messbar, aber stumm).
    pub fn attach(&mut self, quelle: Arc<dyn SampleSource>, sink: Option<Box<dyn PlaybackSink>>) {
        self.quelle = Some(quelle);
        self.sink = sink;
    }

    /// Ob bereits eine entfernte Quelle verdrahtet ist
    pub fn has_remote(&self) -> bool {
        self.quelle.is_some()
    }

    /// Setzt die Ausgangslautstaerke (bereits geclampt)
    pub fn set_volume(&self, v: f32) {
        self.gain.set(v);
    }

    /// Tastet die Kette ab; 0 solange keine Quelle verdrahtet ist
    pub fn level(&mut self) -> f32 {
        let Some(quelle) = &self.quelle else {
            return 0.0;
        };
        let mut fenster = [0.0f32; METER_WINDOW];
        let n = quelle.read_window(&mut fenster);
        self.meter.push(&fenster[..n]);
        self.meter.level()
    }

    /// Gibt alle Ressourcen der Kette frei
    pub fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            if let Err(e) = sink.stop() {
                debug!(fehler = %e, "Playback-Sink-Stop fehlgeschlagen, Abbau laeuft weiter");
            }
        }
        self.quelle = None;
        self.meter.reset();
    }
}

// ---------------------------------------------------------------------------
// AudioPipeline
// ---------------------------------------------------------------------------

/// Audio-Ressourcen eines einzelnen Peers
///
/// Wird genau einmal pro Peer gebaut und genau einmal abgebaut.
/// Ohne Capture-Quelle bleibt `input` leer – der vorgesehene
/// Degraded-Mode, kein Fehler.
pub struct AudioPipeline {
    peer_id: PeerId,
    pub input: Option<InputChain>,
    pub output: OutputChain,
}

impl AudioPipeline {
    /// Erstellt die Pipeline mit eifriger Ausgangskette
    pub fn new(peer_id: PeerId, out_volume: f32) -> Self {
        Self {
            peer_id,
            input: None,
            output: OutputChain::new(out_volume),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Verdrahtet die Eingangskette (sobald die Capture-Quelle bereit ist)
    pub fn set_input(&mut self, kette: InputChain) {
        self.input = Some(kette);
    }

    /// Gibt alle Ressourcen der Pipeline frei, auch bei nur teilweise
    /// abgeschlossenem Aufbau
    pub fn release(&mut self) {
        if let Some(mut input) = self.input.take() {
            input.release();
        }
        self.output.release();
        debug!(peer = %self.peer_id, "Pipeline abgebaut");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{GainedSource, SilenceSource};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Konstant(f32);

    impl SampleSource for Konstant {
        fn read_window(&self, out: &mut [f32]) -> usize {
            out.fill(self.0);
            out.len()
        }
    }

    struct TestTrack {
        enabled: Arc<AtomicBool>,
        gestoppt: Arc<AtomicBool>,
        stop_schlaegt_fehl: bool,
    }

    impl TestTrack {
        fn neu() -> (Self, Arc<AtomicBool>, Arc<AtomicBool>) {
            let enabled = Arc::new(AtomicBool::new(true));
            let gestoppt = Arc::new(AtomicBool::new(false));
            (
                Self {
                    enabled: Arc::clone(&enabled),
                    gestoppt: Arc::clone(&gestoppt),
                    stop_schlaegt_fehl: false,
                },
                enabled,
                gestoppt,
            )
        }
    }

    impl SendTrack for TestTrack {
        fn set_enabled(&self, enabled: bool) -> AudioResult<()> {
            self.enabled.store(enabled, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> AudioResult<()> {
            self.gestoppt.store(true, Ordering::SeqCst);
            if self.stop_schlaegt_fehl {
                return Err(crate::error::AudioError::StreamFehler("kaputt".into()));
            }
            Ok(())
        }
    }

    struct TestSink {
        gestoppt: Arc<AtomicBool>,
    }

    impl PlaybackSink for TestSink {
        fn stop(&self) -> AudioResult<()> {
            self.gestoppt.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn eingangskette(wert: f32, volume: f32) -> (InputChain, Arc<AtomicBool>, Arc<AtomicBool>) {
        let gain = GainControl::new(volume);
        let quelle: Arc<dyn SampleSource> =
            Arc::new(GainedSource::new(Arc::new(Konstant(wert)), gain.clone()));
        let (track, enabled, gestoppt) = TestTrack::neu();
        (
            InputChain::new(quelle, gain, Box::new(track), true),
            enabled,
            gestoppt,
        )
    }

    #[test]
    fn eingangskette_pegel_nach_gain() {
        let (mut kette, _, _) = eingangskette(0.8, 0.5);
        let pegel = kette.level();
        assert!((pegel - 0.4).abs() < 1e-4, "Pegel war {}", pegel);
    }

    #[test]
    fn eingangskette_volume_wirkt_sofort() {
        let (mut kette, _, _) = eingangskette(1.0, 1.0);
        assert!((kette.level() - 1.0).abs() < 1e-4);
        kette.set_volume(0.25);
        assert!((kette.level() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn eingangskette_enabled_steuert_spur() {
        let (kette, enabled, _) = eingangskette(0.5, 1.0);
        kette.set_enabled(false).unwrap();
        assert!(!enabled.load(Ordering::SeqCst));
        kette.set_enabled(true).unwrap();
        assert!(enabled.load(Ordering::SeqCst));
    }

    #[test]
    fn ausgangskette_ohne_quelle_liest_null() {
        let mut kette = OutputChain::new(1.0);
        assert!(!kette.has_remote());
        assert_eq!(kette.level(), 0.0);
    }

    #[test]
    fn ausgangskette_nach_attach() {
        let mut kette = OutputChain::new(1.0);
        let quelle: Arc<dyn SampleSource> =
            Arc::new(GainedSource::new(Arc::new(Konstant(0.6)), kette.gain()));
        kette.attach(quelle, None);
        assert!(kette.has_remote());
        assert!((kette.level() - 0.6).abs() < 1e-4);
    }

    #[test]
    fn ausgangskette_gain_initialwert() {
        // Eine vor dem Verbinden gesetzte Lautstaerke muss beim Bau ankommen
        let kette = OutputChain::new(0.3);
        assert!((kette.gain().get() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn pipeline_release_stoppt_alle_ressourcen() {
        let mut pipeline = AudioPipeline::new(PeerId::neu("a"), 1.0);
        let (kette, _, track_gestoppt) = eingangskette(0.5, 1.0);
        pipeline.set_input(kette);

        let sink_gestoppt = Arc::new(AtomicBool::new(false));
        let quelle: Arc<dyn SampleSource> = Arc::new(Konstant(0.5));
        pipeline.output.attach(
            quelle,
            Some(Box::new(TestSink {
                gestoppt: Arc::clone(&sink_gestoppt),
            })),
        );

        pipeline.release();
        assert!(track_gestoppt.load(Ordering::SeqCst));
        assert!(sink_gestoppt.load(Ordering::SeqCst));
        assert!(pipeline.input.is_none());
        assert!(!pipeline.output.has_remote());
    }

    #[test]
    fn release_fehler_einer_ressource_isoliert() {
        // Fehlschlagender Spur-Stop darf den Sink-Stop nicht verhindern
        let mut pipeline = AudioPipeline::new(PeerId::neu("b"), 1.0);
        let gain = GainControl::new(1.0);
        let quelle: Arc<dyn SampleSource> = Arc::new(SilenceSource);
        let gestoppt = Arc::new(AtomicBool::new(false));
        let track = TestTrack {
            enabled: Arc::new(AtomicBool::new(true)),
            gestoppt: Arc::clone(&gestoppt),
            stop_schlaegt_fehl: true,
        };
        pipeline.set_input(InputChain::new(quelle, gain, Box::new(track), true));

        let sink_gestoppt = Arc::new(AtomicBool::new(false));
        pipeline.output.attach(
            Arc::new(SilenceSource),
            Some(Box::new(TestSink {
                gestoppt: Arc::clone(&sink_gestoppt),
            })),
        );

        pipeline.release();
        assert!(gestoppt.load(Ordering::SeqCst), "Stop wurde versucht");
        assert!(
            sink_gestoppt.load(Ordering::SeqCst),
            "Sink muss trotz Spur-Fehler gestoppt werden"
        );
    }

    #[test]
    fn release_bei_teilweisem_aufbau() {
        // Entfernte Spur nie angekommen: Abbau darf nicht stolpern
        let mut pipeline = AudioPipeline::new(PeerId::neu("c"), 1.0);
        pipeline.release();
        assert!(pipeline.input.is_none());
    }
}
