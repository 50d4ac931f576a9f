//! Sprach-Sitzungsverwaltung – Peer zu Pipeline
//!
//! Reagiert auf die Create/Close-Hooks des Transports: pro Peer wird
//! synchron eine Audio-Pipeline gebaut bzw. abgebaut. Die einzige
//! Wartestelle ist der einmalige Start der geteilten Capture-Session
//! (Berechtigungsabfrage); sie blockiert weder die Aushandlung des
//! Transports noch den Bau empfangsseitiger Pipelines anderer Peers.
//!
//! Alle Mutationen der Peer-Tabelle laufen unter einem Lock und sind
//! damit pro Ereignis atomar. Ereignisse derselben Peer-Kennung
//! serialisiert der Transport; Ereignisse verschiedener Kennungen
//! duerfen sich verzahnen.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use sprechfunk_audio::{
    AudioBackend, AudioPipeline, GainControl, GainedSource, InputChain, SampleSource,
};
use sprechfunk_core::{MediaKind, ParticipantKey, PeerId, Result};

use crate::config::VoiceChatConfig;
use crate::transport::{MedienStrom, Verbindung};

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Zustand der geteilten Capture-Session
pub(crate) enum CaptureZustand {
    /// Noch nie gebraucht
    Inaktiv,
    /// Start laeuft (wartet ggf. auf Berechtigung)
    WirdGestartet,
    /// Quelle verfuegbar, wird von allen Eingangsketten geteilt
    Bereit(Arc<dyn SampleSource>),
    /// Start fehlgeschlagen; Peers bleiben empfangsseitig
    Fehlgeschlagen,
}

/// Eintrag der Peer-Tabelle
pub(crate) struct PeerEintrag {
    pub pipeline: AudioPipeline,
    pub verbindung: Arc<dyn Verbindung>,
    /// Eingangskette wartet noch auf die Capture-Session
    pub eingang_ausstehend: bool,
}

/// Gemeinsamer Sitzungszustand
///
/// Nur der VoiceSessionManager schreibt die Peer-Tabelle, nur der
/// MuteVolumeController schreibt Mute/Lautstaerke, die
/// Pegelueberwachung schreibt ausschliesslich ihren eigenen Verlauf.
pub(crate) struct SitzungsZustand {
    pub config: VoiceChatConfig,
    pub eintraege: HashMap<PeerId, PeerEintrag>,
    pub mute: bool,
    pub in_volume: f32,
    pub out_volume: f32,
    /// Ergebnis der einmaligen Mikrofon-Erkennung
    pub mikrofon: bool,
    pub capture: CaptureZustand,
    /// Wird bei `leeren` erhoeht; entwertet ausstehende Capture-Starts
    pub generation: u64,
    /// Schnappschuss-Verlauf der Pegelueberwachung (level.rs)
    pub pegel_verlauf: Option<HashMap<ParticipantKey, f32>>,
}

impl SitzungsZustand {
    pub(crate) fn neu(config: VoiceChatConfig, mikrofon: bool) -> Self {
        Self {
            mute: config.initial_mute,
            in_volume: config.initial_in_volume,
            out_volume: config.initial_out_volume,
            config,
            eintraege: HashMap::new(),
            mikrofon,
            capture: CaptureZustand::Inaktiv,
            generation: 0,
            pegel_verlauf: None,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceSessionManager
// ---------------------------------------------------------------------------

/// Verwaltet die Peer-Tabelle und den Lebenszyklus der Pipelines
///
/// Haelt das Runtime-Handle vom Bauzeitpunkt, damit die Hooks auch von
/// Transport-Threads ausserhalb der Runtime aufgerufen werden duerfen.
#[derive(Clone)]
pub struct VoiceSessionManager {
    zustand: Arc<Mutex<SitzungsZustand>>,
    backend: Arc<dyn AudioBackend>,
    runtime: tokio::runtime::Handle,
}

impl VoiceSessionManager {
    pub(crate) fn neu(
        zustand: Arc<Mutex<SitzungsZustand>>,
        backend: Arc<dyn AudioBackend>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            zustand,
            backend,
            runtime,
        }
    }

    /// Create-Hook des Transports: baut die Pipeline des Peers.
    /// Doppelte Create-Ereignisse fuer eine bereits verfolgte Kennung
    /// sind No-ops.
    pub fn peer_erstellt(&self, peer_id: PeerId, is_offer: bool, verbindung: Arc<dyn Verbindung>) {
        // Phase 1: Zustand lesen, Capture-Start ggf. vormerken
        let (sendefaehig, mute, in_volume, out_volume, generation, capture_quelle, capture_starten) = {
            let mut z = self.zustand.lock();
            if z.eintraege.contains_key(&peer_id) {
                debug!(peer = %peer_id, "Peer bereits verfolgt, Create ignoriert");
                return;
            }
            // Nach fehlgeschlagenem Capture-Start degradieren auch
            // spaetere Peers direkt auf Empfang
            let (sendefaehig, quelle, starten) = match &z.capture {
                CaptureZustand::Bereit(q) => (true, Some(Arc::clone(q)), false),
                CaptureZustand::WirdGestartet => (true, None, false),
                CaptureZustand::Inaktiv if z.mikrofon => (true, None, true),
                _ => (false, None, false),
            };
            if starten {
                z.capture = CaptureZustand::WirdGestartet;
            }
            (
                sendefaehig,
                z.mute,
                z.in_volume,
                z.out_volume,
                z.generation,
                quelle,
                starten,
            )
        };

        debug!(peer = %peer_id, is_offer, "Neue Peer-Verbindung");

        // Phase 2: Aushandlung ausserhalb des Locks
        let mut pipeline = AudioPipeline::new(peer_id.clone(), out_volume);
        let mut eingang_ausstehend = false;
        if sendefaehig {
            match capture_quelle {
                Some(quelle) => {
                    match eingangskette_bauen(verbindung.as_ref(), quelle, in_volume, mute) {
                        Ok(kette) => pipeline.set_input(kette),
                        Err(e) => {
                            debug!(peer = %peer_id, fehler = %e,
                                "Eingangskette fehlgeschlagen, Peer bleibt empfangsseitig");
                        }
                    }
                }
                // Capture-Session laeuft an; Eingangskette wird
                // nachgezogen sobald die Quelle bereit ist
                None => eingang_ausstehend = true,
            }
        } else if let Err(e) = verbindung.nur_empfang_aushandeln(MediaKind::Audio) {
            debug!(peer = %peer_id, fehler = %e, "Empfangs-Aushandlung fehlgeschlagen");
        }

        // Phase 3: Eintrag registrieren, sofern die Sitzung inzwischen
        // nicht geleert wurde
        {
            let mut z = self.zustand.lock();
            if z.generation != generation || z.eintraege.contains_key(&peer_id) {
                debug!(peer = %peer_id, "Sitzung veraendert, gebaute Pipeline verworfen");
                pipeline.release();
                return;
            }
            z.eintraege.insert(
                peer_id.clone(),
                PeerEintrag {
                    pipeline,
                    verbindung: Arc::clone(&verbindung),
                    eingang_ausstehend,
                },
            );
        }

        // Spur-Ankunft-Hook mit explizit gebundenem Kontext
        let zustand = Arc::clone(&self.zustand);
        let backend = Arc::clone(&self.backend);
        let hook_peer = peer_id.clone();
        verbindung.bei_spur_ankunft(Box::new(move |art, strom| {
            if art != MediaKind::Audio {
                debug!(peer = %hook_peer, art = %art, "Nicht-Audio-Spur ignoriert");
                return;
            }
            spur_angekommen(&zustand, backend.as_ref(), &hook_peer, strom);
        }));

        if capture_starten {
            self.capture_start_anstossen(generation);
        }
    }

    /// Close-Hook des Transports: baut die Pipeline des Peers synchron
    /// ab. Close fuer eine unbekannte Kennung ist ein No-op.
    pub fn peer_geschlossen(&self, peer_id: &PeerId) {
        let mut z = self.zustand.lock();
        match z.eintraege.remove(peer_id) {
            None => debug!(peer = %peer_id, "Close fuer unbekannten Peer ignoriert"),
            Some(mut eintrag) => {
                // Abbau synchron im Close-Handler, damit ein sofortiger
                // Reconnect unter derselben Kennung nicht mit einem
                // verzoegerten Freigeben kollidiert
                eintrag.pipeline.release();
            }
        }
    }

    /// Baut alle Pipelines ab und setzt Mute/Lautstaerken auf die
    /// konfigurierten Anfangswerte zurueck
    pub fn leeren(&self) {
        {
            let mut z = self.zustand.lock();
            let ids: Vec<PeerId> = z.eintraege.keys().cloned().collect();
            for id in ids {
                if let Some(mut eintrag) = z.eintraege.remove(&id) {
                    eintrag.pipeline.release();
                }
            }
            z.mute = z.config.initial_mute;
            z.in_volume = z.config.initial_in_volume;
            z.out_volume = z.config.initial_out_volume;
            z.generation += 1;
            z.capture = CaptureZustand::Inaktiv;
            z.pegel_verlauf = None;
        }
        self.backend.stop_capture();
        debug!("Sitzung geleert, Zustand auf Konfiguration zurueckgesetzt");
    }

    /// Anzahl der aktuell verfolgten Peers
    pub fn anzahl(&self) -> usize {
        self.zustand.lock().eintraege.len()
    }

    /// Ob die Kennung aktuell verfolgt wird
    pub fn ist_verfolgt(&self, peer_id: &PeerId) -> bool {
        self.zustand.lock().eintraege.contains_key(peer_id)
    }

    /// Kennungen aller aktuell verfolgten Peers
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.zustand.lock().eintraege.keys().cloned().collect()
    }

    /// Startet die geteilte Capture-Session im Hintergrund.
    /// Loest sich der Start erst nach einem `leeren` auf, wird das
    /// Ergebnis verworfen und die halb gebaute Session freigegeben.
    fn capture_start_anstossen(&self, generation: u64) {
        let zustand = Arc::clone(&self.zustand);
        let backend = Arc::clone(&self.backend);
        self.runtime.spawn(async move {
            let ergebnis = backend.start_capture().await;

            // Phase 1: Ergebnis eintragen, ausstehende Peers einsammeln
            let (quelle, in_volume, mute, peers) = {
                let mut z = zustand.lock();
                if z.generation != generation {
                    debug!("Capture-Start nach Leeren aufgeloest, Ergebnis verworfen");
                    drop(z);
                    backend.stop_capture();
                    return;
                }
                match ergebnis {
                    Ok(quelle) => {
                        z.capture = CaptureZustand::Bereit(Arc::clone(&quelle));
                        let in_volume = z.in_volume;
                        let mute = z.mute;
                        let peers: Vec<(PeerId, Arc<dyn Verbindung>)> = z
                            .eintraege
                            .iter()
                            .filter(|(_, e)| e.eingang_ausstehend)
                            .map(|(id, e)| (id.clone(), Arc::clone(&e.verbindung)))
                            .collect();
                        (quelle, in_volume, mute, peers)
                    }
                    Err(e) => {
                        debug!(fehler = %e,
                            "Capture-Start fehlgeschlagen, Peers bleiben empfangsseitig");
                        z.capture = CaptureZustand::Fehlgeschlagen;
                        let peers: Vec<Arc<dyn Verbindung>> = z
                            .eintraege
                            .values_mut()
                            .filter(|e| e.eingang_ausstehend)
                            .map(|e| {
                                e.eingang_ausstehend = false;
                                Arc::clone(&e.verbindung)
                            })
                            .collect();
                        drop(z);
                        for verbindung in peers {
                            if let Err(e) = verbindung.nur_empfang_aushandeln(MediaKind::Audio) {
                                debug!(fehler = %e, "Empfangs-Aushandlung fehlgeschlagen");
                            }
                        }
                        return;
                    }
                }
            };

            // Phase 2: Eingangsketten ausserhalb des Locks aushandeln
            for (peer_id, verbindung) in peers {
                let kette = eingangskette_bauen(
                    verbindung.as_ref(),
                    Arc::clone(&quelle),
                    in_volume,
                    mute,
                );
                let mut z = zustand.lock();
                if z.generation != generation {
                    debug!("Sitzung waehrend Verdrahtung geleert");
                    if let Ok(mut kette) = kette {
                        kette.release();
                    }
                    return;
                }
                match (z.eintraege.get_mut(&peer_id), kette) {
                    (Some(eintrag), Ok(kette)) if eintrag.eingang_ausstehend => {
                        eintrag.eingang_ausstehend = false;
                        eintrag.pipeline.set_input(kette);
                        debug!(peer = %peer_id, "Eingangskette nachgezogen");
                    }
                    (Some(eintrag), Err(e)) => {
                        eintrag.eingang_ausstehend = false;
                        debug!(peer = %peer_id, fehler = %e, "Eingangskette fehlgeschlagen");
                    }
                    // Peer inzwischen geschlossen oder bereits verdrahtet
                    (_, Ok(mut kette)) => kette.release(),
                    (None, Err(_)) => {}
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Baut eine Eingangskette: Capture -> Gain -> Sendespur.
/// `roh` ist die geteilte Capture-Quelle; der Gain-Wrapper sorgt dafuer,
/// dass Netzwerk-Pfad und Pegelmesser dieselbe Verstaerkung sehen.
fn eingangskette_bauen(
    verbindung: &dyn Verbindung,
    roh: Arc<dyn SampleSource>,
    volume: f32,
    mute: bool,
) -> Result<InputChain> {
    let gain = GainControl::new(volume);
    let quelle: Arc<dyn SampleSource> = Arc::new(GainedSource::new(roh, gain.clone()));
    let spur = verbindung.sende_spur_aushandeln(MediaKind::Audio, Arc::clone(&quelle))?;
    Ok(InputChain::new(quelle, gain, spur, !mute))
}

/// Spur-Ankunft-Hook: verdrahtet die entfernte Quelle in die
/// Ausgangskette des Peers
fn spur_angekommen(
    zustand: &Arc<Mutex<SitzungsZustand>>,
    backend: &dyn AudioBackend,
    peer_id: &PeerId,
    strom: MedienStrom,
) {
    let gain = {
        let z = zustand.lock();
        match z.eintraege.get(peer_id) {
            Some(eintrag) => eintrag.pipeline.output.gain(),
            None => {
                debug!(peer = %peer_id, "Spur fuer unbekannten Peer verworfen");
                return;
            }
        }
    };

    // Sink-Erstellung ausserhalb des Locks (kann zum Audio-Thread reden)
    let quelle: Arc<dyn SampleSource> = Arc::new(GainedSource::new(strom.quelle, gain));
    let sink = match backend.create_playback_sink(Arc::clone(&quelle)) {
        Ok(sink) => Some(sink),
        Err(e) => {
            debug!(peer = %peer_id, fehler = %e,
                "Playback-Sink fehlgeschlagen, Kette bleibt messbar aber stumm");
            None
        }
    };

    let mut z = zustand.lock();
    match z.eintraege.get_mut(peer_id) {
        Some(eintrag) => {
            eintrag.pipeline.output.attach(quelle, sink);
            debug!(peer = %peer_id, "Entfernte Audiospur verdrahtet");
        }
        None => {
            // Peer zwischen Sink-Bau und Verdrahtung geschlossen
            if let Some(sink) = sink {
                let _ = sink.stop();
            }
        }
    }
}
