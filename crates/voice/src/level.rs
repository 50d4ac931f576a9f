//! Pegelueberwachung
//!
//! Tastet periodisch die Eingangskette des lokalen Teilnehmers und die
//! Ausgangsketten aller Peers ab. Gemeldet wird ein vollstaendiger
//! Schnappschuss, aber nur wenn er sich vom vorherigen unterscheidet –
//! in ruhigen Sitzungen ist der Takt still.
//!
//! Ohne laufende Sitzung (keine lokale Kennung) ist der Takt inaktiv
//! und der Verlauf geleert, damit der erste Schnappschuss der
//! naechsten Sitzung garantiert gemeldet wird.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use sprechfunk_audio::level_to_db;
use sprechfunk_core::{BeobachterListe, ParticipantKey};

use crate::session::SitzungsZustand;
use crate::transport::PeerTransport;

/// Pegel aller Teilnehmer eines Taktes, Werte in [0.0, 1.0]
pub type LevelSnapshot = HashMap<ParticipantKey, f32>;

/// Periodische Pegelabtastung mit Schnappschuss-Diffing
#[derive(Clone)]
pub struct LevelMeter {
    zustand: Arc<Mutex<SitzungsZustand>>,
    transport: Arc<dyn PeerTransport>,
    bei_pegel: Arc<BeobachterListe<LevelSnapshot>>,
}

impl LevelMeter {
    pub(crate) fn neu(
        zustand: Arc<Mutex<SitzungsZustand>>,
        transport: Arc<dyn PeerTransport>,
        bei_pegel: Arc<BeobachterListe<LevelSnapshot>>,
    ) -> Self {
        Self {
            zustand,
            transport,
            bei_pegel,
        }
    }

    /// Ein Takt der Ueberwachung: abtasten, vergleichen, ggf. melden.
    /// Oeffentlich, damit Tests ohne Zeitsteuerung takten koennen.
    pub fn tick(&self) {
        if self.transport.lokale_id().is_none() {
            // Keine Sitzung: Verlauf leeren statt weiterzutakten
            let mut z = self.zustand.lock();
            if z.pegel_verlauf.take().is_some() {
                debug!("Pegelueberwachung inaktiv, Verlauf geleert");
            }
            return;
        }

        let meldung = {
            let mut z = self.zustand.lock();

            let mut schnappschuss: LevelSnapshot = HashMap::with_capacity(z.eintraege.len() + 1);
            let gemutet = z.mute;
            let mut selbst = 0.0f32;
            let mut selbst_gemessen = false;
            for eintrag in z.eintraege.values_mut() {
                // Alle Eingangsketten teilen Quelle und Gain; die erste
                // liefert den Pegel des lokalen Teilnehmers
                if !gemutet && !selbst_gemessen {
                    if let Some(kette) = eintrag.pipeline.input.as_mut() {
                        selbst = kette.level();
                        selbst_gemessen = true;
                    }
                }
                schnappschuss.insert(
                    ParticipantKey::Peer(eintrag.pipeline.peer_id().clone()),
                    eintrag.pipeline.output.level(),
                );
            }
            schnappschuss.insert(ParticipantKey::Selbst, selbst);

            let verschieden = z
                .pegel_verlauf
                .as_ref()
                .map_or(true, |alt| *alt != schnappschuss);
            z.pegel_verlauf = Some(schnappschuss.clone());
            verschieden.then_some(schnappschuss)
        };

        // Meldung ausserhalb des Locks
        if let Some(schnappschuss) = meldung {
            trace!(teilnehmer = schnappschuss.len(), "Pegel geaendert");
            self.bei_pegel.melden(&schnappschuss);
        }
    }

    /// Letzter gespeicherter Schnappschuss, `None` ohne Sitzung
    pub fn letzter_schnappschuss(&self) -> Option<LevelSnapshot> {
        self.zustand.lock().pegel_verlauf.clone()
    }

    /// Pegel des lokalen Teilnehmers aus dem letzten Schnappschuss
    pub fn lokaler_pegel(&self) -> f32 {
        self.zustand
            .lock()
            .pegel_verlauf
            .as_ref()
            .and_then(|v| v.get(&ParticipantKey::Selbst))
            .copied()
            .unwrap_or(0.0)
    }

    /// Lokaler Pegel in Dezibel, geclampt auf [-80.0, 0.0]
    pub fn lokaler_pegel_db(&self) -> f32 {
        level_to_db(self.lokaler_pegel())
    }

    /// Startet den periodischen Takt. Verpasste Ticks werden
    /// uebersprungen statt nachgeholt.
    pub fn takt_starten(&self, intervall: Duration) -> JoinHandle<()> {
        let meter = self.clone();
        tokio::spawn(async move {
            let mut takt = tokio::time::interval(intervall);
            takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                takt.tick().await;
                meter.tick();
            }
        })
    }
}
