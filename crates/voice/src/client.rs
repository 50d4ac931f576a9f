//! VoiceChatClient – Fassade der Sprach-Sitzung
//!
//! Bindet Konfiguration, Audio-Backend und Transport zusammen:
//! registriert die Lebenszyklus-Hooks, startet die Pegelueberwachung
//! und reicht Mute/Lautstaerke/Abfragen an die Teilkomponenten durch.
//!
//! Die Mikrofon-Erkennung laeuft genau einmal beim Bau. Ist die
//! Berechtigungsabfrage per Konfiguration gefordert, wird asynchron
//! gesondet (und ggf. der Nutzer gefragt); sonst genuegt das passive
//! Ergebnis des Backends.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use sprechfunk_audio::AudioBackend;
use sprechfunk_core::{AboId, BeobachterListe, PeerId};

use crate::config::VoiceChatConfig;
use crate::level::{LevelMeter, LevelSnapshot};
use crate::session::{SitzungsZustand, VoiceSessionManager};
use crate::transport::PeerTransport;
use crate::volume::MuteVolumeController;

/// Fassade ueber Sitzungsverwaltung, Mute/Lautstaerke und Pegel
pub struct VoiceChatClient {
    manager: VoiceSessionManager,
    controller: MuteVolumeController,
    meter: LevelMeter,
    backend: Arc<dyn AudioBackend>,
    bei_mute: Arc<BeobachterListe<bool>>,
    bei_pegel: Arc<BeobachterListe<LevelSnapshot>>,
    pegel_task: JoinHandle<()>,
}

impl VoiceChatClient {
    /// Baut den Client: Mikrofon-Erkennung, Hook-Registrierung,
    /// Start der Pegelueberwachung
    pub async fn neu(
        config: VoiceChatConfig,
        backend: Arc<dyn AudioBackend>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let config = config.normalisiert();

        let mikrofon = if config.microphone_permission_check_required {
            backend.probe_microphone().await
        } else {
            backend.has_microphone()
        };
        if mikrofon {
            debug!("Mikrofon gefunden");
        } else {
            debug!("Kein Mikrofon gefunden, Sitzung bleibt empfangsseitig");
        }

        let intervall = config.level_check_interval();
        let zustand = Arc::new(Mutex::new(SitzungsZustand::neu(config, mikrofon)));

        // Das Handle bindet die Hooks an die Runtime des Bauzeitpunkts;
        // der Transport darf sie danach von beliebigen Threads rufen
        let manager = VoiceSessionManager::neu(
            Arc::clone(&zustand),
            Arc::clone(&backend),
            tokio::runtime::Handle::current(),
        );
        let bei_mute = Arc::new(BeobachterListe::neu());
        let bei_pegel = Arc::new(BeobachterListe::neu());
        let controller = MuteVolumeController::neu(Arc::clone(&zustand), Arc::clone(&bei_mute));
        let meter = LevelMeter::neu(
            Arc::clone(&zustand),
            Arc::clone(&transport),
            Arc::clone(&bei_pegel),
        );

        // Hooks binden ihren Kontext explizit als Klon des Managers
        {
            let m = manager.clone();
            transport.create_hook_registrieren(Box::new(move |peer_id, is_offer, verbindung| {
                m.peer_erstellt(peer_id, is_offer, verbindung);
            }));
        }
        {
            let m = manager.clone();
            transport.close_hook_registrieren(Box::new(move |peer_id| {
                m.peer_geschlossen(&peer_id);
            }));
        }

        let pegel_task = meter.takt_starten(intervall);

        Self {
            manager,
            controller,
            meter,
            backend,
            bei_mute,
            bei_pegel,
            pegel_task,
        }
    }

    // -- Mute und Lautstaerke ------------------------------------------------

    /// Schaltet das globale Mute um; `None` ohne Mikrofon
    pub fn mute_umschalten(&self) -> Option<bool> {
        self.controller.mute_umschalten()
    }

    pub fn ist_gemutet(&self) -> bool {
        self.controller.ist_gemutet()
    }

    /// Eingangslautstaerke, geclampt auf [0.0, 1.0]
    pub fn eingangs_lautstaerke_setzen(&self, volume: f32) {
        self.controller.eingangs_lautstaerke_setzen(volume);
    }

    /// Ausgangslautstaerke, geclampt auf [0.0, 1.0]
    pub fn ausgangs_lautstaerke_setzen(&self, volume: f32) {
        self.controller.ausgangs_lautstaerke_setzen(volume);
    }

    pub fn eingangs_lautstaerke(&self) -> f32 {
        self.controller.eingangs_lautstaerke()
    }

    pub fn ausgangs_lautstaerke(&self) -> f32 {
        self.controller.ausgangs_lautstaerke()
    }

    // -- Sitzung -------------------------------------------------------------

    /// Ergebnis der einmaligen Mikrofon-Erkennung
    pub fn hat_mikrofon(&self) -> bool {
        self.backend.has_microphone()
    }

    /// Baut alle Pipelines ab und setzt den Zustand auf die
    /// konfigurierten Anfangswerte zurueck
    pub fn leeren(&self) {
        self.manager.leeren();
    }

    /// Kennungen aller aktuell verfolgten Peers
    pub fn verbundene_peers(&self) -> Vec<PeerId> {
        self.manager.peer_ids()
    }

    // -- Pegel ---------------------------------------------------------------

    /// Letzter Pegel-Schnappschuss, `None` ohne Sitzung
    pub fn letzter_pegel_schnappschuss(&self) -> Option<LevelSnapshot> {
        self.meter.letzter_schnappschuss()
    }

    /// Pegel des lokalen Teilnehmers, [0.0, 1.0]
    pub fn lokaler_pegel(&self) -> f32 {
        self.meter.lokaler_pegel()
    }

    /// Lokaler Pegel in Dezibel, [-80.0, 0.0]
    pub fn lokaler_pegel_db(&self) -> f32 {
        self.meter.lokaler_pegel_db()
    }

    /// Ein manueller Takt der Pegelueberwachung
    pub fn tick(&self) {
        self.meter.tick();
    }

    // -- Ereignisse ----------------------------------------------------------

    /// Beobachtet Mute-Aenderungen
    pub fn bei_mute_aenderung(&self, f: impl Fn(&bool) + Send + Sync + 'static) -> AboId {
        self.bei_mute.abonnieren(f)
    }

    /// Beendet ein Mute-Abo
    pub fn mute_abo_beenden(&self, id: AboId) -> bool {
        self.bei_mute.abbestellen(id)
    }

    /// Beobachtet Pegel-Schnappschuesse (nur bei Aenderung gemeldet)
    pub fn bei_pegel_aenderung(
        &self,
        f: impl Fn(&LevelSnapshot) + Send + Sync + 'static,
    ) -> AboId {
        self.bei_pegel.abonnieren(f)
    }

    /// Beendet ein Pegel-Abo
    pub fn pegel_abo_beenden(&self, id: AboId) -> bool {
        self.bei_pegel.abbestellen(id)
    }
}

impl Drop for VoiceChatClient {
    fn drop(&mut self) {
        self.pegel_task.abort();
        self.backend.stop_capture();
    }
}
