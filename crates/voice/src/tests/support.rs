//! Test-Fakes fuer Transport, Backend und Quellen

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sprechfunk_audio::{
    AudioBackend, AudioError, AudioResult, PlaybackSink, SampleSource, SendTrack,
};
use sprechfunk_core::{MediaKind, PeerId, Result};

use crate::transport::{CloseHook, CreateHook, MedienStrom, PeerTransport, TrackHook, Verbindung};

use crate::client::VoiceChatClient;
use crate::config::VoiceChatConfig;

/// Baut einen Client mit Standardkonfiguration gegen die Fakes
pub async fn client_bauen(
    mikrofon: bool,
) -> (VoiceChatClient, Arc<FakeBackend>, Arc<FakeTransport>) {
    let backend = FakeBackend::neu(mikrofon);
    let transport = FakeTransport::neu();
    let client = VoiceChatClient::neu(
        VoiceChatConfig::default(),
        Arc::clone(&backend) as Arc<dyn AudioBackend>,
        Arc::clone(&transport) as Arc<dyn PeerTransport>,
    )
    .await;
    (client, backend, transport)
}

// ---------------------------------------------------------------------------
// Quellen
// ---------------------------------------------------------------------------

/// Quelle mit setzbarem konstantem Sample-Wert
pub struct KonstanteQuelle {
    wert: Mutex<f32>,
}

impl KonstanteQuelle {
    pub fn neu(wert: f32) -> Arc<Self> {
        Arc::new(Self {
            wert: Mutex::new(wert),
        })
    }

    pub fn setzen(&self, wert: f32) {
        *self.wert.lock() = wert;
    }
}

impl SampleSource for KonstanteQuelle {
    fn read_window(&self, out: &mut [f32]) -> usize {
        out.fill(*self.wert.lock());
        out.len()
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Handles einer ausgehandelten Sendespur (enabled, gestoppt)
pub type SpurHandles = (Arc<AtomicBool>, Arc<AtomicBool>);

struct FakeSendTrack {
    enabled: Arc<AtomicBool>,
    gestoppt: Arc<AtomicBool>,
}

impl SendTrack for FakeSendTrack {
    fn set_enabled(&self, enabled: bool) -> AudioResult<()> {
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> AudioResult<()> {
        self.gestoppt.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Verbindung die Aushandlungen zaehlt und Spuren liefern kann
pub struct FakeVerbindung {
    pub sende_aushandlungen: AtomicUsize,
    pub empfangs_aushandlungen: AtomicUsize,
    pub spuren: Mutex<Vec<SpurHandles>>,
    track_hook: Mutex<Option<TrackHook>>,
}

impl FakeVerbindung {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            sende_aushandlungen: AtomicUsize::new(0),
            empfangs_aushandlungen: AtomicUsize::new(0),
            spuren: Mutex::new(Vec::new()),
            track_hook: Mutex::new(None),
        })
    }

    /// Simuliert die Ankunft einer entfernten Audiospur
    pub fn spur_liefern(&self, quelle: Arc<dyn SampleSource>) {
        let hook = self.track_hook.lock();
        let hook = hook.as_ref().expect("Kein Spur-Hook registriert");
        hook(
            MediaKind::Audio,
            MedienStrom {
                art: MediaKind::Audio,
                quelle,
            },
        );
    }

    /// Handles der zuletzt ausgehandelten Sendespur
    pub fn letzte_spur(&self) -> SpurHandles {
        self.spuren
            .lock()
            .last()
            .cloned()
            .expect("Keine Sendespur ausgehandelt")
    }
}

impl Verbindung for FakeVerbindung {
    fn sende_spur_aushandeln(
        &self,
        _art: MediaKind,
        _quelle: Arc<dyn SampleSource>,
    ) -> Result<Box<dyn SendTrack>> {
        self.sende_aushandlungen.fetch_add(1, Ordering::SeqCst);
        let enabled = Arc::new(AtomicBool::new(true));
        let gestoppt = Arc::new(AtomicBool::new(false));
        self.spuren
            .lock()
            .push((Arc::clone(&enabled), Arc::clone(&gestoppt)));
        Ok(Box::new(FakeSendTrack { enabled, gestoppt }))
    }

    fn nur_empfang_aushandeln(&self, _art: MediaKind) -> Result<()> {
        self.empfangs_aushandlungen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn bei_spur_ankunft(&self, hook: TrackHook) {
        *self.track_hook.lock() = Some(hook);
    }
}

/// Transport der registrierte Hooks aufzeichnet und ausloesen kann
pub struct FakeTransport {
    create_hooks: Mutex<Vec<CreateHook>>,
    close_hooks: Mutex<Vec<CloseHook>>,
    lokale: Mutex<Option<PeerId>>,
}

impl FakeTransport {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            create_hooks: Mutex::new(Vec::new()),
            close_hooks: Mutex::new(Vec::new()),
            lokale: Mutex::new(Some(PeerId::neu("lokal"))),
        })
    }

    pub fn lokale_setzen(&self, id: Option<PeerId>) {
        *self.lokale.lock() = id;
    }

    /// Loest die Create-Hooks fuer einen neuen Peer aus
    pub fn peer_verbinden(&self, id: &str) -> Arc<FakeVerbindung> {
        let verbindung = FakeVerbindung::neu();
        for hook in self.create_hooks.lock().iter() {
            hook(
                PeerId::neu(id),
                true,
                Arc::clone(&verbindung) as Arc<dyn Verbindung>,
            );
        }
        verbindung
    }

    /// Loest die Close-Hooks fuer einen Peer aus
    pub fn peer_trennen(&self, id: &str) {
        for hook in self.close_hooks.lock().iter() {
            hook(PeerId::neu(id));
        }
    }
}

impl PeerTransport for FakeTransport {
    fn create_hook_registrieren(&self, hook: CreateHook) {
        self.create_hooks.lock().push(hook);
    }

    fn close_hook_registrieren(&self, hook: CloseHook) {
        self.close_hooks.lock().push(hook);
    }

    fn lokale_id(&self) -> Option<PeerId> {
        self.lokale.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

struct FakeSink {
    gestoppt: Arc<AtomicBool>,
}

impl PlaybackSink for FakeSink {
    fn stop(&self) -> AudioResult<()> {
        self.gestoppt.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend mit steuerbarer Mikrofon-Faehigkeit
pub struct FakeBackend {
    mikrofon: AtomicBool,
    pub proben: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    /// Verzoegerung des Capture-Starts (Berechtigungsabfrage)
    start_verzoegerung: Mutex<Option<Duration>>,
    start_schlaegt_fehl: AtomicBool,
    quelle: Arc<KonstanteQuelle>,
    pub sinks: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeBackend {
    pub fn neu(mikrofon: bool) -> Arc<Self> {
        Arc::new(Self {
            mikrofon: AtomicBool::new(mikrofon),
            proben: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            start_verzoegerung: Mutex::new(None),
            start_schlaegt_fehl: AtomicBool::new(false),
            quelle: KonstanteQuelle::neu(0.0),
            sinks: Mutex::new(Vec::new()),
        })
    }

    /// Geteilte Capture-Quelle des Backends
    pub fn capture_quelle(&self) -> Arc<KonstanteQuelle> {
        Arc::clone(&self.quelle)
    }

    pub fn start_verzoegern(&self, d: Duration) {
        *self.start_verzoegerung.lock() = Some(d);
    }

    pub fn start_fehlschlagen_lassen(&self) {
        self.start_schlaegt_fehl.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn probe_microphone(&self) -> bool {
        self.proben.fetch_add(1, Ordering::SeqCst);
        self.mikrofon.load(Ordering::SeqCst)
    }

    fn has_microphone(&self) -> bool {
        self.mikrofon.load(Ordering::SeqCst)
    }

    async fn start_capture(&self) -> AudioResult<Arc<dyn SampleSource>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let verzoegerung = *self.start_verzoegerung.lock();
        if let Some(d) = verzoegerung {
            tokio::time::sleep(d).await;
        }
        if self.start_schlaegt_fehl.load(Ordering::SeqCst) {
            return Err(AudioError::KeinMikrofon);
        }
        Ok(Arc::clone(&self.quelle) as Arc<dyn SampleSource>)
    }

    fn stop_capture(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn create_playback_sink(
        &self,
        _quelle: Arc<dyn SampleSource>,
    ) -> AudioResult<Box<dyn PlaybackSink>> {
        let gestoppt = Arc::new(AtomicBool::new(false));
        self.sinks.lock().push(Arc::clone(&gestoppt));
        Ok(Box::new(FakeSink { gestoppt }))
    }
}
