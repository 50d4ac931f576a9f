//! Transport-Grenze
//!
//! Der Transport (Signalisierung, Verbindungsaushandlung) ist ein
//! externer Kollaborateur und hier nur als Trait spezifiziert. Hooks
//! binden ihren Kontext beim Registrieren als Closure – es gibt keinen
//! globalen "aktuelle Instanz"-Zustand fuer den Dispatch.
//!
//! Ordnungsgarantie des Transports: Create/Close-Ereignisse derselben
//! Peer-Kennung sind serialisiert und nie nebenlaeufig.

use std::sync::Arc;

use sprechfunk_audio::{SampleSource, SendTrack};
use sprechfunk_core::{MediaKind, PeerId, Result};

/// Hook fuer neu ausgehandelte Peer-Verbindungen
pub type CreateHook = Box<dyn Fn(PeerId, bool, Arc<dyn Verbindung>) + Send + Sync>;
/// Hook fuer geschlossene Peer-Verbindungen
pub type CloseHook = Box<dyn Fn(PeerId) + Send + Sync>;
/// Hook fuer angekommene entfernte Spuren
pub type TrackHook = Box<dyn Fn(MediaKind, MedienStrom) + Send + Sync>;

/// Entfernter Medienstrom, vom Transport mit dem Spur-Ankunft-Ereignis
/// geliefert
pub struct MedienStrom {
    /// Medien-Art der Spur
    pub art: MediaKind,
    /// Abtastbare Quelle der entfernten Samples
    pub quelle: Arc<dyn SampleSource>,
}

/// Handle einer ausgehandelten Peer-Verbindung
pub trait Verbindung: Send + Sync {
    /// Handelt eine Sendespur der gegebenen Art aus und bindet die
    /// Quelle als ausgehenden Netzwerk-Pfad
    fn sende_spur_aushandeln(
        &self,
        art: MediaKind,
        quelle: Arc<dyn SampleSource>,
    ) -> Result<Box<dyn SendTrack>>;

    /// Handelt einen reinen Empfangs-Transceiver aus (Degraded-Mode
    /// ohne Mikrofon)
    fn nur_empfang_aushandeln(&self, art: MediaKind) -> Result<()>;

    /// Registriert den Hook fuer ankommende entfernte Spuren
    fn bei_spur_ankunft(&self, hook: TrackHook);
}

/// Transport-Kollaborateur
pub trait PeerTransport: Send + Sync {
    /// Registriert den Hook fuer neue Peer-Verbindungen
    fn create_hook_registrieren(&self, hook: CreateHook);

    /// Registriert den Hook fuer geschlossene Peer-Verbindungen
    fn close_hook_registrieren(&self, hook: CloseHook);

    /// Kennung der lokalen Sitzung, `None` solange keine Sitzung laeuft.
    /// Steuert die Idle/Sampling-Zustandsmaschine der Pegelueberwachung.
    fn lokale_id(&self) -> Option<PeerId>;
}
