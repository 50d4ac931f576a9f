//! sprechfunk-voice – Sprach-Sitzungsverwaltung
//!
//! Der Kern von Sprechfunk: pro verbundenem Peer wird eine
//! Audio-Pipeline auf- und wieder abgebaut, konsistent mit den
//! asynchron eintreffenden Lebenszyklus-Ereignissen des Transports.
//!
//! Komponenten:
//! - `VoiceSessionManager`: Peer -> Pipeline, Create/Close/Clear
//! - `MuteVolumeController`: globales Mute und Ein-/Ausgangslautstaerke,
//!   rueckwirkend und fuer kuenftige Pipelines
//! - `LevelMeter`: periodisches Abtasten aller Pipelines, Schnappschuss-
//!   Diffing, Meldung nur bei Aenderung
//! - `VoiceChatClient`: Fassade, bindet Konfiguration, Backend und
//!   Transport-Hooks zusammen
//!
//! Transport und Plattform-Audio sind externe Kollaborateure und nur
//! als Traits spezifiziert (`transport`, `sprechfunk_audio::backend`).

pub mod client;
pub mod config;
pub mod level;
pub mod session;
pub mod transport;
pub mod volume;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use client::VoiceChatClient;
pub use config::VoiceChatConfig;
pub use level::{LevelMeter, LevelSnapshot};
pub use session::VoiceSessionManager;
pub use transport::{CloseHook, CreateHook, MedienStrom, PeerTransport, TrackHook, Verbindung};
pub use volume::MuteVolumeController;
