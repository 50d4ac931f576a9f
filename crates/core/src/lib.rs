//! sprechfunk-core – Gemeinsame Typen, Fehler und Event-Primitiven
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von den
//! anderen Sprechfunk-Crates gemeinsam genutzt werden:
//! - Newtype-Kennungen (`PeerId`, `ParticipantKey`)
//! - Zentraler Fehler-Enum (`SprechfunkError`)
//! - Explizite Beobachter-Registrierung fuer Ereignisse (`BeobachterListe`)
//! - Logging-Initialisierung via tracing-subscriber

pub mod error;
pub mod event;
pub mod logging;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, SprechfunkError};
pub use event::{AboId, BeobachterListe};
pub use logging::{logging_initialisieren, LogFormat};
pub use types::{MediaKind, ParticipantKey, PeerId};
