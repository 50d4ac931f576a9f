//! sprechfunk-audio – Audio-Ketten fuer Sprechfunk
//!
//! Pro Peer existiert genau eine `AudioPipeline`:
//! - Eingangskette: geteilte Capture-Quelle -> Gain -> Pegelmesser -> Sendespur
//! - Ausgangskette: entfernte Quelle -> Gain -> Pegelmesser -> Playback-Sink
//!
//! Die Plattform-Seite (Mikrofon, Lautsprecher) liegt hinter dem
//! faehigkeits-polymorphen `AudioBackend`-Interface mit zwei
//! Implementierungen: cpal-nativ und stumm/capture-los. Die Auswahl
//! erfolgt einmal beim Start, nicht an jeder Aufrufstelle.

pub mod backend;
pub mod error;
pub mod gain;
pub mod meter;
pub mod native;
pub mod pipeline;
pub mod source;

// Bequeme Re-Exporte der wichtigsten Typen
pub use backend::{AudioBackend, PlaybackSink, StummBackend};
pub use error::{AudioError, AudioResult};
pub use gain::GainControl;
pub use meter::{level_to_db, MeterTap, METER_WINDOW};
pub use native::NativeBackend;
pub use pipeline::{AudioPipeline, InputChain, OutputChain, SendTrack};
pub use source::{GainedSource, SampleSource, SilenceSource};
