//! Fehlertypen fuer die Audio-Ketten

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Seite
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Kein Mikrofon verfuegbar")]
    KeinMikrofon,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Nicht unterstuetztes Sample-Format: {0}")]
    SampleFormat(String),

    #[error("Audio-Thread antwortet nicht")]
    ThreadAntwortetNicht,

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
