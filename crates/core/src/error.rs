//! Fehlertypen fuer Sprechfunk
//!
//! Zentraler Fehler-Enum. Nichts in diesem Subsystem ist fatal fuer die
//! Gesamtsitzung: Fehler werden lokal behandelt, schlimmstenfalls bleibt
//! eine einzelne Pipeline stumm. Der Enum existiert fuer die Stellen, an
//! denen ein Ergebnis nach aussen gereicht wird (Aushandlung, Backend).

use thiserror::Error;

/// Globaler Result-Alias fuer Sprechfunk
pub type Result<T> = std::result::Result<T, SprechfunkError>;

/// Alle moeglichen Fehler im Sprechfunk-System
#[derive(Debug, Error)]
pub enum SprechfunkError {
    #[error("Transportfehler: {0}")]
    Transport(String),

    #[error("Aushandlung fehlgeschlagen: {0}")]
    Aushandlung(String),

    #[error("Audiofehler: {0}")]
    Audio(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SprechfunkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}
