//! Gemeinsame Identifikationstypen fuer Sprechfunk
//!
//! Kennungen verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen Schluessel-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};

/// Eindeutige Kennung eines verbundenen Peers
///
/// Opaker String, vom Transport vergeben. Nur unter den aktuell
/// verbundenen Peers eindeutig – nach dem Trennen kann dieselbe
/// Kennung erneut auftauchen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl PeerId {
    /// Erstellt eine PeerId aus einem beliebigen String
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt die Kennung als String-Slice zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Medien-Art einer ausgehandelten Spur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Schluessel eines Teilnehmers im Pegel-Schnappschuss
///
/// Ein Enum statt eines reservierten Strings: ein Peer der woertlich
/// "self" heisst kann so nicht mit dem lokalen Teilnehmer kollidieren.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParticipantKey {
    /// Der lokale Teilnehmer
    Selbst,
    /// Ein verbundener Peer
    Peer(PeerId),
}

impl ParticipantKey {
    /// Gibt zurueck ob der Schluessel den lokalen Teilnehmer bezeichnet
    pub fn ist_selbst(&self) -> bool {
        matches!(self, Self::Selbst)
    }
}

impl std::fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Selbst => write!(f, "self"),
            Self::Peer(id) => write!(f, "{}", id),
        }
    }
}
