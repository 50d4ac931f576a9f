//! Explizite Beobachter-Registrierung fuer Ereignisse
//!
//! Ersetzt reaktive Subjects durch eine Abonnenten-Liste mit
//! garantierter Abmeldung. Der Kontext wird beim Registrieren als
//! Closure gebunden – es gibt keinen globalen "aktuelle Instanz"-Zustand
//! fuer den Dispatch.

use parking_lot::Mutex;
use std::sync::Arc;

/// Kennung eines Abonnements, wird zum Abbestellen benoetigt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AboId(u64);

type Beobachter<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListeInnen<T> {
    naechste_id: u64,
    beobachter: Vec<(AboId, Beobachter<T>)>,
}

/// Abonnenten-Liste fuer ein Ereignis vom Typ `T`
///
/// `melden` ruft die Beobachter ausserhalb des internen Locks auf, damit
/// ein Beobachter waehrend der Meldung abonnieren oder abbestellen darf.
pub struct BeobachterListe<T> {
    innen: Mutex<ListeInnen<T>>,
}

impl<T> BeobachterListe<T> {
    /// Erstellt eine leere Beobachter-Liste
    pub fn neu() -> Self {
        Self {
            innen: Mutex::new(ListeInnen {
                naechste_id: 0,
                beobachter: Vec::new(),
            }),
        }
    }

    /// Registriert einen Beobachter und gibt die Abonnement-Kennung zurueck
    pub fn abonnieren(&self, f: impl Fn(&T) + Send + Sync + 'static) -> AboId {
        let mut innen = self.innen.lock();
        let id = AboId(innen.naechste_id);
        innen.naechste_id += 1;
        innen.beobachter.push((id, Arc::new(f)));
        id
    }

    /// Entfernt ein Abonnement. Gibt `false` zurueck wenn die Kennung
    /// unbekannt war (z.B. bereits abbestellt).
    pub fn abbestellen(&self, id: AboId) -> bool {
        let mut innen = self.innen.lock();
        let vorher = innen.beobachter.len();
        innen.beobachter.retain(|(abo, _)| *abo != id);
        innen.beobachter.len() != vorher
    }

    /// Meldet ein Ereignis an alle aktuell registrierten Beobachter
    pub fn melden(&self, wert: &T) {
        let beobachter: Vec<Beobachter<T>> = {
            let innen = self.innen.lock();
            innen.beobachter.iter().map(|(_, f)| Arc::clone(f)).collect()
        };
        for f in beobachter {
            f(wert);
        }
    }

    /// Anzahl der registrierten Beobachter
    pub fn anzahl(&self) -> usize {
        self.innen.lock().beobachter.len()
    }
}

impl<T> Default for BeobachterListe<T> {
    fn default() -> Self {
        Self::neu()
    }
}
