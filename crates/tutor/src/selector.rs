use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use lobber_domain::Note;

/// Draws notes uniformly while never repeating the previous symbol.
pub struct NoteSelector {
    rng: StdRng,
}

impl NoteSelector {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `None` only for an empty active set. When no note differs from
    /// `previous` the first note is returned rather than resampling forever.
    pub fn next(&mut self, active: &[Note], previous: &Note) -> Option<Note> {
        let first = *active.first()?;
        if active.iter().all(|note| note.same_symbol(previous)) {
            return Some(first);
        }
        let mut draws = 0u32;
        loop {
            draws += 1;
            let candidate = active[self.rng.random_range(0..active.len())];
            if !candidate.same_symbol(previous) {
                trace!(draws, symbol = candidate.symbol, "selected note");
                return Some(candidate);
            }
        }
    }
}

impl Default for NoteSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobber_domain::{active_notes, find_note, NoteGroup, Settings};

    #[test]
    fn never_repeats_previous_symbol() {
        let notes = active_notes(&Settings::default());
        let mut selector = NoteSelector::seeded(7);
        let mut previous = Note::default();
        for _ in 0..2_000 {
            let next = selector.next(&notes, &previous).unwrap();
            assert_ne!(next.symbol, previous.symbol);
            previous = next;
        }
    }

    #[test]
    fn two_note_set_alternates() {
        let notes = vec![find_note("C").unwrap(), find_note("D").unwrap()];
        let mut selector = NoteSelector::seeded(1);
        let mut previous = notes[0];
        for _ in 0..50 {
            let next = selector.next(&notes, &previous).unwrap();
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn singleton_set_returns_immediately() {
        let only = find_note("F#").unwrap();
        let mut selector = NoteSelector::seeded(3);
        assert_eq!(selector.next(&[only], &only), Some(only));
        assert_eq!(selector.next(&[only, only], &only), Some(only));
    }

    #[test]
    fn singleton_differing_from_previous_is_returned() {
        let only = find_note("Bb").unwrap();
        let mut selector = NoteSelector::seeded(3);
        assert_eq!(selector.next(&[only], &Note::default()), Some(only));
    }

    #[test]
    fn empty_set_yields_none() {
        let mut selector = NoteSelector::seeded(0);
        assert_eq!(selector.next(&[], &Note::default()), None);
    }

    #[test]
    fn every_active_note_is_eventually_drawn() {
        let notes = NoteGroup::Flat.notes();
        let mut selector = NoteSelector::seeded(42);
        let mut previous = Note::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            previous = selector.next(notes, &previous).unwrap();
            seen.insert(previous.symbol);
        }
        assert_eq!(seen.len(), notes.len());
    }
}
