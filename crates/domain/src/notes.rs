use serde::{Deserialize, Serialize};

use crate::settings::Settings;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NoteGroup {
    Natural,
    Sharp,
    Flat,
}

impl NoteGroup {
    /// Order in which enabled groups are concatenated into the active set.
    pub const ACTIVE_ORDER: [NoteGroup; 3] = [NoteGroup::Natural, NoteGroup::Flat, NoteGroup::Sharp];

    pub fn notes(self) -> &'static [Note] {
        match self {
            NoteGroup::Natural => NATURALS,
            NoteGroup::Sharp => SHARPS,
            NoteGroup::Flat => FLATS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteGroup::Natural => "natural",
            NoteGroup::Sharp => "sharp",
            NoteGroup::Flat => "flat",
        }
    }
}

/// A pitch name with the text shown on screen and the text handed to speech.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
pub struct Note {
    pub symbol: &'static str,
    pub spoken: &'static str,
    pub group: NoteGroup,
}

impl Note {
    const fn new(symbol: &'static str, spoken: &'static str, group: NoteGroup) -> Self {
        Self {
            symbol,
            spoken,
            group,
        }
    }

    pub fn same_symbol(&self, other: &Note) -> bool {
        self.symbol == other.symbol
    }
}

impl Default for Note {
    fn default() -> Self {
        NATURALS[0]
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol)
    }
}

const NATURALS: &[Note] = &[
    Note::new("C", "C", NoteGroup::Natural),
    Note::new("D", "D", NoteGroup::Natural),
    Note::new("E", "E", NoteGroup::Natural),
    Note::new("F", "F", NoteGroup::Natural),
    Note::new("G", "G", NoteGroup::Natural),
    Note::new("A", "A", NoteGroup::Natural),
    Note::new("B", "B", NoteGroup::Natural),
];

// "A" is quoted so speech engines read the letter rather than the article.
const SHARPS: &[Note] = &[
    Note::new("C#", "C sharp", NoteGroup::Sharp),
    Note::new("D#", "D sharp", NoteGroup::Sharp),
    Note::new("F#", "F sharp", NoteGroup::Sharp),
    Note::new("G#", "G sharp", NoteGroup::Sharp),
    Note::new("A#", "\"A\" sharp", NoteGroup::Sharp),
];

const FLATS: &[Note] = &[
    Note::new("Db", "D flat", NoteGroup::Flat),
    Note::new("Eb", "E flat", NoteGroup::Flat),
    Note::new("Gb", "G flat", NoteGroup::Flat),
    Note::new("Ab", "\"A\" flat", NoteGroup::Flat),
    Note::new("Bb", "B flat", NoteGroup::Flat),
];

/// Enabled groups concatenated as naturals, flats, sharps.
pub fn active_notes(settings: &Settings) -> Vec<Note> {
    NoteGroup::ACTIVE_ORDER
        .iter()
        .filter(|group| settings.includes(**group))
        .flat_map(|group| group.notes().iter().copied())
        .collect()
}

pub fn find_note(symbol: &str) -> Option<Note> {
    NoteGroup::ACTIVE_ORDER
        .iter()
        .flat_map(|group| group.notes().iter())
        .find(|note| note.symbol == symbol)
        .copied()
}

/// Choices offered for the starting note. Kept in active-set order.
pub fn start_note_options(settings: &Settings) -> Vec<Note> {
    active_notes(settings)
}

/// The stored start note when it is still active, otherwise the first active note.
pub fn resolve_start_note(settings: &Settings) -> Option<Note> {
    let options = start_note_options(settings);
    settings
        .start_note
        .as_deref()
        .and_then(|symbol| options.iter().find(|note| note.symbol == symbol))
        .or_else(|| options.first())
        .copied()
}
