pub mod error;
pub mod notes;
pub mod settings;

pub use crate::error::DomainError;
pub use crate::notes::{
    active_notes, find_note, resolve_start_note, start_note_options, Note, NoteGroup,
};
pub use crate::settings::{
    clamp_interval, sanitize_volume, validate_interval, NoteOrder, Settings, VoiceId,
    DEFAULT_INTERVAL_SECONDS, DEFAULT_VOLUME, INTERVAL_RANGE,
};
