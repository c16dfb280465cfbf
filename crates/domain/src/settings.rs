use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::notes::{active_notes, NoteGroup};
use crate::DomainError;

pub const DEFAULT_INTERVAL_SECONDS: u32 = 15;
/// Range offered by the interval control.
pub const INTERVAL_RANGE: RangeInclusive<u32> = 1..=60;
pub const DEFAULT_VOLUME: f32 = 0.75;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoteOrder {
    #[default]
    Ascending,
    Random,
}

impl NoteOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteOrder::Ascending => "ascending",
            NoteOrder::Random => "random",
        }
    }
}

impl FromStr for NoteOrder {
    type Err = std::convert::Infallible;

    /// Anything other than `random` is a fixed order.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(if value == "random" {
            NoteOrder::Random
        } else {
            NoteOrder::Ascending
        })
    }
}

/// Name of a speech voice as reported by the synthesizer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VoiceId(pub String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub interval_seconds: u32,
    pub include_naturals: bool,
    pub include_sharps: bool,
    pub include_flats: bool,
    pub note_order: NoteOrder,
    pub start_note: Option<String>,
    pub speech_enabled: bool,
    pub voice_id: Option<VoiceId>,
    pub volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            include_naturals: true,
            include_sharps: true,
            include_flats: true,
            note_order: NoteOrder::Ascending,
            start_note: None,
            speech_enabled: false,
            voice_id: None,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl Settings {
    pub fn includes(&self, group: NoteGroup) -> bool {
        match group {
            NoteGroup::Natural => self.include_naturals,
            NoteGroup::Sharp => self.include_sharps,
            NoteGroup::Flat => self.include_flats,
        }
    }

    /// Sets one group flag, then re-enables every group if none is left.
    pub fn set_group(&mut self, group: NoteGroup, enabled: bool) {
        match group {
            NoteGroup::Natural => self.include_naturals = enabled,
            NoteGroup::Sharp => self.include_sharps = enabled,
            NoteGroup::Flat => self.include_flats = enabled,
        }
        self.enforce_group_invariant();
    }

    /// Returns true when the flags had to be forced on.
    pub fn enforce_group_invariant(&mut self) -> bool {
        if self.include_naturals || self.include_sharps || self.include_flats {
            return false;
        }
        self.include_naturals = true;
        self.include_sharps = true;
        self.include_flats = true;
        true
    }

    pub fn set_interval(&mut self, seconds: u32) -> Result<(), DomainError> {
        validate_interval(seconds)?;
        self.interval_seconds = seconds;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(DomainError::validation(format!(
                "volume must be between 0 and 1, got {volume}"
            )));
        }
        self.volume = volume;
        Ok(())
    }

    /// Accepts only symbols from the currently active note set.
    pub fn set_start_note(&mut self, symbol: &str) -> Result<(), DomainError> {
        if !active_notes(self).iter().any(|note| note.symbol == symbol) {
            return Err(DomainError::UnknownNote(symbol.to_string()));
        }
        self.start_note = Some(symbol.to_string());
        Ok(())
    }
}

pub fn validate_interval(seconds: u32) -> Result<(), DomainError> {
    if seconds == 0 {
        return Err(DomainError::validation("interval must be a positive number of seconds"));
    }
    Ok(())
}

/// Clamps to the interval control's range.
pub fn clamp_interval(seconds: u32) -> u32 {
    seconds.clamp(*INTERVAL_RANGE.start(), *INTERVAL_RANGE.end())
}

/// Maps NaN to the default and clamps everything else into [0, 1].
pub fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        DEFAULT_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}
