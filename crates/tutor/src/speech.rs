use anyhow::Result;
use serde::{Deserialize, Serialize};

use lobber_domain::VoiceId;

pub const UTTERANCE_PITCH: f32 = 1.0;
pub const UTTERANCE_RATE: f32 = 0.9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voice {
    pub id: VoiceId,
    /// Human-readable name, when the synthesizer reports one.
    pub label: Option<String>,
}

impl Voice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: VoiceId::new(id),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
    /// `None` leaves the choice to the synthesizer's default voice.
    pub voice: Option<VoiceId>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, volume: f32, voice: Option<VoiceId>) -> Self {
        Self {
            text: text.into(),
            pitch: UTTERANCE_PITCH,
            rate: UTTERANCE_RATE,
            volume,
            voice,
        }
    }
}

/// Text-to-speech provided by the platform. `speak` must not block on playback.
pub trait SpeechSynthesizer: Send + Sync {
    /// Voices available right now; the list may change between calls.
    fn voices(&self) -> Vec<Voice>;
    fn speak(&self, utterance: Utterance) -> Result<()>;
}

/// A synthesizer with no voices that never produces sound.
pub struct SilentSpeech;

impl SpeechSynthesizer for SilentSpeech {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&self, _utterance: Utterance) -> Result<()> {
        Ok(())
    }
}

/// Picks the voice for an utterance.
///
/// Nothing stored selects the first available voice. A stored voice that is
/// no longer installed yields `None` so the synthesizer falls back to its
/// default.
pub fn resolve_voice(stored: Option<&VoiceId>, available: &[Voice]) -> Option<VoiceId> {
    match stored {
        None => available.first().map(|voice| voice.id.clone()),
        Some(id) => available
            .iter()
            .find(|voice| &voice.id == id)
            .map(|voice| voice.id.clone()),
    }
}
