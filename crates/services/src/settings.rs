use std::str::FromStr;

use tracing::{debug, info};

use lobber_domain::{
    sanitize_volume, DomainError, NoteGroup, NoteOrder, Settings, VoiceId,
    DEFAULT_INTERVAL_SECONDS, DEFAULT_VOLUME,
};

use crate::store::{KeyValueStore, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKey {
    IntervalSeconds,
    IncludeNaturals,
    IncludeSharps,
    IncludeFlats,
    NoteOrder,
    StartNote,
    SpeechEnabled,
    VoiceId,
    Volume,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::IntervalSeconds,
        SettingKey::IncludeNaturals,
        SettingKey::IncludeSharps,
        SettingKey::IncludeFlats,
        SettingKey::NoteOrder,
        SettingKey::StartNote,
        SettingKey::SpeechEnabled,
        SettingKey::VoiceId,
        SettingKey::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::IntervalSeconds => "intervalSeconds",
            SettingKey::IncludeNaturals => "includeNaturals",
            SettingKey::IncludeSharps => "includeSharps",
            SettingKey::IncludeFlats => "includeFlats",
            SettingKey::NoteOrder => "noteOrder",
            SettingKey::StartNote => "startNote",
            SettingKey::SpeechEnabled => "speechEnabled",
            SettingKey::VoiceId => "voiceId",
            SettingKey::Volume => "volume",
        }
    }

    pub fn for_group(group: NoteGroup) -> Self {
        match group {
            NoteGroup::Natural => SettingKey::IncludeNaturals,
            NoteGroup::Sharp => SettingKey::IncludeSharps,
            NoteGroup::Flat => SettingKey::IncludeFlats,
        }
    }
}

impl FromStr for SettingKey {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| StoreError::UnknownKey(value.to_string()))
    }
}

/// User preferences backed by a key-value store. Every setter writes through
/// immediately.
pub struct SettingsStore<S> {
    store: S,
    settings: Settings,
}

impl<S: KeyValueStore> SettingsStore<S> {
    /// Reads every field, substituting defaults for missing or invalid values.
    pub fn load(store: S) -> Self {
        let interval_seconds = store
            .get(SettingKey::IntervalSeconds.as_str())
            .and_then(|raw| match raw.trim().parse::<u32>() {
                Ok(seconds) if seconds > 0 => Some(seconds),
                _ => {
                    debug!(raw = %raw, "invalid stored interval, using default");
                    None
                }
            })
            .unwrap_or(DEFAULT_INTERVAL_SECONDS);

        let flag = |key: SettingKey| store.get(key.as_str()).as_deref() == Some("true");
        let mut settings = Settings {
            interval_seconds,
            include_naturals: flag(SettingKey::IncludeNaturals),
            include_sharps: flag(SettingKey::IncludeSharps),
            include_flats: flag(SettingKey::IncludeFlats),
            note_order: store
                .get(SettingKey::NoteOrder.as_str())
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default(),
            start_note: store.get(SettingKey::StartNote.as_str()),
            speech_enabled: flag(SettingKey::SpeechEnabled),
            voice_id: store
                .get(SettingKey::VoiceId.as_str())
                .filter(|raw| !raw.is_empty())
                .map(VoiceId::new),
            volume: store
                .get(SettingKey::Volume.as_str())
                .and_then(|raw| raw.trim().parse::<f32>().ok())
                .map(sanitize_volume)
                .unwrap_or(DEFAULT_VOLUME),
        };
        if settings.enforce_group_invariant() {
            debug!("no note groups enabled, enabling all");
        }
        Self { store, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn persist(&mut self, key: SettingKey, value: &str) -> Result<(), StoreError> {
        info!(key = key.as_str(), value, "saving setting");
        self.store.set(key.as_str(), value)
    }

    pub fn set_interval(&mut self, seconds: u32) -> Result<(), StoreError> {
        self.settings.set_interval(seconds)?;
        self.persist(SettingKey::IntervalSeconds, &seconds.to_string())
    }

    /// Persists all three flags so a reload sees exactly the in-memory state,
    /// including flags the invariant forced back on.
    pub fn toggle_group(&mut self, group: NoteGroup, enabled: bool) -> Result<(), StoreError> {
        self.settings.set_group(group, enabled);
        for group in NoteGroup::ACTIVE_ORDER {
            let value = self.settings.includes(group).to_string();
            self.persist(SettingKey::for_group(group), &value)?;
        }
        Ok(())
    }

    pub fn set_note_order(&mut self, order: NoteOrder) -> Result<(), StoreError> {
        self.settings.note_order = order;
        self.persist(SettingKey::NoteOrder, order.as_str())
    }

    pub fn set_start_note(&mut self, symbol: &str) -> Result<(), StoreError> {
        self.settings.set_start_note(symbol)?;
        self.persist(SettingKey::StartNote, symbol)
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.settings.speech_enabled = enabled;
        self.persist(SettingKey::SpeechEnabled, &enabled.to_string())
    }

    /// `None` forgets the choice so the first available voice is used.
    pub fn set_voice(&mut self, voice: Option<VoiceId>) -> Result<(), StoreError> {
        match &voice {
            Some(id) => self.persist(SettingKey::VoiceId, id.id())?,
            None => {
                info!(key = SettingKey::VoiceId.as_str(), "clearing setting");
                self.store.remove(SettingKey::VoiceId.as_str())?;
            }
        }
        self.settings.voice_id = voice;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), StoreError> {
        self.settings.set_volume(volume)?;
        self.persist(SettingKey::Volume, &volume.to_string())
    }

    /// Parses `value` for `key` and routes it through the matching setter.
    pub fn set_from_str(&mut self, key: SettingKey, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        match key {
            SettingKey::IntervalSeconds => self.set_interval(parse(key, value)?),
            SettingKey::IncludeNaturals => self.toggle_group(NoteGroup::Natural, parse(key, value)?),
            SettingKey::IncludeSharps => self.toggle_group(NoteGroup::Sharp, parse(key, value)?),
            SettingKey::IncludeFlats => self.toggle_group(NoteGroup::Flat, parse(key, value)?),
            SettingKey::NoteOrder => self.set_note_order(parse(key, value)?),
            SettingKey::StartNote => self.set_start_note(value),
            SettingKey::SpeechEnabled => self.set_speech_enabled(parse(key, value)?),
            SettingKey::VoiceId => {
                self.set_voice((!value.is_empty()).then(|| VoiceId::new(value)))
            }
            SettingKey::Volume => self.set_volume(parse(key, value)?),
        }
    }

    /// Current value of `key` in its stored string form.
    pub fn display_value(&self, key: SettingKey) -> String {
        let s = &self.settings;
        match key {
            SettingKey::IntervalSeconds => s.interval_seconds.to_string(),
            SettingKey::IncludeNaturals => s.include_naturals.to_string(),
            SettingKey::IncludeSharps => s.include_sharps.to_string(),
            SettingKey::IncludeFlats => s.include_flats.to_string(),
            SettingKey::NoteOrder => s.note_order.as_str().to_string(),
            SettingKey::StartNote => s.start_note.clone().unwrap_or_default(),
            SettingKey::SpeechEnabled => s.speech_enabled.to_string(),
            SettingKey::VoiceId => s.voice_id.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            SettingKey::Volume => s.volume.to_string(),
        }
    }
}

fn parse<T: FromStr>(key: SettingKey, value: &str) -> Result<T, StoreError> {
    value.parse().map_err(|_| {
        StoreError::Invalid(DomainError::validation(format!(
            "cannot parse {:?} for {}",
            value,
            key.as_str()
        )))
    })
}
