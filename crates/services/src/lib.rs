pub mod espeak;
pub mod settings;
pub mod store;

pub use espeak::EspeakSpeech;
pub use settings::{SettingKey, SettingsStore};
pub use store::{settings_path, JsonFileStore, KeyValueStore, MemoryStore, StoreError};
