pub mod present;
pub mod progress;
pub mod selector;
pub mod session;
pub mod speech;

pub use present::{NullPresenter, Presenter};
pub use progress::{Progress, FRAME_PERIOD};
pub use selector::NoteSelector;
pub use session::{SessionController, SessionError, SessionStatus};
pub use speech::{resolve_voice, SilentSpeech, SpeechSynthesizer, Utterance, Voice};
