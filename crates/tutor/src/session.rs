use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use lobber_domain::{active_notes, validate_interval, DomainError, Note, Settings, VoiceId};

use crate::present::Presenter;
use crate::progress::{Progress, FRAME_PERIOD};
use crate::selector::NoteSelector;
use crate::speech::{resolve_voice, SpeechSynthesizer, Utterance};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid interval: {0}")]
    Interval(#[from] DomainError),
    #[error("a session is already running")]
    AlreadyRunning,
}

/// Owns the practice session: which note is showing, whether the timers are
/// armed, and how far through the current interval we are.
///
/// `start` spawns a tokio task and must be called from within a runtime.
pub struct SessionController {
    core: Arc<Mutex<SessionCore>>,
    speech: Arc<dyn SpeechSynthesizer>,
    run: Option<RunHandle>,
}

struct RunHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct SessionCore {
    settings: Settings,
    selector: NoteSelector,
    presenter: Box<dyn Presenter>,
    status: SessionStatus,
    current_note: Note,
    progress: Progress,
    animating: bool,
    /// Identifies the live run; callbacks carrying an older value are ignored.
    generation: u64,
}

struct SpeechRequest {
    text: &'static str,
    volume: f32,
    voice: Option<VoiceId>,
}

impl SessionController {
    pub fn new(
        settings: Settings,
        presenter: impl Presenter + 'static,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self::with_selector(settings, presenter, speech, NoteSelector::new())
    }

    pub fn with_selector(
        settings: Settings,
        presenter: impl Presenter + 'static,
        speech: Arc<dyn SpeechSynthesizer>,
        selector: NoteSelector,
    ) -> Self {
        let progress = Progress::new(u64::from(settings.interval_seconds) * 1_000);
        Self {
            core: Arc::new(Mutex::new(SessionCore {
                settings,
                selector,
                presenter: Box::new(presenter),
                status: SessionStatus::Idle,
                current_note: Note::default(),
                progress,
                animating: false,
                generation: 0,
            })),
            speech,
            run: None,
        }
    }

    #[instrument(skip(self))]
    pub fn start(&mut self, interval_seconds: u32) -> Result<(), SessionError> {
        validate_interval(interval_seconds)?;
        if self.run.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        let period = Duration::from_secs(u64::from(interval_seconds));
        let started = Instant::now();
        let (generation, request) = {
            let mut core = lock(&self.core);
            core.generation += 1;
            core.status = SessionStatus::Running;
            core.progress = Progress::new(period.as_millis() as u64);
            core.presenter.show_running(true);
            (core.generation, core.announce())
        };
        info!(interval_seconds, "session started");
        if let Some(request) = request {
            request.dispatch(&self.speech);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(drive(
            Arc::clone(&self.core),
            Arc::clone(&self.speech),
            generation,
            started,
            period,
            stop_rx,
        ));
        self.run = Some(RunHandle { stop_tx, task });
        Ok(())
    }

    /// Cancels both timers. Returns false when nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        let _ = run.stop_tx.send(());
        run.task.abort();
        let mut core = lock(&self.core);
        core.generation += 1;
        core.status = SessionStatus::Idle;
        core.animating = false;
        core.presenter.show_running(false);
        info!(last_note = core.current_note.symbol, "session stopped");
        true
    }

    /// Start with the configured interval when idle, stop when running.
    pub fn toggle(&mut self) -> Result<SessionStatus, SessionError> {
        if self.is_running() {
            self.stop();
        } else {
            let interval = lock(&self.core).settings.interval_seconds;
            self.start(interval)?;
        }
        Ok(self.status())
    }

    pub fn dispose(mut self) {
        self.stop();
    }

    /// Later announce cycles use these settings. A running interval keeps its period.
    pub fn apply_settings(&self, settings: Settings) {
        lock(&self.core).settings = settings;
    }

    pub fn settings(&self) -> Settings {
        lock(&self.core).settings.clone()
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.core).status
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    pub fn current_note(&self) -> Note {
        lock(&self.core).current_note
    }

    pub fn progress(&self) -> Progress {
        lock(&self.core).progress
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SessionCore {
    /// Picks and shows the next note, then re-arms the progress animation.
    fn announce(&mut self) -> Option<SpeechRequest> {
        self.progress.reset();
        let notes = active_notes(&self.settings);
        match self.selector.next(&notes, &self.current_note) {
            Some(note) => self.current_note = note,
            None => warn!("no active notes; keeping current note"),
        }
        let note = self.current_note;
        debug!(symbol = note.symbol, "announcing note");
        self.presenter.show_note(&note);
        self.presenter.show_progress(0);
        self.animating = true;

        self.settings.speech_enabled.then(|| SpeechRequest {
            text: note.spoken,
            volume: self.settings.volume,
            voice: self.settings.voice_id.clone(),
        })
    }

    /// One animation frame. Returns whether the animation is still running.
    fn frame(&mut self, since_announce: Duration) -> bool {
        if !self.animating {
            return false;
        }
        match self.progress.advance_frame(since_announce) {
            Some(per_mille) => {
                self.presenter.show_progress(per_mille);
                self.animating = !self.progress.is_complete();
            }
            None => self.animating = false,
        }
        self.animating
    }
}

impl SpeechRequest {
    /// Hands the request to the blocking pool. Voice queries may shell out and
    /// must not stall the timers.
    fn dispatch(self, speech: &Arc<dyn SpeechSynthesizer>) {
        let speech = Arc::clone(speech);
        tokio::task::spawn_blocking(move || self.deliver(speech.as_ref()));
    }

    fn deliver(self, speech: &dyn SpeechSynthesizer) {
        let voices = speech.voices();
        if voices.is_empty() {
            debug!("no speech voices available, skipping utterance");
            return;
        }
        let voice = resolve_voice(self.voice.as_ref(), &voices);
        if voice.is_none() {
            debug!(stored = ?self.voice, "selected voice unavailable, using default");
        }
        if let Err(err) = speech.speak(Utterance::new(self.text, self.volume, voice)) {
            warn!(error = %err, "speech synthesis failed");
        }
    }
}

async fn drive(
    core: Arc<Mutex<SessionCore>>,
    speech: Arc<dyn SpeechSynthesizer>,
    generation: u64,
    started: Instant,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticks = time::interval_at(started + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = time::interval_at(started + FRAME_PERIOD, FRAME_PERIOD);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut animating = true;
    let mut announced_at = started;

    loop {
        // Frames first: a frame due with the tick completes the old interval.
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            at = frames.tick(), if animating => {
                let mut core = lock(&core);
                if core.generation != generation {
                    break;
                }
                animating = core.frame(at.saturating_duration_since(announced_at));
            }
            at = ticks.tick() => {
                let request = {
                    let mut core = lock(&core);
                    if core.generation != generation {
                        break;
                    }
                    core.announce()
                };
                announced_at = at;
                frames.reset_at(at + FRAME_PERIOD);
                animating = true;
                if let Some(request) = request {
                    request.dispatch(&speech);
                }
            }
        }
    }
    debug!(generation, "session run finished");
}

fn lock(core: &Mutex<SessionCore>) -> MutexGuard<'_, SessionCore> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::Voice;
    use lobber_domain::NoteGroup;

    #[derive(Debug, Clone, PartialEq)]
    enum Shown {
        Note(&'static str),
        Progress(u16),
        Running(bool),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Shown>>>);

    impl Recorder {
        fn events(&self) -> Vec<Shown> {
            self.0.lock().unwrap().clone()
        }

        fn notes(&self) -> Vec<&'static str> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Shown::Note(symbol) => Some(symbol),
                    _ => None,
                })
                .collect()
        }
    }

    impl Presenter for Recorder {
        fn show_note(&mut self, note: &Note) {
            self.0.lock().unwrap().push(Shown::Note(note.symbol));
        }
        fn show_progress(&mut self, per_mille: u16) {
            self.0.lock().unwrap().push(Shown::Progress(per_mille));
        }
        fn show_running(&mut self, running: bool) {
            self.0.lock().unwrap().push(Shown::Running(running));
        }
    }

    #[derive(Default)]
    struct FakeSpeech {
        voices: Vec<Voice>,
        fail: bool,
        spoken: Mutex<Vec<Utterance>>,
    }

    impl SpeechSynthesizer for FakeSpeech {
        fn voices(&self) -> Vec<Voice> {
            self.voices.clone()
        }

        fn speak(&self, utterance: Utterance) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("engine unavailable");
            }
            self.spoken.lock().unwrap().push(utterance);
            Ok(())
        }
    }

    fn controller(settings: Settings, recorder: &Recorder, speech: Arc<FakeSpeech>) -> SessionController {
        SessionController::with_selector(settings, recorder.clone(), speech, NoteSelector::seeded(11))
    }

    async fn sleep_ms(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_announces_immediately() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        session.start(15).unwrap();
        assert!(session.is_running());
        assert_eq!(recorder.notes().len(), 1);
        assert_ne!(session.current_note().symbol, "C");
        assert_eq!(recorder.events()[0], Shown::Running(true));
    }

    #[tokio::test(start_paused = true)]
    async fn announces_once_per_interval_without_repeats() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        session.start(1).unwrap();
        sleep_ms(5_005).await;
        let notes = recorder.notes();
        assert_eq!(notes.len(), 6);
        assert!(notes.windows(2).all(|w| w[0] != w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_fills_interval_then_resets() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        session.start(1).unwrap();

        sleep_ms(995).await;
        assert_eq!(session.progress().elapsed_ms, 990);
        sleep_ms(10).await;
        assert_eq!(session.progress().elapsed_ms, 0);
        assert_eq!(recorder.notes().len(), 2);

        // the frame before each new note reports a full bar
        let events = recorder.events();
        let second_note = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Shown::Note(_)))
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(events[second_note - 1], Shown::Progress(1_000));
        assert_eq!(events[second_note + 1], Shown::Progress(0));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_both_timers() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        session.start(2).unwrap();
        sleep_ms(505).await;
        let note = session.current_note();
        assert!(session.stop());
        let seen = recorder.events().len();

        sleep_ms(10_000).await;
        assert_eq!(recorder.events().len(), seen);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.current_note(), note);
        assert_eq!(recorder.events().last(), Some(&Shown::Running(false)));
        assert!(!session.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_runs_a_single_timer() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        session.start(1).unwrap();
        sleep_ms(300).await;
        session.stop();
        session.start(1).unwrap();
        sleep_ms(3_005).await;
        // one note per start plus three ticks of the second run
        assert_eq!(recorder.notes().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_zero_interval_and_double_start() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        assert!(matches!(session.start(0), Err(SessionError::Interval(_))));
        assert!(!session.is_running());
        session.start(5).unwrap();
        assert!(matches!(session.start(5), Err(SessionError::AlreadyRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_uses_configured_interval() {
        let recorder = Recorder::default();
        let settings = Settings {
            interval_seconds: 3,
            ..Settings::default()
        };
        let mut session = controller(settings, &recorder, Arc::default());
        assert_eq!(session.toggle().unwrap(), SessionStatus::Running);
        assert_eq!(session.progress().interval_ms, 3_000);
        assert_eq!(session.toggle().unwrap(), SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn flats_only_session_draws_flats() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        let mut settings = Settings::default();
        settings.set_group(NoteGroup::Natural, false);
        settings.set_group(NoteGroup::Sharp, false);
        session.apply_settings(settings);
        session.start(1).unwrap();
        sleep_ms(2_005).await;
        assert_eq!(recorder.notes().len(), 3);
        assert!(recorder.notes().iter().all(|s| s.ends_with('b')));
    }

    #[tokio::test(start_paused = true)]
    async fn speaks_with_resolved_voice() {
        let recorder = Recorder::default();
        let speech = Arc::new(FakeSpeech {
            voices: vec![Voice::new("en"), Voice::new("de")],
            ..FakeSpeech::default()
        });
        let settings = Settings {
            speech_enabled: true,
            voice_id: Some(VoiceId::new("de")),
            volume: 0.5,
            ..Settings::default()
        };
        let mut session = controller(settings.clone(), &recorder, speech.clone());
        session.start(1).unwrap();
        sleep_ms(1).await;

        let spoken = speech.spoken.lock().unwrap().clone();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, session.current_note().spoken);
        assert_eq!(spoken[0].voice, Some(VoiceId::new("de")));
        assert_eq!(spoken[0].rate, 0.9);
        assert_eq!(spoken[0].volume, 0.5);

        session.apply_settings(Settings {
            voice_id: Some(VoiceId::new("fr")),
            ..settings
        });
        sleep_ms(1_005).await;
        let spoken = speech.spoken.lock().unwrap().clone();
        assert_eq!(spoken.len(), 2);
        assert_eq!(spoken[1].voice, None);
    }

    #[tokio::test(start_paused = true)]
    async fn speech_failure_keeps_visual_update() {
        let recorder = Recorder::default();
        let speech = Arc::new(FakeSpeech {
            voices: vec![Voice::new("en")],
            fail: true,
            ..FakeSpeech::default()
        });
        let settings = Settings {
            speech_enabled: true,
            ..Settings::default()
        };
        let mut session = controller(settings, &recorder, speech);
        session.start(1).unwrap();
        sleep_ms(1_005).await;
        assert_eq!(recorder.notes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn speech_disabled_or_voiceless_stays_silent() {
        let recorder = Recorder::default();
        let speech = Arc::new(FakeSpeech::default());
        let settings = Settings {
            speech_enabled: true,
            ..Settings::default()
        };
        let mut session = controller(settings, &recorder, speech.clone());
        session.start(1).unwrap();
        sleep_ms(1).await;
        assert!(speech.spoken.lock().unwrap().is_empty());

        let voiced = Arc::new(FakeSpeech {
            voices: vec![Voice::new("en")],
            ..FakeSpeech::default()
        });
        let mut quiet = controller(Settings::default(), &recorder, voiced.clone());
        quiet.start(1).unwrap();
        sleep_ms(1).await;
        assert!(voiced.spoken.lock().unwrap().is_empty());
    }

    /// Lists its voices the way a shelled-out engine does: slowly.
    struct SlowVoices(Duration);

    impl SpeechSynthesizer for SlowVoices {
        fn voices(&self) -> Vec<Voice> {
            std::thread::sleep(self.0);
            vec![Voice::new("en")]
        }

        fn speak(&self, _utterance: Utterance) -> anyhow::Result<()> {
            Ok(())
        }
    }

    // Runs on the real clock: a slow voice query has to cost wall time.
    #[tokio::test]
    async fn slow_voice_query_does_not_starve_progress() {
        let recorder = Recorder::default();
        let settings = Settings {
            speech_enabled: true,
            ..Settings::default()
        };
        let mut session = SessionController::with_selector(
            settings,
            recorder.clone(),
            Arc::new(SlowVoices(Duration::from_millis(40))),
            NoteSelector::seeded(11),
        );
        session.start(1).unwrap();
        sleep_ms(2_100).await;
        session.stop();

        let events = recorder.events();
        let note_at: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Shown::Note(_)))
            .map(|(i, _)| i)
            .collect();
        assert!(note_at.len() >= 3, "only {} notes", note_at.len());
        for &i in &note_at[1..] {
            match events[i - 1] {
                Shown::Progress(per_mille) => {
                    assert!(per_mille >= 990, "bar stopped at {per_mille} before a note")
                }
                ref other => panic!("expected progress before a note, got {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_running_session() {
        let recorder = Recorder::default();
        let mut session = controller(Settings::default(), &recorder, Arc::default());
        session.start(1).unwrap();
        session.dispose();
        let seen = recorder.events().len();
        sleep_ms(3_000).await;
        assert_eq!(recorder.events().len(), seen);
    }
}
