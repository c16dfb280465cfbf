use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use tracing::debug;

use lobber_domain::{clamp_interval, resolve_start_note, NoteGroup, NoteOrder, VoiceId};
use lobber_services::{KeyValueStore, SettingsStore};
use lobber_tutor::SessionController;

pub const HELP: &str = "\
commands:
  <enter>                 start or stop
  start | stop
  interval <seconds>      only while stopped
  naturals|sharps|flats on|off
  order random|ascending
  start-note <symbol>
  speech on|off
  voice <id>              an id from `lobber voices`, e.g. en-us;
                          `voice` alone uses the first available voice
  volume <0..1>
  status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Toggle,
    Start,
    Stop,
    Interval(u32),
    Group(NoteGroup, bool),
    Order(NoteOrder),
    StartNote(String),
    Speech(bool),
    Voice(Option<VoiceId>),
    Volume(f32),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(Command::Toggle);
        };
        let rest: Vec<&str> = words.collect();
        let arg = || {
            rest.first()
                .copied()
                .ok_or_else(|| anyhow!("`{verb}` needs a value"))
        };
        let command = match verb.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "interval" => Command::Interval(arg()?.parse()?),
            "naturals" => Command::Group(NoteGroup::Natural, switch(arg()?)?),
            "sharps" => Command::Group(NoteGroup::Sharp, switch(arg()?)?),
            "flats" => Command::Group(NoteGroup::Flat, switch(arg()?)?),
            "order" => match arg()? {
                "random" => Command::Order(NoteOrder::Random),
                "ascending" => Command::Order(NoteOrder::Ascending),
                other => bail!("unknown order `{other}`"),
            },
            "start-note" => Command::StartNote(arg()?.to_string()),
            "speech" => Command::Speech(switch(arg()?)?),
            "voice" => Command::Voice(rest.first().map(|id| VoiceId::new(*id))),
            "volume" => Command::Volume(arg()?.parse()?),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command `{other}`, try `help`"),
        };
        Ok(command)
    }
}

fn switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => bail!("expected on or off, got `{other}`"),
    }
}

#[derive(Debug, PartialEq)]
pub enum Reply {
    Done,
    Info(String),
    Quit,
}

/// Routes input commands to the settings store and the session. The only
/// place either is mutated from user input.
pub struct Binding<S> {
    settings: SettingsStore<S>,
    session: SessionController,
}

impl<S: KeyValueStore> Binding<S> {
    pub fn new(settings: SettingsStore<S>, session: SessionController) -> Self {
        Self { settings, session }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn handle(&mut self, command: Command) -> Result<Reply> {
        debug!(?command, "handling command");
        match command {
            Command::Toggle => {
                self.session.toggle()?;
            }
            Command::Start => {
                if !self.session.is_running() {
                    self.session.start(self.settings.settings().interval_seconds)?;
                }
            }
            Command::Stop => {
                self.session.stop();
            }
            Command::Interval(seconds) => {
                if self.session.is_running() {
                    bail!("stop the session before changing the interval");
                }
                let seconds = clamp_interval(seconds);
                self.settings.set_interval(seconds)?;
                self.sync();
                return Ok(Reply::Info(format!("interval set to {seconds}s")));
            }
            Command::Group(group, enabled) => {
                self.settings.toggle_group(group, enabled)?;
                self.sync();
            }
            Command::Order(order) => {
                self.settings.set_note_order(order)?;
                self.sync();
            }
            Command::StartNote(symbol) => {
                self.settings.set_start_note(&symbol)?;
                self.sync();
            }
            Command::Speech(enabled) => {
                self.settings.set_speech_enabled(enabled)?;
                self.sync();
            }
            Command::Voice(voice) => {
                self.settings.set_voice(voice)?;
                self.sync();
            }
            Command::Volume(volume) => {
                self.settings.set_volume(volume)?;
                self.sync();
            }
            Command::Status => return Ok(Reply::Info(self.status_line())),
            Command::Help => return Ok(Reply::Info(HELP.to_string())),
            Command::Quit => return Ok(Reply::Quit),
        }
        Ok(Reply::Done)
    }

    pub fn shutdown(mut self) {
        self.session.stop();
    }

    fn sync(&self) {
        self.session.apply_settings(self.settings.settings().clone());
    }

    fn status_line(&self) -> String {
        let s = self.settings.settings();
        let groups: Vec<&str> = NoteGroup::ACTIVE_ORDER
            .iter()
            .filter(|group| s.includes(**group))
            .map(|group| group.label())
            .collect();
        let start_note = resolve_start_note(s).map(|n| n.symbol).unwrap_or("-");
        format!(
            "{:?}, every {}s, groups: {}, order: {}, start note: {}, speech: {}, volume: {}",
            self.session.status(),
            s.interval_seconds,
            groups.join("/"),
            s.note_order.as_str(),
            start_note,
            if s.speech_enabled { "on" } else { "off" },
            s.volume
        )
    }
}
