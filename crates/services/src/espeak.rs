use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use lobber_tutor::speech::{SpeechSynthesizer, Utterance, Voice};

pub const DEFAULT_PROGRAM: &str = "espeak-ng";
/// espeak's default speaking rate, in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const BASE_PITCH: f32 = 50.0;

/// Speech through the `espeak-ng` command line tool.
pub struct EspeakSpeech {
    program: String,
}

impl EspeakSpeech {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for EspeakSpeech {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl SpeechSynthesizer for EspeakSpeech {
    fn voices(&self) -> Vec<Voice> {
        let output = match Command::new(&self.program).arg("--voices").output() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(program = %self.program, status = %output.status, "voice listing failed");
                return Vec::new();
            }
            Err(err) => {
                debug!(program = %self.program, error = %err, "speech engine unavailable");
                return Vec::new();
            }
        };
        parse_voices(&String::from_utf8_lossy(&output.stdout))
    }

    /// Spawns the engine and returns without waiting for playback.
    fn speak(&self, utterance: Utterance) -> Result<()> {
        tokio::process::Command::new(&self.program)
            .args(speak_args(&utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn {}", self.program))?;
        Ok(())
    }
}

fn speak_args(utterance: &Utterance) -> Vec<String> {
    let amplitude = (utterance.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
    let words_per_minute = (utterance.rate * BASE_WORDS_PER_MINUTE).round() as u32;
    let pitch = (utterance.pitch * BASE_PITCH).round().clamp(0.0, 99.0) as u32;
    let mut args = vec![
        "-a".to_string(),
        amplitude.to_string(),
        "-s".to_string(),
        words_per_minute.to_string(),
        "-p".to_string(),
        pitch.to_string(),
    ];
    if let Some(voice) = &utterance.voice {
        args.push("-v".to_string());
        args.push(voice.id().to_string());
    }
    args.push("--".to_string());
    args.push(utterance.text.clone());
    args
}

/// Parses the `--voices` table: `Pty Language Age/Gender VoiceName File Other`.
fn parse_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let language = columns.nth(1)?;
            let name = columns.nth(1)?;
            Some(Voice::new(language).with_label(name.replace('_', " ")))
        })
        .collect()
}
