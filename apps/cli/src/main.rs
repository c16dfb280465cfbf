mod binding;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lobber_domain::{active_notes, clamp_interval, resolve_start_note};
use lobber_services::espeak::DEFAULT_PROGRAM;
use lobber_services::{settings_path, EspeakSpeech, JsonFileStore, SettingKey, SettingsStore};
use lobber_tutor::{resolve_voice, NoteSelector, SessionController, SpeechSynthesizer};

use crate::binding::{Binding, Command, Reply, HELP};
use crate::terminal::TerminalPresenter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Call out random note names at a steady interval", long_about = None)]
struct Cli {
    /// Settings file to use instead of the one in the config directory
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a practice session (the default)
    Run(RunArgs),
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List speech voices reported by espeak-ng
    Voices {
        #[arg(long, default_value = DEFAULT_PROGRAM)]
        espeak: String,
    },
    /// List the notes the current settings will draw from
    Notes,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Seconds between notes; saved as the new default
    #[arg(short, long)]
    interval: Option<u32>,
    /// Speak each note
    #[arg(long, conflicts_with = "no_speech")]
    speech: bool,
    /// Only show notes
    #[arg(long)]
    no_speech: bool,
    /// Seed for a reproducible note sequence
    #[arg(long)]
    seed: Option<u64>,
    /// Speech program to run
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    espeak: String,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli
        .settings
        .or_else(settings_path)
        .ok_or_else(|| anyhow!("no config directory; pass --settings"))?;
    info!(path = %path.display(), "using settings file");
    let settings = SettingsStore::load(JsonFileStore::open(&path));

    match cli.command {
        None => {
            run(
                settings,
                RunArgs {
                    espeak: DEFAULT_PROGRAM.to_string(),
                    ..RunArgs::default()
                },
            )
            .await
        }
        Some(Commands::Run(args)) => run(settings, args).await,
        Some(Commands::Config { action }) => config(settings, action),
        Some(Commands::Voices { espeak }) => {
            voices(&settings, &EspeakSpeech::new(espeak));
            Ok(())
        }
        Some(Commands::Notes) => {
            notes(&settings);
            Ok(())
        }
    }
}

async fn run(mut settings: SettingsStore<JsonFileStore>, args: RunArgs) -> Result<()> {
    if let Some(interval) = args.interval {
        settings.set_interval(clamp_interval(interval))?;
    }
    if args.speech || args.no_speech {
        settings.set_speech_enabled(args.speech)?;
    }

    let speech: Arc<dyn SpeechSynthesizer> = Arc::new(EspeakSpeech::new(args.espeak));
    let selector = args.seed.map(NoteSelector::seeded).unwrap_or_default();
    let session = SessionController::with_selector(
        settings.settings().clone(),
        TerminalPresenter::stdout(),
        speech,
        selector,
    );
    let mut binding = Binding::new(settings, session);
    println!("{HELP}\n");
    binding.handle(Command::Start)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.parse::<Command>().and_then(|command| binding.handle(command)) {
                    Ok(Reply::Done) => {}
                    Ok(Reply::Info(message)) => println!("{message}"),
                    Ok(Reply::Quit) => break,
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    info!(last_note = binding.session().current_note().symbol, "leaving");
    binding.shutdown();
    println!();
    Ok(())
}

fn config(mut settings: SettingsStore<JsonFileStore>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            for key in SettingKey::ALL {
                println!("{:<16} {}", key.as_str(), settings.display_value(key));
            }
        }
        ConfigAction::Set { key, value } => {
            let key: SettingKey = key.parse()?;
            settings.set_from_str(key, &value)?;
            println!("{} = {}", key.as_str(), settings.display_value(key));
        }
    }
    Ok(())
}

fn voices(settings: &SettingsStore<JsonFileStore>, speech: &dyn SpeechSynthesizer) {
    let available = speech.voices();
    if available.is_empty() {
        println!("no voices found (is espeak-ng installed?)");
        return;
    }
    let selected = resolve_voice(settings.settings().voice_id.as_ref(), &available);
    for voice in &available {
        let marker = if Some(&voice.id) == selected.as_ref() { "*" } else { " " };
        println!(
            "{marker} {:<12} {}",
            voice.id.id(),
            voice.label.as_deref().unwrap_or("")
        );
    }
}

fn notes(settings: &SettingsStore<JsonFileStore>) {
    let current = settings.settings();
    let symbols: Vec<&str> = active_notes(current).iter().map(|n| n.symbol).collect();
    println!("active notes: {}", symbols.join(" "));
    if let Some(start) = resolve_start_note(current) {
        println!("start note:   {}", start.symbol);
    }
}
