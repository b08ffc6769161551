use anyhow::Context;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vox_assistant::config_loader::Settings;
use vox_assistant::dispatcher::Dispatcher;
use vox_assistant::ear::{Ear, Listener};
use vox_assistant::engine::{AudioEngine, SpeechOutput};
use vox_assistant::knowledge::Wikipedia;
use vox_assistant::notes::NotesStore;
use vox_assistant::session::{self, Mode, Session};
use vox_assistant::web::SystemBrowser;

#[derive(Parser)]
#[command(name = "vox", version, about)]
struct Cli {
    /// Input mode; asked interactively when omitted
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Extra configuration file layered over the standard locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Notes file
    #[arg(long)]
    notes: Option<PathBuf>,

    /// Assistant name
    #[arg(long)]
    name: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings =
            Settings::load(self.config.as_deref()).context("failed to load configuration")?;
        if let Some(name) = &self.name {
            settings.rename(name);
        }
        if let Some(notes) = &self.notes {
            settings.notes_path = notes.clone();
        }
        settings.normalize();
        settings.validate().context("invalid configuration")?;
        Ok(settings)
    }
}

fn run(settings: Settings, mode: Option<Mode>) -> anyhow::Result<()> {
    let mut input = io::stdin().lock();
    let mode = match mode {
        Some(mode) => mode,
        None => session::prompt_mode(&mut input).context("no input mode chosen")?,
    };

    let engine = AudioEngine::new(&settings);
    let browser = SystemBrowser::new();
    let knowledge = Wikipedia::new(
        &settings.knowledge_url,
        Duration::from_secs(settings.knowledge_timeout_secs),
    )?;
    let notes = NotesStore::new(settings.notes_path.clone());
    tracing::info!(
        voiced = engine.is_voiced(),
        notes = %notes.path().display(),
        "assistant ready"
    );
    let dispatcher = Dispatcher::new(
        &engine,
        &browser,
        &knowledge,
        &notes,
        &settings.assistant_name,
        settings.knowledge_sentences,
    );

    engine.speak(&format!(
        "Hi, I'm {}. Say or type a command, or 'exit' to quit.",
        settings.assistant_name
    ));
    let mut session = Session::new(
        mode,
        dispatcher,
        &engine,
        settings.wake_phrases.clone(),
        input,
        Box::new(|| Ear::new(&settings).map(|ear| Box::new(ear) as Box<dyn Listener>)),
    );
    session.run()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let settings = cli.settings()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        name = %settings.assistant_name,
        "starting assistant"
    );

    let mode = cli.mode;
    let session = tokio::task::spawn_blocking(move || run(settings, mode));

    tokio::select! {
        joined = session => joined.context("session thread panicked")?,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted. Goodbye!");
            std::process::exit(0)
        }
    }
}
