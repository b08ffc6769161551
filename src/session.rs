//! The read-dispatch loop.

use crate::dispatcher::{Dispatcher, Outcome};
use crate::ear::Listener;
use crate::engine::SpeechOutput;
use crate::{Error, Result};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// Characters allowed between a wake phrase and the command that follows it.
const WAKE_SEPARATORS: &[char] = &[' ', ',', '.', ':', ';', '-', '!'];
const TRAILING_PUNCTUATION: &[char] = &['.', '!', '?', ','];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Voice,
    Text,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "voice" => Ok(Mode::Voice),
            "text" => Ok(Mode::Text),
            other => Err(Error::Config(format!("unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Voice => write!(f, "voice"),
            Mode::Text => write!(f, "text"),
        }
    }
}

/// Asks for the input mode until the answer is `voice` or `text`.
pub fn prompt_mode<R: BufRead>(input: &mut R) -> Result<Mode> {
    loop {
        print!("Choose input mode (voice/text): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(Error::InputClosed);
        }
        match line.parse() {
            Ok(mode) => return Ok(mode),
            Err(_) => println!("Please type 'voice' or 'text'."),
        }
    }
}

/// Lowercases, collapses runs of whitespace, and drops trailing sentence punctuation.
pub fn normalize(text: &str) -> String {
    let collapsed = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim_end()
        .to_string()
}

/// What to do with a voice transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Wake phrase heard, followed by this command.
    Command(String),
    /// Wake phrase heard on its own.
    Presence,
    /// No wake phrase; not meant for us.
    Discard,
}

/// Checks a transcript for a leading wake phrase, longest phrase first.
/// With no wake phrases configured every non-empty transcript is a command.
pub fn gate(transcript: &str, wake_phrases: &[String]) -> Gate {
    let heard = normalize(transcript);
    if wake_phrases.is_empty() {
        return if heard.is_empty() {
            Gate::Discard
        } else {
            Gate::Command(heard)
        };
    }

    let mut phrases: Vec<&str> = wake_phrases
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    phrases.sort_by_key(|p| std::cmp::Reverse(p.len()));

    for phrase in phrases {
        let Some(rest) = heard.strip_prefix(phrase) else {
            continue;
        };
        // "jarvisville" does not start with the wake phrase "jarvis"
        if !rest.is_empty() && !rest.starts_with(WAKE_SEPARATORS) {
            continue;
        }
        let command = normalize(rest.trim_start_matches(WAKE_SEPARATORS));
        return if command.is_empty() {
            Gate::Presence
        } else {
            Gate::Command(command)
        };
    }
    Gate::Discard
}

/// Opens the voice listener on demand.
pub type ListenerFactory<'a> = Box<dyn FnMut() -> Result<Box<dyn Listener>> + 'a>;

pub struct Session<'a, R: BufRead> {
    mode: Mode,
    dispatcher: Dispatcher<'a>,
    speech: &'a dyn SpeechOutput,
    wake_phrases: Vec<String>,
    input: R,
    open_listener: ListenerFactory<'a>,
    listener: Option<Box<dyn Listener>>,
}

impl<'a, R: BufRead> Session<'a, R> {
    pub fn new(
        mode: Mode,
        dispatcher: Dispatcher<'a>,
        speech: &'a dyn SpeechOutput,
        wake_phrases: Vec<String>,
        input: R,
        open_listener: ListenerFactory<'a>,
    ) -> Self {
        Self {
            mode,
            dispatcher,
            speech,
            wake_phrases: wake_phrases.iter().map(|p| normalize(p)).collect(),
            input,
            open_listener,
            listener: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Runs until an exit command or end of input.
    pub fn run(&mut self) -> Result<()> {
        self.enter(self.mode);
        loop {
            let outcome = match self.mode {
                Mode::Voice => self.voice_turn(),
                Mode::Text => self.text_turn()?,
            };
            match outcome {
                Outcome::Continue => {}
                Outcome::SwitchMode(mode) => self.enter(mode),
                Outcome::Exit => return Ok(()),
            }
        }
    }

    /// Switches mode, falling back to text when no listener can be opened.
    fn enter(&mut self, mode: Mode) {
        if mode == Mode::Voice && self.listener.is_none() {
            match (self.open_listener)() {
                Ok(listener) => self.listener = Some(listener),
                Err(e) => {
                    tracing::warn!(error = %e, "voice input unavailable");
                    self.speech
                        .speak("Voice input is unavailable, so I'll continue in text mode.");
                    self.mode = Mode::Text;
                    return;
                }
            }
        }
        tracing::info!(%mode, "input mode");
        self.mode = mode;
    }

    fn voice_turn(&mut self) -> Outcome {
        let Some(listener) = self.listener.as_mut() else {
            self.mode = Mode::Text;
            return Outcome::Continue;
        };
        let Some(transcript) = listener.listen() else {
            return Outcome::Continue;
        };

        match gate(&transcript, &self.wake_phrases) {
            Gate::Command(command) => {
                println!("You said: {}", command);
                self.dispatcher.dispatch(&command)
            }
            Gate::Presence => {
                self.speech.speak("Yes?");
                Outcome::Continue
            }
            Gate::Discard => {
                tracing::debug!(%transcript, "no wake phrase, ignoring");
                Outcome::Continue
            }
        }
    }

    fn text_turn(&mut self) -> Result<Outcome> {
        print!("You: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            tracing::info!("input closed, ending session");
            return Ok(Outcome::Exit);
        }
        let command = normalize(&line);
        if command.is_empty() {
            return Ok(Outcome::Continue);
        }
        if self.wake_phrases.contains(&command) {
            self.speech.speak("I'm listening.");
            return Ok(Outcome::Continue);
        }
        Ok(self.dispatcher.dispatch(&command))
    }
}
