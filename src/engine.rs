//! Speech output: every reply is printed, and spoken when a synthesizer is available.

use crate::backends::{self, SpeechBackend};
use crate::config_loader::Settings;
use crate::{Error, Result};

/// Where the assistant's replies go.
pub trait SpeechOutput {
    fn speak(&self, text: &str);
}

pub struct AudioEngine {
    name: String,
    voice: Option<Voice>,
}

/// A working synthesizer plus the device it plays on.
struct Voice {
    backend: Box<dyn SpeechBackend>,
    player: Player,
}

impl AudioEngine {
    /// Picks the configured backend and opens the audio output. Any failure here
    /// leaves the engine in print-only mode for the rest of the process.
    pub fn new(settings: &Settings) -> Self {
        let voice = backends::from_settings(settings).and_then(|backend| match Player::open() {
            Ok(player) => {
                tracing::info!(backend = backend.id(), "speech output ready");
                Some(Voice { backend, player })
            }
            Err(e) => {
                tracing::warn!(error = %e, "no audio output, replies will be printed only");
                None
            }
        });
        Self {
            name: settings.assistant_name.clone(),
            voice,
        }
    }

    pub fn print_only(name: &str) -> Self {
        Self {
            name: name.to_string(),
            voice: None,
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.voice.is_some()
    }

    fn line(&self, text: &str) -> String {
        format!("{}: {}", self.name, text)
    }
}

impl SpeechOutput for AudioEngine {
    fn speak(&self, text: &str) {
        println!("{}", self.line(text));
        let Some(voice) = &self.voice else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }

        let result = voice
            .backend
            .synthesize(text)
            .map_err(|e| Error::Tts(e.to_string()))
            .and_then(|wav| voice.player.play_blocking(wav));
        if let Err(e) = result {
            tracing::warn!(backend = voice.backend.id(), error = %e, "speech synthesis failed");
        }
    }
}

#[cfg(feature = "audio")]
struct Player {
    // Audio stream must outlive every sink created from its handle
    _stream: rodio::OutputStream,
    handle: rodio::OutputStreamHandle,
}

#[cfg(feature = "audio")]
impl Player {
    fn open() -> Result<Self> {
        let (stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| Error::Audio(format!("No audio output device: {}", e)))?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    fn play_blocking(&self, wav: Vec<u8>) -> Result<()> {
        use rodio::{Decoder, Sink, Source};
        use std::io::Cursor;

        let sink = Sink::try_new(&self.handle)
            .map_err(|e| Error::Audio(format!("Failed to create sink: {}", e)))?;
        let source = Decoder::new(Cursor::new(wav))
            .map_err(|e| Error::Tts(format!("Failed to decode synthesized audio: {}", e)))?;
        sink.append(source.convert_samples::<f32>());
        sink.sleep_until_end();
        Ok(())
    }
}

#[cfg(not(feature = "audio"))]
struct Player;

#[cfg(not(feature = "audio"))]
impl Player {
    fn open() -> Result<Self> {
        Err(Error::Audio("built without the `audio` feature".to_string()))
    }

    fn play_blocking(&self, _wav: Vec<u8>) -> Result<()> {
        Ok(())
    }
}
