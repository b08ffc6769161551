use super::{collect_output, SpeechBackend};

use std::io::{Error, ErrorKind, Result};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Upper bound for a single synthesis call.
const SYNTH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EspeakBackend {
    binary: String,
    voice: String,
    rate: u32,
}

impl EspeakBackend {
    pub fn new(binary: &str, voice: &str, rate: u32) -> Self {
        Self {
            binary: binary.to_string(),
            voice: voice.to_string(),
            rate,
        }
    }

    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--stdout")
            .arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(self.rate.to_string())
            .arg(text);
        cmd
    }
}

impl SpeechBackend for EspeakBackend {
    fn id(&self) -> &'static str {
        "espeak-ng"
    }

    fn check_available(&self) -> Result<()> {
        which::which(&self.binary)
            .map(|_| ())
            .map_err(|e| Error::new(ErrorKind::NotFound, format!("{}: {}", self.binary, e)))
    }

    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let child = self
            .command(text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        collect_output(child, SYNTH_TIMEOUT, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_passes_voice_and_rate() {
        let backend = EspeakBackend::new("espeak-ng", "en-us", 150);
        let cmd = backend.command("hello there");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["--stdout", "-v", "en-us", "-s", "150", "hello there"]);
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let backend = EspeakBackend::new("definitely-not-espeak-xyz", "en", 170);
        assert!(backend.check_available().is_err());
    }
}
