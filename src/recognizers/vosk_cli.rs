//! Offline recognizer that shells out to `vosk-transcriber`.

use super::{CapturedAudio, Recognizer};
use crate::config_loader::Settings;
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct VoskCliRecognizer {
    binary: PathBuf,
    model_path: String,
}

impl VoskCliRecognizer {
    pub fn new(settings: &Settings) -> Result<Self> {
        let binary = which::which(&settings.vosk_binary)
            .map_err(|e| Error::Stt(format!("{} not found: {}", settings.vosk_binary, e)))?;
        Ok(Self {
            binary,
            model_path: settings.vosk_model_path.clone(),
        })
    }

    fn command(&self, wav: &std::path::Path, txt: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-i").arg(wav).arg("-o").arg(txt);
        if std::path::Path::new(&self.model_path).is_dir() {
            cmd.arg("--model").arg(&self.model_path);
        }
        cmd
    }
}

impl Recognizer for VoskCliRecognizer {
    fn id(&self) -> &'static str {
        "vosk-cli"
    }

    fn transcribe(&self, audio: &CapturedAudio) -> Result<String> {
        let dir = tempfile::tempdir()?;
        let wav_path = dir.path().join("utterance.wav");
        let txt_path = dir.path().join("utterance.txt");
        audio.write_wav(&wav_path)?;

        let mut child = self
            .command(&wav_path, &txt_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        match child.wait_timeout(TRANSCRIBE_TIMEOUT)? {
            Some(status) if status.success() => {
                let text = std::fs::read_to_string(&txt_path)
                    .map_err(|e| Error::Stt(format!("Vosk success but read error: {}", e)))?;
                Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            Some(status) => Err(Error::Stt(format!("vosk-transcriber exited with {}", status))),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::Stt(format!(
                    "vosk-transcriber timed out after {:?}",
                    TRANSCRIBE_TIMEOUT
                )))
            }
        }
    }
}
