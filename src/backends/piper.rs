use super::{collect_output, SpeechBackend};
use std::io::{Error, ErrorKind, Result, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

const SYNTH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct PiperBackend {
    binary_path: String,
    model: PathBuf,
}

impl PiperBackend {
    pub fn new(binary_path: &str, model: &str) -> Self {
        Self {
            binary_path: binary_path.to_string(),
            model: PathBuf::from(model),
        }
    }
}

impl SpeechBackend for PiperBackend {
    fn id(&self) -> &'static str {
        "piper"
    }

    fn check_available(&self) -> Result<()> {
        which::which(&self.binary_path)
            .map_err(|e| Error::new(ErrorKind::NotFound, format!("{}: {}", self.binary_path, e)))?;

        let config = self.model.with_extension("onnx.json");
        if !self.model.exists() || !config.exists() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!(
                    "Piper model not found locally: {}. Please download it first.",
                    self.model.display()
                ),
            ));
        }
        Ok(())
    }

    fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.binary_path)
            .arg("-m")
            .arg(&self.model)
            .arg("--output_file")
            .arg("-") // Output WAV to stdout
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Write text to stdin and close it
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
            stdin.write_all(b"\n")?;
        }

        collect_output(child, SYNTH_TIMEOUT, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_unavailable() {
        let backend = PiperBackend::new("sh", "/nonexistent/voice.onnx");
        let err = backend.check_available().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
