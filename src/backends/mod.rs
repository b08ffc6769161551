pub mod espeak;
pub mod piper;

use crate::config_loader::Settings;
use std::process::Child;
use std::time::Duration;

/// Trait that all speech synthesis backends must implement.
/// This allows us to plug in different engines (eSpeak, Piper, etc.)
pub trait SpeechBackend {
    /// Returns WAV bytes for the given text or an error
    fn synthesize(&self, text: &str) -> std::io::Result<Vec<u8>>;

    /// Returns the unique ID of the backend (e.g., "espeak-ng")
    fn id(&self) -> &'static str;

    /// Startup check that the backend can actually run
    fn check_available(&self) -> std::io::Result<()>;
}

/// Builds the backend named by `tts_backend`, or `None` when it is disabled or not installed.
pub fn from_settings(settings: &Settings) -> Option<Box<dyn SpeechBackend>> {
    match settings.tts_backend.as_str() {
        "espeak" => {
            let backend = espeak::EspeakBackend::new(
                &settings.espeak_binary,
                &settings.espeak_voice,
                settings.speech_rate,
            );
            available(backend)
        }
        "piper" => available(piper::PiperBackend::new(
            &settings.piper_binary,
            &settings.piper_model,
        )),
        _ => None,
    }
}

fn available<B: SpeechBackend + 'static>(backend: B) -> Option<Box<dyn SpeechBackend>> {
    match backend.check_available() {
        Ok(()) => Some(Box::new(backend)),
        Err(e) => {
            tracing::warn!(backend = backend.id(), error = %e, "speech backend unavailable");
            None
        }
    }
}

/// Waits for a synthesis child process, killing it if it runs past `limit`.
/// Stdout and stderr are drained on helper threads so neither pipe can fill up and stall the child.
pub(crate) fn collect_output(mut child: Child, limit: Duration, id: &str) -> std::io::Result<Vec<u8>> {
    use std::io::{Error, ErrorKind, Read};
    use wait_timeout::ChildExt;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::new(ErrorKind::Other, format!("{} stdout not captured", id)))?;
    let reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut msg = String::new();
            let _ = stderr.read_to_string(&mut msg);
            msg
        })
    });
    let stderr_text = |handle: Option<std::thread::JoinHandle<String>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };

    match child.wait_timeout(limit)? {
        Some(status) => {
            let audio = reader
                .join()
                .map_err(|_| Error::new(ErrorKind::Other, "stdout reader panicked"))??;
            let err_msg = stderr_text(stderr_reader);
            if status.success() {
                Ok(audio)
            } else {
                Err(Error::new(
                    ErrorKind::Other,
                    format!("{} error: {}", id, err_msg.trim()),
                ))
            }
        }
        None => {
            // Timeout occurred, kill the process
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.join();
            let _ = stderr_text(stderr_reader);
            Err(Error::new(
                ErrorKind::TimedOut,
                format!("{} timed out after {:?}", id, limit),
            ))
        }
    }
}
