//! Speech-to-text engines.
//!
//! The ear tries an online recognizer first and an offline one second; each is
//! optional and chosen once from [`Settings`] at startup.

pub mod http;
pub mod vosk_cli;
#[cfg(feature = "vosk")]
pub mod vosk_native;
#[cfg(feature = "whisper")]
pub mod whisper;

use crate::config_loader::Settings;
use crate::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

/// One captured utterance: mono 16-bit PCM.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }

    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, self.spec())?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let mut writer = WavWriter::create(path, self.spec())?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Normalized f32 samples, as the native engines expect.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect()
    }
}

pub trait Recognizer {
    /// Returns the unique ID of the recognizer (e.g., "vosk-cli")
    fn id(&self) -> &'static str;

    fn transcribe(&self, audio: &CapturedAudio) -> Result<String>;
}

/// The online recognizer, if an API key is configured.
pub fn online_from_settings(settings: &Settings) -> Option<Box<dyn Recognizer>> {
    if settings.online_stt_api_key.trim().is_empty() {
        tracing::info!("online recognizer disabled (no API key)");
        return None;
    }
    match http::HttpRecognizer::new(settings) {
        Ok(rec) => Some(Box::new(rec)),
        Err(e) => {
            tracing::warn!(error = %e, "online recognizer unavailable");
            None
        }
    }
}

/// The offline recognizer named by `offline_stt_backend`, if it can run here.
pub fn offline_from_settings(settings: &Settings) -> Option<Box<dyn Recognizer>> {
    let result: Result<Box<dyn Recognizer>> = match settings.offline_stt_backend.as_str() {
        "vosk-cli" => vosk_cli::VoskCliRecognizer::new(settings)
            .map(|r| Box::new(r) as Box<dyn Recognizer>),
        #[cfg(feature = "vosk")]
        "vosk" => vosk_native::VoskRecognizer::new(settings)
            .map(|r| Box::new(r) as Box<dyn Recognizer>),
        #[cfg(feature = "whisper")]
        "whisper" => Ok(Box::new(whisper::WhisperRecognizer::new(
            &settings.whisper_model_path,
            &settings.stt_language,
        ))),
        "none" => return None,
        other => Err(crate::Error::Config(format!(
            "offline recognizer '{}' is not compiled in",
            other
        ))),
    };
    match result {
        Ok(rec) => Some(rec),
        Err(e) => {
            tracing::warn!(error = %e, "offline recognizer unavailable");
            None
        }
    }
}
