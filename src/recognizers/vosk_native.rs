//! Offline recognizer using the native Vosk library.

use super::{CapturedAudio, Recognizer};
use crate::config_loader::Settings;
use crate::{Error, Result};
use vosk::{Model, Recognizer as VoskDecoder};

pub struct VoskRecognizer {
    model: Model,
}

impl VoskRecognizer {
    pub fn new(settings: &Settings) -> Result<Self> {
        let model = Model::new(settings.vosk_model_path.as_str()).ok_or_else(|| {
            Error::Stt(format!(
                "failed to load Vosk model from {}",
                settings.vosk_model_path
            ))
        })?;
        Ok(Self { model })
    }
}

impl Recognizer for VoskRecognizer {
    fn id(&self) -> &'static str {
        "vosk"
    }

    fn transcribe(&self, audio: &CapturedAudio) -> Result<String> {
        let mut decoder = VoskDecoder::new(&self.model, audio.sample_rate as f32)
            .ok_or_else(|| Error::Stt("failed to create Vosk recognizer".to_string()))?;

        decoder
            .accept_waveform(&audio.samples)
            .map_err(|e| Error::Stt(format!("Vosk rejected audio: {:?}", e)))?;

        let text = decoder
            .final_result()
            .single()
            .map(|r| r.text.to_string())
            .unwrap_or_default();
        Ok(text)
    }
}
