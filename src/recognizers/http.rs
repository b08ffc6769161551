//! Online recognizer for OpenAI-compatible `/audio/transcriptions` endpoints.

use super::{CapturedAudio, Recognizer};
use crate::config_loader::Settings;
use crate::{Error, Result};
use reqwest::blocking::multipart::{Form, Part};
use std::time::Duration;

/// Response from a Whisper-style transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct HttpRecognizer {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    model: String,
    language: String,
}

impl HttpRecognizer {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.online_stt_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: settings.online_stt_url.clone(),
            api_key: settings.online_stt_api_key.clone(),
            model: settings.online_stt_model.clone(),
            language: settings.stt_language.clone(),
        })
    }
}

impl Recognizer for HttpRecognizer {
    fn id(&self) -> &'static str {
        "http"
    }

    fn transcribe(&self, audio: &CapturedAudio) -> Result<String> {
        let wav = audio.to_wav_bytes()?;
        tracing::debug!(audio_bytes = wav.len(), url = %self.url, "starting online transcription");

        let file = Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(e.to_string()))?;
        let mut form = Form::new().part("file", file).text("model", self.model.clone());
        if !self.language.is_empty() && self.language != "auto" {
            form = form.text("language", self.language.clone());
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Stt(format!("transcription API error {}: {}", status, body)));
        }

        let result: TranscriptionResponse = response.json()?;
        Ok(result.text.trim().to_string())
    }
}
