//! Native Whisper recognizer using whisper.cpp via whisper-rs bindings

use super::{CapturedAudio, Recognizer};
use crate::{Error, Result};
use std::sync::OnceLock;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// whisper.cpp expects 16 kHz mono input
const WHISPER_RATE: u32 = 16000;

pub struct WhisperRecognizer {
    model_path: String,
    language: String,
    /// Loaded on first use, then kept in memory
    ctx: OnceLock<WhisperContext>,
}

impl WhisperRecognizer {
    pub fn new(model_path: &str, language: &str) -> Self {
        Self {
            model_path: model_path.to_string(),
            language: language.to_string(),
            ctx: OnceLock::new(),
        }
    }

    fn context(&self) -> Result<&WhisperContext> {
        if let Some(ctx) = self.ctx.get() {
            return Ok(ctx);
        }

        // Expand ~ to home directory
        let expanded_path = match (self.model_path.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
            _ => self.model_path.clone(),
        };

        tracing::info!(path = %expanded_path, "loading Whisper model");
        let ctx = WhisperContext::new_with_params(&expanded_path, WhisperContextParameters::default())
            .map_err(|e| Error::Stt(format!("Failed to load Whisper model: {:?}", e)))?;
        Ok(self.ctx.get_or_init(|| ctx))
    }
}

impl Recognizer for WhisperRecognizer {
    fn id(&self) -> &'static str {
        "whisper"
    }

    fn transcribe(&self, audio: &CapturedAudio) -> Result<String> {
        let samples = resample(&audio.to_f32(), audio.sample_rate, WHISPER_RATE);
        let ctx = self.context()?;

        let mut state = ctx
            .create_state()
            .map_err(|e| Error::Stt(format!("Failed to create state: {:?}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // Set language (empty string = auto-detect)
        if !self.language.is_empty() && self.language != "auto" {
            params.set_language(Some(&self.language));
        }

        // Disable printing to stdout
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Single segment mode for short audio
        params.set_single_segment(true);

        state
            .full(params, &samples)
            .map_err(|e| Error::Stt(format!("Transcription failed: {:?}", e)))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(segment_text) = segment.to_str() {
                text.push_str(segment_text);
                text.push(' ');
            }
        }
        Ok(text.trim().to_string())
    }
}

/// Simple linear interpolation resampling
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let idx = src_idx as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < input.len() {
            input[idx] * (1.0 - frac) + input[idx + 1] * frac
        } else {
            input[idx.min(input.len() - 1)]
        };
        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_up() {
        let input = vec![1.0, 2.0, 3.0, 4.0];
        let output = resample(&input, 8000, 16000);
        assert_eq!(output.len(), 8);
        assert!((output[1] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn same_rate_is_identity() {
        let input = vec![0.1, 0.2];
        assert_eq!(resample(&input, 16000, 16000), input);
    }
}
