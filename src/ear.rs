//! Speech input: microphone capture, segmentation and transcription.

use crate::config_loader::Settings;
use crate::recognizers::{self, CapturedAudio, Recognizer};
use crate::vad::VadConfig;
#[cfg(feature = "audio")]
use crate::vad::{VadState, VoiceActivity};
use crate::{Error, Result};

/// Source of spoken utterances.
pub trait Listener {
    /// Returns one lowercase transcript, or `None` on timeout or any failure.
    fn listen(&mut self) -> Option<String>;
}

pub struct Ear {
    vad: VadConfig,
    online: Option<Box<dyn Recognizer>>,
    offline: Option<Box<dyn Recognizer>>,
    #[cfg(feature = "audio")]
    mic: capture::Microphone,
}

impl Ear {
    /// Opens the default microphone and the configured recognizers. Fails when
    /// there is no input device or no recognizer at all.
    pub fn new(settings: &Settings) -> Result<Self> {
        let online = recognizers::online_from_settings(settings);
        let offline = recognizers::offline_from_settings(settings);
        Self::with_recognizers(settings, online, offline)
    }

    pub fn with_recognizers(
        settings: &Settings,
        online: Option<Box<dyn Recognizer>>,
        offline: Option<Box<dyn Recognizer>>,
    ) -> Result<Self> {
        if online.is_none() && offline.is_none() {
            return Err(Error::Stt(
                "no speech recognizer available (set an online API key or install vosk-transcriber)"
                    .to_string(),
            ));
        }

        #[cfg(feature = "audio")]
        {
            let mic = capture::Microphone::open()?;
            let vad = vad_config(settings, mic.sample_rate());
            Ok(Self {
                vad,
                online,
                offline,
                mic,
            })
        }

        #[cfg(not(feature = "audio"))]
        {
            let _ = (settings, online, offline);
            Err(Error::Audio(
                "built without the `audio` feature; voice input is unavailable".to_string(),
            ))
        }
    }

    /// Online first, offline second. Empty transcripts count as failures.
    fn transcribe(&self, audio: &CapturedAudio) -> Option<String> {
        transcribe_with_fallback(&[self.online.as_deref(), self.offline.as_deref()], audio)
    }
}

pub fn vad_config(settings: &Settings, sample_rate: u32) -> VadConfig {
    VadConfig {
        sample_rate,
        calibration: settings.ambient_calibration(),
        listen_timeout: settings.listen_timeout(),
        pause_threshold: settings.pause_threshold(),
        phrase_time_limit: settings.phrase_time_limit(),
        min_threshold: settings.min_energy_threshold,
    }
}

/// Runs recognizers in order and returns the first non-empty lowercase transcript.
pub fn transcribe_with_fallback(
    chain: &[Option<&dyn Recognizer>],
    audio: &CapturedAudio,
) -> Option<String> {
    for recognizer in chain.iter().flatten() {
        match recognizer.transcribe(audio) {
            Ok(text) if !text.trim().is_empty() => {
                tracing::debug!(recognizer = recognizer.id(), transcript = %text, "transcribed");
                return Some(text.trim().to_lowercase());
            }
            Ok(_) => {
                tracing::info!(recognizer = recognizer.id(), "could not understand audio");
            }
            Err(e) => {
                tracing::warn!(recognizer = recognizer.id(), error = %e, "recognizer failed");
            }
        }
    }
    tracing::info!("no recognizer produced a transcript");
    None
}

/// Converts normalized float samples to 16-bit PCM.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

impl Listener for Ear {
    fn listen(&mut self) -> Option<String> {
        #[cfg(feature = "audio")]
        {
            println!("Listening...");
            let mut vad = VoiceActivity::new(&self.vad);
            let recording = match self.mic.record(&mut vad) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "microphone capture failed");
                    return None;
                }
            };
            if vad.state() != VadState::Done || recording.is_empty() {
                tracing::info!("no speech before timeout");
                return None;
            }
            let audio = CapturedAudio::new(to_pcm16(&recording), self.vad.sample_rate);
            tracing::debug!(seconds = audio.duration_secs(), "phrase captured");
            self.transcribe(&audio)
        }

        #[cfg(not(feature = "audio"))]
        {
            None
        }
    }
}

#[cfg(feature = "audio")]
mod capture {
    use crate::vad::VoiceActivity;
    use crate::{Error, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{Device, FromSample, Sample, SizedSample, Stream, StreamConfig, SupportedStreamConfig};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    const POLL_INTERVAL: Duration = Duration::from_millis(30);
    /// How long the device may go without delivering samples before capture is abandoned.
    const STALL_GRACE: Duration = Duration::from_secs(2);

    pub struct Microphone {
        device: Device,
        supported: SupportedStreamConfig,
    }

    impl Microphone {
        pub fn open() -> Result<Self> {
            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .ok_or_else(|| Error::Audio("No input device found".to_string()))?;
            let supported = device
                .default_input_config()
                .map_err(|e| Error::Audio(format!("Error getting config: {}", e)))?;
            tracing::info!(config = ?supported, "microphone ready");
            Ok(Self { device, supported })
        }

        pub fn sample_rate(&self) -> u32 {
            self.supported.sample_rate()
        }

        /// Streams mono samples into `vad` until it finishes or the stream stalls.
        pub fn record(&self, vad: &mut VoiceActivity) -> Result<Vec<f32>> {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            let config: StreamConfig = self.supported.config();

            let stream = match self.supported.sample_format() {
                cpal::SampleFormat::F32 => build_stream::<f32>(&self.device, &config, buffer.clone()),
                cpal::SampleFormat::I16 => build_stream::<i16>(&self.device, &config, buffer.clone()),
                cpal::SampleFormat::U16 => build_stream::<u16>(&self.device, &config, buffer.clone()),
                cpal::SampleFormat::I32 => build_stream::<i32>(&self.device, &config, buffer.clone()),
                other => Err(Error::Audio(format!("Unsupported sample format {:?}", other))),
            }?;
            stream
                .play()
                .map_err(|e| Error::Audio(format!("Error playing stream: {}", e)))?;

            let mut last_progress = Instant::now();
            while !vad.is_finished() {
                thread::sleep(POLL_INTERVAL);
                let chunk: Vec<f32> = match buffer.lock() {
                    Ok(mut b) => std::mem::take(&mut *b),
                    Err(_) => return Err(Error::Audio("sample buffer poisoned".to_string())),
                };
                if chunk.is_empty() {
                    if last_progress.elapsed() > STALL_GRACE {
                        return Err(Error::Audio("microphone stopped delivering audio".to_string()));
                    }
                    continue;
                }
                last_progress = Instant::now();
                vad.push(&chunk);
            }
            drop(stream); // Stop recording

            Ok(vad.take_recording())
        }
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        buffer: Arc<Mutex<Vec<f32>>>,
    ) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let channels = config.channels.max(1) as usize;
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut b) = buffer.lock() {
                        for frame in data.chunks(channels) {
                            let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                            b.push(sum / frame.len() as f32);
                        }
                    }
                },
                |err| tracing::warn!(error = %err, "an error occurred on input stream"),
                None,
            )
            .map_err(|e| Error::Audio(format!("Error building stream: {}", e)))
    }
}
