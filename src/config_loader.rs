use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TTS_BACKENDS: &[&str] = &["espeak", "piper", "none"];
pub const OFFLINE_STT_BACKENDS: &[&str] = &["vosk-cli", "vosk", "whisper", "none"];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub assistant_name: String,
    /// Derived from the name when not configured.
    #[serde(default)]
    pub wake_phrases: Vec<String>,
    // Capture
    pub listen_timeout_secs: u64,
    pub phrase_time_limit_secs: u64,
    pub ambient_calibration_ms: u64,
    pub pause_threshold_ms: u64,
    pub min_energy_threshold: f32,
    // Notes
    pub notes_path: PathBuf,
    // TTS
    pub tts_backend: String, // "espeak", "piper" or "none"
    pub espeak_binary: String,
    pub espeak_voice: String,
    pub speech_rate: u32, // words per minute
    pub piper_binary: String,
    pub piper_model: String,
    // Online STT (OpenAI-compatible transcription endpoint)
    pub online_stt_url: String,
    pub online_stt_model: String,
    pub online_stt_api_key: String,
    pub online_stt_timeout_secs: u64,
    // Offline STT
    pub offline_stt_backend: String, // "vosk-cli", "vosk", "whisper" or "none"
    pub vosk_binary: String,
    pub vosk_model_path: String,
    pub whisper_model_path: String,
    pub stt_language: String,
    // Knowledge lookup
    pub knowledge_url: String,
    pub knowledge_sentences: usize,
    pub knowledge_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let home = home_dir_string();
        Self {
            assistant_name: "Jarvis".to_string(),
            wake_phrases: default_wake_phrases("Jarvis"),
            listen_timeout_secs: 5,
            phrase_time_limit_secs: 8,
            ambient_calibration_ms: 500,
            pause_threshold_ms: 800,
            min_energy_threshold: 0.01,
            notes_path: PathBuf::from("notes.txt"),
            tts_backend: "espeak".to_string(),
            espeak_binary: "espeak-ng".to_string(),
            espeak_voice: "en".to_string(),
            speech_rate: 170,
            piper_binary: "piper".to_string(),
            piper_model: format!("{}/.local/share/piper/models/en_US-lessac-medium.onnx", home),
            online_stt_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            online_stt_model: "whisper-1".to_string(),
            online_stt_api_key: String::new(),
            online_stt_timeout_secs: 15,
            offline_stt_backend: "vosk-cli".to_string(),
            vosk_binary: "vosk-transcriber".to_string(),
            vosk_model_path: format!("{}/.cache/vosk/vosk-model-small-en-us-0.15", home),
            whisper_model_path: format!("{}/.cache/whisper/ggml-tiny.en.bin", home),
            stt_language: "en".to_string(),
            knowledge_url: "https://en.wikipedia.org".to_string(),
            knowledge_sentences: 2,
            knowledge_timeout_secs: 8,
        }
    }
}

/// "hey <name>", "ok <name>" and the bare name.
pub fn default_wake_phrases(name: &str) -> Vec<String> {
    let name = name.trim().to_lowercase();
    vec![
        format!("hey {}", name),
        format!("ok {}", name),
        name,
    ]
}

fn home_dir_string() -> String {
    dirs::home_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

impl Settings {
    /// Loads settings from defaults, the optional `Assistant` files, `extra_file`
    /// and `VOX_*` variables. Unlike the standard files, `extra_file` must exist.
    pub fn load(extra_file: Option<&Path>) -> Result<Self, ConfigError> {
        let d = Settings::default();
        let mut builder = Config::builder()
            .set_default("assistant_name", d.assistant_name)?
            // Capture defaults
            .set_default("listen_timeout_secs", d.listen_timeout_secs)?
            .set_default("phrase_time_limit_secs", d.phrase_time_limit_secs)?
            .set_default("ambient_calibration_ms", d.ambient_calibration_ms)?
            .set_default("pause_threshold_ms", d.pause_threshold_ms)?
            .set_default("min_energy_threshold", d.min_energy_threshold as f64)?
            .set_default("notes_path", d.notes_path.to_string_lossy().into_owned())?
            // TTS defaults
            .set_default("tts_backend", d.tts_backend)?
            .set_default("espeak_binary", d.espeak_binary)?
            .set_default("espeak_voice", d.espeak_voice)?
            .set_default("speech_rate", d.speech_rate)?
            .set_default("piper_binary", d.piper_binary)?
            .set_default("piper_model", d.piper_model)?
            // STT defaults
            .set_default("online_stt_url", d.online_stt_url)?
            .set_default("online_stt_model", d.online_stt_model)?
            .set_default("online_stt_api_key", d.online_stt_api_key)?
            .set_default("online_stt_timeout_secs", d.online_stt_timeout_secs)?
            .set_default("offline_stt_backend", d.offline_stt_backend)?
            .set_default("vosk_binary", d.vosk_binary)?
            .set_default("vosk_model_path", d.vosk_model_path)?
            .set_default("whisper_model_path", d.whisper_model_path)?
            .set_default("stt_language", d.stt_language)?
            // Knowledge defaults
            .set_default("knowledge_url", d.knowledge_url)?
            .set_default("knowledge_sentences", d.knowledge_sentences as u64)?
            .set_default("knowledge_timeout_secs", d.knowledge_timeout_secs)?
            // Merge with local config file (if exists)
            .add_source(File::with_name("Assistant").required(false));

        if let Some(config_dir) = dirs::config_dir() {
            let user_file = config_dir.join("vox-assistant").join("Assistant");
            builder = builder.add_source(
                File::with_name(&user_file.to_string_lossy()).required(false),
            );
        }

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Merge with environment variables (e.g. VOX_ASSISTANT_NAME)
        let builder = builder.add_source(
            Environment::with_prefix("VOX")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("wake_phrases"),
        );

        let config = builder.build()?;
        let wake_phrases_configured = config.get::<Vec<String>>("wake_phrases").is_ok();
        let mut settings: Settings = config.try_deserialize()?;
        if !wake_phrases_configured {
            settings.wake_phrases = default_wake_phrases(&settings.assistant_name);
        }
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Lowercases wake phrases and drops empty ones, so gating compares like with like.
    pub fn normalize(&mut self) {
        self.assistant_name = self.assistant_name.trim().to_string();
        self.wake_phrases = self
            .wake_phrases
            .iter()
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assistant_name.is_empty() {
            return Err(ConfigError::Message(
                "assistant_name must not be empty".to_string(),
            ));
        }
        if self.listen_timeout_secs == 0 || self.phrase_time_limit_secs == 0 {
            return Err(ConfigError::Message(
                "listen_timeout_secs and phrase_time_limit_secs must be positive".to_string(),
            ));
        }
        if self.min_energy_threshold < 0.0 {
            return Err(ConfigError::Message(format!(
                "Invalid min_energy_threshold: {}. Must not be negative",
                self.min_energy_threshold
            )));
        }
        if self.knowledge_sentences == 0 {
            return Err(ConfigError::Message(
                "knowledge_sentences must be greater than 0".to_string(),
            ));
        }
        if !TTS_BACKENDS.contains(&self.tts_backend.as_str()) {
            return Err(ConfigError::Message(format!(
                "Unknown tts_backend '{}'. Expected one of {:?}",
                self.tts_backend, TTS_BACKENDS
            )));
        }
        if !OFFLINE_STT_BACKENDS.contains(&self.offline_stt_backend.as_str()) {
            return Err(ConfigError::Message(format!(
                "Unknown offline_stt_backend '{}'. Expected one of {:?}",
                self.offline_stt_backend, OFFLINE_STT_BACKENDS
            )));
        }
        Ok(())
    }

    /// Renames the assistant. Wake phrases still at their defaults follow the new name.
    pub fn rename(&mut self, name: &str) {
        if self.wake_phrases == default_wake_phrases(&self.assistant_name) {
            self.wake_phrases = default_wake_phrases(name);
        }
        self.assistant_name = name.trim().to_string();
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    pub fn phrase_time_limit(&self) -> Duration {
        Duration::from_secs(self.phrase_time_limit_secs)
    }

    pub fn ambient_calibration(&self) -> Duration {
        Duration::from_millis(self.ambient_calibration_ms)
    }

    pub fn pause_threshold(&self) -> Duration {
        Duration::from_millis(self.pause_threshold_ms)
    }
}
