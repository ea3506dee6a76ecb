use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::AudioBackendConfig;
use crate::catalog::Question;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub prompt: PromptConfig,
    pub recognizer: RecognizerConfig,
    pub watchdog: WatchdogConfig,
    pub microphone: MicrophoneConfig,
    pub analysis: AnalysisConfig,
    pub nats: NatsConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "memory-interview".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8087,
        }
    }
}

/// Voice parameters sent with every prompt
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            locale: "ko-KR".to_string(),
            rate: 0.9,
            pitch: 1.1,
            volume: 0.9,
        }
    }
}

/// Recognizer locale and recovery policy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub locale: String,
    /// Delay before a spontaneously ended attempt is restarted
    pub restart_backoff_ms: u64,
    /// Consecutive restarts without any recognition result before the turn gives up
    pub max_restarts: u32,
    /// How long an explicit stop waits for the engine to confirm it has ended
    pub stop_timeout_ms: u64,
}

impl RecognizerConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            locale: "ko-KR".to_string(),
            restart_backoff_ms: 150,
            max_restarts: 5,
            stop_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Silence window, restarted by every recognition event
    pub soft_silence_ms: u64,
    /// Absolute upper bound on one answer
    pub hard_cap_ms: u64,
}

impl WatchdogConfig {
    pub fn soft_silence(&self) -> Duration {
        Duration::from_millis(self.soft_silence_ms)
    }

    pub fn hard_cap(&self) -> Duration {
        Duration::from_millis(self.hard_cap_ms)
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            soft_silence_ms: 6000,
            hard_cap_ms: 12000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    /// Publish an RMS level for waveform rendering while recording
    pub level_tap: bool,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    /// WAV file replayed by the file-backed microphone
    pub input_path: Option<PathBuf>,
}

impl MicrophoneConfig {
    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.sample_rate,
            target_channels: self.channels,
            buffer_duration_ms: self.buffer_duration_ms,
        }
    }
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            level_tap: true,
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            input_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_id: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 20,
            user_id: "anonymous".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

/// Optional question list overriding the built-in catalog
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub questions: Vec<Question>,
}

/// The slice of configuration the turn engine itself consumes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnConfig {
    pub prompt: PromptConfig,
    pub recognizer: RecognizerConfig,
    pub watchdog: WatchdogConfig,
    pub microphone: MicrophoneConfig,
}

impl Config {
    /// Load from a TOML file (extension optional) with `INTERVIEW__SECTION__KEY` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn turn_config(&self) -> TurnConfig {
        TurnConfig {
            prompt: self.prompt.clone(),
            recognizer: self.recognizer.clone(),
            watchdog: self.watchdog.clone(),
            microphone: self.microphone.clone(),
        }
    }
}
