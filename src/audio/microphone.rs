use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::file::{AudioFile, WavBackend};
use super::level::rms_level;
use crate::config::MicrophoneConfig;

/// Cached answer of the platform permission query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Prompt,
}

#[derive(Debug, Error)]
pub enum MicrophoneError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),
    #[error("microphone unavailable: {0}")]
    Unavailable(String),
    #[error("a microphone session is already open")]
    AlreadyOpen,
}

/// Platform microphone permission API
#[async_trait::async_trait]
pub trait MicrophoneAccess: Send + Sync {
    /// Current permission status without prompting the user
    async fn query(&self) -> PermissionState;

    /// Ask for access; on success returns a capture backend that has not been started
    async fn request(
        &self,
        config: &AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>, MicrophoneError>;
}

/// Exclusive ownership of one acquired microphone stream
///
/// Frames are fanned out on a broadcast channel so the recognizer can
/// resubscribe after a restart. When the level tap is enabled the RMS level
/// of each frame is published for waveform rendering.
pub struct MicrophoneSession {
    backend: Option<Box<dyn AudioBackend>>,
    frames: broadcast::Sender<AudioFrame>,
    pump: Option<JoinHandle<()>>,
    level_tap: Option<watch::Sender<f32>>,
}

impl MicrophoneSession {
    pub async fn acquire(
        access: &dyn MicrophoneAccess,
        config: &MicrophoneConfig,
        levels: &watch::Sender<f32>,
    ) -> Result<Self, MicrophoneError> {
        let mut backend = access.request(&config.backend_config()).await?;

        let mut audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(stop_err) = backend.stop().await {
                    warn!("Failed to stop {} after start failure: {}", backend.name(), stop_err);
                }
                return Err(MicrophoneError::Unavailable(format!("{e:#}")));
            }
        };

        let (frames, _) = broadcast::channel(64);
        let level_tap = config.level_tap.then(|| levels.clone());

        let pump = {
            let frames = frames.clone();
            let level_tap = level_tap.clone();
            tokio::spawn(async move {
                while let Some(frame) = audio_rx.recv().await {
                    if let Some(tap) = &level_tap {
                        tap.send_replace(rms_level(&frame.samples));
                    }
                    // No subscribers is fine: the recognizer may be between attempts
                    let _ = frames.send(frame);
                }
                debug!("Microphone frame pump finished");
            })
        };

        info!("Microphone acquired ({})", backend.name());

        Ok(Self {
            backend: Some(backend),
            frames,
            pump: Some(pump),
            level_tap,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.frames.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn has_level_tap(&self) -> bool {
        self.level_tap.is_some()
    }

    /// Stop all capture and close the level tap. Returns false if already released.
    pub async fn release(&mut self) -> bool {
        let Some(mut backend) = self.backend.take() else {
            return false;
        };

        if let Err(e) = backend.stop().await {
            warn!("Failed to stop {}: {}", backend.name(), e);
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(tap) = self.level_tap.take() {
            tap.send_replace(0.0);
        }

        info!("Microphone released ({})", backend.name());
        true
    }
}

impl Drop for MicrophoneSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(backend) = &self.backend {
            warn!("Microphone session dropped without release ({})", backend.name());
        }
    }
}

/// Holds at most one open microphone session
#[derive(Default)]
pub struct MicrophoneSlot {
    current: Option<MicrophoneSession>,
}

impl MicrophoneSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a new session. Acquiring while one is open is refused before
    /// the permission API is touched.
    pub async fn acquire(
        &mut self,
        access: &dyn MicrophoneAccess,
        config: &MicrophoneConfig,
        levels: &watch::Sender<f32>,
    ) -> Result<(), MicrophoneError> {
        if self.current.is_some() {
            return Err(MicrophoneError::AlreadyOpen);
        }
        self.current = Some(MicrophoneSession::acquire(access, config, levels).await?);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.current.as_ref().is_some_and(MicrophoneSession::is_open)
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<AudioFrame>> {
        self.current.as_ref().map(MicrophoneSession::subscribe)
    }

    /// Release and drop the open session, if any
    pub async fn release(&mut self) -> bool {
        match self.current.take() {
            Some(mut session) => session.release().await,
            None => false,
        }
    }
}

/// File-backed microphone: replays a WAV file as if it were captured live
pub struct WavMicrophone {
    path: PathBuf,
}

impl WavMicrophone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl MicrophoneAccess for WavMicrophone {
    async fn query(&self) -> PermissionState {
        if self.path.is_file() {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn request(
        &self,
        config: &AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>, MicrophoneError> {
        if !self.path.is_file() {
            return Err(MicrophoneError::PermissionDenied(format!(
                "no audio input at {}",
                self.path.display()
            )));
        }

        let file = AudioFile::open(&self.path)
            .map_err(|e| MicrophoneError::Unavailable(format!("{e:#}")))?;

        if file.sample_rate != config.target_sample_rate || file.channels != config.target_channels {
            warn!(
                "Input {} is {}Hz/{}ch, expected {}Hz/{}ch; replaying unconverted",
                file.path, file.sample_rate, file.channels, config.target_sample_rate, config.target_channels
            );
        }

        Ok(Box::new(WavBackend::new(file, config.buffer_duration_ms)))
    }
}
