use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioFrame};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split into frames of `frame_ms` each, timestamped from zero
    pub fn frames(&self, frame_ms: u64) -> Vec<AudioFrame> {
        let per_frame = (self.sample_rate as u64 * frame_ms / 1000) as usize * self.channels as usize;
        if per_frame == 0 {
            return Vec::new();
        }

        self.samples
            .chunks(per_frame)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * frame_ms,
            })
            .collect()
    }
}

/// Capture backend that replays a WAV file at real-time pace
pub struct WavBackend {
    file: Arc<AudioFile>,
    frame_ms: u64,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavBackend {
    pub fn new(file: AudioFile, frame_ms: u64) -> Self {
        Self {
            file: Arc::new(file),
            frame_ms: frame_ms.max(10),
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for WavBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            anyhow::bail!("WAV backend already started");
        }

        let (tx, rx) = mpsc::channel(100);
        let file = Arc::clone(&self.file);
        let frame_ms = self.frame_ms;
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));
            for frame in file.frames(frame_ms) {
                ticker.tick().await;
                if !capturing.load(Ordering::SeqCst) || tx.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("WAV replay finished: {}", file.path);
            capturing.store(false, Ordering::SeqCst);
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-replay"
    }
}
