use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};

use super::messages::{AudioFrameMessage, CancelSpeechMessage, SpeakMessage};
use crate::audio::AudioFrame;

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Publish one microphone frame for the STT service
    pub async fn publish_audio_frame(
        &self,
        session_id: &str,
        frame: &AudioFrame,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let subject = format!("audio.frame.{}", session_id);
        let pcm_bytes = frame.pcm_bytes();

        let message = AudioFrameMessage {
            session_id: session_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (seq={}, bytes={}, final={})",
            subject,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // The STT service publishes to stt.text.partial and stt.text.final;
        // callers filter by session_id in the payload
        let subject = "stt.text.>";

        let subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to transcripts")?;

        debug!("Subscribed to {}", subject);

        Ok(subscriber)
    }

    pub async fn publish_speak(&self, message: &SpeakMessage) -> Result<()> {
        let subject = format!("tts.speak.{}", message.session_id);
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish speak request")?;

        debug!("Published prompt #{} to {}", message.utterance_id, subject);
        Ok(())
    }

    /// Subscribe to playback events for one session
    pub async fn subscribe_speech_events(&self, session_id: &str) -> Result<async_nats::Subscriber> {
        let subject = format!("tts.event.{}", session_id);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to speech events")?;

        debug!("Subscribed to {}", subject);
        Ok(subscriber)
    }

    pub async fn publish_cancel(&self, session_id: &str) -> Result<()> {
        let subject = format!("tts.cancel.{}", session_id);
        let message = CancelSpeechMessage {
            session_id: session_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish speech cancel")?;

        Ok(())
    }
}
