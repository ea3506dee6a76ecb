use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::events::{EngineEvent, EventSink, SpeakerEvent};
use crate::config::PromptConfig;

/// One utterance to synthesize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub session_id: String,
    pub text: String,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Text-to-speech engine
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Begin speaking. Lifecycle events, ending in `Ended` or `Errored`, are
    /// reported through `sink`.
    async fn speak(&self, request: SpeakRequest, sink: EventSink<SpeakerEvent>) -> Result<()>;

    /// Silence whatever is currently being spoken. Must not block.
    fn cancel(&self);

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Completed,
    Failed(String),
}

/// Speaks prompts one at a time and turns engine events into a single outcome per prompt
pub struct PromptSpeaker {
    engine: Arc<dyn SpeechSynthesizer>,
    voice: PromptConfig,
    events: mpsc::UnboundedSender<EngineEvent>,
    last_utterance: u64,
    in_flight: Option<u64>,
    speaking: watch::Sender<bool>,
    boundaries: u64,
}

impl PromptSpeaker {
    pub fn new(
        engine: Arc<dyn SpeechSynthesizer>,
        voice: PromptConfig,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (speaking, _) = watch::channel(false);
        Self {
            engine,
            voice,
            events,
            last_utterance: 0,
            in_flight: None,
            speaking,
            boundaries: 0,
        }
    }

    pub fn is_speaking(&self) -> bool {
        *self.speaking.borrow()
    }

    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.speaking.subscribe()
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Word boundaries seen for the current prompt
    pub fn boundaries(&self) -> u64 {
        self.boundaries
    }

    /// Start speaking `text`, cancelling any prompt still in flight.
    /// Returns the utterance id that will carry the terminal event.
    pub async fn speak(&mut self, session_id: &str, text: &str) -> u64 {
        self.cancel();

        self.last_utterance += 1;
        let utterance = self.last_utterance;
        self.in_flight = Some(utterance);
        self.boundaries = 0;

        let request = SpeakRequest {
            session_id: session_id.to_string(),
            text: text.to_string(),
            locale: self.voice.locale.clone(),
            rate: self.voice.rate,
            pitch: self.voice.pitch,
            volume: self.voice.volume,
        };
        let sink = EventSink::new(self.events.clone(), utterance);

        info!("Speaking prompt #{} via {}", utterance, self.engine.name());

        if let Err(e) = self.engine.speak(request, sink.clone()).await {
            // Completes the lifecycle so the interview is never blocked on audio
            warn!("Speech synthesis failed to start: {:#}", e);
            sink.emit(SpeakerEvent::Errored(format!("{e:#}")));
        }

        utterance
    }

    /// Apply an engine event. Returns the outcome once the in-flight prompt terminates;
    /// events for cancelled or already finished prompts are ignored.
    pub fn on_event(&mut self, utterance: u64, event: SpeakerEvent) -> Option<PromptOutcome> {
        if self.in_flight != Some(utterance) {
            debug!("Ignoring {:?} for stale prompt #{}", event, utterance);
            return None;
        }

        match event {
            SpeakerEvent::Started => {
                self.speaking.send_replace(true);
                None
            }
            SpeakerEvent::Boundary { char_index } => {
                self.boundaries += 1;
                debug!("Prompt #{} boundary at {}", utterance, char_index);
                None
            }
            SpeakerEvent::Ended => {
                self.finish();
                Some(PromptOutcome::Completed)
            }
            SpeakerEvent::Errored(reason) => {
                self.finish();
                Some(PromptOutcome::Failed(reason))
            }
        }
    }

    /// Cancel the in-flight prompt, if any. No outcome is produced for it.
    pub fn cancel(&mut self) {
        if let Some(utterance) = self.in_flight.take() {
            debug!("Cancelling prompt #{}", utterance);
            self.engine.cancel();
            self.speaking.send_replace(false);
        }
    }

    fn finish(&mut self) {
        self.in_flight = None;
        self.speaking.send_replace(false);
    }
}
