use anyhow::Result;
use futures::StreamExt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::NatsClient;
use super::messages::{SpeakMessage, SpeechEventKind, SpeechEventMessage, TranscriptMessage};
use crate::audio::AudioFrame;
use crate::speech::{
    EventSink, RecognitionEngine, RecognitionRequest, RecognizerEvent, SpeakRequest,
    SpeakerEvent, SpeechSynthesizer,
};

struct ActiveAttempt {
    session_id: String,
    sink: EventSink<RecognizerEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveAttempt {
    fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Streaming recognition through the STT service on NATS.
///
/// Microphone frames go out on `audio.frame.<session>`; transcripts come back
/// on `stt.text.>` and are filtered by session id.
pub struct NatsRecognitionEngine {
    client: NatsClient,
    active: Mutex<Option<ActiveAttempt>>,
}

impl NatsRecognitionEngine {
    pub fn new(client: NatsClient) -> Self {
        Self {
            client,
            active: Mutex::new(None),
        }
    }

    fn take_active(&self) -> Option<ActiveAttempt> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for NatsRecognitionEngine {
    async fn start(
        &self,
        request: RecognitionRequest,
        audio: Option<broadcast::Receiver<AudioFrame>>,
        sink: EventSink<RecognizerEvent>,
    ) -> Result<()> {
        if let Some(previous) = self.take_active() {
            previous.abort();
        }

        let mut transcript_sub = self.client.subscribe_transcripts().await?;
        let mut tasks = Vec::with_capacity(2);

        let transcript_task = {
            let session_id = request.session_id.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                while let Some(msg) = transcript_sub.next().await {
                    let transcript = match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("Failed to parse transcript message: {}", e);
                            continue;
                        }
                    };

                    if transcript.session_id != session_id {
                        continue;
                    }

                    let event = if transcript.partial {
                        RecognizerEvent::Interim(transcript.text)
                    } else {
                        RecognizerEvent::Final(transcript.text)
                    };
                    if !sink.emit(event) {
                        return;
                    }
                }

                debug!("Transcript subscription closed");
                sink.emit(RecognizerEvent::Ended);
            })
        };
        tasks.push(transcript_task);

        if let Some(mut audio) = audio {
            let client = self.client.clone();
            let session_id = request.session_id.clone();
            let sink = sink.clone();

            tasks.push(tokio::spawn(async move {
                let mut sequence = 0u32;
                loop {
                    match audio.recv().await {
                        Ok(frame) => {
                            if let Err(e) = client
                                .publish_audio_frame(&session_id, &frame, sequence, false)
                                .await
                            {
                                sink.emit(RecognizerEvent::Errored(format!("{e:#}")));
                                return;
                            }
                            sequence = sequence.wrapping_add(1);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Audio uplink lagged, {} frames dropped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                debug!("Audio uplink finished after {} frames", sequence);
            }));
        }

        info!("STT attempt #{} listening for {}", sink.tag(), request.session_id);

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveAttempt {
            session_id: request.session_id,
            sink,
            tasks,
        });

        Ok(())
    }

    fn stop(&self) {
        let Some(attempt) = self.take_active() else {
            return;
        };
        attempt.abort();

        // Tell the STT service the stream is complete
        let client = self.client.clone();
        let session_id = attempt.session_id.clone();
        tokio::spawn(async move {
            let marker = AudioFrame {
                samples: Vec::new(),
                sample_rate: 16000,
                channels: 1,
                timestamp_ms: 0,
            };
            if let Err(e) = client.publish_audio_frame(&session_id, &marker, 0, true).await {
                warn!("Failed to publish final audio marker: {:#}", e);
            }
        });

        attempt.sink.emit(RecognizerEvent::Ended);
    }

    fn name(&self) -> &str {
        "nats-stt"
    }
}

struct ActivePrompt {
    session_id: String,
    forwarder: JoinHandle<()>,
}

/// Prompt playback through the TTS service on NATS
pub struct NatsSpeechSynthesizer {
    client: NatsClient,
    active: Mutex<Option<ActivePrompt>>,
}

impl NatsSpeechSynthesizer {
    pub fn new(client: NatsClient) -> Self {
        Self {
            client,
            active: Mutex::new(None),
        }
    }

    fn take_active(&self) -> Option<ActivePrompt> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn speaker_event(message: SpeechEventMessage) -> SpeakerEvent {
    match message.event {
        SpeechEventKind::Start => SpeakerEvent::Started,
        SpeechEventKind::Boundary => SpeakerEvent::Boundary {
            char_index: message.char_index.unwrap_or(0),
        },
        SpeechEventKind::End => SpeakerEvent::Ended,
        SpeechEventKind::Error => SpeakerEvent::Errored(
            message
                .message
                .unwrap_or_else(|| "speech synthesis failed".to_string()),
        ),
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for NatsSpeechSynthesizer {
    async fn speak(&self, request: SpeakRequest, sink: EventSink<SpeakerEvent>) -> Result<()> {
        if let Some(previous) = self.take_active() {
            previous.forwarder.abort();
        }

        // Subscribe before publishing so the start event cannot be missed
        let mut events = self.client.subscribe_speech_events(&request.session_id).await?;
        let utterance_id = sink.tag();

        let forwarder = tokio::spawn(async move {
            while let Some(msg) = events.next().await {
                let message = match serde_json::from_slice::<SpeechEventMessage>(&msg.payload) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Failed to parse speech event: {}", e);
                        continue;
                    }
                };
                if message.utterance_id != utterance_id {
                    continue;
                }

                let event = speaker_event(message);
                let terminal = event.is_terminal();
                if !sink.emit(event) || terminal {
                    return;
                }
            }

            sink.emit(SpeakerEvent::Errored("speech event stream closed".to_string()));
        });

        let message = SpeakMessage {
            session_id: request.session_id.clone(),
            utterance_id,
            text: request.text,
            locale: request.locale,
            rate: request.rate,
            pitch: request.pitch,
            volume: request.volume,
        };
        if let Err(e) = self.client.publish_speak(&message).await {
            forwarder.abort();
            return Err(e);
        }

        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActivePrompt {
            session_id: request.session_id,
            forwarder,
        });

        Ok(())
    }

    fn cancel(&self) {
        let Some(prompt) = self.take_active() else {
            return;
        };
        prompt.forwarder.abort();

        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.publish_cancel(&prompt.session_id).await {
                warn!("Failed to cancel speech: {:#}", e);
            }
        });
    }

    fn name(&self) -> &str {
        "nats-tts"
    }
}
