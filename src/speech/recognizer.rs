use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::events::{EngineEvent, EventSink, RecognizerEvent};
use crate::audio::AudioFrame;
use crate::config::RecognizerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub session_id: String,
    pub locale: String,
}

/// Continuous speech-to-text engine
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Start one recognition attempt. Results and the attempt's end are
    /// reported through `sink`; `audio` carries microphone frames when the
    /// engine does not capture on its own.
    async fn start(
        &self,
        request: RecognitionRequest,
        audio: Option<broadcast::Receiver<AudioFrame>>,
        sink: EventSink<RecognizerEvent>,
    ) -> Result<()>;

    /// Ask the running attempt to stop. The engine confirms with `Ended`.
    fn stop(&self);

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Listening,
    RestartPending { at: Instant },
    Stopping,
}

/// What the controller should do with a recognizer event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerSignal {
    Interim(String),
    Final(String),
    RestartScheduled { attempt: u64, at: Instant },
    /// Restart budget used up; the turn should finalize with what it has
    Exhausted { restarts: u32 },
    /// The engine confirmed an explicit stop
    Stopped,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Confirmed,
    TimedOut,
    NotRunning,
}

/// Keeps one listening session alive across engine attempts
pub struct SpeechRecognizer {
    engine: Arc<dyn RecognitionEngine>,
    config: RecognizerConfig,
    events: mpsc::UnboundedSender<EngineEvent>,
    request: Option<RecognitionRequest>,
    attempt: u64,
    phase: Phase,
    consecutive_restarts: u32,
    total_restarts: u32,
}

impl SpeechRecognizer {
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        config: RecognizerConfig,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            engine,
            config,
            events,
            request: None,
            attempt: 0,
            phase: Phase::Idle,
            consecutive_restarts: 0,
            total_restarts: 0,
        }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Restarts performed during the current turn
    pub fn total_restarts(&self) -> u32 {
        self.total_restarts
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn is_listening(&self) -> bool {
        self.phase == Phase::Listening
    }

    pub fn restart_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::RestartPending { at } => Some(at),
            _ => None,
        }
    }

    /// Begin listening for a new turn
    pub async fn start(
        &mut self,
        request: RecognitionRequest,
        audio: Option<broadcast::Receiver<AudioFrame>>,
    ) -> RecognizerSignal {
        self.request = Some(request);
        self.consecutive_restarts = 0;
        self.total_restarts = 0;
        self.launch(audio).await
    }

    /// Run the attempt scheduled by a previous unexpected end
    pub async fn restart(&mut self, audio: Option<broadcast::Receiver<AudioFrame>>) -> RecognizerSignal {
        if !matches!(self.phase, Phase::RestartPending { .. }) {
            return RecognizerSignal::Ignored;
        }
        self.launch(audio).await
    }

    async fn launch(&mut self, audio: Option<broadcast::Receiver<AudioFrame>>) -> RecognizerSignal {
        let Some(request) = self.request.clone() else {
            return RecognizerSignal::Ignored;
        };

        self.attempt += 1;
        let sink = EventSink::new(self.events.clone(), self.attempt);

        match self.engine.start(request, audio, sink).await {
            Ok(()) => {
                info!("Recognition attempt #{} started ({})", self.attempt, self.engine.name());
                self.phase = Phase::Listening;
                RecognizerSignal::Ignored
            }
            Err(e) => {
                warn!("Recognition attempt #{} failed to start: {:#}", self.attempt, e);
                self.schedule_restart()
            }
        }
    }

    /// Apply an engine event in arrival order
    pub fn on_event(&mut self, attempt: u64, event: RecognizerEvent) -> RecognizerSignal {
        if attempt != self.attempt {
            debug!("Ignoring {:?} from stale attempt #{}", event, attempt);
            return RecognizerSignal::Ignored;
        }

        match (self.phase, event) {
            (Phase::Listening, RecognizerEvent::Interim(text)) => {
                self.consecutive_restarts = 0;
                RecognizerSignal::Interim(text)
            }
            (Phase::Listening, RecognizerEvent::Final(text)) => {
                self.consecutive_restarts = 0;
                RecognizerSignal::Final(text)
            }
            (Phase::Listening, RecognizerEvent::Ended) => {
                debug!("Recognition attempt #{} ended on its own", attempt);
                self.schedule_restart()
            }
            (Phase::Listening, RecognizerEvent::Errored(reason)) => {
                warn!("Recognition attempt #{} errored: {}", attempt, reason);
                self.schedule_restart()
            }
            (Phase::Stopping, event) if event.is_terminal() => {
                self.phase = Phase::Idle;
                RecognizerSignal::Stopped
            }
            (phase, event) => {
                debug!("Ignoring {:?} while {:?}", event, phase);
                RecognizerSignal::Ignored
            }
        }
    }

    fn schedule_restart(&mut self) -> RecognizerSignal {
        if self.consecutive_restarts >= self.config.max_restarts {
            warn!(
                "Recognizer gave up after {} consecutive restarts",
                self.consecutive_restarts
            );
            self.phase = Phase::Idle;
            return RecognizerSignal::Exhausted {
                restarts: self.total_restarts,
            };
        }

        self.consecutive_restarts += 1;
        self.total_restarts += 1;
        let at = Instant::now() + self.config.restart_backoff();
        self.phase = Phase::RestartPending { at };
        RecognizerSignal::RestartScheduled {
            attempt: self.attempt + 1,
            at,
        }
    }

    /// Suppress any further restart and ask the engine to stop
    pub fn request_stop(&mut self) {
        match self.phase {
            Phase::Listening => {
                self.phase = Phase::Stopping;
                self.engine.stop();
            }
            Phase::RestartPending { .. } => self.phase = Phase::Idle,
            Phase::Stopping | Phase::Idle => {}
        }
    }

    /// Wait for the engine to confirm a requested stop, bounded by the stop timeout.
    /// Events other than the confirmation are discarded.
    pub async fn await_stopped(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<EngineEvent>,
    ) -> StopOutcome {
        if self.phase != Phase::Stopping {
            return StopOutcome::NotRunning;
        }

        let timeout = self.config.stop_timeout();
        let confirmed = tokio::time::timeout(timeout, async {
            while let Some(event) = inbox.recv().await {
                match event {
                    EngineEvent::Recognizer { attempt, event } => {
                        if self.on_event(attempt, event) == RecognizerSignal::Stopped {
                            return true;
                        }
                    }
                    other => debug!("Discarding {:?} while recognizer stops", other),
                }
            }
            false
        })
        .await;

        match confirmed {
            Ok(true) => StopOutcome::Confirmed,
            _ => {
                warn!("Recognizer did not confirm stop within {:?}", timeout);
                self.phase = Phase::Idle;
                StopOutcome::TimedOut
            }
        }
    }
}
