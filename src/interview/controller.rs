use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use super::handle::{Command, Envelope, InterviewHandle};
use super::session::{Answer, InputMode, Session, TurnEnd};
use super::state::{Trigger, TurnState};
use super::stats::SessionSnapshot;
use super::transcript::TranscriptAccumulator;
use super::watchdog::{SilenceWatchdog, WatchdogExpiry};
use crate::analysis::{summarize_answers, AnalysisError, AnalysisService, InterviewReport};
use crate::audio::{MicrophoneAccess, MicrophoneError, MicrophoneSlot, PermissionState};
use crate::catalog::Question;
use crate::config::TurnConfig;
use crate::error::{Result, TurnError};
use crate::speech::{
    EngineEvent, PromptOutcome, PromptSpeaker, RecognitionEngine, RecognitionRequest,
    RecognizerSignal, SpeechRecognizer, SpeechSynthesizer,
};

const COMMAND_BUFFER: usize = 32;

/// External engines and services a controller drives
#[derive(Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub recognizer: Arc<dyn RecognitionEngine>,
    pub microphone: Arc<dyn MicrophoneAccess>,
    pub analysis: Arc<dyn AnalysisService>,
}

/// Report produced off the controller task for one session
#[derive(Debug)]
struct AnalysisDone {
    session_id: String,
    report: InterviewReport,
    failure: Option<AnalysisError>,
}

/// Owns one interview at a time and moves it through its turns.
///
/// Every input (user commands, engine events, timer expiries) is handled
/// to completion on this task before the next one is looked at, so the
/// controller never observes a half-applied transition.
pub struct TurnController {
    config: TurnConfig,
    microphone_access: Arc<dyn MicrophoneAccess>,
    analysis: Arc<dyn AnalysisService>,

    speaker: PromptSpeaker,
    recognizer: SpeechRecognizer,
    transcript: TranscriptAccumulator,
    watchdog: SilenceWatchdog,
    microphone: MicrophoneSlot,

    state: TurnState,
    session: Option<Session>,
    permission: PermissionState,
    report: Option<InterviewReport>,
    last_error: Option<String>,
    analysis_task: Option<JoinHandle<()>>,

    commands: mpsc::Receiver<Envelope>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    reports_tx: mpsc::UnboundedSender<AnalysisDone>,
    reports: mpsc::UnboundedReceiver<AnalysisDone>,
    snapshot: watch::Sender<SessionSnapshot>,
    levels: watch::Sender<f32>,
}

impl TurnController {
    pub fn new(config: TurnConfig, collaborators: Collaborators) -> (Self, InterviewHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (reports_tx, reports) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (levels, levels_rx) = watch::channel(0.0_f32);

        let speaker = PromptSpeaker::new(
            collaborators.synthesizer,
            config.prompt.clone(),
            events_tx.clone(),
        );
        let recognizer = SpeechRecognizer::new(
            collaborators.recognizer,
            config.recognizer.clone(),
            events_tx,
        );
        let handle = InterviewHandle::new(
            command_tx,
            snapshot_rx,
            speaker.subscribe_speaking(),
            levels_rx,
        );

        let controller = Self {
            watchdog: SilenceWatchdog::from_config(&config.watchdog),
            config,
            microphone_access: collaborators.microphone,
            analysis: collaborators.analysis,
            speaker,
            recognizer,
            transcript: TranscriptAccumulator::new(),
            microphone: MicrophoneSlot::new(),
            state: TurnState::Idle,
            session: None,
            permission: PermissionState::default(),
            report: None,
            last_error: None,
            analysis_task: None,
            commands,
            events,
            reports_tx,
            reports,
            snapshot,
            levels,
        };

        (controller, handle)
    }

    /// Build a controller and run it on its own task
    pub fn spawn(
        config: TurnConfig,
        collaborators: Collaborators,
    ) -> (InterviewHandle, JoinHandle<Result<()>>) {
        let (controller, handle) = Self::new(config, collaborators);
        (handle, tokio::spawn(controller.run()))
    }

    /// Process inputs until shut down, every handle is dropped, or an invariant breaks.
    /// The microphone and recognizer are released on every exit path.
    pub async fn run(mut self) -> Result<()> {
        info!("Turn controller started");

        let result = self.process().await;
        if let Err(e) = &result {
            error!("Turn controller failed: {}", e);
            self.abandon().await;
        }
        result
    }

    async fn process(&mut self) -> Result<()> {
        loop {
            let expiry = self.watchdog.expired();
            let restart_at = self.recognizer.restart_deadline();

            tokio::select! {
                biased;

                Some(event) = self.events.recv() => {
                    self.handle_engine_event(event).await?;
                }
                envelope = self.commands.recv() => {
                    let Some(Envelope { command, reply }) = envelope else {
                        info!("All interview handles dropped");
                        self.abandon().await;
                        return Ok(());
                    };

                    if matches!(command, Command::Shutdown) {
                        self.abandon().await;
                        self.transition(Trigger::Leave)?;
                        let _ = reply.send(true);
                        info!("Turn controller stopped");
                        return Ok(());
                    }

                    let accepted = self.handle_command(command).await?;
                    let _ = reply.send(accepted);
                }
                Some(done) = self.reports.recv() => {
                    self.on_analysis_done(done);
                }
                kind = expiry => {
                    self.on_watchdog_expired(kind).await?;
                }
                _ = sleep_until_opt(restart_at) => {
                    self.restart_recognizer().await?;
                }
            }

            self.publish();
        }
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        debug!("Command {:?} in {:?}", command, self.state);

        match command {
            Command::Begin {
                session_id,
                questions,
                input,
            } => self.begin(session_id, questions, input).await,
            Command::StopTurn => {
                if self.state != TurnState::Recording {
                    return Ok(false);
                }
                self.finish_turn(TurnEnd::UserStop).await?;
                Ok(true)
            }
            Command::RetryMicrophone => {
                if !self.can(Trigger::RetryMicrophone) {
                    return Ok(false);
                }
                self.transition(Trigger::RetryMicrophone)?;
                self.acquire_input().await?;
                Ok(true)
            }
            Command::SubmitText(text) => self.submit_text(&text).await,
            Command::Leave => {
                self.leave().await?;
                Ok(true)
            }
            // Handled by the run loop
            Command::Shutdown => Ok(true),
        }
    }

    async fn begin(
        &mut self,
        session_id: String,
        questions: Vec<Question>,
        input: InputMode,
    ) -> Result<bool> {
        if questions.is_empty() {
            return Ok(false);
        }

        if !self.can(Trigger::Begin) {
            info!("Abandoning session in {:?} to start a new one", self.state);
            self.abandon().await;
            self.transition(Trigger::Leave)?;
        }

        info!(
            "Starting session {} with {} questions ({:?} input)",
            session_id,
            questions.len(),
            input
        );

        self.cancel_analysis();
        self.session = Some(Session::new(session_id, questions, input));
        self.report = None;
        self.last_error = None;

        self.transition(Trigger::Begin)?;
        self.speak_current_prompt().await;
        Ok(true)
    }

    async fn speak_current_prompt(&mut self) {
        self.transcript.reset();

        let Some(session) = &self.session else {
            return;
        };
        let Some(question) = session.current_question() else {
            return;
        };

        info!(
            "Question {}/{}: {}",
            session.index() + 1,
            session.len(),
            question.id
        );

        let session_id = session.id().to_string();
        let text = question.prompt_text.clone();
        self.speaker.speak(&session_id, &text).await;
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::Speaker { utterance, event } => {
                let Some(outcome) = self.speaker.on_event(utterance, event) else {
                    return Ok(());
                };
                if self.state != TurnState::SpeakingPrompt {
                    return Ok(());
                }

                if let PromptOutcome::Failed(reason) = outcome {
                    warn!("Prompt failed, continuing to listen: {}", reason);
                    self.last_error = Some(TurnError::SpeechSynthesis(reason).to_string());
                }

                self.transition(Trigger::PromptFinished)?;
                self.acquire_input().await
            }
            EngineEvent::Recognizer { attempt, event } => {
                let signal = self.recognizer.on_event(attempt, event);
                self.on_recognizer_signal(signal).await
            }
        }
    }

    /// Obtain the answer input for the current turn: the microphone in voice
    /// mode, nothing in text mode.
    async fn acquire_input(&mut self) -> Result<()> {
        let input = self.session.as_ref().map(Session::input).unwrap_or_default();
        if input == InputMode::Text {
            self.transition(Trigger::InputReady)?;
            info!("Waiting for a typed answer");
            return Ok(());
        }

        self.permission = self.microphone_access.query().await;
        if self.permission == PermissionState::Denied {
            self.deny("microphone access is blocked".to_string())?;
            return Ok(());
        }

        let acquired = self
            .microphone
            .acquire(
                self.microphone_access.as_ref(),
                &self.config.microphone,
                &self.levels,
            )
            .await;

        match acquired {
            Ok(()) => {
                self.permission = PermissionState::Granted;
                self.start_recording().await
            }
            Err(MicrophoneError::PermissionDenied(reason)) => {
                self.permission = PermissionState::Denied;
                self.deny(reason)
            }
            Err(MicrophoneError::Unavailable(reason)) => self.deny(reason),
            Err(e @ MicrophoneError::AlreadyOpen) => Err(e.into()),
        }
    }

    fn deny(&mut self, reason: String) -> Result<()> {
        warn!("Microphone unavailable: {}", reason);
        self.last_error = Some(TurnError::PermissionDenied(reason).to_string());
        self.transition(Trigger::MicrophoneDenied)?;
        Ok(())
    }

    async fn start_recording(&mut self) -> Result<()> {
        self.transition(Trigger::InputReady)?;

        let Some(session) = &self.session else {
            return Err(TurnError::InvariantViolation(
                "recording without a session".to_string(),
            ));
        };
        let request = RecognitionRequest {
            session_id: session.id().to_string(),
            locale: self.config.recognizer.locale.clone(),
        };

        self.watchdog.arm(Instant::now());
        let signal = self
            .recognizer
            .start(request, self.microphone.subscribe())
            .await;
        self.on_recognizer_signal(signal).await
    }

    async fn restart_recognizer(&mut self) -> Result<()> {
        if self.state != TurnState::Recording {
            self.recognizer.request_stop();
            return Ok(());
        }

        let signal = self.recognizer.restart(self.microphone.subscribe()).await;
        self.on_recognizer_signal(signal).await
    }

    async fn on_recognizer_signal(&mut self, signal: RecognizerSignal) -> Result<()> {
        let recording = self.state == TurnState::Recording;

        match signal {
            RecognizerSignal::Interim(text) if recording => {
                debug!("Interim: {}", text);
                self.transcript.push_interim(&text);
                self.watchdog.touch(Instant::now());
            }
            RecognizerSignal::Final(text) if recording => {
                debug!("Final: {}", text);
                self.transcript.push_final(&text);
                self.watchdog.touch(Instant::now());
            }
            RecognizerSignal::RestartScheduled { attempt, .. } => {
                debug!("Recognition attempt #{} scheduled", attempt);
            }
            RecognizerSignal::Exhausted { restarts } if recording => {
                let err = TurnError::RecognizerExhausted { restarts };
                warn!("{}; finalizing with the transcript so far", err);
                self.last_error = Some(err.to_string());
                self.finish_turn(TurnEnd::RecognizerExhausted).await?;
            }
            other => debug!("Recognizer signal {:?} in {:?}", other, self.state),
        }

        Ok(())
    }

    async fn on_watchdog_expired(&mut self, kind: WatchdogExpiry) -> Result<()> {
        if self.state != TurnState::Recording {
            self.watchdog.disarm();
            return Ok(());
        }

        info!("Watchdog expired ({:?})", kind);
        let end = match kind {
            WatchdogExpiry::Silence => TurnEnd::Silence,
            WatchdogExpiry::HardCap => TurnEnd::HardCap,
        };
        self.finish_turn(end).await
    }

    async fn submit_text(&mut self, text: &str) -> Result<bool> {
        if !self.can(Trigger::TextSubmitted) {
            return Ok(false);
        }

        self.transcript.push_final(text);
        self.finish_turn(TurnEnd::Typed).await?;
        Ok(true)
    }

    /// Seal the answer, release the turn's resources, then advance or finish
    async fn finish_turn(&mut self, end: TurnEnd) -> Result<()> {
        let trigger = match end {
            TurnEnd::Typed => Trigger::TextSubmitted,
            _ => Trigger::StopRequested,
        };
        self.transition(trigger)?;

        let sealed = self.transcript.seal();
        let restarts = self.recognizer.total_restarts();
        self.teardown().await;

        let Some(session) = self.session.as_mut() else {
            return Err(TurnError::InvariantViolation(
                "finalizing without a session".to_string(),
            ));
        };
        let Some(question) = session.current_question().cloned() else {
            return Err(TurnError::InvariantViolation(
                "finalizing past the last question".to_string(),
            ));
        };

        info!(
            "Answer to {} sealed ({:?}, {} chars, {} restarts)",
            question.id,
            end,
            sealed.text().chars().count(),
            restarts
        );
        debug!("Answer text: {}", sealed.text());

        session.record(Answer {
            question_id: question.id,
            prompt_text: question.prompt_text,
            text: sealed.into_text(),
            ended_by: end,
            recognizer_restarts: restarts,
        });

        let more_questions = session.has_more();
        self.transition(Trigger::TurnSealed { more_questions })?;

        if more_questions {
            if let Some(session) = self.session.as_mut() {
                session.advance();
            }
            self.speak_current_prompt().await;
        } else {
            self.start_analysis();
        }

        Ok(())
    }

    /// Summarize the answers on a separate task; the report comes back through `reports`
    fn start_analysis(&mut self) {
        self.cancel_analysis();
        let Some(session) = &self.session else {
            return;
        };

        info!("Interview {} complete, requesting analysis", session.id());

        let service = Arc::clone(&self.analysis);
        let session_id = session.id().to_string();
        let answers = session.answers().to_vec();
        let reports = self.reports_tx.clone();

        self.analysis_task = Some(tokio::spawn(async move {
            let (report, failure) = summarize_answers(service.as_ref(), &session_id, &answers).await;
            let _ = reports.send(AnalysisDone {
                session_id,
                report,
                failure,
            });
        }));
    }

    fn on_analysis_done(&mut self, done: AnalysisDone) {
        let current = self.session.as_ref().map(Session::id);
        if self.state != TurnState::Done || current != Some(done.session_id.as_str()) {
            debug!("Discarding report for session {}", done.session_id);
            return;
        }

        self.analysis_task = None;
        if let Some(failure) = done.failure {
            let err = TurnError::from(failure);
            warn!("{}; local summary used", err);
            self.last_error = Some(err.to_string());
        }
        self.report = Some(done.report);
    }

    fn cancel_analysis(&mut self) {
        if let Some(task) = self.analysis_task.take() {
            debug!("Cancelling pending analysis");
            task.abort();
        }
    }

    /// Stop the recognizer, cancel both timers and release the microphone,
    /// in that order, then wait for the recognizer to confirm.
    async fn teardown(&mut self) {
        self.recognizer.request_stop();
        self.watchdog.disarm();
        let released = self.microphone.release().await;
        let stopped = self.recognizer.await_stopped(&mut self.events).await;
        debug!("Turn teardown: microphone released={}, recognizer {:?}", released, stopped);
    }

    /// Drop everything belonging to the current turn
    async fn abandon(&mut self) {
        self.speaker.cancel();
        self.cancel_analysis();
        self.teardown().await;
        self.transcript.reset();
    }

    async fn leave(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            info!("Leaving session {} in {:?}", session.id(), self.state);
        }

        self.abandon().await;
        self.session = None;
        self.report = None;
        self.last_error = None;
        self.transition(Trigger::Leave)?;
        Ok(())
    }

    fn can(&self, trigger: Trigger) -> bool {
        self.state.next(trigger).is_some()
    }

    fn transition(&mut self, trigger: Trigger) -> Result<TurnState> {
        let next = self.state.next(trigger).ok_or_else(|| {
            TurnError::InvariantViolation(format!("{:?} is not valid in {:?}", trigger, self.state))
        })?;

        if self.microphone.is_open() && !next.holds_microphone() {
            return Err(TurnError::InvariantViolation(format!(
                "microphone still open entering {:?}",
                next
            )));
        }

        info!("{:?} -> {:?} ({:?})", self.state, next, trigger);
        self.state = next;
        self.publish();
        Ok(next)
    }

    fn publish(&self) {
        let session = self.session.as_ref();
        let snapshot = SessionSnapshot {
            session_id: session.map(|s| s.id().to_string()),
            state: self.state,
            input_mode: session.map(Session::input).unwrap_or_default(),
            started_at: session.map(Session::started_at),
            question_index: session.map(Session::index).unwrap_or(0),
            total_questions: session.map(Session::len).unwrap_or(0),
            current_question: session.and_then(Session::current_question).cloned(),
            is_speaking: self.speaker.is_speaking(),
            transcript: self.transcript.composed_text(),
            permission: self.permission,
            recognizer_restarts: self.recognizer.total_restarts(),
            answers: session.map(|s| s.answers().to_vec()).unwrap_or_default(),
            report: self.report.clone(),
            last_error: self.last_error.clone(),
        };
        self.snapshot.send_replace(snapshot);
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
