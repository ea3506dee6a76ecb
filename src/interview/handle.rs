use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use super::session::InputMode;
use super::state::TurnState;
use super::stats::SessionSnapshot;
use crate::catalog::{CatalogError, Question};
use crate::error::{Result, TurnError};

#[derive(Debug)]
pub(crate) enum Command {
    Begin {
        session_id: String,
        questions: Vec<Question>,
        input: InputMode,
    },
    StopTurn,
    RetryMicrophone,
    SubmitText(String),
    Leave,
    Shutdown,
}

/// A command plus the channel the controller answers on. The reply is
/// `true` when the command applied in the controller's current state.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub command: Command,
    pub reply: oneshot::Sender<bool>,
}

/// Cloneable front end of a running `TurnController`
#[derive(Clone)]
pub struct InterviewHandle {
    commands: mpsc::Sender<Envelope>,
    snapshot: watch::Receiver<SessionSnapshot>,
    speaking: watch::Receiver<bool>,
    levels: watch::Receiver<f32>,
}

impl InterviewHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Envelope>,
        snapshot: watch::Receiver<SessionSnapshot>,
        speaking: watch::Receiver<bool>,
        levels: watch::Receiver<f32>,
    ) -> Self {
        Self {
            commands,
            snapshot,
            speaking,
            levels,
        }
    }

    /// Start a new session over `questions`, abandoning any session in progress.
    /// Returns the new session id.
    pub async fn begin(&self, questions: Vec<Question>, input: InputMode) -> Result<String> {
        if questions.is_empty() {
            return Err(CatalogError::EmptySelection.into());
        }

        let session_id = Uuid::new_v4().to_string();
        self.send(Command::Begin {
            session_id: session_id.clone(),
            questions,
            input,
        })
        .await?;

        Ok(session_id)
    }

    /// End the current answer now, as if the silence window had elapsed
    pub async fn stop_turn(&self) -> Result<bool> {
        self.send(Command::StopTurn).await
    }

    pub async fn retry_microphone(&self) -> Result<bool> {
        self.send(Command::RetryMicrophone).await
    }

    /// Use typed text as the answer to the current question
    pub async fn submit_text(&self, text: impl Into<String>) -> Result<bool> {
        self.send(Command::SubmitText(text.into())).await
    }

    /// Abandon the session and release every resource it holds
    pub async fn leave(&self) -> Result<bool> {
        self.send(Command::Leave).await
    }

    /// Leave and stop the controller task
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await.map(|_| ())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> TurnState {
        self.snapshot.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.speaking.clone()
    }

    pub fn subscribe_level(&self) -> watch::Receiver<f32> {
        self.levels.clone()
    }

    /// Latest microphone level, 0.0 when no microphone is open
    pub fn level(&self) -> f32 {
        *self.levels.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx.wait_for(predicate).await.map_err(|_| TurnError::Closed)?;
        Ok(snapshot.clone())
    }

    pub async fn wait_for_state(&self, state: TurnState) -> Result<SessionSnapshot> {
        self.wait_for(|s| s.state == state).await
    }

    async fn send(&self, command: Command) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply })
            .await
            .map_err(|_| TurnError::Closed)?;
        rx.await.map_err(|_| TurnError::Closed)
    }
}
