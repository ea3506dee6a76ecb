use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::audio::MicrophoneError;
use crate::catalog::CatalogError;

pub type Result<T> = std::result::Result<T, TurnError>;

/// Failures surfaced by the turn engine. Everything except
/// `InvariantViolation` is absorbed by the controller and reported in the
/// session snapshot.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recognizer gave up after {restarts} restarts")]
    RecognizerExhausted { restarts: u32 },

    #[error("Speech synthesis error: {0}")]
    SpeechSynthesis(String),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Invalid question selection: {0}")]
    Selection(#[from] CatalogError),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Interview controller has shut down")]
    Closed,
}

impl From<MicrophoneError> for TurnError {
    fn from(err: MicrophoneError) -> Self {
        match err {
            MicrophoneError::AlreadyOpen => TurnError::InvariantViolation(err.to_string()),
            MicrophoneError::PermissionDenied(reason) | MicrophoneError::Unavailable(reason) => {
                TurnError::PermissionDenied(reason)
            }
        }
    }
}
