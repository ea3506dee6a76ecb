use serde::{Deserialize, Serialize};

/// Lifecycle of an interview, one turn at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    SpeakingPrompt,
    AwaitingMicPermission,
    PermissionDenied,
    Recording,
    Finalizing,
    Done,
}

/// Everything that can move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// User started (or restarted) a session
    Begin,
    /// The prompt ended or failed to play
    PromptFinished,
    /// Microphone access confirmed, or the text input needs none
    InputReady,
    MicrophoneDenied,
    RetryMicrophone,
    /// Watchdog expiry, user stop, or recognizer exhaustion
    StopRequested,
    /// A typed answer replaces listening
    TextSubmitted,
    TurnSealed { more_questions: bool },
    /// User navigated away
    Leave,
}

impl Trigger {
    pub const ALL: [Trigger; 10] = [
        Trigger::Begin,
        Trigger::PromptFinished,
        Trigger::InputReady,
        Trigger::MicrophoneDenied,
        Trigger::RetryMicrophone,
        Trigger::StopRequested,
        Trigger::TextSubmitted,
        Trigger::TurnSealed {
            more_questions: true,
        },
        Trigger::TurnSealed {
            more_questions: false,
        },
        Trigger::Leave,
    ];
}

impl TurnState {
    pub const ALL: [TurnState; 7] = [
        TurnState::Idle,
        TurnState::SpeakingPrompt,
        TurnState::AwaitingMicPermission,
        TurnState::PermissionDenied,
        TurnState::Recording,
        TurnState::Finalizing,
        TurnState::Done,
    ];

    pub fn is_terminal(self) -> bool {
        self == TurnState::Done
    }

    /// A microphone may be open only here. Finalizing keeps it until teardown completes.
    pub fn holds_microphone(self) -> bool {
        matches!(self, TurnState::Recording | TurnState::Finalizing)
    }

    /// Next state, or `None` when the trigger does not apply in this state
    pub fn next(self, trigger: Trigger) -> Option<TurnState> {
        use TurnState::*;

        match (self, trigger) {
            (_, Trigger::Leave) => Some(Idle),
            (Idle | Done, Trigger::Begin) => Some(SpeakingPrompt),
            (SpeakingPrompt, Trigger::PromptFinished) => Some(AwaitingMicPermission),
            (AwaitingMicPermission, Trigger::InputReady) => Some(Recording),
            (AwaitingMicPermission, Trigger::MicrophoneDenied) => Some(PermissionDenied),
            (PermissionDenied, Trigger::RetryMicrophone) => Some(AwaitingMicPermission),
            (Recording, Trigger::StopRequested) => Some(Finalizing),
            (Recording | PermissionDenied, Trigger::TextSubmitted) => Some(Finalizing),
            (Finalizing, Trigger::TurnSealed { more_questions: true }) => Some(SpeakingPrompt),
            (Finalizing, Trigger::TurnSealed { more_questions: false }) => Some(Done),
            _ => None,
        }
    }
}
