use chrono::{DateTime, Utc};
use serde::Serialize;

use super::session::{Answer, InputMode};
use super::state::TurnState;
use crate::analysis::InterviewReport;
use crate::audio::PermissionState;
use crate::catalog::Question;

/// Point-in-time view of the controller, published after every change
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub state: TurnState,
    pub input_mode: InputMode,
    pub started_at: Option<DateTime<Utc>>,

    /// Zero-based index of the current question
    pub question_index: usize,
    pub total_questions: usize,
    pub current_question: Option<Question>,

    pub is_speaking: bool,
    /// Live composed transcript of the current answer
    pub transcript: String,
    pub permission: PermissionState,
    pub recognizer_restarts: u32,

    pub answers: Vec<Answer>,
    pub report: Option<InterviewReport>,

    /// Last recovered error, for user-facing hints
    pub last_error: Option<String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            session_id: None,
            state: TurnState::Idle,
            input_mode: InputMode::default(),
            started_at: None,
            question_index: 0,
            total_questions: 0,
            current_question: None,
            is_speaking: false,
            transcript: String::new(),
            permission: PermissionState::default(),
            recognizer_restarts: 0,
            answers: Vec::new(),
            report: None,
            last_error: None,
        }
    }
}
