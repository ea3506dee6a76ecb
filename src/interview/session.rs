use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Question;

/// How answers are captured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Microphone plus streaming recognition
    #[default]
    Voice,
    /// Typed answers; no microphone is opened
    Text,
}

/// Why a turn stopped listening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEnd {
    Silence,
    HardCap,
    UserStop,
    RecognizerExhausted,
    Typed,
}

/// A sealed answer to one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub prompt_text: String,
    pub text: String,
    pub ended_by: TurnEnd,
    pub recognizer_restarts: u32,
}

/// One interview run, owned by the turn controller
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    questions: Vec<Question>,
    index: usize,
    input: InputMode,
    started_at: DateTime<Utc>,
    answers: Vec<Answer>,
}

impl Session {
    pub fn new(id: String, questions: Vec<Question>, input: InputMode) -> Self {
        Self {
            id,
            questions,
            index: 0,
            input,
            started_at: Utc::now(),
            answers: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input(&self) -> InputMode {
        self.input
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn has_more(&self) -> bool {
        self.index + 1 < self.questions.len()
    }

    pub fn advance(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn record(&mut self, answer: Answer) {
        self.answers.push(answer);
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }
}
