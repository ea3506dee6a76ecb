use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::config::CatalogConfig;

/// A single interview question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// Text spoken to the user
    #[serde(rename = "prompt")]
    pub prompt_text: String,
}

impl Question {
    pub fn new(id: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt_text: prompt_text.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no questions selected")]
    EmptySelection,
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),
    #[error("question {0} selected more than once")]
    DuplicateQuestion(String),
}

/// Read-only question source for interview sessions
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Experience-eliciting questions used when no catalog is configured
    pub fn builtin() -> Self {
        Self::new(vec![
            Question::new("q1", "자주 쓰던 물건 이름이 갑자기 생각 나지 않은 적 있나요?"),
            Question::new("q2", "대화 중에 단어가 떠오르지 않아서 곤란했던 적이 있나요?"),
            Question::new("q3", "가족이나 지인이 평소와 다르다고 말한 적이 있나요?"),
            Question::new("q4", "최근에 불편했던 점이나 걱정되는 점이 있나요?"),
        ])
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        if config.questions.is_empty() {
            Self::builtin()
        } else {
            Self::new(config.questions.clone())
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Resolve a selection, keeping the order in which the user picked the questions
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Question>, CatalogError> {
        if ids.is_empty() {
            return Err(CatalogError::EmptySelection);
        }

        let mut seen = HashSet::new();
        ids.iter()
            .map(|id| {
                let id = id.as_ref();
                if !seen.insert(id) {
                    return Err(CatalogError::DuplicateQuestion(id.to_string()));
                }
                self.get(id)
                    .cloned()
                    .ok_or_else(|| CatalogError::UnknownQuestion(id.to_string()))
            })
            .collect()
    }
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
