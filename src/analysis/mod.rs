//! Hand-off of sealed answers to the analysis backend
//!
//! The interview never fails because of analysis: any service error is
//! replaced by a local keyword-based summary.

mod client;
mod fallback;
pub mod messages;
mod report;

pub use client::{interpret, HttpAnalysisClient};
pub use fallback::LocalSummarizer;
pub use report::{AnswerReport, InterviewReport};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::interview::Answer;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("analysis service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("analysis response unusable: {0}")]
    Unusable(String),
}

/// One answer to be analysed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub session_id: String,
    pub question_id: String,
    pub question: String,
    /// Sealed transcript; may be empty when nothing was said
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    Service,
    OffTopic,
    LocalFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub summary: String,
    pub analysis: String,
    pub guidance: String,
    pub source: SummarySource,
}

/// Analysis backend collaborator
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisSummary, AnalysisError>;
}

/// Summarize every answer of a session, substituting the local summary on failure.
/// The last service failure, if any, is returned alongside the report.
pub async fn summarize_answers(
    service: &dyn AnalysisService,
    session_id: &str,
    answers: &[Answer],
) -> (InterviewReport, Option<AnalysisError>) {
    let mut entries = Vec::with_capacity(answers.len());
    let mut last_failure = None;

    for answer in answers {
        let request = AnalysisRequest {
            session_id: session_id.to_string(),
            question_id: answer.question_id.clone(),
            question: answer.prompt_text.clone(),
            answer: answer.text.clone(),
        };

        let summary = match service.analyze(&request).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Analysis of {} failed, using local summary: {}", answer.question_id, e);
                last_failure = Some(e);
                LocalSummarizer::summarize(&answer.text)
            }
        };

        entries.push(AnswerReport {
            question_id: answer.question_id.clone(),
            question: answer.prompt_text.clone(),
            answer: answer.text.clone(),
            summary,
        });
    }

    info!("Analysis complete for {} ({} answers)", session_id, entries.len());

    let report = InterviewReport {
        session_id: session_id.to_string(),
        date: Utc::now().date_naive(),
        entries,
    };
    (report, last_failure)
}
