use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::AnalysisSummary;

/// Summary for one question/answer pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReport {
    pub question_id: String,
    pub question: String,
    pub answer: String,
    pub summary: AnalysisSummary,
}

/// Consultation record for a finished interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewReport {
    pub session_id: String,
    pub date: NaiveDate,
    pub entries: Vec<AnswerReport>,
}

impl InterviewReport {
    /// True when at least one entry had to use the local fallback
    pub fn is_degraded(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.summary.source == super::SummarySource::LocalFallback)
    }

    /// Plain-text record for display, printing and saving
    pub fn render(&self) -> String {
        let mut out = format!("📝 인지건강 상담 기록 ({})\n", self.date.format("%Y-%m-%d"));

        for entry in &self.entries {
            out.push_str("\n[사용자 발화 기록]\n\n");
            out.push_str(&format!("- 질문: {}\n", entry.question));
            out.push_str(&format!("- 답변: {}\n", entry.answer));
            out.push_str("\n[AI 요약]\n\n");
            out.push_str(&format!("- 요약: {}\n", entry.summary.summary));
            out.push_str(&format!("- 분석: {}\n", entry.summary.analysis));
            out.push_str(&format!("- 안내: {}\n", entry.summary.guidance));
        }

        out
    }
}
