use serde::{Deserialize, Serialize};

/// Body of `POST /voice-chatbot`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceChatbotRequest {
    pub user_response: String,
    pub question_context: String,
    pub session_id: String,
    pub user_id: String,
}

/// Response from the analysis backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceChatbotResponse {
    /// `success` or `off_topic`
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub analysis: Option<ResponseAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAnalysis {
    #[serde(default)]
    pub summary: Option<StructuredSummary>,
}

/// Consultation summary sections produced by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredSummary {
    #[serde(default)]
    pub primary_symptoms: Vec<String>,
    #[serde(default)]
    pub counselling_content: Vec<String>,
    #[serde(default)]
    pub psychological_state: Option<String>,
    #[serde(default)]
    pub ai_interpretation: Vec<String>,
    #[serde(default)]
    pub cautions: Vec<String>,
    /// Present when the backend could not summarize
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl StructuredSummary {
    /// Markdown-ish section text shown in the consultation record
    pub fn render(&self) -> String {
        let mut out = String::new();

        push_list(&mut out, "주 증상", &self.primary_symptoms);
        push_list(&mut out, "상담내용", &self.counselling_content);

        out.push_str("**심리상태**\n");
        out.push_str(self.psychological_state.as_deref().unwrap_or("(정보없음)"));
        out.push_str("\n\n");

        push_list(&mut out, "AI 해석", &self.ai_interpretation);
        push_list(&mut out, "주의사항", &self.cautions);

        out.trim().to_string()
    }
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("**{}**\n", title));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}
