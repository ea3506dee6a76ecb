use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::messages::{VoiceChatbotRequest, VoiceChatbotResponse};
use super::{AnalysisError, AnalysisRequest, AnalysisService, AnalysisSummary, SummarySource};
use crate::config::AnalysisConfig;

/// HTTP client for the consultation analysis backend
pub struct HttpAnalysisClient {
    client: Client,
    endpoint: String,
    user_id: String,
}

impl HttpAnalysisClient {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = format!("{}/voice-chatbot", config.base_url.trim_end_matches('/'));
        info!("Analysis service endpoint: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            user_id: config.user_id.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisSummary, AnalysisError> {
        let body = VoiceChatbotRequest {
            user_response: request.answer.trim().to_string(),
            question_context: request.question.clone(),
            session_id: request.session_id.clone(),
            user_id: self.user_id.clone(),
        };

        debug!("Requesting analysis for question {}", request.question_id);

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: VoiceChatbotResponse = response.json().await?;
        interpret(parsed)
    }
}

/// Map a backend response onto the summary shown to the user
pub fn interpret(response: VoiceChatbotResponse) -> Result<AnalysisSummary, AnalysisError> {
    match response.status.as_str() {
        "off_topic" => Ok(AnalysisSummary {
            summary: response
                .message
                .unwrap_or_else(|| "치매와 관련없는 내용입니다.".to_string()),
            analysis: "해당 챗봇은 치매와 인지장애 관련 상담만 가능합니다.".to_string(),
            guidance: "치매 관련 증상이나 우려사항에 대해 말씀해 주세요.".to_string(),
            source: SummarySource::OffTopic,
        }),
        "success" => {
            let summary = response
                .analysis
                .and_then(|a| a.summary)
                .filter(|s| s.error.is_none())
                .ok_or_else(|| AnalysisError::Unusable("success without a summary".to_string()))?;

            Ok(AnalysisSummary {
                summary: summary.render(),
                analysis: "AI 분석 완료".to_string(),
                guidance: "전문가 상담 권장".to_string(),
                source: SummarySource::Service,
            })
        }
        other => Err(AnalysisError::Unusable(format!("unexpected status {other}"))),
    }
}
