use super::state::AppState;
use crate::analysis::InterviewReport;
use crate::error::TurnError;
use crate::interview::{InputMode, InterviewHandle, SessionSnapshot, TurnController, TurnState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    /// Question ids in the order they should be asked
    pub question_ids: Vec<String>,

    /// Voice (default) or typed answers
    #[serde(default)]
    pub input: InputMode,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub interview_id: String,
    pub state: TurnState,
    pub question_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub interview_id: String,
    pub accepted: bool,
    pub state: TurnState,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    /// Microphone RMS level, 0.0 when closed
    pub microphone_level: f32,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub interview_id: String,
    pub report: InterviewReport,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub active_interviews: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn not_found(interview_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Interview {} not found", interview_id),
    )
}

/// Answer for a command sent to a controller; rejected commands are 409
fn command_response(
    interview_id: String,
    handle: &InterviewHandle,
    result: Result<bool, TurnError>,
) -> Response {
    match result {
        Ok(accepted) => {
            let status = if accepted {
                StatusCode::OK
            } else {
                StatusCode::CONFLICT
            };
            (
                status,
                Json(CommandResponse {
                    interview_id,
                    accepted,
                    state: handle.state(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Interview {} command failed: {}", interview_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews
/// Start a new interview over the selected questions
pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> impl IntoResponse {
    let questions = match state.catalog.select(&req.question_ids) {
        Ok(q) => q,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let question_count = questions.len();

    let collaborators = match state.factory.build().await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build interview engines: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to build interview engines: {:#}", e),
            );
        }
    };

    let (handle, task) = TurnController::spawn(state.turn_config.clone(), collaborators);

    let interview_id = match handle.begin(questions, req.input).await {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to begin interview: {}", e);
            task.abort();
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    info!("Interview {} started", interview_id);

    let response = StartInterviewResponse {
        interview_id: interview_id.clone(),
        state: handle.state(),
        question_count,
    };
    state
        .interviews
        .write()
        .await
        .insert(interview_id.clone(), handle);

    // Drop the registry entry once the controller task ends, however it ends
    {
        let interviews = Arc::clone(&state.interviews);
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(())) => info!("Interview {} controller finished", interview_id),
                Ok(Err(e)) => error!("Interview {} controller failed: {}", interview_id, e),
                Err(e) => warn!("Interview {} controller task aborted: {}", interview_id, e),
            }
            if interviews.write().await.remove(&interview_id).is_some() {
                debug!("Interview {} removed from registry", interview_id);
            }
        });
    }

    (StatusCode::CREATED, Json(response)).into_response()
}

/// POST /interviews/:interview_id/stop
/// End the current answer immediately
pub async fn stop_turn(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = state.get(&interview_id).await else {
        return not_found(&interview_id);
    };

    let result = handle.stop_turn().await;
    command_response(interview_id, &handle, result)
}

/// POST /interviews/:interview_id/retry-microphone
pub async fn retry_microphone(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = state.get(&interview_id).await else {
        return not_found(&interview_id);
    };

    let result = handle.retry_microphone().await;
    command_response(interview_id, &handle, result)
}

/// POST /interviews/:interview_id/answer
/// Submit a typed answer for the current question
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> impl IntoResponse {
    let Some(handle) = state.get(&interview_id).await else {
        return not_found(&interview_id);
    };

    let result = handle.submit_text(req.text).await;
    command_response(interview_id, &handle, result)
}

/// DELETE /interviews/:interview_id
/// Leave the interview and stop its controller
pub async fn close_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let handle = state.interviews.write().await.remove(&interview_id);
    let Some(handle) = handle else {
        return not_found(&interview_id);
    };

    if let Err(e) = handle.shutdown().await {
        warn!("Interview {} was already stopped: {}", interview_id, e);
    }

    info!("Interview {} closed", interview_id);
    (
        StatusCode::OK,
        Json(CommandResponse {
            interview_id,
            accepted: true,
            state: TurnState::Idle,
        }),
    )
        .into_response()
}

/// GET /interviews/:interview_id/status
pub async fn get_interview_status(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    match state.get(&interview_id).await {
        Some(handle) => (
            StatusCode::OK,
            Json(StatusResponse {
                snapshot: handle.snapshot(),
                microphone_level: handle.level(),
            }),
        )
            .into_response(),
        None => not_found(&interview_id),
    }
}

/// GET /interviews/:interview_id/report
/// Consultation record; 409 until analysis has finished
pub async fn get_interview_report(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = state.get(&interview_id).await else {
        return not_found(&interview_id);
    };

    match handle.snapshot().report {
        Some(report) => (
            StatusCode::OK,
            Json(ReportResponse {
                interview_id,
                text: report.render(),
                report,
            }),
        )
            .into_response(),
        None => error_response(
            StatusCode::CONFLICT,
            format!("Interview {} has no report yet", interview_id),
        ),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active_interviews = state.interviews.read().await.len();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            service: state.service_name.clone(),
            active_interviews,
        }),
    )
}
