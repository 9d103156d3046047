//! REST surface for the reply pipeline.
//!
//! The transport is a thin shell: it adapts request bodies into
//! `EmployerMessage`, runs the controller, logs the outcome, and renders one
//! of the two outcome shapes. A run-level pipeline failure maps to 502 —
//! never to either outcome shape.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::error::PipelineError;
use crate::pipeline::PipelineController;
use crate::pipeline::types::{
    CriterionScores, EmployerMessage, IntakeCategory, MessageType, PipelineOutcome,
};
use crate::store::{InteractionLog, LogEntry, LogRecord};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PipelineController>,
    pub log: Arc<InteractionLog>,
}

/// Build the Axum router.
pub fn routes(controller: Arc<PipelineController>, log: Arc<InteractionLog>) -> Router {
    let state = AppState { controller, log };

    Router::new()
        .route("/process-message", post(process_message))
        .route("/submit-human-response", post(submit_human_response))
        .route("/logs", get(get_logs).delete(clear_logs))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Request / response bodies ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProcessMessageRequest {
    pub sender_name: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HumanResponseRequest {
    pub sender_name: String,
    pub message: String,
    pub human_reply: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub reason: String,
}

/// Wire rendering of a pipeline outcome.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum OutcomeResponse {
    HumanRequired {
        reason: String,
        category: IntakeCategory,
    },
    Sent {
        response: String,
        message_type: MessageType,
        evaluation: EvaluationBody,
        attempts: u32,
    },
}

#[derive(Debug, Serialize)]
struct EvaluationBody {
    score: u8,
    approved: bool,
    scores: CriterionScores,
    feedback: String,
}

fn render_outcome(outcome: &PipelineOutcome) -> OutcomeResponse {
    match outcome {
        PipelineOutcome::HumanRequired { verdict } => OutcomeResponse::HumanRequired {
            reason: verdict.reason.clone(),
            category: verdict.category,
        },
        PipelineOutcome::Sent {
            draft,
            evaluation,
            attempts,
        } => OutcomeResponse::Sent {
            response: draft.reply_text.clone(),
            message_type: draft.message_type,
            evaluation: EvaluationBody {
                score: evaluation.total,
                approved: evaluation.approved,
                scores: evaluation.scores,
                feedback: evaluation.feedback.clone(),
            },
            attempts: *attempts,
        },
    }
}

/// Run-level failure: the caller must treat this as "could not process".
#[derive(Debug)]
struct ApiError(PipelineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Pipeline run failed");
        (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

async fn process_message(
    State(state): State<AppState>,
    Json(request): Json<ProcessMessageRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message = EmployerMessage {
        sender: request.sender_name,
        body: request.message,
    };

    let outcome = state.controller.run(&message).await.map_err(ApiError)?;

    let entry = match &outcome {
        PipelineOutcome::HumanRequired { verdict } => LogEntry::HumanInterventionRequested {
            detection: verdict.clone(),
        },
        PipelineOutcome::Sent {
            draft,
            evaluation,
            attempts,
        } => LogEntry::ResponseSent {
            final_response: draft.reply_text.clone(),
            message_type: draft.message_type,
            evaluation: evaluation.clone(),
            attempts: *attempts,
        },
    };
    if let Err(e) = state
        .log
        .append(LogRecord::new(&message.sender, &message.body, entry))
        .await
    {
        // The reply still goes out; the record is what's lost.
        warn!(error = %e, "Failed to append interaction log record");
    }

    let body = serde_json::to_value(render_outcome(&outcome))
        .unwrap_or_else(|_| serde_json::json!({ "status": "sent" }));
    Ok(Json(body))
}

async fn submit_human_response(
    State(state): State<AppState>,
    Json(request): Json<HumanResponseRequest>,
) -> Json<serde_json::Value> {
    if let Err(e) = state
        .log
        .append(LogRecord::new(
            &request.sender_name,
            &request.message,
            LogEntry::HumanResponseSubmitted {
                final_response: request.human_reply.clone(),
                category: request.category,
                reason: request.reason,
            },
        ))
        .await
    {
        warn!(error = %e, "Failed to append human response record");
    }

    Json(serde_json::json!({
        "status": "sent",
        "response": request.human_reply,
        "message_type": "human_response",
        "submitted_by": "human",
    }))
}

async fn get_logs(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    Json(state.log.read_all().await)
}

async fn clear_logs(State(state): State<AppState>) -> Response {
    match state.log.clear().await {
        Ok(()) => Json(serde_json::json!({
            "status": "ok",
            "message": "Logs cleared."
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to clear logs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "agent": "Career Assist"
    }))
}
