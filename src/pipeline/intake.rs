//! Intake gate — decides whether a message must bypass automation before
//! any generation cost is spent.
//!
//! The verdict is advisory below the confidence threshold: a `requires_human`
//! with low certainty is logged and the pipeline proceeds. Parsing degrades
//! to a safe non-escalating default rather than raising.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::extract_json_object;
use crate::pipeline::types::{IntakeCategory, IntakeVerdict};
use crate::retrieval::ContextRetriever;

/// Temperature for detection (near-deterministic).
const INTAKE_TEMPERATURE: f32 = 0.2;

/// Max tokens for the detection call.
const INTAKE_MAX_TOKENS: u32 = 512;

/// Classifies messages that need human handling.
pub struct IntakeGate {
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<ContextRetriever>,
}

impl IntakeGate {
    pub fn new(llm: Arc<dyn LlmProvider>, retriever: Arc<ContextRetriever>) -> Self {
        Self { llm, retriever }
    }

    /// Produce the intake verdict for one inbound message.
    pub async fn assess(&self, message: &str) -> Result<IntakeVerdict, PipelineError> {
        let summary = self.retriever.query_summary().await?;

        let request = CompletionRequest::new(vec![ChatMessage::user(build_detection_prompt(
            message, &summary,
        ))])
        .with_temperature(INTAKE_TEMPERATURE)
        .with_max_tokens(INTAKE_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let verdict = parse_detection_response(&response.content);

        debug!(
            requires_human = verdict.requires_human,
            confidence = verdict.confidence,
            category = verdict.category.as_str(),
            "Intake verdict"
        );
        Ok(verdict)
    }
}

/// Build the detection prompt around the CV summary.
fn build_detection_prompt(message: &str, cv_summary: &str) -> String {
    format!(
        "As a career assistant, analyze this employer message.\n\n\
         ## Candidate background (from the resume):\n{cv_summary}\n\n\
         ## Employer message:\n{message}\n\n\
         ## Task:\n\
         Does this message involve any of the following?\n\
         - Salary figure negotiation (a number is named, or a counter is requested)\n\
         - A deep technical question outside the candidate's background above\n\
         - Legal or contract details (non-compete, equity, legal clauses)\n\
         - A vague or manipulative offer (suspicious, missing key information)\n\n\
         Return ONLY a JSON object, nothing else:\n\
         {{\n\
             \"requires_human\": true,\n\
             \"confidence_score\": 0.0,\n\
             \"reason\": \"why a human is or is not needed\",\n\
             \"category\": \"salary_negotiation | out_of_domain | legal | ambiguous | none\"\n\
         }}"
    )
}

/// Raw detection shape as the model returns it.
#[derive(Debug, Deserialize)]
struct DetectionResponse {
    #[serde(default)]
    requires_human: bool,
    #[serde(default)]
    confidence_score: f32,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    category: String,
}

/// Parse the detection response into a closed verdict.
///
/// Unknown categories coerce to `none`; confidence clamps into [0, 1]; a
/// fully unparseable response becomes a non-escalating default so the gate
/// never halts the pipeline on model noise.
fn parse_detection_response(raw: &str) -> IntakeVerdict {
    let json_str = extract_json_object(raw);
    match serde_json::from_str::<DetectionResponse>(&json_str) {
        Ok(response) => IntakeVerdict {
            requires_human: response.requires_human,
            confidence: response.confidence_score.clamp(0.0, 1.0),
            category: IntakeCategory::from_label(&response.category),
            reason: response.reason,
        },
        Err(e) => {
            warn!(error = %e, raw = %raw, "Unparseable detection response; continuing without escalation");
            IntakeVerdict {
                requires_human: false,
                confidence: 0.0,
                category: IntakeCategory::None,
                reason: "detection response was unparseable".into(),
            }
        }
    }
}
