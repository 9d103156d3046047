//! Response evaluator — rubric scoring of one draft against the original
//! message.
//!
//! Five criteria, each 0–2, scored in a single structured-output call.
//! Missing or malformed criterion values default to 0; only a response that
//! is not parseable as JSON at all raises.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::EvaluationError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::extract_json_object;
use crate::pipeline::types::{CriterionScores, Evaluation};

/// Temperature for scoring (deterministic-ish).
const EVALUATION_TEMPERATURE: f32 = 0.3;

/// Max tokens for the scoring call.
const EVALUATION_MAX_TOKENS: u32 = 512;

/// Scores drafts against the fixed rubric.
pub struct ResponseEvaluator {
    llm: Arc<dyn LlmProvider>,
    threshold: u8,
}

impl ResponseEvaluator {
    pub fn new(llm: Arc<dyn LlmProvider>, threshold: u8) -> Self {
        Self { llm, threshold }
    }

    /// Score `reply_text` as an answer to `original_message`.
    pub async fn evaluate(
        &self,
        original_message: &str,
        reply_text: &str,
    ) -> Result<Evaluation, EvaluationError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(build_rubric_prompt(
            original_message,
            reply_text,
        ))])
        .with_temperature(EVALUATION_TEMPERATURE)
        .with_max_tokens(EVALUATION_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let evaluation = parse_rubric_response(&response.content, self.threshold)?;

        debug!(
            total = evaluation.total,
            approved = evaluation.approved,
            "Draft evaluated"
        );
        Ok(evaluation)
    }
}

/// Build the rubric prompt.
fn build_rubric_prompt(original_message: &str, reply_text: &str) -> String {
    format!(
        "EVALUATE the following career assistant reply.\n\n\
         ## Employer message:\n{original_message}\n\n\
         ## Assistant reply:\n{reply_text}\n\n\
         ## Criteria (0-2 points each):\n\
         - professional_tone : Is the language professional and polite?\n\
         - clarity           : Is the content clear and coherent?\n\
         - completeness      : Does it fully answer the employer's question?\n\
         - safety            : Is it free of false, fabricated, or risky claims?\n\
         - relevance         : Does it directly address the incoming message?\n\n\
         Return ONLY a JSON object, nothing else:\n\
         {{\n\
             \"professional_tone\": <0-2>,\n\
             \"clarity\": <0-2>,\n\
             \"completeness\": <0-2>,\n\
             \"safety\": <0-2>,\n\
             \"relevance\": <0-2>,\n\
             \"feedback\": \"<briefly explain the total score>\",\n\
             \"suggestions\": \"<how to improve if low; 'No changes needed' if high>\"\n\
         }}"
    )
}

/// Parse the scoring response.
///
/// Each criterion is read defensively: absent or non-numeric values score 0,
/// out-of-range values clamp into 0–2.
fn parse_rubric_response(raw: &str, threshold: u8) -> Result<Evaluation, EvaluationError> {
    let json_str = extract_json_object(raw);
    let value: Value = serde_json::from_str(&json_str)
        .map_err(|e| EvaluationError::Parse(format!("JSON parse error: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| EvaluationError::Parse("response is not a JSON object".into()))?;

    let criterion = |key: &str| -> u8 {
        object
            .get(key)
            .and_then(Value::as_f64)
            .map(|score| score.clamp(0.0, 2.0) as u8)
            .unwrap_or(0)
    };

    let scores = CriterionScores {
        professional_tone: criterion("professional_tone"),
        clarity: criterion("clarity"),
        completeness: criterion("completeness"),
        safety: criterion("safety"),
        relevance: criterion("relevance"),
    };

    let text_field = |key: &str| -> String {
        object
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Ok(Evaluation::from_scores(
        scores,
        text_field("feedback"),
        text_field("suggestions"),
        threshold,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::ScriptedLlm;

    const FULL_RESPONSE: &str = r#"{
        "professional_tone": 2, "clarity": 2, "completeness": 2,
        "safety": 1, "relevance": 2,
        "feedback": "Strong, direct answer.",
        "suggestions": "No changes needed"
    }"#;

    #[test]
    fn full_response_parses_and_approves() {
        let eval = parse_rubric_response(FULL_RESPONSE, 7).unwrap();
        assert_eq!(eval.total, 9);
        assert!(eval.approved);
        assert_eq!(eval.scores.safety, 1);
        assert_eq!(eval.feedback, "Strong, direct answer.");
        assert_eq!(eval.suggestions, "No changes needed");
    }

    #[test]
    fn total_always_matches_score_sum() {
        let eval = parse_rubric_response(FULL_RESPONSE, 7).unwrap();
        assert_eq!(eval.total, eval.scores.total());
        assert!(eval.total <= 10);
    }

    #[test]
    fn missing_criteria_default_to_zero() {
        let raw = r#"{"clarity": 2, "feedback": "thin"}"#;
        let eval = parse_rubric_response(raw, 7).unwrap();
        assert_eq!(eval.scores.clarity, 2);
        assert_eq!(eval.scores.professional_tone, 0);
        assert_eq!(eval.total, 2);
        assert!(!eval.approved);
    }

    #[test]
    fn out_of_range_scores_clamp() {
        let raw = r#"{"professional_tone": 9, "clarity": -3, "completeness": 2,
                      "safety": 2, "relevance": 2}"#;
        let eval = parse_rubric_response(raw, 7).unwrap();
        assert_eq!(eval.scores.professional_tone, 2);
        assert_eq!(eval.scores.clarity, 0);
        assert_eq!(eval.total, 8);
    }

    #[test]
    fn non_numeric_criterion_scores_zero() {
        let raw = r#"{"professional_tone": "great", "clarity": 2, "completeness": 2,
                      "safety": 2, "relevance": 2}"#;
        let eval = parse_rubric_response(raw, 7).unwrap();
        assert_eq!(eval.scores.professional_tone, 0);
        assert_eq!(eval.total, 8);
    }

    #[test]
    fn approval_boundary_is_seven() {
        let raw = r#"{"professional_tone": 2, "clarity": 2, "completeness": 2,
                      "safety": 1, "relevance": 0}"#;
        let eval = parse_rubric_response(raw, 7).unwrap();
        assert_eq!(eval.total, 7);
        assert!(eval.approved);

        let raw = r#"{"professional_tone": 2, "clarity": 2, "completeness": 2,
                      "safety": 0, "relevance": 0}"#;
        let eval = parse_rubric_response(raw, 7).unwrap();
        assert_eq!(eval.total, 6);
        assert!(!eval.approved);
    }

    #[test]
    fn markdown_wrapped_response_parses() {
        let raw = format!("Here you go:\n```json\n{FULL_RESPONSE}\n```");
        let eval = parse_rubric_response(&raw, 7).unwrap();
        assert_eq!(eval.total, 9);
    }

    #[test]
    fn unparseable_response_raises() {
        let err = parse_rubric_response("I think it's pretty good!", 7).unwrap_err();
        assert!(matches!(err, EvaluationError::Parse(_)));
    }

    #[test]
    fn non_object_json_raises() {
        let err = parse_rubric_response("[1, 2, 3]", 7).unwrap_err();
        assert!(matches!(err, EvaluationError::Parse(_)));
    }

    #[tokio::test]
    async fn evaluate_runs_one_call() {
        let llm = ScriptedLlm::new(vec![FULL_RESPONSE]);
        let evaluator = ResponseEvaluator::new(llm.clone(), 7);
        let eval = evaluator
            .evaluate("Can you do Rust?", "Yes — five years of it.")
            .await
            .unwrap();
        assert!(eval.approved);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_llm_error() {
        let llm = ScriptedLlm::failing();
        let evaluator = ResponseEvaluator::new(llm, 7);
        let err = evaluator.evaluate("a", "b").await.unwrap_err();
        assert!(matches!(err, EvaluationError::Llm(_)));
    }

    #[test]
    fn rubric_prompt_embeds_both_texts() {
        let prompt = build_rubric_prompt("Can you relocate?", "Yes, I can relocate.");
        assert!(prompt.contains("Can you relocate?"));
        assert!(prompt.contains("Yes, I can relocate."));
        assert!(prompt.contains("professional_tone"));
    }
}
