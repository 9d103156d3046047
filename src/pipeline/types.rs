//! Shared data contracts for the reply pipeline.
//!
//! Every inter-stage payload is a named record with required fields, so
//! malformed upstream output is caught at the parse boundary instead of
//! propagating as loose maps.

use serde::{Deserialize, Serialize};

use crate::retrieval::ContextBundle;

// ── Inbound message ─────────────────────────────────────────────────

/// One employer inquiry — the immutable input to a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerMessage {
    /// Sender identifier (name or address as given by the transport).
    pub sender: String,
    /// Message body.
    pub body: String,
}

// ── Message classification ──────────────────────────────────────────

/// Closed classification of employer messages, parsed from the generator's
/// leading type tag. Unrecognized tags fall back to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    InterviewInvite,
    TechnicalQuestion,
    JobOffer,
    Decline,
    Clarification,
    Other,
}

impl MessageType {
    /// Parse a tag value (already lowercased/trimmed by the caller).
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "interview_invite" => Self::InterviewInvite,
            "technical_question" => Self::TechnicalQuestion,
            "job_offer" => Self::JobOffer,
            "decline" => Self::Decline,
            "clarification" => Self::Clarification,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InterviewInvite => "interview_invite",
            Self::TechnicalQuestion => "technical_question",
            Self::JobOffer => "job_offer",
            Self::Decline => "decline",
            Self::Clarification => "clarification",
            Self::Other => "other",
        }
    }
}

// ── Draft ───────────────────────────────────────────────────────────

/// One generation attempt. Superseded, never mutated, by the next attempt.
#[derive(Debug, Clone)]
pub struct Draft {
    pub reply_text: String,
    pub message_type: MessageType,
    /// The retrieved context this draft was grounded in.
    pub context_used: ContextBundle,
}

// ── Evaluation ──────────────────────────────────────────────────────

/// Per-criterion rubric scores, each in 0–2.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CriterionScores {
    pub professional_tone: u8,
    pub clarity: u8,
    pub completeness: u8,
    pub safety: u8,
    pub relevance: u8,
}

impl CriterionScores {
    pub fn total(&self) -> u8 {
        self.professional_tone + self.clarity + self.completeness + self.safety + self.relevance
    }
}

/// Rubric verdict for one draft. Belongs to exactly one `Draft`.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub scores: CriterionScores,
    /// Sum of the criterion scores, 0–10.
    pub total: u8,
    pub feedback: String,
    pub suggestions: String,
    pub approved: bool,
}

impl Evaluation {
    /// Derive total and approval from the scores and the threshold.
    pub fn from_scores(
        scores: CriterionScores,
        feedback: String,
        suggestions: String,
        threshold: u8,
    ) -> Self {
        let total = scores.total();
        Self {
            scores,
            total,
            feedback,
            suggestions,
            approved: total >= threshold,
        }
    }
}

// ── Intake verdict ──────────────────────────────────────────────────

/// Closed escalation categories. Unknown strings from the model coerce to
/// `None` so the enumeration stays closed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeCategory {
    SalaryNegotiation,
    OutOfDomain,
    Legal,
    Ambiguous,
    None,
}

impl IntakeCategory {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "salary_negotiation" => Self::SalaryNegotiation,
            "out_of_domain" => Self::OutOfDomain,
            "legal" => Self::Legal,
            "ambiguous" => Self::Ambiguous,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalaryNegotiation => "salary_negotiation",
            Self::OutOfDomain => "out_of_domain",
            Self::Legal => "legal",
            Self::Ambiguous => "ambiguous",
            Self::None => "none",
        }
    }
}

/// Pre-generation escalation decision. Exactly one per inbound message,
/// produced before any draft exists.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeVerdict {
    pub requires_human: bool,
    /// Classifier certainty in [0, 1].
    pub confidence: f32,
    pub category: IntakeCategory,
    pub reason: String,
}

impl IntakeVerdict {
    /// Escalation requires both the flag and certainty at or above the
    /// threshold; a low-confidence `requires_human` does not halt the run.
    pub fn should_escalate(&self, confidence_threshold: f32) -> bool {
        self.requires_human && self.confidence >= confidence_threshold
    }
}

// ── Pipeline outcome ────────────────────────────────────────────────

/// Terminal record of one pipeline run — the only value returned to the
/// caller and the only value persisted to the log.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Confidence-gated human handoff. A designed outcome, not a failure.
    HumanRequired { verdict: IntakeVerdict },
    /// A reply to send — the *last* draft produced, whether or not its
    /// evaluation approved it.
    Sent {
        draft: Draft,
        evaluation: Evaluation,
        attempts: u32,
    },
}

impl PipelineOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HumanRequired { .. } => "human_required",
            Self::Sent { .. } => "sent",
        }
    }
}
