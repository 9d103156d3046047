//! Pipeline controller — the bounded generate→evaluate→retry machine.
//!
//! One run is a strictly sequential chain: intake, then up to
//! `max_attempts` generate/evaluate rounds, each retry prompt built from the
//! previous evaluation's suggestions. The machine is written as explicit
//! states so the exhaustion policy — the last draft is sent even when it
//! never passed review — is a named transition, not a loop fallthrough.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::notify::{NotificationSink, NotifySignal};
use crate::pipeline::evaluator::ResponseEvaluator;
use crate::pipeline::generator::ResponseGenerator;
use crate::pipeline::intake::IntakeGate;
use crate::pipeline::types::{Draft, EmployerMessage, Evaluation, PipelineOutcome};

/// Marker inserted between the original message and evaluator feedback on a
/// retry prompt.
const RETRY_MARKER: &str = "[PREVIOUS REPLY WAS INSUFFICIENT]";

/// Controller states. Terminal outcomes are return values, not states.
enum RunState {
    Generating { attempt: u32, prompt: String },
    Evaluating { attempt: u32, draft: Draft },
    Retrying { attempt: u32, evaluation: Evaluation },
}

/// Runs one inbound message through the full pipeline.
pub struct PipelineController {
    intake: IntakeGate,
    generator: ResponseGenerator,
    evaluator: ResponseEvaluator,
    notifier: Arc<dyn NotificationSink>,
    config: PipelineConfig,
}

impl PipelineController {
    pub fn new(
        intake: IntakeGate,
        generator: ResponseGenerator,
        evaluator: ResponseEvaluator,
        notifier: Arc<dyn NotificationSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            intake,
            generator,
            evaluator,
            notifier,
            config,
        }
    }

    /// Process one employer message to a terminal outcome.
    ///
    /// Errors are run-level failures ("could not process") — distinct from
    /// both outcome shapes.
    pub async fn run(&self, message: &EmployerMessage) -> Result<PipelineOutcome, PipelineError> {
        info!(sender = %message.sender, "Processing employer message");
        self.notify(NotifySignal::NewMessage {
            sender: message.sender.clone(),
            preview: message.body.clone(),
        })
        .await;

        // ── Intake ──────────────────────────────────────────────────
        let verdict = self.intake.assess(&message.body).await?;
        if verdict.should_escalate(self.config.escalation_confidence) {
            info!(
                category = verdict.category.as_str(),
                confidence = verdict.confidence,
                "Escalating to human"
            );
            self.notify(NotifySignal::HumanNeeded {
                reason: format!("{}: {}", verdict.category.as_str(), verdict.reason),
            })
            .await;
            return Ok(PipelineOutcome::HumanRequired { verdict });
        }
        if verdict.requires_human {
            // Below the confidence gate: noted, not acted on.
            warn!(
                confidence = verdict.confidence,
                category = verdict.category.as_str(),
                "requires_human below confidence gate; continuing"
            );
        }

        // ── Generate / evaluate / retry ─────────────────────────────
        let mut state = RunState::Generating {
            attempt: 1,
            prompt: message.body.clone(),
        };

        loop {
            state = match state {
                RunState::Generating { attempt, prompt } => {
                    info!(attempt, "Generating draft");
                    let draft = self.generator.generate(&prompt).await?;
                    RunState::Evaluating { attempt, draft }
                }

                RunState::Evaluating { attempt, draft } => {
                    let evaluation = self
                        .evaluator
                        .evaluate(&message.body, &draft.reply_text)
                        .await?;

                    if evaluation.approved {
                        info!(attempt, total = evaluation.total, "Draft approved");
                        self.notify(NotifySignal::ResponseSent {
                            score: evaluation.total,
                        })
                        .await;
                        return Ok(PipelineOutcome::Sent {
                            draft,
                            evaluation,
                            attempts: attempt,
                        });
                    }

                    if attempt < self.config.max_attempts {
                        RunState::Retrying { attempt, evaluation }
                    } else {
                        // Exhausted: best-effort send of the final draft,
                        // never a silent drop.
                        warn!(
                            attempt,
                            total = evaluation.total,
                            "Retries exhausted; sending last draft unapproved"
                        );
                        self.notify(NotifySignal::ResponseSent {
                            score: evaluation.total,
                        })
                        .await;
                        return Ok(PipelineOutcome::Sent {
                            draft,
                            evaluation,
                            attempts: attempt,
                        });
                    }
                }

                RunState::Retrying { attempt, evaluation } => {
                    info!(
                        attempt,
                        total = evaluation.total,
                        "Draft rejected; rewriting with feedback"
                    );
                    self.notify(NotifySignal::Retry {
                        attempt,
                        score: evaluation.total,
                    })
                    .await;
                    RunState::Generating {
                        attempt: attempt + 1,
                        prompt: build_retry_prompt(&message.body, &evaluation.suggestions),
                    }
                }
            };
        }
    }

    /// Deliver a signal, discarding the result — notification failure never
    /// alters a pipeline outcome.
    async fn notify(&self, signal: NotifySignal) {
        let _ = self.notifier.send(signal).await;
    }
}

/// The feedback-augmented message for a rewrite attempt.
fn build_retry_prompt(original_message: &str, suggestions: &str) -> String {
    format!(
        "{original_message}\n\n{RETRY_MARKER}\n\
         Evaluator feedback: {suggestions}\n\
         Please write a better reply taking this feedback into account."
    )
}
