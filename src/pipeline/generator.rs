//! Response generator — one grounded draft per call.
//!
//! Each call is a single stateless completion: the system prompt embeds the
//! retrieved context bundle, the model answers with a leading type tag and
//! the reply body. Tag parsing never fails the pipeline — malformed output
//! degrades to `MessageType::Other` with the raw text as the reply.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::error::PipelineError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Draft, MessageType};
use crate::retrieval::{ContextBundle, ContextRetriever};

/// Temperature for reply generation — some variation is wanted.
const GENERATION_TEMPERATURE: f32 = 0.7;

/// Max tokens for a reply (150–250 words plus the tag line).
const GENERATION_MAX_TOKENS: u32 = 1024;

/// Generates grounded reply drafts.
pub struct ResponseGenerator {
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<ContextRetriever>,
    tag_pattern: Regex,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, retriever: Arc<ContextRetriever>) -> Self {
        Self {
            llm,
            retriever,
            tag_pattern: Regex::new(r"(?i)^TYPE:\s*(.+)$").unwrap(),
        }
    }

    /// Produce one draft for `message` (the original message on attempt 1,
    /// the feedback-augmented message on retries).
    pub async fn generate(&self, message: &str) -> Result<Draft, PipelineError> {
        let bundle = self.retriever.bundle_for(message).await?;

        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt(&bundle)),
            ChatMessage::user(format!("Employer message:\n{message}")),
        ])
        .with_temperature(GENERATION_TEMPERATURE)
        .with_max_tokens(GENERATION_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let (message_type, reply_text) = parse_tagged_reply(&response.content, &self.tag_pattern);

        debug!(
            message_type = message_type.as_str(),
            reply_chars = reply_text.len(),
            "Draft generated"
        );

        Ok(Draft {
            reply_text,
            message_type,
            context_used: bundle,
        })
    }
}

/// Build the generation system prompt around the retrieved context.
fn build_system_prompt(bundle: &ContextBundle) -> String {
    format!(
        "You are a career assistant replying to employer messages on behalf of the candidate.\n\n\
         ## Candidate identity (from the resume):\n{identity}\n\n\
         ## Resume sections relevant to this message:\n{topic}\n\n\
         ## Rules:\n\
         1. Always professional, polite, and concise\n\
         2. Never invent or exaggerate — use only facts from the resume context above\n\
         3. If asked about something the resume does not cover, say so honestly and offer to follow up\n\
         4. Keep the reply between 150 and 250 words\n\
         5. Reply in English\n\n\
         ## Message type detection:\n\
         On the first line, before the reply body, emit a tag in this format:\n\
         TYPE: [interview_invite | technical_question | job_offer | decline | clarification | other]\n\n\
         Leave a blank line after the tag, then write the actual reply.",
        identity = bundle.identity_context,
        topic = bundle.topic_context,
    )
}

/// Split raw model output into (type, reply body).
///
/// If the first line carries a `TYPE:` tag, the tag and the single blank
/// line after it are stripped exactly once; otherwise the whole output is
/// the reply and the type defaults to `Other`.
fn parse_tagged_reply(raw: &str, tag_pattern: &Regex) -> (MessageType, String) {
    let trimmed = raw.trim();
    let (first_line, rest) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };

    if let Some(captures) = tag_pattern.captures(first_line.trim_end()) {
        let tag = captures[1].trim().to_lowercase();
        let body = rest.strip_prefix('\n').unwrap_or(rest);
        return (MessageType::from_tag(&tag), body.to_string());
    }

    (MessageType::Other, trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{sample_retriever, ScriptedLlm};

    fn pattern() -> Regex {
        Regex::new(r"(?i)^TYPE:\s*(.+)$").unwrap()
    }

    #[test]
    fn tagged_reply_round_trip() {
        let (message_type, reply) =
            parse_tagged_reply("TYPE: job_offer\n\nThank you for the offer.", &pattern());
        assert_eq!(message_type, MessageType::JobOffer);
        assert_eq!(reply, "Thank you for the offer.");
    }

    #[test]
    fn blank_line_is_stripped_exactly_once() {
        let (_, reply) = parse_tagged_reply("TYPE: other\n\n\nBody here", &pattern());
        assert_eq!(reply, "\nBody here");
    }

    #[test]
    fn untagged_reply_defaults_to_other() {
        let raw = "Happy to chat next week.\nBest,\nJane";
        let (message_type, reply) = parse_tagged_reply(raw, &pattern());
        assert_eq!(message_type, MessageType::Other);
        assert_eq!(reply, raw);
    }

    #[test]
    fn unknown_tag_value_becomes_other_but_still_strips() {
        let (message_type, reply) = parse_tagged_reply("TYPE: spam\n\nBody", &pattern());
        assert_eq!(message_type, MessageType::Other);
        assert_eq!(reply, "Body");
    }

    #[test]
    fn tag_is_case_insensitive() {
        let (message_type, _) =
            parse_tagged_reply("type: Interview_Invite\n\nSure!", &pattern());
        assert_eq!(message_type, MessageType::InterviewInvite);
    }

    #[test]
    fn tag_without_body_yields_empty_reply() {
        let (message_type, reply) = parse_tagged_reply("TYPE: decline", &pattern());
        assert_eq!(message_type, MessageType::Decline);
        assert_eq!(reply, "");
    }

    #[test]
    fn system_prompt_embeds_both_contexts() {
        let bundle = ContextBundle {
            identity_context: "Jane Doe, Senior Engineer".into(),
            topic_context: "[CV Section 1 — page 2]\nSkills: Rust".into(),
        };
        let prompt = build_system_prompt(&bundle);
        assert!(prompt.contains("Jane Doe, Senior Engineer"));
        assert!(prompt.contains("Skills: Rust"));
        assert!(prompt.contains("TYPE:"));
        assert!(prompt.contains("interview_invite"));
    }

    #[tokio::test]
    async fn generate_produces_typed_draft() {
        let llm = ScriptedLlm::new(vec![
            "TYPE: interview_invite\n\nThank you — Tuesday works well for me.",
        ]);
        let generator = ResponseGenerator::new(llm.clone(), sample_retriever());

        let draft = generator
            .generate("We'd like to schedule an interview next week")
            .await
            .unwrap();
        assert_eq!(draft.message_type, MessageType::InterviewInvite);
        assert_eq!(draft.reply_text, "Thank you — Tuesday works well for me.");
        assert!(!draft.context_used.identity_context.is_empty());
    }

    #[tokio::test]
    async fn generate_survives_untagged_output() {
        let llm = ScriptedLlm::new(vec!["Just a plain reply with no tag."]);
        let generator = ResponseGenerator::new(llm.clone(), sample_retriever());

        let draft = generator.generate("Hello").await.unwrap();
        assert_eq!(draft.message_type, MessageType::Other);
        assert_eq!(draft.reply_text, "Just a plain reply with no tag.");
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let llm = ScriptedLlm::failing();
        let generator = ResponseGenerator::new(llm, sample_retriever());
        let result = generator.generate("Hello").await;
        assert!(matches!(result, Err(PipelineError::Llm(_))));
    }
}
