//! The reply pipeline.
//!
//! One inbound employer message flows through:
//! 1. `IntakeGate` — confidence-gated human-escalation check (no draft yet)
//! 2. `ResponseGenerator` — grounded draft + type classification
//! 3. `ResponseEvaluator` — rubric scoring, pass/fail
//! 4. `PipelineController` — the bounded generate→evaluate→retry machine
//!
//! Stages exchange the named records in `types`; nothing downstream ever
//! sees raw model output.

pub mod controller;
pub mod evaluator;
pub mod generator;
pub mod intake;
pub mod types;

pub use controller::PipelineController;
pub use evaluator::ResponseEvaluator;
pub use generator::ResponseGenerator;
pub use intake::IntakeGate;
pub use types::*;

/// Extract a JSON object from LLM output (handles markdown wrapping).
pub(crate) fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::error::LlmError;
    use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
    use crate::notify::{NotificationSink, NotifySignal};
    use crate::retrieval::index::test_support::{chunk, index_from_parts};
    use crate::retrieval::retriever::test_support::{keyword_vector, KeywordEmbedder};
    use crate::retrieval::ContextRetriever;

    /// LLM that replays a scripted sequence of responses.
    pub struct ScriptedLlm {
        responses: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl ScriptedLlm {
        pub fn new(responses: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        /// LLM whose every call fails at the transport layer.
        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::RequestFailed {
                    provider: "scripted".into(),
                    reason: "connection refused".into(),
                });
            }
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted LLM ran out of responses");
            Ok(CompletionResponse {
                content,
                input_tokens: 100,
                output_tokens: 50,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    /// Notification sink that records every signal it receives.
    #[derive(Default)]
    pub struct RecordingSink {
        pub signals: Mutex<Vec<NotifySignal>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, signal: NotifySignal) -> bool {
            self.signals.lock().unwrap().push(signal);
            true
        }
    }

    /// Small in-memory retriever over a fixture résumé.
    pub fn sample_retriever() -> Arc<ContextRetriever> {
        let texts = [
            ("Jane Doe — email jane@example.com, phone 555-0100", "page 1"),
            ("Senior Engineer. Summary: distributed systems role", "page 1"),
            ("Skills: Rust, Tokio. Education: BSc", "page 2"),
            ("Projects: search engine. Achievements: work history", "page 2"),
        ];
        let parts = texts
            .iter()
            .map(|(text, locator)| (chunk(text, locator), keyword_vector(text)))
            .collect();
        Arc::new(ContextRetriever::new(
            index_from_parts(parts, 6),
            Arc::new(KeywordEmbedder),
            3,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_direct_object() {
        let input = r#"{"requires_human": true}"#;
        assert_eq!(extract_json_object(input), input);
    }

    #[test]
    fn extract_json_from_markdown_block() {
        let input = "```json\n{\"clarity\": 2}\n```";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("clarity"));
    }

    #[test]
    fn extract_json_embedded_in_text() {
        let input = "My scoring: {\"safety\": 2, \"relevance\": 1} done.";
        let result = extract_json_object(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
    }
}
