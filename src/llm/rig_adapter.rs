//! Bridges rig's `CompletionModel` trait to our `LlmProvider` trait.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::costs::model_cost;
use crate::llm::provider::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
};

/// Default bound on a single completion call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter wrapping a rig completion model.
///
/// Every request is a single, stateless round trip: system messages become
/// the preamble, the remaining messages collapse in order into the prompt.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    cost: (Decimal, Decimal),
    timeout: Duration,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            cost: model_cost(model_name),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Split a request into (preamble, prompt body).
fn flatten_messages(messages: &[ChatMessage]) -> (String, String) {
    let mut preamble_parts = Vec::new();
    let mut prompt_parts = Vec::new();
    for message in messages {
        match message.role {
            ChatRole::System => preamble_parts.push(message.content.as_str()),
            ChatRole::User | ChatRole::Assistant => prompt_parts.push(message.content.as_str()),
        }
    }
    (preamble_parts.join("\n\n"), prompt_parts.join("\n\n"))
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        self.cost
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, prompt) = flatten_messages(&request.messages);
        if prompt.is_empty() {
            return Err(LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: "request contains no user content".into(),
            });
        }

        let mut builder = self.model.completion_request(prompt);
        if !preamble.is_empty() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(temperature as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(max_tokens as u64);
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.model_name.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        let content: String = response
            .choice
            .into_iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "completion contained no text content".into(),
            });
        }

        let completion = CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            finish_reason: FinishReason::Stop,
            response_id: None,
        };

        debug!(
            model = %self.model_name,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            cost_usd = %completion.estimated_cost(self.cost),
            "Completion finished"
        );

        Ok(completion)
    }
}
