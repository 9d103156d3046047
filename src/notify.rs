//! Outbound notification sink.
//!
//! Four signal kinds cover the pipeline's observable events. Delivery is
//! fire-and-forget: the controller discards the result, every sink bounds
//! its own delivery time, and a dead bot token can never fail or alter a
//! pipeline outcome.

use async_trait::async_trait;
use tracing::{debug, warn};

/// Default bound on a notification delivery.
const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// A pipeline event worth telling the human about.
#[derive(Debug, Clone)]
pub enum NotifySignal {
    /// A new employer message entered the pipeline.
    NewMessage { sender: String, preview: String },
    /// A reply was approved (or exhausted) and sent.
    ResponseSent { score: u8 },
    /// The intake gate escalated to a human.
    HumanNeeded { reason: String },
    /// A draft failed review and is being rewritten.
    Retry { attempt: u32, score: u8 },
}

/// Delivery target for pipeline notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one signal. Returns whether delivery succeeded; callers
    /// ignore the result.
    async fn send(&self, signal: NotifySignal) -> bool;
}

/// Sink used when no notification channel is configured.
pub struct NullNotifier;

#[async_trait]
impl NotificationSink for NullNotifier {
    async fn send(&self, signal: NotifySignal) -> bool {
        debug!(?signal, "Notification dropped (no sink configured)");
        false
    }
}

/// Telegram Bot API sink.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`; `None` when
    /// either is unset.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        Some(Self::new(bot_token, chat_id))
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Post one message, Markdown-first with a plain-text fallback.
    async fn post(&self, text: &str) -> bool {
        let markdown_body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        match self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => return true,
            Ok(resp) => {
                warn!(
                    status = %resp.status(),
                    "Telegram sendMessage with Markdown failed; retrying without parse_mode"
                );
            }
            Err(e) => {
                warn!(error = %e, "Telegram sendMessage failed");
                return false;
            }
        }

        let plain_body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        match self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "Telegram sendMessage failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Telegram sendMessage failed");
                false
            }
        }
    }
}

/// Render a signal as a Telegram message with a severity prefix.
fn format_signal(signal: &NotifySignal) -> String {
    let (emoji, body) = match signal {
        NotifySignal::NewMessage { sender, preview } => {
            let truncated: String = preview.chars().take(100).collect();
            let ellipsis = if preview.chars().count() > 100 { "..." } else { "" };
            (
                "📨",
                format!("New employer message!\n*From:* {sender}\n*Preview:* {truncated}{ellipsis}"),
            )
        }
        NotifySignal::ResponseSent { score } => (
            "✅",
            format!("Reply approved and sent.\n*Evaluation Score:* {score}/10"),
        ),
        NotifySignal::HumanNeeded { reason } => (
            "🚨",
            format!("HUMAN INTERVENTION REQUIRED!\n*Reason:* {reason}"),
        ),
        NotifySignal::Retry { attempt, score } => (
            "⚠️",
            format!(
                "Reply was insufficient — rewriting.\n*Attempt:* {attempt}\n*Previous score:* {score}/10"
            ),
        ),
    };
    format!("{emoji} *Career Agent Notification*\n\n{body}")
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, signal: NotifySignal) -> bool {
        let message = format_signal(&signal);
        let delivered = self.post(&message).await;
        if delivered {
            debug!(?signal, "Notification sent");
        }
        delivered
    }
}
