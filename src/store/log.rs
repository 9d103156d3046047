//! Append-only interaction log.
//!
//! One timestamped record per pipeline run, plus human-override submissions,
//! stored as a JSON array on disk. A missing or corrupt file reads as empty
//! and heals on the next append.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::pipeline::types::{Evaluation, IntakeVerdict, MessageType};

/// What happened in one logged interaction.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LogEntry {
    /// The intake gate escalated before any draft was generated.
    HumanInterventionRequested { detection: IntakeVerdict },
    /// The pipeline produced a reply (approved or best-effort).
    ResponseSent {
        final_response: String,
        message_type: MessageType,
        evaluation: Evaluation,
        attempts: u32,
    },
    /// A human typed their own reply after an escalation.
    HumanResponseSubmitted {
        final_response: String,
        category: String,
        reason: String,
    },
}

/// One record in the interaction log.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub message: String,
    #[serde(flatten)]
    pub entry: LogEntry,
}

impl LogRecord {
    pub fn new(sender: impl Into<String>, message: impl Into<String>, entry: LogEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sender: sender.into(),
            message: message.into(),
            entry,
        }
    }
}

/// File-backed append-only log. Appends are serialized behind a mutex so
/// concurrent runs cannot interleave the read-modify-write.
pub struct InteractionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append one record.
    pub async fn append(&self, record: LogRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_raw().await;
        let value = serde_json::to_value(&record)
            .map_err(|e| StoreError::Write(format!("record serialization: {e}")))?;
        records.push(value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(&records)
            .map_err(|e| StoreError::Write(format!("log serialization: {e}")))?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    /// All records, oldest first. Missing or corrupt files read as empty.
    pub async fn read_all(&self) -> Vec<serde_json::Value> {
        self.read_raw().await
    }

    /// Truncate the log.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, "[]").await?;
        Ok(())
    }

    async fn read_raw(&self) -> Vec<serde_json::Value> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}
