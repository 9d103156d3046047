//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Pipeline tunables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum generation attempts per message (1 initial + rewrites).
    pub max_attempts: u32,
    /// Minimum evaluator total for a draft to be approved (out of 10).
    pub score_threshold: u8,
    /// Intake confidence at or above which `requires_human` halts the run.
    pub escalation_confidence: f32,
    /// Target chunk size in characters for index construction.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Chunks returned per topic query.
    pub topic_top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            score_threshold: 7,
            escalation_confidence: 0.8,
            chunk_size: 500,
            chunk_overlap: 50,
            topic_top_k: 3,
        }
    }
}

/// Process-level configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the candidate's résumé (PDF, markdown, or plain text).
    pub resume_path: PathBuf,
    /// Path where the built index is persisted (loaded instead of rebuilt).
    pub index_path: PathBuf,
    /// Path of the append-only interaction log.
    pub log_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Timeout applied to every completion and embedding call.
    pub llm_timeout: Duration,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Build config from environment variables, with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let resume_path = std::env::var("CAREER_ASSIST_RESUME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/cv.pdf"));

        let index_path = std::env::var("CAREER_ASSIST_INDEX")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/resume_index.json"));

        let log_path = std::env::var("CAREER_ASSIST_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/logs.json"));

        let port: u16 = match std::env::var("CAREER_ASSIST_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CAREER_ASSIST_PORT".into(),
                message: format!("not a port number: {raw}"),
            })?,
            Err(_) => 8000,
        };

        let llm_timeout_secs: u64 = match std::env::var("CAREER_ASSIST_LLM_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CAREER_ASSIST_LLM_TIMEOUT_SECS".into(),
                message: format!("not a number of seconds: {raw}"),
            })?,
            Err(_) => 60,
        };

        Ok(Self {
            resume_path,
            index_path,
            log_path,
            port,
            llm_timeout: Duration::from_secs(llm_timeout_secs),
            pipeline: PipelineConfig::default(),
        })
    }
}
