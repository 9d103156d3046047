//! Persistence for Career Assist.

pub mod log;

pub use log::{InteractionLog, LogEntry, LogRecord};
