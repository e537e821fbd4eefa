//! Step-by-step progress reporting for encrypt/decrypt.
//!
//! A `ProgressSink` only ever receives short step descriptions such as
//! `"layer 2: encrypting (TWOFISH_CBC)"`. Passwords, keys and plaintext are
//! never passed in, and nothing a sink does can change the outcome of the
//! operation it observes.

use chrono::{DateTime, Utc};

/// Append-only receiver of progress steps.
pub trait ProgressSink {
    fn step(&mut self, message: &str);
}

/// Discards every step.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn step(&mut self, _message: &str) {}
}

/// A single timestamped progress step.
#[derive(Debug, Clone)]
pub struct ProgressEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Collects steps in memory, oldest first.
#[derive(Debug, Default, Clone)]
pub struct ProgressLog {
    entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    /// Just the messages, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProgressSink for ProgressLog {
    fn step(&mut self, message: &str) {
        self.entries.push(ProgressEntry {
            at: Utc::now(),
            message: message.to_string(),
        });
    }
}

/// Forwards every step to `tracing` at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn step(&mut self, message: &str) {
        tracing::info!(target: "cipherstack::progress", "{message}");
    }
}
