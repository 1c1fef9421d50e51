//! Build progress reporting

use std::sync::{Arc, Mutex};

/// Receives a message as each build step starts
pub trait Progress: Send + Sync {
    fn next_step(&self, message: &str);
}

impl<P: Progress + ?Sized> Progress for Arc<P> {
    fn next_step(&self, message: &str) {
        (**self).next_step(message)
    }
}

/// Progress that reports nowhere
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn next_step(&self, _message: &str) {}
}

/// Progress that keeps every step message
#[derive(Debug, Default)]
pub struct RecordedProgress {
    steps: Mutex<Vec<String>>,
}

impl RecordedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Progress for RecordedProgress {
    fn next_step(&self, message: &str) {
        tracing::info!(step = message, "build step");
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
