//! Progress reporting for migration runs.
//!
//! The reporter is passed into each run; nothing about progress is kept in
//! shared state between entity categories.

use std::sync::Mutex;

/// Receives human-readable status messages during a run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ProgressReporter for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Keeps every message in order.
#[derive(Default)]
pub struct CollectingReporter {
    messages: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the collected messages.
    pub fn take(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut m| std::mem::take(&mut *m))
            .unwrap_or_default()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
