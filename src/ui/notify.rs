use std::path::Path;

use notify_rust::Notification;

use crate::worker::RunOutcome;

const SUMMARY: &str = "deface-shell";

#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn notify(&self, summary: &str, body: &str) {
        if !self.enabled {
            return;
        }

        if let Err(error) = Notification::new().summary(summary).body(body).show() {
            tracing::debug!("desktop notification failed: {error}");
        }
    }

    pub fn run_finished(&self, outcome: &RunOutcome, output: &Path) {
        self.notify(SUMMARY, &outcome_message(outcome, output));
    }
}

pub fn outcome_message(outcome: &RunOutcome, output: &Path) -> String {
    if outcome.succeeded {
        format!("Processing completed: {}", output.display())
    } else {
        format!("Processing failed: {}", outcome.error_message)
    }
}
