use chrono::Utc;
use lethe_core::{DebugLog, Severity, Stage};
use tracing::{debug, error, info, warn};

/// Per-request diagnostic log, mirrored to `tracing`.
#[derive(Debug)]
pub struct RequestTrace {
    logs: Vec<DebugLog>,
    stage: Stage,
}

impl Default for RequestTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTrace {
    #[must_use]
    pub fn new() -> Self {
        let mut trace = Self {
            logs: Vec::new(),
            stage: Stage::Received,
        };
        trace.info("Stage: received");
        trace
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.info(format!("Stage: {stage}"));
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        self.push(message, Severity::Debug);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.push(message, Severity::Info);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.push(message, Severity::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.push(message, Severity::Error);
    }

    fn push(&mut self, message: String, severity: Severity) {
        self.logs.push(DebugLog {
            message,
            severity,
            timestamp: Utc::now(),
        });
    }

    #[must_use]
    pub fn logs(&self) -> &[DebugLog] {
        &self.logs
    }

    #[must_use]
    pub fn into_logs(self) -> Vec<DebugLog> {
        self.logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_logged_in_order() {
        let mut trace = RequestTrace::new();
        trace.enter(Stage::PromptChecked);
        trace.warn("careful");
        assert_eq!(trace.stage(), Stage::PromptChecked);

        let logs = trace.into_logs();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "Stage: received");
        assert_eq!(logs[1].message, "Stage: prompt_checked");
        assert_eq!(logs[2].severity, Severity::Warning);
    }
}
