use std::time::Duration;

use async_trait::async_trait;
use lethe_core::GenerationProvider;
use tracing::{debug, info};

use crate::command_runner::{build_command, generation_command};

/// Console noise some hosts print into the CLI's stdout.
const NOISE_LINES: [&str; 2] = [
    "failed to get console mode for stdout: The handle is invalid.",
    "failed to get console mode for stderr: The handle is invalid.",
];

/// Generation backed by the `ollama` command-line tool.
pub struct OllamaCliProvider {
    program: String,
    timeout: Duration,
}

impl Default for OllamaCliProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaCliProvider {
    #[must_use]
    pub fn new() -> Self {
        info!("Creating OllamaCliProvider");
        Self {
            program: "ollama".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl GenerationProvider for OllamaCliProvider {
    async fn generate(&self, prompt: &str, model: &str) -> anyhow::Result<String> {
        let spec = generation_command(&self.program, model, prompt);
        info!("Running {} for model={}", self.program, model);
        debug!("Prompt length: {} chars", prompt.len());

        let result = tokio::time::timeout(self.timeout, build_command(&spec).output()).await;

        match result {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let code = output.status.code().unwrap_or(-1);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    anyhow::bail!("{} exited with code {code}: {}", self.program, stderr.trim());
                }
                let response = clean_output(&String::from_utf8_lossy(&output.stdout));
                if response.is_empty() {
                    anyhow::bail!("{} returned an empty response", self.program);
                }
                info!("Received {} chars from {}", response.len(), self.program);
                Ok(response)
            }
            Ok(Err(e)) => Err(anyhow::anyhow!("Failed to execute {}: {e}", self.program)),
            Err(_) => Err(anyhow::anyhow!(
                "{} timed out after {} seconds",
                self.program,
                self.timeout.as_secs()
            )),
        }
    }
}

/// Strip console noise and reflow the output into blank-line separated paragraphs.
#[must_use]
pub fn clean_output(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    for noise in NOISE_LINES {
        text = text.replace(noise, "");
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_output_removes_console_noise() {
        let raw = "failed to get console mode for stdout: The handle is invalid.\nHello there.\n";
        assert_eq!(clean_output(raw), "Hello there.");
    }

    #[test]
    fn test_clean_output_formats_paragraphs() {
        let raw = "  First line. \n\n\n  Second line.\nThird line.";
        assert_eq!(
            clean_output(raw),
            "First line.\n\nSecond line.\n\nThird line."
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let provider = OllamaCliProvider::new().with_program("lethe-no-such-binary-xyz");
        let result = provider.generate("hello", "llama3.2").await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_becomes_response() {
        // `echo run <model> <prompt>` stands in for the real CLI.
        let provider = OllamaCliProvider::new().with_program("echo");
        let response = provider.generate("hello world", "tiny").await.unwrap();
        assert_eq!(response, "run tiny hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let provider = OllamaCliProvider::new().with_program("false");
        let err = provider.generate("hello", "tiny").await.unwrap_err();
        assert!(err.to_string().contains("exited with code"));
    }
}
