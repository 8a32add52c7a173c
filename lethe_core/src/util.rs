//! Fixed user-visible strings.

/// Returned when a query is blocked before generation.
pub const PROMPT_BLOCKED_MESSAGE: &str =
    "I'm sorry, I cannot provide information about that topic.";

/// Returned when generated output is blocked.
pub const RESPONSE_BLOCKED_MESSAGE: &str = "I apologize, but I cannot provide that information.";

/// Returned when the generation backend fails.
pub const GENERATION_FAILED_MESSAGE: &str = "Error: Could not generate response.";
