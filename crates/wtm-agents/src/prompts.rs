//! Fixed text fragments used when rendering assistant prompts.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever any of these change so a
//! rendered prompt can be traced back to the template that produced it.

/// Prompt version. Bump on any template change.
pub const PROMPT_VERSION: &str = "1.0.0";

/// Goal used when the caller does not supply one.
pub const DEFAULT_GOAL: &str = "Implement the requested feature";

/// Shown in place of an empty quick-action list or environment.
pub const NONE_PLACEHOLDER: &str = "  (none)";

/// Header that introduces the rendered workspace summary.
pub const CONTEXT_HEADER: &str = "Context:";

/// Closing instruction appended to every prompt.
pub const CLOSING_INSTRUCTION: &str = "Please plan the changes, execute them, and report status.";

/// Goal the orchestrator hands the prompt agent for a ticket.
pub fn ticket_goal(key: &str) -> String {
    format!("Implement Jira ticket {key}")
}

/// Assemble goal, workspace summary, and closing instruction.
pub fn assemble(goal: &str, summary: &str) -> String {
    format!("{goal}\n\n{CONTEXT_HEADER}\n{summary}\n\n{CLOSING_INSTRUCTION}")
}
