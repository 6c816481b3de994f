//! Error taxonomy for the agent pipeline.
//!
//! Every failure surfaced by the runner, the agents, or the orchestrator is a
//! [`WorkflowError`]. Nothing here is retried. The only failure the pipeline
//! recovers from on its own is a corrupted ticket cache, which never reaches
//! this type.

use std::path::PathBuf;

use thiserror::Error;

use crate::agents::AgentRole;

/// Result alias used across the crate.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// External process exited with a non-zero status.
    #[error("command failed: {command} (exit code {exit_code})\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// External process could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Expected JSON on stdout was absent or invalid.
    #[error("malformed output from `{command}`: {message}")]
    MalformedOutput { command: String, message: String },

    #[error("agent `{agent}` does not support action `{action}`")]
    UnsupportedAction { agent: String, action: String },

    #[error("no {0} agent is configured")]
    MissingAgent(AgentRole),

    #[error("workspace context is required")]
    MissingContext,

    /// Payload lacks a field the action cannot run without.
    #[error("agent `{agent}` requires payload field `{field}`")]
    MissingField { agent: String, field: String },

    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkflowError {
    pub fn malformed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnsupportedAction {
            agent: agent.into(),
            action: action.into(),
        }
    }

    pub fn missing_field(agent: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            agent: agent.into(),
            field: field.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code and stderr of a failed external command, if this is one.
    pub fn command_failure(&self) -> Option<(i32, &str)> {
        match self {
            Self::CommandFailed {
                exit_code, stderr, ..
            } => Some((*exit_code, stderr.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_message_carries_streams_verbatim() {
        let err = WorkflowError::CommandFailed {
            command: "wtm worktree remove mob-1".into(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "not found".into(),
        };
        let text = err.to_string();
        assert!(text.contains("wtm worktree remove mob-1"));
        assert!(text.contains("exit code 1"));
        assert!(text.contains("stderr:\nnot found"));
        assert_eq!(err.command_failure(), Some((1, "not found")));
    }

    #[test]
    fn unsupported_action_names_the_offending_value() {
        let err = WorkflowError::unsupported("worktree-manager", "prune");
        assert_eq!(
            err.to_string(),
            "agent `worktree-manager` does not support action `prune`"
        );
        assert!(err.command_failure().is_none());
    }

    #[test]
    fn missing_agent_names_the_role() {
        let err = WorkflowError::MissingAgent(AgentRole::PromptRendering);
        assert_eq!(err.to_string(), "no prompt-rendering agent is configured");
    }
}
