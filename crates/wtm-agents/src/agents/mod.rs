//! Agents that make up the workspace pipeline.
//!
//! Every agent wraps one concern (a CLI or a piece of prompt assembly) behind
//! the same tagged-action interface: a JSON payload with an `action`
//! discriminator goes in, a JSON object comes out. Each agent declares its
//! role and its fixed action set statically, so the orchestrator can find
//! agents by role and reject unknown actions without inspecting types.
//!
//! Agents receive the run's [`WorkspaceContext`] by mutable reference. What
//! each one may change is part of its contract:
//!
//! | Agent                          | May mutate                     |
//! |--------------------------------|--------------------------------|
//! | [`TicketSourceAgent`]          | nothing                        |
//! | [`WorkspaceLifecycleAgent`]    | `worktree_path` (on `add`)     |
//! | [`EnvironmentEnrichmentAgent`] | `quick_actions`, `env`         |
//! | [`PromptRenderingAgent`]       | nothing                        |
//!
//! No agent replaces the context; that is the orchestrator's job.

pub mod enrichment;
pub mod prompt;
pub mod ticket_source;
pub mod workspace;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::WorkspaceContext;
use crate::errors::{WorkflowError, WorkflowResult};

pub use enrichment::EnvironmentEnrichmentAgent;
pub use prompt::PromptRenderingAgent;
pub use ticket_source::TicketSourceAgent;
pub use workspace::WorkspaceLifecycleAgent;

/// Payload handed to [`Agent::handle`]: a JSON object with an optional
/// `action` key plus action-specific fields.
pub type Payload = Map<String, Value>;

/// Capability an agent provides. The orchestrator looks agents up by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    TicketSource,
    WorkspaceLifecycle,
    EnvironmentEnrichment,
    PromptRendering,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TicketSource => write!(f, "ticket-source"),
            Self::WorkspaceLifecycle => write!(f, "workspace-lifecycle"),
            Self::EnvironmentEnrichment => write!(f, "environment-enrichment"),
            Self::PromptRendering => write!(f, "prompt-rendering"),
        }
    }
}

/// A synchronous, stateless pipeline agent.
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn role(&self) -> AgentRole;

    /// Short, static description for diagnostics.
    fn describe(&self) -> &'static str;

    /// Every action this agent understands.
    fn actions(&self) -> &'static [&'static str];

    /// Action to run when the payload has no `action` key.
    fn default_action(&self) -> Option<&'static str> {
        None
    }

    /// Process one payload against the run's context.
    fn handle(&self, payload: &Payload, context: &mut WorkspaceContext) -> WorkflowResult<Value>;

    /// Match the payload's `action` against [`Agent::actions`].
    fn resolve_action(&self, payload: &Payload) -> WorkflowResult<&'static str> {
        match payload.get("action") {
            None | Some(Value::Null) => self
                .default_action()
                .ok_or_else(|| WorkflowError::missing_field(self.name(), "action")),
            Some(Value::String(action)) => self
                .actions()
                .iter()
                .copied()
                .find(|known| *known == action.as_str())
                .ok_or_else(|| WorkflowError::unsupported(self.name(), action.as_str())),
            Some(other) => Err(WorkflowError::unsupported(self.name(), other.to_string())),
        }
    }
}

/// Build a payload from a `json!` object literal. Non-objects become empty.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// Non-empty string field.
pub(crate) fn str_field<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub(crate) fn bool_field(payload: &Payload, key: &str) -> bool {
    payload.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// String entries of an array field; other entries are skipped.
pub(crate) fn string_list(payload: &Payload, key: &str) -> Vec<String> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
