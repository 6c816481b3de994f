//! Prompt-rendering agent: turns the workspace context and a goal into the
//! prompt handed to the external coding assistant.

use serde_json::{json, Value};
use tracing::debug;

use super::{Agent, AgentRole, Payload};
use crate::context::WorkspaceContext;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::prompts::{self, DEFAULT_GOAL, PROMPT_VERSION};

const ACTIONS: &[&str] = &["render"];

/// Named after the assistant it writes for; that name is also the default
/// `assistant` in its output.
pub struct PromptRenderingAgent {
    name: String,
}

impl PromptRenderingAgent {
    pub fn new(assistant: impl Into<String>) -> Self {
        Self {
            name: assistant.into(),
        }
    }

    /// Pure: the same goal and context always give the same text.
    pub fn render(&self, goal: &str, context: &WorkspaceContext) -> String {
        prompts::assemble(goal, &context.render_summary())
    }
}

fn text_field<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

impl Agent for PromptRenderingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> AgentRole {
        AgentRole::PromptRendering
    }

    fn describe(&self) -> &'static str {
        "Forms a rich prompt for the external coding assistant."
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn default_action(&self) -> Option<&'static str> {
        Some("render")
    }

    fn handle(&self, payload: &Payload, context: &mut WorkspaceContext) -> WorkflowResult<Value> {
        match self.resolve_action(payload)? {
            "render" => {
                // An explicit empty string is kept; only a missing key falls back.
                let goal = text_field(payload, "goal").unwrap_or(DEFAULT_GOAL);
                let assistant = text_field(payload, "assistant").unwrap_or(&self.name);
                debug!(assistant, prompt_version = PROMPT_VERSION, "Rendering prompt");
                Ok(json!({
                    "prompt": self.render(goal, context),
                    "assistant": assistant,
                }))
            }
            other => Err(WorkflowError::unsupported(self.name.as_str(), other)),
        }
    }
}
