//! Environment-enrichment agent: merges configured quick actions and
//! environment defaults into the run's context.

use std::collections::HashSet;

use serde_json::{json, Value};
use tracing::debug;

use super::{string_list, Agent, AgentRole, Payload};
use crate::config::EnrichmentConfig;
use crate::context::WorkspaceContext;
use crate::errors::{WorkflowError, WorkflowResult};

pub const NAME: &str = "react-environment";

const ACTIONS: &[&str] = &["enrich"];

pub struct EnvironmentEnrichmentAgent {
    config: EnrichmentConfig,
}

impl EnvironmentEnrichmentAgent {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self { config }
    }

    /// Replace `context.quick_actions` with configured actions followed by
    /// `extras`, de-duplicated, and apply configured env over `context.env`.
    pub fn enrich(&self, extras: &[String], context: &mut WorkspaceContext) -> Vec<String> {
        let merged = merge_quick_actions(&self.config.quick_actions, extras);
        // Same Vec, new contents.
        context.quick_actions.clear();
        context.quick_actions.extend(merged.iter().cloned());
        context.env.extend(
            self.config
                .extra_env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        debug!(
            actions = merged.len(),
            env = context.env.len(),
            "Enriched workspace context"
        );
        merged
    }
}

/// `defaults` then `extras`, keeping the first occurrence of each command.
pub fn merge_quick_actions(defaults: &[String], extras: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    defaults
        .iter()
        .chain(extras)
        .filter(|action| seen.insert(action.as_str()))
        .cloned()
        .collect()
}

impl Agent for EnvironmentEnrichmentAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn role(&self) -> AgentRole {
        AgentRole::EnvironmentEnrichment
    }

    fn describe(&self) -> &'static str {
        "Adds React Native quick actions and environment hints to the workspace."
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn default_action(&self) -> Option<&'static str> {
        Some("enrich")
    }

    fn handle(&self, payload: &Payload, context: &mut WorkspaceContext) -> WorkflowResult<Value> {
        match self.resolve_action(payload)? {
            "enrich" => {
                let extras = string_list(payload, "extra_actions");
                let merged = self.enrich(&extras, context);
                Ok(json!({ "quick_actions": merged, "env": context.env }))
            }
            other => Err(WorkflowError::unsupported(NAME, other)),
        }
    }
}
