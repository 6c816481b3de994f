//! Workflow orchestrator: owns the agent set and sequences the pipeline
//! ticket → workspace context → enrichment → worktree → prompt.
//!
//! Each public operation is a complete pipeline on its own; nothing is kept
//! between calls apart from the agents themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::agents::{
    payload, Agent, AgentRole, EnvironmentEnrichmentAgent, PromptRenderingAgent,
    TicketSourceAgent, WorkspaceLifecycleAgent,
};
use crate::config::WorkflowConfig;
use crate::context::WorkspaceContext;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::process::{CommandRunner, SystemRunner};
use crate::prompts;
use crate::ticket::Ticket;

/// Prompt plus the assistant it is meant for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub prompt: String,
    pub assistant: String,
}

pub struct WorkflowOrchestrator {
    config: WorkflowConfig,
    agents: Vec<Box<dyn Agent>>,
    /// Role → index into `agents`; the first agent of a role wins.
    by_role: HashMap<AgentRole, usize>,
}

impl WorkflowOrchestrator {
    /// Default agents running real subprocesses.
    pub fn new(config: WorkflowConfig) -> WorkflowResult<Self> {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Default agents sharing `runner`. Creates the ticket cache directory.
    pub fn with_runner(config: WorkflowConfig, runner: Arc<dyn CommandRunner>) -> WorkflowResult<Self> {
        config.ensure_paths()?;
        let agents = default_agents(&config, runner);
        Ok(Self::with_agents(config, agents))
    }

    /// Explicit agent set, in the given order.
    pub fn with_agents(config: WorkflowConfig, agents: Vec<Box<dyn Agent>>) -> Self {
        let mut by_role = HashMap::new();
        for (index, agent) in agents.iter().enumerate() {
            by_role.entry(agent.role()).or_insert(index);
        }
        Self {
            config,
            agents,
            by_role,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn agent(&self, role: AgentRole) -> Option<&dyn Agent> {
        self.by_role.get(&role).map(|&index| self.agents[index].as_ref())
    }

    /// Fresh context for `ticket` with configured quick actions and env,
    /// enriched. Does not touch the worktree tool.
    pub fn initialise_workspace(&self, ticket: Ticket) -> WorkflowResult<WorkspaceContext> {
        let worktree_path = WorkspaceContext::default_worktree_path(&self.config.repo_root, &ticket);
        let mut context = WorkspaceContext::new(&self.config.repo_root, worktree_path, ticket);
        context.quick_actions = self.config.enrichment.quick_actions.clone();
        context.env = self.config.enrichment.extra_env.clone();

        if let Some(enricher) = self.agent(AgentRole::EnvironmentEnrichment) {
            enricher.handle(&payload(json!({})), &mut context)?;
        }
        info!(
            ticket = %context.ticket.key,
            worktree = %context.worktree_path.display(),
            "Workspace initialised"
        );
        Ok(context)
    }

    /// Initialise a workspace for `ticket`, then [`plan_in`](Self::plan_in) it.
    pub fn plan(&self, ticket: Ticket) -> WorkflowResult<Plan> {
        let mut context = self.initialise_workspace(ticket)?;
        self.plan_in(&mut context)
    }

    /// Ensure the worktree exists for an already initialised context and
    /// render the assistant prompt from it.
    pub fn plan_in(&self, context: &mut WorkspaceContext) -> WorkflowResult<Plan> {
        let renderer = self
            .agent(AgentRole::PromptRendering)
            .ok_or(WorkflowError::MissingAgent(AgentRole::PromptRendering))?;

        let slug = context.ticket.slug();
        if let Some(lifecycle) = self.agent(AgentRole::WorkspaceLifecycle) {
            lifecycle.handle(&payload(json!({ "action": "add", "branch": slug })), context)?;
        } else {
            debug!("No workspace-lifecycle agent; skipping worktree creation");
        }

        let result = renderer.handle(
            &payload(json!({
                "goal": prompts::ticket_goal(&context.ticket.key),
                "assistant": self.config.assistant,
            })),
            context,
        )?;
        let plan: Plan = serde_json::from_value(result)
            .map_err(|e| WorkflowError::malformed(renderer.name(), e.to_string()))?;
        info!(ticket = %context.ticket.key, assistant = %plan.assistant, "Plan ready");
        Ok(plan)
    }

    /// Merge `actions` into `context` through the enrichment agent.
    pub fn update_quick_actions(
        &self,
        actions: &[String],
        context: Option<&mut WorkspaceContext>,
    ) -> WorkflowResult<()> {
        let context = context.ok_or(WorkflowError::MissingContext)?;
        match self.agent(AgentRole::EnvironmentEnrichment) {
            Some(enricher) => {
                enricher.handle(&payload(json!({ "extra_actions": actions })), context)?;
            }
            None => debug!("No environment-enrichment agent; quick actions unchanged"),
        }
        Ok(())
    }

    /// Agent name → description, for diagnostics.
    pub fn describe_agents(&self) -> BTreeMap<String, String> {
        self.agents
            .iter()
            .map(|agent| (agent.name().to_string(), agent.describe().to_string()))
            .collect()
    }

    /// Assigned tickets from the ticket-source agent, or nothing if none is
    /// configured.
    pub fn fetch_ticket_suggestions(&self) -> WorkflowResult<Vec<Ticket>> {
        let Some(source) = self.agent(AgentRole::TicketSource) else {
            return Ok(Vec::new());
        };

        let mut scratch = WorkspaceContext::new(
            &self.config.repo_root,
            &self.config.repo_root,
            Ticket::default(),
        );
        let result = source.handle(&payload(json!({ "action": "suggest" })), &mut scratch)?;
        match result.get("tickets") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(tickets) => serde_json::from_value(tickets.clone())
                .map_err(|e| WorkflowError::malformed(source.name(), e.to_string())),
        }
    }
}

/// Ticket source (only with tracker credentials), worktree manager,
/// enrichment, prompt renderer.
pub fn default_agents(config: &WorkflowConfig, runner: Arc<dyn CommandRunner>) -> Vec<Box<dyn Agent>> {
    let mut agents: Vec<Box<dyn Agent>> = Vec::with_capacity(4);
    if let Some(tracker) = &config.tracker {
        agents.push(Box::new(TicketSourceAgent::new(
            tracker.anchored(&config.repo_root),
            Arc::clone(&runner),
        )));
    }
    agents.push(Box::new(WorkspaceLifecycleAgent::new(
        &config.wtm_binary,
        &config.repo_root,
        runner,
    )));
    agents.push(Box::new(EnvironmentEnrichmentAgent::new(config.enrichment.clone())));
    agents.push(Box::new(PromptRenderingAgent::new(&config.assistant)));
    agents
}
