//! Workspace-lifecycle agent: creates, lists, and removes worktrees through
//! the `wtm worktree` CLI.
//!
//! The branch defaults to the context ticket's slug. After `add`, the new
//! worktree's path is looked up in `wtm worktree list --json`: the first
//! record whose `branch` equals the requested branch exactly wins, and no
//! match yields a `null` path rather than an error.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::{bool_field, str_field, Agent, AgentRole, Payload};
use crate::context::WorkspaceContext;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::process::{CommandRunner, CommandRunnerExt, Invocation};

pub const NAME: &str = "worktree-manager";

const ACTIONS: &[&str] = &["add", "remove", "list"];

pub struct WorkspaceLifecycleAgent {
    wtm_binary: String,
    repo_root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl WorkspaceLifecycleAgent {
    pub fn new(
        wtm_binary: impl Into<String>,
        repo_root: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            wtm_binary: wtm_binary.into(),
            repo_root: repo_root.into(),
            runner,
        }
    }

    /// Create a worktree for `branch` and return its path, if `list` reports one.
    pub fn add(&self, branch: &str, path_hint: Option<&str>) -> WorkflowResult<Option<PathBuf>> {
        let mut add = self.worktree_command("add").arg(branch);
        if let Some(hint) = path_hint {
            add = add.arg(hint);
        }
        self.runner.run(&add)?;

        let path = find_branch_path(&self.list()?, branch);
        match &path {
            Some(p) => info!(branch, path = %p.display(), "Worktree ready"),
            None => warn!(branch, "Worktree added but not reported by list"),
        }
        Ok(path)
    }

    /// Remove the worktree for `branch`. Any failure comes from the CLI itself.
    pub fn remove(&self, branch: &str, force: bool) -> WorkflowResult<()> {
        let mut remove = self.worktree_command("remove").arg(branch);
        if force {
            remove = remove.arg("--force");
        }
        self.runner.run(&remove)?;
        info!(branch, force, "Worktree removed");
        Ok(())
    }

    /// Raw records from `wtm worktree list --json`.
    pub fn list(&self) -> WorkflowResult<Vec<Value>> {
        let list = self.worktree_command("list").arg("--json");
        match self.runner.run_json(&list)? {
            Some(Value::Array(records)) => Ok(records),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(WorkflowError::malformed(
                list.display(),
                "expected a JSON array of worktrees",
            )),
        }
    }

    fn worktree_command(&self, verb: &str) -> Invocation {
        Invocation::new(&self.wtm_binary)
            .args(["worktree", verb])
            .current_dir(&self.repo_root)
    }
}

/// Path of the first record whose `branch` equals `branch` exactly.
pub fn find_branch_path(records: &[Value], branch: &str) -> Option<PathBuf> {
    records
        .iter()
        .find(|record| record["branch"].as_str() == Some(branch))
        .and_then(|record| record["path"].as_str())
        .map(PathBuf::from)
}

impl Agent for WorkspaceLifecycleAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn role(&self) -> AgentRole {
        AgentRole::WorkspaceLifecycle
    }

    fn describe(&self) -> &'static str {
        "Creates, lists, and prunes WTM-managed worktrees."
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn handle(&self, payload: &Payload, context: &mut WorkspaceContext) -> WorkflowResult<Value> {
        let action = self.resolve_action(payload)?;
        if action == "list" {
            return Ok(json!({ "worktrees": self.list()? }));
        }

        let branch = str_field(payload, "branch")
            .map(str::to_string)
            .unwrap_or_else(|| context.ticket.slug());

        match action {
            "add" => {
                let path = self.add(&branch, str_field(payload, "path"))?;
                if let Some(p) = &path {
                    context.worktree_path = p.clone();
                }
                Ok(json!({
                    "branch": branch,
                    "path": path.map(|p| p.display().to_string()),
                }))
            }
            // Reported as removed whether or not wtm knew the branch.
            "remove" => {
                self.remove(&branch, bool_field(payload, "force"))?;
                Ok(json!({ "branch": branch, "removed": true }))
            }
            other => Err(WorkflowError::unsupported(NAME, other)),
        }
    }
}
