//! Live workspace state shared by the agents during one workflow run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::prompts::NONE_PLACEHOLDER;
use crate::ticket::Ticket;

/// Workspace directories live under `<repo_root>/.wtm/workspaces/<slug>`.
pub const WORKSPACES_SUBDIR: [&str; 2] = [".wtm", "workspaces"];

/// Aggregated view of the workspace a single workflow run operates on.
///
/// Created by the orchestrator, mutated in place by agents according to
/// their documented rights, and dropped at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    pub repo_root: PathBuf,
    pub worktree_path: PathBuf,
    pub ticket: Ticket,
    pub quick_actions: Vec<String>,
    /// Sorted map so rendering is deterministic.
    pub env: BTreeMap<String, String>,
}

impl WorkspaceContext {
    pub fn new(repo_root: impl Into<PathBuf>, worktree_path: impl Into<PathBuf>, ticket: Ticket) -> Self {
        Self {
            repo_root: repo_root.into(),
            worktree_path: worktree_path.into(),
            ticket,
            quick_actions: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Default workspace directory for `ticket` inside `repo_root`.
    pub fn default_worktree_path(repo_root: &Path, ticket: &Ticket) -> PathBuf {
        let mut path = repo_root.to_path_buf();
        path.extend(WORKSPACES_SUBDIR);
        path.push(ticket.slug());
        path
    }

    /// Human-readable summary for the coding assistant.
    pub fn render_summary(&self) -> String {
        let actions = if self.quick_actions.is_empty() {
            NONE_PLACEHOLDER.to_string()
        } else {
            self.quick_actions
                .iter()
                .map(|action| format!("- {action}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let env = if self.env.is_empty() {
            NONE_PLACEHOLDER.to_string()
        } else {
            self.env
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Repository root: {}\n\
             Worktree path: {}\n\
             Ticket: {} — {}\n\
             Quick actions:\n{actions}\n\
             Environment:\n{env}",
            self.repo_root.display(),
            self.worktree_path.display(),
            self.ticket.key,
            self.ticket.summary,
        )
    }
}
