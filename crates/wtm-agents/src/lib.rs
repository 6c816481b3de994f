//! Agent pipeline that turns a tracker ticket into a WTM-managed worktree and
//! a prompt for an external coding assistant.
//!
//! Each agent wraps one external command-line tool behind the [`agents::Agent`]
//! contract; [`orchestrator::WorkflowOrchestrator`] sequences them.

pub mod agents;
pub mod config;
pub mod context;
pub mod errors;
pub mod orchestrator;
pub mod process;
pub mod prompts;
pub mod ticket;
pub mod ticket_cache;
