//! Ticket-source agent: loads tracker tickets through the tracker CLI
//! (`acli jira issue ...`) and keeps a flat JSON cache of the assigned list.
//!
//! Actions:
//! - `suggest` (default): cached list if the cache parses, otherwise a live
//!   fetch that rewrites the cache. A corrupted cache is deleted, never fatal.
//! - `detail`: one ticket by `key`, always live.
//! - `refresh`: drop the cache, then `suggest`.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::{str_field, Agent, AgentRole, Payload};
use crate::config::TrackerConfig;
use crate::context::WorkspaceContext;
use crate::errors::{WorkflowError, WorkflowResult};
use crate::process::{CommandRunner, CommandRunnerExt, Invocation};
use crate::ticket::Ticket;
use crate::ticket_cache::TicketCache;

pub const NAME: &str = "jira-context";

const ACTIONS: &[&str] = &["suggest", "detail", "refresh"];

pub struct TicketSourceAgent {
    config: TrackerConfig,
    cache: TicketCache,
    runner: Arc<dyn CommandRunner>,
}

impl TicketSourceAgent {
    /// `config.cache_path` is used as given; anchor it first if relative.
    pub fn new(config: TrackerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let cache = TicketCache::new(config.cache_path.clone());
        Self {
            config,
            cache,
            runner,
        }
    }

    pub fn cache(&self) -> &TicketCache {
        &self.cache
    }

    /// Tickets assigned to the configured identity, cache first.
    pub fn suggest(&self) -> WorkflowResult<Vec<Ticket>> {
        match self.cache.load() {
            Ok(Some(tickets)) => {
                info!(count = tickets.len(), "Using cached tickets");
                return Ok(tickets);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    path = %self.cache.path().display(),
                    error = %e,
                    "Ticket cache unreadable; discarding and refetching"
                );
                self.cache.invalidate()?;
            }
        }

        let list = self
            .issue_command("list", None)
            .arg(format!("--limit={}", self.config.max_results))
            .arg("--json");
        let tickets = match self.runner.run_json(&list)? {
            Some(Value::Array(items)) => items.iter().map(Ticket::from_tracker_value).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(WorkflowError::malformed(
                    list.display(),
                    format!("expected a JSON array, got {}", json_kind(&other)),
                ))
            }
        };

        self.cache.store(&tickets)?;
        info!(count = tickets.len(), "Fetched tickets from tracker");
        Ok(tickets)
    }

    /// A single ticket by key. Never cached.
    pub fn detail(&self, key: &str) -> WorkflowResult<Ticket> {
        let get = self.issue_command("get", Some(key)).arg("--json");
        match self.runner.run_json(&get)? {
            Some(data) => Ok(Ticket::from_tracker_value(&data)),
            None => Err(WorkflowError::malformed(get.display(), "empty output")),
        }
    }

    pub fn refresh(&self) -> WorkflowResult<Vec<Ticket>> {
        self.cache.invalidate()?;
        self.suggest()
    }

    /// `<tracker> [<namespace>] issue <verb> [<key>] --site=.. --user=.. --token=..`
    fn issue_command(&self, verb: &str, key: Option<&str>) -> Invocation {
        let mut inv = Invocation::new(&self.config.binary);
        if !self.config.namespace.is_empty() {
            inv = inv.arg(&self.config.namespace);
        }
        inv = inv.args(["issue", verb]);
        if let Some(key) = key {
            inv = inv.arg(key);
        }
        inv.arg(format!("--site={}", self.config.site))
            .arg(format!("--user={}", self.config.email))
            .arg(format!("--token={}", self.config.api_token))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Agent for TicketSourceAgent {
    fn name(&self) -> &str {
        NAME
    }

    fn role(&self) -> AgentRole {
        AgentRole::TicketSource
    }

    fn describe(&self) -> &'static str {
        "Fetches assigned Jira tickets and caches them locally."
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn default_action(&self) -> Option<&'static str> {
        Some("suggest")
    }

    fn handle(&self, payload: &Payload, _context: &mut WorkspaceContext) -> WorkflowResult<Value> {
        match self.resolve_action(payload)? {
            "suggest" => Ok(json!({ "tickets": self.suggest()? })),
            "refresh" => Ok(json!({ "tickets": self.refresh()? })),
            "detail" => {
                let key = str_field(payload, "key")
                    .ok_or_else(|| WorkflowError::missing_field(NAME, "key"))?;
                Ok(json!({ "ticket": self.detail(key)? }))
            }
            other => Err(WorkflowError::unsupported(NAME, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::payload;
    use crate::process::MockCommandRunner;

    fn config(dir: &std::path::Path) -> TrackerConfig {
        let mut config = TrackerConfig::new("acme", "dev@acme.test", "secret");
        config.cache_path = dir.join(".wtm/jira_cache.json");
        config.max_results = 5;
        config
    }

    fn empty_context() -> WorkspaceContext {
        WorkspaceContext::new("/repo", "/repo", Ticket::default())
    }

    #[test]
    fn list_command_carries_credentials_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.program == "acli"
                    && inv.args
                        == [
                            "jira",
                            "issue",
                            "list",
                            "--site=acme",
                            "--user=dev@acme.test",
                            "--token=secret",
                            "--limit=5",
                            "--json",
                        ]
            })
            .times(1)
            .returning(|_| Ok(r#"[{"key": "MOB-1", "fields": {"summary": "One"}}]"#.into()));

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        let tickets = agent.suggest().unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].summary, "One");
        assert!(agent.cache().path().exists(), "live fetch writes the cache");
    }

    #[test]
    fn second_suggest_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Ok(r#"[{"key": "MOB-1", "fields": {"summary": "One"}}]"#.into()));

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        let first = agent.suggest().unwrap();
        let second = agent.suggest().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_tracker_output_caches_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(String::new()));

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        assert!(agent.suggest().unwrap().is_empty());
        assert_eq!(agent.cache().load().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn non_array_list_output_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(r#"{"key": "MOB-1"}"#.into()));

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        let err = agent.suggest().unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedOutput { .. }), "got {err:?}");
        assert!(!agent.cache().path().exists());
    }

    fn tracker_failure(inv: &Invocation) -> WorkflowResult<String> {
        Err(WorkflowError::CommandFailed {
            command: inv.display(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "401 Unauthorized".into(),
        })
    }

    #[test]
    fn failing_live_fetch_propagates_and_writes_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(tracker_failure);

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        let err = agent
            .handle(&payload(json!({"action": "suggest"})), &mut empty_context())
            .unwrap_err();
        assert_eq!(err.command_failure(), Some((1, "401 Unauthorized")));
        assert!(!agent.cache().path().exists());
    }

    #[test]
    fn failing_detail_propagates_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(tracker_failure);

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        let err = agent
            .handle(&payload(json!({"action": "detail", "key": "MOB-7"})), &mut empty_context())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CommandFailed { exit_code: 1, .. }), "got {err:?}");
    }

    #[test]
    fn detail_command_puts_key_before_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|inv| {
                inv.args
                    == [
                        "jira",
                        "issue",
                        "get",
                        "MOB-7",
                        "--site=acme",
                        "--user=dev@acme.test",
                        "--token=secret",
                        "--json",
                    ]
            })
            .returning(|_| {
                Ok(r#"{"key": "MOB-7", "fields": {"summary": "Seven", "status": {"name": "Done"}}}"#.into())
            });

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        let result = agent
            .handle(&payload(json!({"action": "detail", "key": "MOB-7"})), &mut empty_context())
            .unwrap();
        assert_eq!(result["ticket"]["key"], "MOB-7");
        assert_eq!(result["ticket"]["extra"]["status"], "Done");
        assert!(!agent.cache().path().exists(), "detail never touches the cache");
    }

    #[test]
    fn detail_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(MockCommandRunner::new()));
        let err = agent
            .handle(&payload(json!({"action": "detail"})), &mut empty_context())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField { ref field, .. } if field == "key"));
    }

    #[test]
    fn detail_with_empty_output_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(String::new()));
        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        assert!(matches!(
            agent.detail("MOB-1").unwrap_err(),
            WorkflowError::MalformedOutput { .. }
        ));
    }

    #[test]
    fn refresh_ignores_existing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Ok(r#"[{"key": "MOB-2", "fields": {"summary": "Fresh"}}]"#.into()));

        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(runner));
        agent.cache().store(&[Ticket::new("MOB-1", "Stale")]).unwrap();

        let result = agent
            .handle(&payload(json!({"action": "refresh"})), &mut empty_context())
            .unwrap();
        assert_eq!(result["tickets"][0]["key"], "MOB-2");
        assert_eq!(agent.cache().load().unwrap().unwrap()[0].summary, "Fresh");
    }

    #[test]
    fn missing_action_defaults_to_suggest() {
        let dir = tempfile::tempdir().unwrap();
        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(MockCommandRunner::new()));
        agent.cache().store(&[Ticket::new("MOB-1", "Cached")]).unwrap();

        let result = agent.handle(&Payload::new(), &mut empty_context()).unwrap();
        assert_eq!(result["tickets"][0]["summary"], "Cached");
    }

    #[test]
    fn unknown_action_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let agent = TicketSourceAgent::new(config(dir.path()), Arc::new(MockCommandRunner::new()));
        let err = agent
            .handle(&payload(json!({"action": "assign"})), &mut empty_context())
            .unwrap_err();
        assert_eq!(err.to_string(), "agent `jira-context` does not support action `assign`");
    }

    #[test]
    fn empty_namespace_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.binary = "tracker".into();
        cfg.namespace = String::new();
        let agent = TicketSourceAgent::new(cfg, Arc::new(MockCommandRunner::new()));
        let inv = agent.issue_command("list", None);
        assert_eq!(inv.program, "tracker");
        assert_eq!(&inv.args[..2], ["issue", "list"]);
    }
}
