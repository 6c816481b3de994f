use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use wtm_agents::config::{TrackerConfig, WorkflowConfig};
use wtm_agents::orchestrator::WorkflowOrchestrator;
use wtm_agents::ticket::Ticket;

/// Run the WTM multi-agent workflow for one ticket.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tracker ticket key (e.g. MOB-123)
    ticket: String,

    /// Short summary of the ticket
    summary: String,

    /// Path to the Git repository root
    repo: PathBuf,

    /// Path to the WTM binary (overrides config and WTM_BINARY)
    #[arg(long = "wtm")]
    wtm_binary: Option<String>,

    /// Coding assistant identifier (overrides config and WTM_ASSISTANT)
    #[arg(long)]
    assistant: Option<String>,

    /// Jira site identifier for the tracker CLI
    #[arg(long)]
    jira_site: Option<String>,

    /// Email used for Jira authentication
    #[arg(long)]
    jira_email: Option<String>,

    /// API token used for Jira authentication
    #[arg(long)]
    jira_token: Option<String>,

    /// Additional quick action command to enqueue (repeatable)
    #[arg(long = "extra-action", value_name = "COMMAND")]
    extra_actions: Vec<String>,

    /// Print `{prompt, assistant}` as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Agent configuration file (defaults to <repo>/.wtm/agents.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Flags sit on top of every other configuration layer.
    fn apply_to(&self, config: &mut WorkflowConfig) {
        if let Some(bin) = &self.wtm_binary {
            config.wtm_binary = bin.clone();
        }
        if let Some(assistant) = &self.assistant {
            config.assistant = assistant.clone();
        }
        // Tracker credentials only count as a set.
        if let (Some(site), Some(email), Some(token)) =
            (&self.jira_site, &self.jira_email, &self.jira_token)
        {
            match config.tracker.as_mut() {
                Some(tracker) => {
                    tracker.site = site.clone();
                    tracker.email = email.clone();
                    tracker.api_token = token.clone();
                }
                None => config.tracker = Some(TrackerConfig::new(site, email, token)),
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let repo_root = std::fs::canonicalize(&args.repo)
        .with_context(|| format!("repository path {} is not accessible", args.repo.display()))?;

    let mut config = WorkflowConfig::load(&repo_root, args.config.as_deref())
        .context("failed to load agent configuration")?;
    args.apply_to(&mut config);

    let orchestrator = WorkflowOrchestrator::new(config)?;
    let config = orchestrator.config();
    info!(
        repo = %config.repo_root.display(),
        wtm = %config.wtm_binary,
        assistant = %config.assistant,
        tracker = config.tracker.is_some(),
        agents = ?orchestrator.describe_agents().keys().collect::<Vec<_>>(),
        "WTM agent workflow starting"
    );

    let ticket = Ticket::new(&args.ticket, &args.summary);
    let mut context = orchestrator.initialise_workspace(ticket)?;
    if !args.extra_actions.is_empty() {
        orchestrator.update_quick_actions(&args.extra_actions, Some(&mut context))?;
    }
    let plan = orchestrator
        .plan_in(&mut context)
        .with_context(|| format!("failed to plan ticket {}", args.ticket))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Assistant: {}", plan.assistant);
        println!("Prompt:\n");
        println!("{}", plan.prompt);
    }
    Ok(())
}
