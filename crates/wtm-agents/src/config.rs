use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{WorkflowError, WorkflowResult};

/// Directory inside the repository that holds WTM state.
pub const WTM_DIR: &str = ".wtm";

/// Optional TOML file with agent settings, relative to the repository root.
pub const AGENTS_CONFIG_FILE: &str = "agents.toml";

/// WTM's own workspace config, read for its quick-access commands.
pub const WTM_CONFIG_FILE: &str = "config.json";

const DEFAULT_WTM_BINARY: &str = "wtm";
const DEFAULT_ASSISTANT: &str = "claude";
const DEFAULT_TRACKER_BINARY: &str = "acli";
const DEFAULT_TRACKER_NAMESPACE: &str = "jira";
const DEFAULT_CACHE_PATH: &str = ".wtm/jira_cache.json";
const DEFAULT_MAX_RESULTS: u32 = 10;

/// Settings required to query the ticket tracker CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackerConfig {
    pub site: String,
    pub email: String,
    pub api_token: String,
    /// Relative paths are resolved against the repository root.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_tracker_binary")]
    pub binary: String,
    /// Sub-command inserted before `issue` (`acli jira issue ...`). Empty to omit.
    #[serde(default = "default_tracker_namespace")]
    pub namespace: String,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_tracker_binary() -> String {
    DEFAULT_TRACKER_BINARY.to_string()
}

fn default_tracker_namespace() -> String {
    DEFAULT_TRACKER_NAMESPACE.to_string()
}

impl TrackerConfig {
    pub fn new(site: impl Into<String>, email: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            email: email.into(),
            api_token: api_token.into(),
            cache_path: default_cache_path(),
            max_results: DEFAULT_MAX_RESULTS,
            binary: default_tracker_binary(),
            namespace: default_tracker_namespace(),
        }
    }

    /// Build from `WTM_TRACKER_SITE`, `WTM_TRACKER_EMAIL` and
    /// `WTM_TRACKER_TOKEN`. All three must be set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let site = lookup("WTM_TRACKER_SITE")?;
        let email = lookup("WTM_TRACKER_EMAIL")?;
        let api_token = lookup("WTM_TRACKER_TOKEN")?;
        Some(Self::new(site, email, api_token))
    }

    /// Copy with a relative cache path resolved against `repo_root`.
    pub fn anchored(&self, repo_root: &Path) -> Self {
        let mut anchored = self.clone();
        if anchored.cache_path.is_relative() {
            anchored.cache_path = repo_root.join(&self.cache_path);
        }
        anchored
    }
}

/// Quick actions and environment defaults merged into every workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub quick_actions: Vec<String>,
    pub extra_env: BTreeMap<String, String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            quick_actions: vec![
                "npm install".into(),
                "npm run lint".into(),
                "npm run test".into(),
                "npx expo start --dev-client".into(),
            ],
            extra_env: BTreeMap::new(),
        }
    }
}

/// Top-level configuration for the orchestrator and its agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub repo_root: PathBuf,
    pub wtm_binary: String,
    /// Coding assistant identifier, also the prompt agent's name.
    pub assistant: String,
    /// `None` disables the ticket-source agent.
    pub tracker: Option<TrackerConfig>,
    pub enrichment: EnrichmentConfig,
}

/// On-disk shape of `.wtm/agents.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    wtm_binary: Option<String>,
    assistant: Option<String>,
    tracker: Option<TrackerConfig>,
    enrichment: Option<EnrichmentConfig>,
}

#[derive(Deserialize)]
struct WtmConfigFile {
    #[serde(default, rename = "quickAccess")]
    quick_access: Vec<QuickAccessEntry>,
}

#[derive(Deserialize)]
struct QuickAccessEntry {
    #[serde(default, rename = "quickCommand")]
    quick_command: Option<String>,
    #[serde(default, rename = "type")]
    entry_type: Option<String>,
}

impl WorkflowConfig {
    /// Built-in defaults only; no files or environment consulted.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            wtm_binary: DEFAULT_WTM_BINARY.to_string(),
            assistant: DEFAULT_ASSISTANT.to_string(),
            tracker: None,
            enrichment: EnrichmentConfig::default(),
        }
    }

    /// Layer defaults, the agents TOML file, WTM quick-access commands, and
    /// environment variables, in that order.
    ///
    /// `explicit` must exist when given. Otherwise `.wtm/agents.toml` is read
    /// only if present.
    pub fn load(repo_root: impl Into<PathBuf>, explicit: Option<&Path>) -> WorkflowResult<Self> {
        let mut config = Self::new(repo_root);

        let wtm_dir = config.repo_root.join(WTM_DIR);
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(wtm_dir.join(AGENTS_CONFIG_FILE)).filter(|p| p.exists()),
        };
        if let Some(path) = file {
            config.apply_file(&path)?;
        }

        let quick_access = load_quick_access(&wtm_dir)?;
        if !quick_access.is_empty() {
            debug!(count = quick_access.len(), "Loaded WTM quick-access commands");
            config.enrichment.quick_actions.extend(quick_access);
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay the settings present in a TOML file.
    pub fn apply_file(&mut self, path: &Path) -> WorkflowResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| WorkflowError::io(path, e))?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| WorkflowError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(bin) = file.wtm_binary {
            self.wtm_binary = bin;
        }
        if let Some(assistant) = file.assistant {
            self.assistant = assistant;
        }
        if file.tracker.is_some() {
            self.tracker = file.tracker;
        }
        if let Some(enrichment) = file.enrichment {
            self.enrichment = enrichment;
        }
        info!(path = %path.display(), "Applied agent configuration file");
        Ok(())
    }

    /// Overlay `WTM_BINARY`, `WTM_ASSISTANT`, and tracker credentials.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bin) = lookup("WTM_BINARY") {
            self.wtm_binary = bin;
        }
        if let Some(assistant) = lookup("WTM_ASSISTANT") {
            self.assistant = assistant;
        }
        if let Some(from_env) = TrackerConfig::from_lookup(&lookup) {
            match self.tracker.as_mut() {
                Some(tracker) => {
                    tracker.site = from_env.site;
                    tracker.email = from_env.email;
                    tracker.api_token = from_env.api_token;
                }
                None => self.tracker = Some(from_env),
            }
        }
    }

    /// Make sure the ticket cache directory exists.
    pub fn ensure_paths(&self) -> WorkflowResult<()> {
        if let Some(tracker) = &self.tracker {
            let cache_path = tracker.anchored(&self.repo_root).cache_path;
            if let Some(parent) = cache_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| WorkflowError::io(parent, e))?;
            }
        }
        Ok(())
    }
}

/// Commands from the `quickAccess` section of WTM's `config.json`.
///
/// A missing file yields no commands. Entries of a type other than
/// `command`, or without a `quickCommand`, are skipped.
pub fn load_quick_access(wtm_dir: &Path) -> WorkflowResult<Vec<String>> {
    let path = wtm_dir.join(WTM_CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WorkflowError::io(path, e)),
    };

    let parsed: WtmConfigFile = serde_json::from_str(&data).map_err(|e| WorkflowError::Config {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(parsed
        .quick_access
        .into_iter()
        .filter(|entry| entry.entry_type.as_deref().unwrap_or("command") == "command")
        .filter_map(|entry| entry.quick_command)
        .filter(|command| !command.trim().is_empty())
        .collect())
}
