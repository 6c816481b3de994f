//! Flat JSON cache of normalized tickets.
//!
//! The file holds a pretty-printed JSON array of [`Ticket`] records. There is
//! no locking: two runs sharing a cache path race and the last writer wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{WorkflowError, WorkflowResult};
use crate::ticket::Ticket;

#[derive(Debug, Clone)]
pub struct TicketCache {
    path: PathBuf,
}

impl TicketCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached tickets, or `None` when no cache file exists.
    ///
    /// An unreadable or unparsable file is an error; callers decide whether
    /// to discard it.
    pub fn load(&self) -> WorkflowResult<Option<Vec<Ticket>>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WorkflowError::io(&self.path, e)),
        };
        let tickets: Vec<Ticket> = serde_json::from_str(&data).map_err(|e| {
            WorkflowError::malformed(self.path.display().to_string(), e.to_string())
        })?;
        debug!(path = %self.path.display(), count = tickets.len(), "Loaded ticket cache");
        Ok(Some(tickets))
    }

    /// Replace the cache contents, creating parent directories as needed.
    pub fn store(&self, tickets: &[Ticket]) -> WorkflowResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| WorkflowError::io(parent, e))?;
        }
        let data = serde_json::to_string_pretty(tickets)
            .map_err(|e| WorkflowError::malformed(self.path.display().to_string(), e.to_string()))?;
        fs::write(&self.path, data).map_err(|e| WorkflowError::io(&self.path, e))?;
        debug!(path = %self.path.display(), count = tickets.len(), "Wrote ticket cache");
        Ok(())
    }

    /// Delete the cache file. A missing file is not an error.
    pub fn invalidate(&self) -> WorkflowResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkflowError::io(&self.path, e)),
        }
    }
}
