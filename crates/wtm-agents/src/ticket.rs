//! Ticket domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum slug length, in characters.
pub const SLUG_MAX_LEN: usize = 80;

/// Slug used when neither the key nor the summary contribute any characters.
const FALLBACK_SLUG: &str = "ticket";

/// The subset of tracker ticket data the prompt pipeline cares about.
///
/// Tickets are values: re-fetching produces a new `Ticket`, nothing mutates
/// a cached one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Ticket {
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Filesystem- and branch-safe identifier: `<key>-<summary>`, lowercase,
    /// spaces turned into `-`, anything outside `[a-z0-9_-]` dropped, capped
    /// at [`SLUG_MAX_LEN`].
    pub fn slug(&self) -> String {
        let key = sanitize(&self.key);
        let summary = sanitize(&self.summary.to_lowercase().replace(' ', "-"));

        let mut slug = match (key.is_empty(), summary.is_empty()) {
            (true, true) => FALLBACK_SLUG.to_string(),
            (false, true) => key,
            (true, false) => summary,
            (false, false) => format!("{key}-{summary}"),
        };
        // Only ASCII survives sanitizing, so byte truncation is safe.
        slug.truncate(SLUG_MAX_LEN);
        slug
    }

    /// Normalize one raw tracker record (`{key, self, fields: {...}}`).
    ///
    /// Lossy: only the fields the prompt needs are kept, and anything
    /// missing or of the wrong shape becomes an empty value.
    pub fn from_tracker_value(data: &Value) -> Self {
        let fields = &data["fields"];
        let text = |v: &Value| v.as_str().unwrap_or_default().to_string();

        let labels = fields["labels"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut extra = BTreeMap::new();
        extra.insert("status".to_string(), text(&fields["status"]["name"]));
        extra.insert(
            "assignee".to_string(),
            text(&fields["assignee"]["displayName"]),
        );

        Self {
            key: text(&data["key"]),
            summary: text(&fields["summary"]),
            url: data["self"].as_str().map(str::to_string),
            labels,
            extra,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.extra
            .get("status")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn assignee(&self) -> Option<&str> {
        self.extra
            .get("assignee")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

fn sanitize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slug_of_key_and_summary() {
        let ticket = Ticket::new("MOB-42", "Fix Login Crash!");
        assert_eq!(ticket.slug(), "mob-42-fix-login-crash");
    }

    #[test]
    fn slug_keeps_underscores_and_drops_punctuation() {
        let ticket = Ticket::new("APP-7", "Use snake_case in API: v2 (beta)");
        assert_eq!(ticket.slug(), "app-7-use-snake_case-in-api-v2-beta");
    }

    #[test]
    fn slug_drops_non_ascii_letters() {
        let ticket = Ticket::new("MOB-1", "Café résumé");
        assert_eq!(ticket.slug(), "mob-1-caf-rsum");
    }

    #[test]
    fn slug_is_capped_at_eighty_characters() {
        let ticket = Ticket::new("MOB-1", "word ".repeat(40));
        let slug = ticket.slug();
        assert_eq!(slug.len(), SLUG_MAX_LEN);
        assert!(slug.starts_with("mob-1-word-word"));
    }

    #[test]
    fn slug_without_summary_is_the_key() {
        assert_eq!(Ticket::new("MOB-9", "").slug(), "mob-9");
        assert_eq!(Ticket::new("MOB-9", "!!!").slug(), "mob-9");
    }

    #[test]
    fn slug_of_empty_ticket_is_never_empty() {
        assert_eq!(Ticket::default().slug(), FALLBACK_SLUG);
        assert_eq!(Ticket::new("", "Hello").slug(), "hello");
    }

    #[test]
    fn normalizes_full_tracker_record() {
        let raw = json!({
            "key": "MOB-123",
            "self": "https://example.atlassian.net/rest/api/2/issue/10001",
            "fields": {
                "summary": "Crash on login",
                "labels": ["mobile", "p1"],
                "status": {"name": "In Progress"},
                "assignee": {"displayName": "Sam Doe"}
            }
        });
        let ticket = Ticket::from_tracker_value(&raw);
        assert_eq!(ticket.key, "MOB-123");
        assert_eq!(ticket.summary, "Crash on login");
        assert_eq!(
            ticket.url.as_deref(),
            Some("https://example.atlassian.net/rest/api/2/issue/10001")
        );
        assert_eq!(ticket.labels, vec!["mobile", "p1"]);
        assert_eq!(ticket.status(), Some("In Progress"));
        assert_eq!(ticket.assignee(), Some("Sam Doe"));
    }

    #[test]
    fn normalizes_sparse_record_to_empty_values() {
        let raw = json!({"key": "MOB-5", "fields": {"assignee": null, "labels": [1, "ok"]}});
        let ticket = Ticket::from_tracker_value(&raw);
        assert_eq!(ticket.summary, "");
        assert_eq!(ticket.url, None);
        assert_eq!(ticket.labels, vec!["ok"]);
        assert_eq!(ticket.extra.get("status").map(String::as_str), Some(""));
        assert_eq!(ticket.extra.get("assignee").map(String::as_str), Some(""));
        assert_eq!(ticket.assignee(), None);
    }

    #[test]
    fn normalizes_non_object_to_empty_ticket() {
        let ticket = Ticket::from_tracker_value(&Value::Null);
        assert_eq!(ticket.key, "");
        assert_eq!(ticket.slug(), FALLBACK_SLUG);
    }
}
