//! Tool-compatibility tables.
//!
//! Repositories (and projects) may declare which tern versions they work
//! with: a mapping from version requirement to severity. The first entry
//! matching the running tool's version decides.

use tern_core::{Value, Version, VersionReq};

/// How compatible a repository is with the running tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompatSeverity {
    /// Fully supported.
    #[default]
    Good,
    /// Works, with a warning.
    Warn,
    /// Known broken; refuse to proceed.
    Error,
}

impl CompatSeverity {
    /// Parse the descriptor spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(Self::Good),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One compatibility rule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CompatEntry {
    reqs: Vec<VersionReq>,
    severity: CompatSeverity,
}

/// An ordered compatibility table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatTable {
    entries: Vec<CompatEntry>,
}

impl CompatTable {
    /// An empty (always-good) table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a descriptor mapping of requirement string to severity.
    /// Unparseable entries are skipped with a warning so one bad line does
    /// not take the whole repository down.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let mut entries = Vec::new();
        let Ok(pairs) = value.as_mapping() else {
            tracing::warn!("compatibility table is not a mapping; ignoring");
            return Self::new();
        };
        for (req_text, severity_value) in pairs {
            let Ok(reqs) = VersionReq::parse_list(req_text) else {
                tracing::warn!(requirement = %req_text, "skipping unparseable compatibility entry");
                continue;
            };
            let severity = severity_value
                .as_str()
                .ok()
                .and_then(|s| CompatSeverity::parse(&s));
            let Some(severity) = severity else {
                tracing::warn!(requirement = %req_text, "skipping compatibility entry with unknown severity");
                continue;
            };
            entries.push(CompatEntry { reqs, severity });
        }
        Self { entries }
    }

    /// Severity for the running tool. An empty table is always good; a
    /// populated table with no matching entry warns.
    #[must_use]
    pub fn check(&self, tool: &Version) -> CompatSeverity {
        if self.entries.is_empty() {
            return CompatSeverity::Good;
        }
        for entry in &self.entries {
            if entry.reqs.iter().all(|req| req.matches(tool)) {
                return entry.severity;
            }
        }
        CompatSeverity::Warn
    }

    /// Is the table empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
