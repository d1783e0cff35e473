//! Staged-function entries as declared by packages.
//!
//! Packages contribute named functions (init, shutdown, build hooks) to
//! ordered sequences. An entry is placed either at an explicit integer
//! stage or relative to other entries via before/after edges; the actual
//! ordering is computed by the resolver.

use crate::error::PkgError;
use std::path::Path;
use tern_core::{PkgRef, Value};

/// Placement of a staged entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKey {
    /// Explicit integer stage.
    Number(i64),
    /// Relative placement by entry name.
    Edges {
        /// Entries this one must run after.
        afters: Vec<String>,
        /// Entries this one must run before.
        befores: Vec<String>,
    },
}

/// A staged function contributed by a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    /// Function (or command) name. Must be unique across packages.
    pub name: String,
    /// Contributing package.
    pub pkg: PkgRef,
    /// Placement.
    pub key: StageKey,
}

/// Parse one stage-list mapping entry.
///
/// Accepted shapes: an integer stage, or a mapping with `after` and/or
/// `before` name lists.
pub fn parse_stage_key(
    file: &Path,
    entry_name: &str,
    value: &Value,
) -> Result<StageKey, PkgError> {
    if let Ok(stage) = value.as_int() {
        return Ok(StageKey::Number(stage));
    }

    if let Ok(entries) = value.as_mapping() {
        let mut afters = Vec::new();
        let mut befores = Vec::new();
        let mut recognized = false;
        for (k, v) in entries {
            let names = v
                .as_sequence()
                .ok()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().ok())
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| PkgError::BadStageEntry {
                    file: file.to_path_buf(),
                    entry: entry_name.to_string(),
                })?;
            match k.as_str() {
                "after" => {
                    afters = names;
                    recognized = true;
                }
                "before" => {
                    befores = names;
                    recognized = true;
                }
                _ => {
                    return Err(PkgError::BadStageEntry {
                        file: file.to_path_buf(),
                        entry: entry_name.to_string(),
                    });
                }
            }
        }
        if recognized {
            return Ok(StageKey::Edges { afters, befores });
        }
    }

    Err(PkgError::BadStageEntry {
        file: file.to_path_buf(),
        entry: entry_name.to_string(),
    })
}
