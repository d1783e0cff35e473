//! The result of a successful resolution.

use std::collections::BTreeMap;
use std::sync::Arc;
use tern_core::PkgRef;
use tern_pkg::{Package, StageEntry};
use tern_syscfg::SyscfgState;

/// A converged package set with its flattened configuration and the
/// orderings derived from it. Built per command and discarded afterwards.
#[derive(Debug)]
pub struct Resolution {
    /// Resolved packages, in canonical order.
    pub pkgs: Vec<Arc<Package>>,
    /// The flattened configuration.
    pub syscfg: SyscfgState,
    /// Which package supplies each required API.
    pub api_bindings: BTreeMap<String, PkgRef>,
    /// Ordered init-function sequence.
    pub init_order: Vec<StageEntry>,
    /// Ordered shutdown sequence.
    pub down_order: Vec<StageEntry>,
    /// Ordered pre-build commands.
    pub pre_build_order: Vec<StageEntry>,
    /// Ordered pre-link commands.
    pub pre_link_order: Vec<StageEntry>,
    /// Ordered post-link commands.
    pub post_link_order: Vec<StageEntry>,
}

impl Resolution {
    /// Number of resolved packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pkgs.len()
    }

    /// Is the resolution empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pkgs.is_empty()
    }

    /// Is `name` part of the resolution?
    #[must_use]
    pub fn contains(&self, name: &PkgRef) -> bool {
        self.pkgs.iter().any(|p| p.name() == name)
    }

    /// Get a resolved package by reference.
    #[must_use]
    pub fn get(&self, name: &PkgRef) -> Option<&Arc<Package>> {
        self.pkgs.iter().find(|p| p.name() == name)
    }
}
