//! Package/syscfg co-resolution.
//!
//! The outer fixed-point loop: flatten the working set's configuration,
//! expand hard dependencies and API suppliers under it, prune orphans and
//! imposters, and re-flatten until neither the package set nor the
//! configuration moves. Conditional dependencies are conditioned on
//! configuration that is itself produced by the closure, which is exactly
//! why the loop must iterate: a package pulled in on round `n` may define
//! a setting that activates another package's guarded dependency on round
//! `n + 1`.
//!
//! Every ordered iteration runs in lexicographic order of canonical
//! package names, so output is stable across runs and platforms.

use crate::error::{Problem, ResolveError};
use crate::resolution::Resolution;
use crate::stage;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tern_core::event::{Event, EventSink, NullSink};
use tern_core::{AbortFlag, PkgRef};
use tern_pkg::{Package, PackageIndex, StageEntry};
use tern_syscfg::SyscfgState;
use tracing::debug;

/// Iteration cap converting runaway loops into a non-convergence error.
const DEFAULT_ITERATION_CAP: u32 = 100;

static NULL_SINK: NullSink = NullSink;

/// The package resolver.
pub struct Resolver<'a> {
    index: &'a PackageIndex,
    events: &'a dyn EventSink,
    abort: AbortFlag,
    iteration_cap: u32,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("packages", &self.index.len())
            .field("iteration_cap", &self.iteration_cap)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    /// Resolver over a package index.
    #[must_use]
    pub fn new(index: &'a PackageIndex) -> Self {
        Self {
            index,
            events: &NULL_SINK,
            abort: AbortFlag::new(),
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    /// Emit progress through `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a dyn EventSink) -> Self {
        self.events = events;
        self
    }

    /// Observe `abort` before each outer-loop iteration.
    #[must_use]
    pub fn with_abort(mut self, abort: AbortFlag) -> Self {
        self.abort = abort;
        self
    }

    /// Override the iteration cap.
    #[must_use]
    pub const fn with_iteration_cap(mut self, cap: u32) -> Self {
        self.iteration_cap = cap;
        self
    }

    /// Resolve the closure of `seeds`.
    pub fn resolve(&self, seeds: &[PkgRef]) -> Result<Resolution, ResolveError> {
        let mut ws: BTreeMap<PkgRef, Arc<Package>> = BTreeMap::new();
        for seed in seeds {
            let pkg = self
                .index
                .get(seed)
                .ok_or_else(|| ResolveError::SeedNotFound { pkg: seed.clone() })?;
            ws.insert(seed.clone(), Arc::clone(pkg));
        }
        // Packages admitted only as API suppliers; candidates for imposter
        // pruning if their supply is supplanted.
        let mut api_added: BTreeMap<PkgRef, String> = BTreeMap::new();

        let mut round = 0u32;
        let sigma = loop {
            if self.abort.is_set() {
                return Err(ResolveError::Aborted);
            }
            round += 1;
            if round > self.iteration_cap {
                return Err(ResolveError::NonConvergence {
                    iterations: self.iteration_cap,
                });
            }

            let sigma = flatten_ws(&ws)?;
            self.events.emit(&Event::ResolveIteration {
                round,
                packages: ws.len(),
            });

            let mut changed = self.expand_hard_deps(&mut ws, &sigma)?;
            changed |= self.expand_api_suppliers(&mut ws, &sigma, &mut api_added)?;
            if changed {
                continue;
            }

            let bindings = compute_bindings(&ws, &sigma)?.0;
            prune_orphans(&mut ws, &sigma, seeds, &bindings)?;
            prune_imposters(&mut ws, &sigma, &api_added, &bindings)?;

            let sigma_after = flatten_ws(&ws)?;
            if sigma_after.values() != sigma.values() {
                debug!(round, "configuration shifted after pruning; iterating");
                continue;
            }
            break sigma_after;
        };

        debug!(rounds = round, packages = ws.len(), "resolver converged");
        self.events.emit(&Event::ResolveConverged {
            packages: ws.len(),
            settings: sigma.len(),
        });

        self.finish(ws, sigma)
    }

    /// Add hard dependencies of working-set packages that resolve in the
    /// index. Unresolvable references are reported after convergence.
    fn expand_hard_deps(
        &self,
        ws: &mut BTreeMap<PkgRef, Arc<Package>>,
        sigma: &SyscfgState,
    ) -> Result<bool, ResolveError> {
        let mut additions: Vec<PkgRef> = Vec::new();
        for pkg in ws.values() {
            for dep in pkg.deps(sigma)? {
                if !ws.contains_key(&dep) && self.index.contains(&dep) {
                    additions.push(dep);
                }
            }
        }
        let changed = !additions.is_empty();
        for dep in additions {
            let pkg = self.index.get(&dep).expect("checked above");
            debug!(pkg = %dep, "hard dependency added");
            ws.insert(dep, Arc::clone(pkg));
        }
        Ok(changed)
    }

    /// For each required API with no supplier in the working set, admit the
    /// best supplier the index knows: highest priority, then lexicographic
    /// name.
    fn expand_api_suppliers(
        &self,
        ws: &mut BTreeMap<PkgRef, Arc<Package>>,
        sigma: &SyscfgState,
        api_added: &mut BTreeMap<PkgRef, String>,
    ) -> Result<bool, ResolveError> {
        let mut required: BTreeSet<String> = BTreeSet::new();
        for pkg in ws.values() {
            required.extend(pkg.req_apis(sigma)?);
        }
        let mut supplied: BTreeSet<String> = BTreeSet::new();
        for pkg in ws.values() {
            supplied.extend(pkg.apis(sigma)?);
        }

        let mut changed = false;
        for api in required.difference(&supplied) {
            let mut best: Option<&Arc<Package>> = None;
            for candidate in self.index.iter() {
                if ws.contains_key(candidate.name()) {
                    continue;
                }
                if !candidate.apis(sigma)?.iter().any(|a| a == api) {
                    continue;
                }
                let better = match best {
                    None => true,
                    // Index iteration is name-ascending, so a later
                    // candidate wins only on strictly higher priority.
                    Some(current) => candidate.priority() > current.priority(),
                };
                if better {
                    best = Some(candidate);
                }
            }
            if let Some(supplier) = best {
                debug!(api = %api, supplier = %supplier.name(), "api supplier admitted");
                ws.insert(supplier.name().clone(), Arc::clone(supplier));
                api_added.insert(supplier.name().clone(), api.clone());
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Turn the converged working set into a `Resolution`, or a report of
    /// every problem found.
    fn finish(
        &self,
        ws: BTreeMap<PkgRef, Arc<Package>>,
        sigma: SyscfgState,
    ) -> Result<Resolution, ResolveError> {
        let mut problems: Vec<Problem> = Vec::new();

        // Unresolvable dependency references under true guards.
        for pkg in ws.values() {
            for dep in pkg.deps(&sigma)? {
                if !self.index.contains(&dep) {
                    problems.push(Problem::MissingDependency {
                        pkg: pkg.name().clone(),
                        dep,
                    });
                }
            }
        }

        let (bindings, mut api_problems) = compute_bindings(&ws, &sigma)?;
        problems.append(&mut api_problems);

        for err in sigma.errors() {
            problems.push(Problem::Config(err.clone()));
        }

        let mut init_entries: Vec<StageEntry> = Vec::new();
        let mut down_entries: Vec<StageEntry> = Vec::new();
        let mut pre_build: Vec<StageEntry> = Vec::new();
        let mut pre_link: Vec<StageEntry> = Vec::new();
        let mut post_link: Vec<StageEntry> = Vec::new();
        for pkg in ws.values() {
            init_entries.extend(pkg.init_entries(&sigma)?);
            down_entries.extend(pkg.down_entries(&sigma)?);
            pre_build.extend(pkg.pre_build_cmds(&sigma)?);
            pre_link.extend(pkg.pre_link_cmds(&sigma)?);
            post_link.extend(pkg.post_link_cmds(&sigma)?);
        }

        let order_or_report = |entries: &[StageEntry], problems: &mut Vec<Problem>| {
            match stage::order(entries) {
                Ok(ordered) => ordered,
                Err(mut errs) => {
                    problems.append(&mut errs);
                    Vec::new()
                }
            }
        };
        let init_order = order_or_report(&init_entries, &mut problems);
        let down_order = order_or_report(&down_entries, &mut problems);
        let pre_build_order = order_or_report(&pre_build, &mut problems);
        let pre_link_order = order_or_report(&pre_link, &mut problems);
        let post_link_order = order_or_report(&post_link, &mut problems);

        if !problems.is_empty() {
            return Err(ResolveError::Report { problems });
        }

        Ok(Resolution {
            pkgs: ws.into_values().collect(),
            syscfg: sigma,
            api_bindings: bindings,
            init_order,
            down_order,
            pre_build_order,
            pre_link_order,
            post_link_order,
        })
    }
}

/// Flatten the working set's configuration.
fn flatten_ws(ws: &BTreeMap<PkgRef, Arc<Package>>) -> Result<SyscfgState, ResolveError> {
    let pkgs: Vec<&Package> = ws.values().map(Arc::as_ref).collect();
    Ok(tern_syscfg::flatten(&pkgs)?)
}

/// Bind each required API to its supplier: the highest-priority supplier
/// in the working set. Zero suppliers or a same-priority tie is a problem.
fn compute_bindings(
    ws: &BTreeMap<PkgRef, Arc<Package>>,
    sigma: &SyscfgState,
) -> Result<(BTreeMap<String, PkgRef>, Vec<Problem>), ResolveError> {
    let mut required: BTreeMap<String, Vec<PkgRef>> = BTreeMap::new();
    for pkg in ws.values() {
        for api in pkg.req_apis(sigma)? {
            required.entry(api).or_default().push(pkg.name().clone());
        }
    }
    let mut supplied: BTreeMap<String, Vec<&Arc<Package>>> = BTreeMap::new();
    for pkg in ws.values() {
        for api in pkg.apis(sigma)? {
            supplied.entry(api).or_default().push(pkg);
        }
    }

    let mut bindings = BTreeMap::new();
    let mut problems = Vec::new();
    for (api, requirers) in required {
        let Some(suppliers) = supplied.get(&api) else {
            problems.push(Problem::ApiUnsatisfied { api, requirers });
            continue;
        };
        let top = suppliers
            .iter()
            .map(|p| p.priority())
            .max()
            .expect("supplier list is never empty");
        let tied: Vec<&&Arc<Package>> = suppliers
            .iter()
            .filter(|p| p.priority() == top)
            .collect();
        if tied.len() > 1 {
            problems.push(Problem::ApiConflict {
                api,
                suppliers: tied.iter().map(|p| p.name().clone()).collect(),
            });
            continue;
        }
        bindings.insert(api, tied[0].name().clone());
    }
    Ok((bindings, problems))
}

/// Remove packages with no path from any seed. Reachability follows hard
/// dependencies plus the API binding of each requirer.
fn prune_orphans(
    ws: &mut BTreeMap<PkgRef, Arc<Package>>,
    sigma: &SyscfgState,
    seeds: &[PkgRef],
    bindings: &BTreeMap<String, PkgRef>,
) -> Result<(), ResolveError> {
    let mut reachable: BTreeSet<PkgRef> = BTreeSet::new();
    let mut queue: VecDeque<PkgRef> = seeds.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        let Some(pkg) = ws.get(&name) else { continue };
        for dep in pkg.deps(sigma)? {
            if ws.contains_key(&dep) && !reachable.contains(&dep) {
                queue.push_back(dep);
            }
        }
        for api in pkg.req_apis(sigma)? {
            if let Some(supplier) = bindings.get(&api) {
                if !reachable.contains(supplier) {
                    queue.push_back(supplier.clone());
                }
            }
        }
    }

    let orphans: Vec<PkgRef> = ws
        .keys()
        .filter(|name| !reachable.contains(*name))
        .cloned()
        .collect();
    for orphan in orphans {
        debug!(pkg = %orphan, "pruning orphan");
        ws.remove(&orphan);
    }
    Ok(())
}

/// Remove packages that were admitted only as API suppliers and have been
/// supplanted by a higher-precedence supplier, provided nothing in the set
/// hard-depends on them.
fn prune_imposters(
    ws: &mut BTreeMap<PkgRef, Arc<Package>>,
    sigma: &SyscfgState,
    api_added: &BTreeMap<PkgRef, String>,
    bindings: &BTreeMap<String, PkgRef>,
) -> Result<(), ResolveError> {
    let mut hard_targets: BTreeSet<PkgRef> = BTreeSet::new();
    for pkg in ws.values() {
        hard_targets.extend(pkg.deps(sigma)?);
    }

    let imposters: Vec<PkgRef> = api_added
        .iter()
        .filter(|&(name, api)| {
            ws.contains_key(name)
                && bindings.get(api.as_str()) != Some(name)
                && !hard_targets.contains(name)
        })
        .map(|(name, _)| name.clone())
        .collect();

    for imposter in imposters {
        debug!(pkg = %imposter, "pruning imposter");
        ws.remove(&imposter);
    }
    Ok(())
}
