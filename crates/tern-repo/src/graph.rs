//! Repository dependency graph and version solver.
//!
//! Nodes are `<repo, version>` pairs plus a synthetic `project` root whose
//! out-edges encode the project file's top-level requirements. Dependency
//! edges connect a version to every version of a required repository that
//! satisfies the declared requirement set. A repository pinned to a raw
//! commit contributes no outgoing edges: commit pins override inter-repo
//! dependency propagation.
//!
//! Solving walks the graph breadth-first from the root, carrying a working
//! map of `repo → <version, priority>`. Commit pins enter at high priority
//! and are never displaced; everything else enters at low priority, and a
//! disagreement between two low-priority requirements is recorded as a
//! conflict with witness chains for both sides. All independent failures
//! from one pass are reported together.

use crate::error::{MissingVersion, RepoError, RepoVersionConflict, SolveReport};
use crate::repository::Repository;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, VecDeque};
use tern_core::{Version, VersionReq};

/// A node in the repository graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphNode {
    /// The synthetic root for the project's own requirements.
    Project,
    /// One version of one repository.
    Repo {
        /// Repository name.
        name: String,
        /// The version this node stands for.
        version: Version,
    },
}

impl std::fmt::Display for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Repo { name, version } => write!(f, "{name} {version}"),
        }
    }
}

/// Requirement priority in the working map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Priority {
    /// From a version range; may lose to a disagreeing high entry.
    Low,
    /// From a commit pin; never displaced.
    High,
}

/// A selection in the working map, with the chain that produced it.
#[derive(Debug, Clone)]
struct Selection {
    version: Version,
    priority: Priority,
    origin: String,
}

/// The solved version map, root excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Selected version per repository.
    pub versions: BTreeMap<String, Version>,
}

/// The repository dependency graph.
#[derive(Debug)]
pub struct RepoGraph {
    graph: DiGraph<GraphNode, Vec<VersionReq>>,
    indices: BTreeMap<GraphNode, NodeIndex>,
    /// Requirement sets that matched no version, per source node.
    unsatisfied: BTreeMap<GraphNode, Vec<(String, Vec<VersionReq>)>>,
    /// Root requirements, kept for the post-solve prune.
    root_reqs: BTreeMap<String, Vec<VersionReq>>,
}

impl RepoGraph {
    /// Build the graph from repository metadata and the project's root
    /// requirement sets.
    #[must_use]
    pub fn build(
        repos: &BTreeMap<String, Repository>,
        root_reqs: &BTreeMap<String, Vec<VersionReq>>,
    ) -> Self {
        let mut this = Self {
            graph: DiGraph::new(),
            indices: BTreeMap::new(),
            unsatisfied: BTreeMap::new(),
            root_reqs: root_reqs.clone(),
        };

        let project = this.intern(GraphNode::Project);

        // One node per table version of every known repository.
        for (name, repo) in repos {
            for version in repo.versions().keys() {
                this.intern(GraphNode::Repo {
                    name: name.clone(),
                    version: version.clone(),
                });
            }
        }

        // Root edges. A commit pin becomes a dedicated node with no
        // out-edges; ranges fan out to every satisfying version.
        for (name, reqs) in root_reqs {
            if let Some(pin) = reqs.iter().find(|r| r.version().is_commit_pin()) {
                let node = this.intern(GraphNode::Repo {
                    name: name.clone(),
                    version: pin.version().clone(),
                });
                this.graph.add_edge(project, node, reqs.clone());
                continue;
            }

            let matches = match repos.get(name) {
                Some(repo) => matching_versions(repo, reqs),
                None => Vec::new(),
            };
            if matches.is_empty() {
                this.unsatisfied
                    .entry(GraphNode::Project)
                    .or_default()
                    .push((name.clone(), reqs.clone()));
                continue;
            }
            for version in matches {
                let node = this.intern(GraphNode::Repo {
                    name: name.clone(),
                    version,
                });
                this.graph.add_edge(project, node, reqs.clone());
            }
        }

        // Dependency edges, from each table version's commit deps.
        for (name, repo) in repos {
            for (version, commit) in repo.versions() {
                let source_key = GraphNode::Repo {
                    name: name.clone(),
                    version: version.clone(),
                };
                let source = this.indices[&source_key];
                for dep in repo.deps_for_commit(commit) {
                    let matches = match repos.get(&dep.name) {
                        Some(dep_repo) => matching_versions(dep_repo, &dep.reqs),
                        None => Vec::new(),
                    };
                    if matches.is_empty() {
                        this.unsatisfied
                            .entry(source_key.clone())
                            .or_default()
                            .push((dep.name.clone(), dep.reqs.clone()));
                        continue;
                    }
                    for dep_version in matches {
                        let target = this.intern(GraphNode::Repo {
                            name: dep.name.clone(),
                            version: dep_version,
                        });
                        this.graph.add_edge(source, target, dep.reqs.clone());
                    }
                }
            }
        }

        this
    }

    fn intern(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(idx) = self.indices.get(&node) {
            return *idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.indices.insert(node, idx);
        idx
    }

    /// Number of `<repo, version>` nodes (root excluded).
    #[must_use]
    pub fn version_node_count(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    /// Number of requirement edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Out-edges of a node, grouped by target repository and sorted by
    /// `(repo name, version descending)`.
    fn successors(&self, node: &GraphNode) -> Vec<(String, Vec<Version>, Vec<VersionReq>)> {
        let Some(&idx) = self.indices.get(node) else {
            return Vec::new();
        };
        let mut grouped: BTreeMap<String, (Vec<Version>, Vec<VersionReq>)> = BTreeMap::new();
        for edge in self.graph.edges(idx) {
            let GraphNode::Repo { name, version } = &self.graph[edge.target()] else {
                continue;
            };
            let entry = grouped.entry(name.clone()).or_default();
            entry.0.push(version.clone());
            entry.1 = edge.weight().clone();
        }
        grouped
            .into_iter()
            .map(|(name, (mut versions, reqs))| {
                versions.sort_by(|a, b| b.cmp(a));
                (name, versions, reqs)
            })
            .collect()
    }

    /// Solve for one version per repository.
    pub fn solve(&self) -> Result<Solution, RepoError> {
        let mut report = SolveReport::default();
        let mut ws: BTreeMap<String, Selection> = BTreeMap::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        // Requirements the root itself could not satisfy.
        if let Some(problems) = self.unsatisfied.get(&GraphNode::Project) {
            for (repo, reqs) in problems {
                report.missing.push(MissingVersion {
                    repo: repo.clone(),
                    reqs: reqs.clone(),
                    required_by: "project".to_string(),
                });
            }
        }

        // Seed the working map from the root's out-edges.
        for (name, versions, reqs) in self.successors(&GraphNode::Project) {
            let pinned = versions.iter().any(Version::is_commit_pin);
            let chosen = versions[0].clone();
            let origin = format!("project requires {name} [{}]", render_reqs(&reqs));
            let priority = if pinned { Priority::High } else { Priority::Low };
            insert_requirement(
                &mut ws,
                &mut queue,
                &mut report,
                &name,
                chosen,
                priority,
                origin,
            );
        }

        // Breadth-first walk; each <repo, version> pair is expanded once.
        let mut expanded: std::collections::BTreeSet<(String, Version)> =
            std::collections::BTreeSet::new();
        while let Some(name) = queue.pop_front() {
            let Some(selection) = ws.get(&name).cloned() else {
                continue;
            };
            if !expanded.insert((name.clone(), selection.version.clone())) {
                continue;
            }
            let node = GraphNode::Repo {
                name: name.clone(),
                version: selection.version.clone(),
            };

            if let Some(problems) = self.unsatisfied.get(&node) {
                for (repo, reqs) in problems {
                    report.missing.push(MissingVersion {
                        repo: repo.clone(),
                        reqs: reqs.clone(),
                        required_by: node.to_string(),
                    });
                }
            }

            for (dep, versions, reqs) in self.successors(&node) {
                // Tie-break: highest concrete version satisfying the set.
                let chosen = versions[0].clone();
                let origin = format!(
                    "{} requires {dep} [{}]",
                    node,
                    render_reqs(&reqs)
                );
                insert_requirement(
                    &mut ws,
                    &mut queue,
                    &mut report,
                    &dep,
                    chosen,
                    Priority::Low,
                    origin,
                );
            }
        }

        // Prune: a selection the project file forbids is a conflict, unless
        // it entered as a commit pin.
        for (name, reqs) in &self.root_reqs {
            let Some(selection) = ws.get(name) else {
                continue;
            };
            if selection.priority == Priority::High {
                continue;
            }
            if !reqs.iter().all(|req| req.matches(&selection.version)) {
                report.conflicts.push(RepoVersionConflict {
                    repo: name.clone(),
                    existing: selection.version.clone(),
                    proposed: selection.version.clone(),
                    witnesses: vec![
                        selection.origin.clone(),
                        format!("project requires {name} [{}]", render_reqs(reqs)),
                    ],
                });
            }
        }

        if report.is_failure() {
            return Err(RepoError::SolveFailed { report });
        }

        Ok(Solution {
            versions: ws
                .into_iter()
                .map(|(name, sel)| (name, sel.version))
                .collect(),
        })
    }
}

/// Apply one requirement to the working map, per the priority rules.
fn insert_requirement(
    ws: &mut BTreeMap<String, Selection>,
    queue: &mut VecDeque<String>,
    report: &mut SolveReport,
    repo: &str,
    version: Version,
    priority: Priority,
    origin: String,
) {
    match ws.get(repo) {
        None => {
            ws.insert(
                repo.to_string(),
                Selection {
                    version,
                    priority,
                    origin,
                },
            );
            queue.push_back(repo.to_string());
        }
        Some(existing) if existing.version == version => {}
        Some(existing) if existing.priority == Priority::High => {
            tracing::debug!(
                repo,
                pinned = %existing.version,
                ignored = %version,
                "commit pin overrides requirement"
            );
        }
        Some(existing) if priority == Priority::High => {
            let replaced = existing.version.clone();
            ws.insert(
                repo.to_string(),
                Selection {
                    version,
                    priority,
                    origin,
                },
            );
            tracing::debug!(repo, %replaced, "high-priority requirement replaces selection");
            queue.push_back(repo.to_string());
        }
        Some(existing) => {
            report.conflicts.push(RepoVersionConflict {
                repo: repo.to_string(),
                existing: existing.version.clone(),
                proposed: version,
                witnesses: vec![existing.origin.clone(), origin],
            });
        }
    }
}

/// Table versions of `repo` satisfying every requirement in `reqs`.
fn matching_versions(repo: &Repository, reqs: &[VersionReq]) -> Vec<Version> {
    repo.versions()
        .keys()
        .filter(|v| reqs.iter().all(|req| req.matches(v)))
        .cloned()
        .collect()
}

fn render_reqs(reqs: &[VersionReq]) -> String {
    reqs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
