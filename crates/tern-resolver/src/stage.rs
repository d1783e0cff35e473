//! Staged-function ordering.
//!
//! Orders the init, shutdown, and custom-command entries contributed by a
//! resolved package set. Entries with explicit integer stages sort by
//! `(stage, name)` and every entry at one stage precedes every entry at
//! the next; entries keyed by before/after edges are placed topologically
//! against them. The same primitive serves all three sequences.

use crate::error::Problem;
use std::collections::BTreeMap;
use tern_pkg::{StageEntry, StageKey};

/// Sort key used to break ties deterministically: numbered entries by
/// stage, then name; edge-keyed entries after, by name.
fn tiebreak(entry: &StageEntry) -> (u8, i64, &str) {
    match &entry.key {
        StageKey::Number(stage) => (0, *stage, entry.name.as_str()),
        StageKey::Edges { .. } => (1, 0, entry.name.as_str()),
    }
}

/// Order `entries` into a single linear sequence.
///
/// Fails with every independent problem found: duplicate names, references
/// to unknown entries, and constraint cycles.
pub fn order(entries: &[StageEntry]) -> Result<Vec<StageEntry>, Vec<Problem>> {
    let mut problems = Vec::new();

    // Duplicate names across packages are fatal; the sequence is consumed
    // by code emitters where names become symbols.
    let mut by_name: BTreeMap<&str, &StageEntry> = BTreeMap::new();
    for entry in entries {
        if let Some(first) = by_name.get(entry.name.as_str()) {
            problems.push(Problem::StageNameConflict {
                name: entry.name.clone(),
                first: first.pkg.clone(),
                second: entry.pkg.clone(),
            });
        } else {
            by_name.insert(&entry.name, entry);
        }
    }
    if !problems.is_empty() {
        return Err(problems);
    }

    let index_of: BTreeMap<&str, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.as_str(), i))
        .collect();

    // adjacency[i] holds successors of i; indegree counts incoming edges.
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut indegree: Vec<usize> = vec![0; entries.len()];
    let add_edge = |successors: &mut Vec<Vec<usize>>, indegree: &mut Vec<usize>, from: usize, to: usize| {
        if !successors[from].contains(&to) {
            successors[from].push(to);
            indegree[to] += 1;
        }
    };

    // Implicit edges: every entry of a stage precedes every entry of the
    // next stage present.
    let mut stages: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if let StageKey::Number(stage) = entry.key {
            stages.entry(stage).or_default().push(i);
        }
    }
    let stage_groups: Vec<&Vec<usize>> = stages.values().collect();
    for pair in stage_groups.windows(2) {
        for &from in pair[0] {
            for &to in pair[1] {
                add_edge(&mut successors, &mut indegree, from, to);
            }
        }
    }

    // Explicit before/after edges.
    for (i, entry) in entries.iter().enumerate() {
        let StageKey::Edges { afters, befores } = &entry.key else {
            continue;
        };
        for name in afters {
            match index_of.get(name.as_str()) {
                Some(&j) => add_edge(&mut successors, &mut indegree, j, i),
                None => problems.push(Problem::UnknownStageDependency {
                    entry: entry.name.clone(),
                    reference: name.clone(),
                }),
            }
        }
        for name in befores {
            match index_of.get(name.as_str()) {
                Some(&j) => add_edge(&mut successors, &mut indegree, i, j),
                None => problems.push(Problem::UnknownStageDependency {
                    entry: entry.name.clone(),
                    reference: name.clone(),
                }),
            }
        }
    }
    if !problems.is_empty() {
        return Err(problems);
    }

    // Kahn's algorithm with a deterministically ordered ready set.
    let mut ready: Vec<usize> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(i, _)| i)
        .collect();
    let mut ordered = Vec::with_capacity(entries.len());

    while !ready.is_empty() {
        ready.sort_by(|&a, &b| tiebreak(&entries[a]).cmp(&tiebreak(&entries[b])));
        let next = ready.remove(0);
        ordered.push(entries[next].clone());
        for &succ in &successors[next] {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                ready.push(succ);
            }
        }
    }

    if ordered.len() != entries.len() {
        let cycle: Vec<String> = entries
            .iter()
            .enumerate()
            .filter(|(i, _)| indegree[*i] > 0)
            .map(|(_, e)| e.name.clone())
            .collect();
        return Err(vec![Problem::CircularStageDependency { cycle }]);
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tern_core::PkgRef;

    fn numbered(name: &str, stage: i64) -> StageEntry {
        StageEntry {
            name: name.to_string(),
            pkg: PkgRef::new("core", name),
            key: StageKey::Number(stage),
        }
    }

    fn edged(name: &str, afters: &[&str], befores: &[&str]) -> StageEntry {
        StageEntry {
            name: name.to_string(),
            pkg: PkgRef::new("core", name),
            key: StageKey::Edges {
                afters: afters.iter().map(ToString::to_string).collect(),
                befores: befores.iter().map(ToString::to_string).collect(),
            },
        }
    }

    fn names(entries: &[StageEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn numbered_entries_sort_by_stage_then_name() {
        let ordered = order(&[
            numbered("b", 200),
            numbered("a", 200),
            numbered("z", 100),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["z", "a", "b"]);
    }

    #[test]
    fn before_edge_places_entry_ahead_of_target() {
        // x at 200, y at 100, z before x: expected y, z, x.
        let ordered = order(&[
            numbered("x", 200),
            numbered("y", 100),
            edged("z", &[], &["x"]),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["y", "z", "x"]);
    }

    #[test]
    fn after_edge_places_entry_behind_target() {
        let ordered = order(&[
            numbered("first", 10),
            edged("second", &["first"], &[]),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["first", "second"]);
    }

    #[test]
    fn chained_edges() {
        let ordered = order(&[
            edged("c", &["b"], &[]),
            edged("b", &["a"], &[]),
            numbered("a", 50),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_names_are_fatal() {
        let errs = order(&[numbered("dup", 1), numbered("dup", 2)]).unwrap_err();
        assert!(matches!(errs[0], Problem::StageNameConflict { .. }));
    }

    #[test]
    fn unknown_reference_is_fatal() {
        let errs = order(&[edged("a", &["ghost"], &[])]).unwrap_err();
        assert!(
            matches!(&errs[0], Problem::UnknownStageDependency { reference, .. } if reference == "ghost")
        );
    }

    #[test]
    fn cycle_is_fatal_and_names_members() {
        let errs = order(&[
            edged("a", &["b"], &[]),
            edged("b", &["a"], &[]),
        ])
        .unwrap_err();
        let [Problem::CircularStageDependency { cycle }] = errs.as_slice() else {
            panic!("expected a cycle problem");
        };
        assert_eq!(cycle, &vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn implicit_stage_edges_respect_all_relations() {
        // Two entries at 100, one at 200; both early entries precede it.
        let ordered = order(&[
            numbered("late", 200),
            numbered("early_b", 100),
            numbered("early_a", 100),
        ])
        .unwrap();
        assert_eq!(names(&ordered), vec!["early_a", "early_b", "late"]);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(order(&[]).unwrap().is_empty());
    }
}
