//! Conditional configuration tree.
//!
//! Every descriptor file Tern ingests (`pkg.yml`, `syscfg.yml`,
//! `target.yml`, ...) lands in a [`Cct`]: a container of leaves keyed by a
//! base path, where each leaf may be guarded by conditional expressions
//! inherited from its source key (`pkg.deps.BLE_HOST: [...]`). Merging is
//! additive; the same base path from two files produces sibling leaves, each
//! keeping its guard set and file provenance.
//!
//! Lookups evaluate guards against a caller-supplied environment and return
//! every leaf whose guards all hold. Callers that need a single value apply
//! one of the documented reducers: [`Cct::scalar`] (last-inserted truthy
//! sibling), [`Cct::sequence`] (ordered concatenation), or [`Cct::mapping`]
//! (key-wise merge, later files win). Guard ASTs are parsed once at
//! ingestion — parsing does not depend on the environment — while guard
//! *evaluation* happens on every lookup, so a mutating environment is
//! always honored.

pub mod error;
pub mod key;

pub use error::CctError;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::path::{Path, PathBuf};
use tern_core::Value;
use tern_expr::{Env, Evaluator, Expr, ExprError};

/// Shared cache of parsed guard ASTs, keyed by guard text. Parsing does
/// not depend on the evaluation environment, so entries never invalidate;
/// the cache is cleared wholesale if it grows past bound.
static GUARD_AST_CACHE: Lazy<RwLock<AHashMap<String, Expr>>> =
    Lazy::new(|| RwLock::new(AHashMap::with_capacity(256)));

/// Cache bound before wholesale eviction.
const MAX_GUARD_CACHE: usize = 4096;

fn parse_guard(text: &str) -> Result<Expr, ExprError> {
    if let Some(expr) = GUARD_AST_CACHE.read().get(text) {
        return Ok(expr.clone());
    }
    let expr = tern_expr::parse(text)?;
    let mut cache = GUARD_AST_CACHE.write();
    if cache.len() >= MAX_GUARD_CACHE {
        cache.clear();
    }
    cache.insert(text.to_string(), expr.clone());
    Ok(expr)
}

/// Where a leaf came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Source file.
    pub file: PathBuf,
    /// Global insertion sequence number; later files load later.
    pub seq: u64,
}

/// A guard expression attached to a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    /// Raw source text of the guard segment.
    pub text: String,
    expr: Expr,
}

impl Guard {
    /// Evaluate the guard against an environment.
    fn holds(&self, env: &dyn Env) -> Result<bool, tern_expr::ExprError> {
        Ok(Evaluator::new(env).eval(&self.expr)?.is_truthy())
    }
}

/// One ingested key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    base: Vec<String>,
    guards: SmallVec<[Guard; 2]>,
    value: Value,
    origin: Origin,
}

impl Leaf {
    /// Base path, dot-joined.
    #[must_use]
    pub fn base_key(&self) -> String {
        self.base.join(".")
    }

    /// The leaf's value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Guard segments, raw text.
    pub fn guard_texts(&self) -> impl Iterator<Item = &str> {
        self.guards.iter().map(|g| g.text.as_str())
    }

    /// Provenance.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Full key as it appeared in the source file.
    #[must_use]
    pub fn full_key(&self) -> String {
        let mut key = self.base.join(".");
        for guard in &self.guards {
            key.push('.');
            key.push_str(&guard.text);
        }
        key
    }

    /// Do all guards hold under `env`?
    fn selected(&self, env: &dyn Env) -> Result<bool, CctError> {
        for guard in &self.guards {
            let holds = guard.holds(env).map_err(|source| CctError::GuardEval {
                key: self.full_key(),
                guard: guard.text.clone(),
                source,
            })?;
            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Warn about identifiers the environment does not define. Only called
    /// for siblings that were not selected; an undefined identifier there is
    /// commonly a typo.
    fn warn_unknown_identifiers(&self, env: &dyn Env) {
        for guard in &self.guards {
            for ident in guard.expr.identifiers() {
                if env.lookup(ident).is_none() {
                    tracing::warn!(
                        key = %self.full_key(),
                        identifier = ident,
                        file = %self.origin.file.display(),
                        "guard references unknown configuration identifier"
                    );
                }
            }
        }
    }
}

/// The conditional configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cct {
    leaves: Vec<Leaf>,
    next_seq: u64,
}

impl Cct {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document and merge it. The document root must be a
    /// mapping; keys are decomposed into base path and guards.
    pub fn merge_yaml_str(&mut self, file: impl AsRef<Path>, text: &str) -> Result<(), CctError> {
        let file = file.as_ref();
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| CctError::Yaml {
                file: file.to_path_buf(),
                reason: e.to_string(),
            })?;
        let doc = Value::from_yaml(parsed).map_err(|source| CctError::BadValue {
            file: file.to_path_buf(),
            key: String::new(),
            source,
        })?;
        self.merge_value(file, &doc)
    }

    /// Merge an already-converted document. Merging is additive: existing
    /// leaves are never replaced, so provenance and guard sets survive.
    pub fn merge_value(&mut self, file: impl AsRef<Path>, doc: &Value) -> Result<(), CctError> {
        let file = file.as_ref();
        if doc.is_empty_scalar() {
            return Ok(());
        }
        let entries = doc.as_mapping().map_err(|_| CctError::NotAMapping {
            file: file.to_path_buf(),
        })?;

        for (raw_key, value) in entries {
            let split = key::decompose(raw_key).map_err(|segment| CctError::BaseAfterGuard {
                file: file.to_path_buf(),
                key: raw_key.clone(),
                segment,
            })?;

            let mut guards = SmallVec::new();
            for text in split.guards {
                let expr = parse_guard(&text).map_err(|source| CctError::MalformedGuard {
                    file: file.to_path_buf(),
                    key: raw_key.clone(),
                    source,
                })?;
                guards.push(Guard { text, expr });
            }

            self.leaves.push(Leaf {
                base: split.base,
                guards,
                value: value.clone(),
                origin: Origin {
                    file: file.to_path_buf(),
                    seq: self.next_seq,
                },
            });
            self.next_seq += 1;
        }

        Ok(())
    }

    /// All leaves, in insertion order.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.leaves.iter()
    }

    /// All distinct base keys, sorted.
    #[must_use]
    pub fn base_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.leaves.iter().map(Leaf::base_key).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Does any leaf (guarded or not) live at `base`?
    #[must_use]
    pub fn has_base(&self, base: &str) -> bool {
        let base = key::split_segments(base);
        self.leaves.iter().any(|l| l.base == base)
    }

    /// Every leaf at `base` whose guards all hold under `env`, in insertion
    /// order. Unselected siblings that reference unknown identifiers are
    /// logged as warnings, not errors.
    pub fn lookup(&self, base: &str, env: &dyn Env) -> Result<Vec<&Leaf>, CctError> {
        let base = key::split_segments(base);
        let mut selected = Vec::new();
        for leaf in self.leaves.iter().filter(|l| l.base == base) {
            if leaf.selected(env)? {
                selected.push(leaf);
            } else {
                leaf.warn_unknown_identifiers(env);
            }
        }
        Ok(selected)
    }

    /// Scalar reducer: the last-inserted selected sibling's value. Stable
    /// across runs because file load order is deterministic.
    pub fn scalar(&self, base: &str, env: &dyn Env) -> Result<Option<Value>, CctError> {
        Ok(self.lookup(base, env)?.last().map(|l| l.value.clone()))
    }

    /// Sequence reducer: ordered concatenation of every selected sibling's
    /// items.
    pub fn sequence(&self, base: &str, env: &dyn Env) -> Result<Vec<Value>, CctError> {
        let mut items = Vec::new();
        for leaf in self.lookup(base, env)? {
            let mut leaf_items =
                leaf.value
                    .as_sequence()
                    .map_err(|source| CctError::BadValue {
                        file: leaf.origin.file.clone(),
                        key: leaf.full_key(),
                        source,
                    })?;
            items.append(&mut leaf_items);
        }
        Ok(items)
    }

    /// Mapping reducer: key-wise merge of every selected sibling, later
    /// insertions overriding earlier ones. First-seen key order is kept.
    pub fn mapping(&self, base: &str, env: &dyn Env) -> Result<Vec<(String, Value)>, CctError> {
        let mut merged: Vec<(String, Value)> = Vec::new();
        for leaf in self.lookup(base, env)? {
            let entries = leaf.value.as_mapping().map_err(|source| CctError::BadValue {
                file: leaf.origin.file.clone(),
                key: leaf.full_key(),
                source,
            })?;
            for (k, v) in entries {
                match merged.iter_mut().find(|(existing, _)| existing == k) {
                    Some((_, slot)) => *slot = v.clone(),
                    None => merged.push((k.clone(), v.clone())),
                }
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tern_expr::EvalValue;

    struct MapEnv(HashMap<&'static str, i64>);

    impl Env for MapEnv {
        fn lookup(&self, name: &str) -> Option<EvalValue> {
            self.0.get(name).map(|v| EvalValue::Int(*v))
        }
    }

    fn env(pairs: &[(&'static str, i64)]) -> MapEnv {
        MapEnv(pairs.iter().copied().collect())
    }

    fn tree(docs: &[(&str, &str)]) -> Cct {
        let mut cct = Cct::new();
        for (file, text) in docs {
            cct.merge_yaml_str(file, text).unwrap();
        }
        cct
    }

    #[test]
    fn unguarded_lookup() {
        let cct = tree(&[("pkg.yml", "pkg.name: sys/log\npkg.deps: [a, b]\n")]);
        let leaves = cct.lookup("pkg.deps", &env(&[])).unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(
            cct.scalar("pkg.name", &env(&[])).unwrap(),
            Some(Value::Str("sys/log".to_string()))
        );
    }

    #[test]
    fn guard_selects_by_environment() {
        let cct = tree(&[(
            "pkg.yml",
            "pkg.deps: [base]\npkg.deps.BLE_HOST: [ble_extra]\n",
        )]);

        let off = cct.sequence("pkg.deps", &env(&[])).unwrap();
        assert_eq!(off, vec![Value::Str("base".to_string())]);

        let on = cct
            .sequence("pkg.deps", &env(&[("BLE_HOST", 1)]))
            .unwrap();
        assert_eq!(
            on,
            vec![
                Value::Str("base".to_string()),
                Value::Str("ble_extra".to_string())
            ]
        );
    }

    #[test]
    fn parenthesized_guard() {
        let cct = tree(&[(
            "pkg.yml",
            "pkg.cflags.(LOG_LEVEL > 1): [-DVERBOSE]\n",
        )]);
        assert!(
            cct.sequence("pkg.cflags", &env(&[("LOG_LEVEL", 1)]))
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            cct.sequence("pkg.cflags", &env(&[("LOG_LEVEL", 2)]))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn merge_keeps_sibling_provenance() {
        let cct = tree(&[
            ("a/syscfg.yml", "syscfg.vals: {X: 1}\n"),
            ("b/syscfg.yml", "syscfg.vals: {X: 2, Y: 3}\n"),
        ]);
        let leaves = cct.lookup("syscfg.vals", &env(&[])).unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].origin().file, PathBuf::from("a/syscfg.yml"));
        assert_eq!(leaves[1].origin().seq, 1);
    }

    #[test]
    fn scalar_reducer_takes_last_inserted() {
        let cct = tree(&[
            ("a.yml", "pkg.linkerscript: first.ld\n"),
            ("b.yml", "pkg.linkerscript: second.ld\n"),
        ]);
        assert_eq!(
            cct.scalar("pkg.linkerscript", &env(&[])).unwrap(),
            Some(Value::Str("second.ld".to_string()))
        );
    }

    #[test]
    fn mapping_reducer_later_file_overrides() {
        let cct = tree(&[
            ("a.yml", "syscfg.vals: {X: 1, Y: 1}\n"),
            ("b.yml", "syscfg.vals: {Y: 2}\n"),
        ]);
        let merged = cct.mapping("syscfg.vals", &env(&[])).unwrap();
        assert_eq!(
            merged,
            vec![
                ("X".to_string(), Value::Int(1)),
                ("Y".to_string(), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn malformed_guard_names_file_key_and_position() {
        let mut cct = Cct::new();
        let err = cct
            .merge_yaml_str("bad/syscfg.yml", "syscfg.vals.(A > ): {X: 1}\n")
            .unwrap_err();
        match err {
            CctError::MalformedGuard { file, key, source } => {
                assert_eq!(file, PathBuf::from("bad/syscfg.yml"));
                assert_eq!(key, "syscfg.vals.(A > )");
                assert!(matches!(source, tern_expr::ExprError::Parse { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn base_after_guard_is_rejected() {
        let mut cct = Cct::new();
        let err = cct
            .merge_yaml_str("pkg.yml", "pkg.BLE_HOST.deps: [x]\n")
            .unwrap_err();
        assert!(matches!(err, CctError::BaseAfterGuard { .. }));
    }

    #[test]
    fn guard_eval_error_is_reported() {
        let cct = tree(&[("pkg.yml", "pkg.deps.(1 / ZERO): [x]\n")]);
        let err = cct.lookup("pkg.deps", &env(&[("ZERO", 0)])).unwrap_err();
        assert!(matches!(err, CctError::GuardEval { .. }));
    }

    #[test]
    fn late_binding_sees_environment_changes() {
        let cct = tree(&[("pkg.yml", "pkg.deps.FEATURE: [extra]\n")]);
        assert!(cct.sequence("pkg.deps", &env(&[])).unwrap().is_empty());
        // Same tree, new environment: the guard re-evaluates.
        assert_eq!(
            cct.sequence("pkg.deps", &env(&[("FEATURE", 1)]))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn enumeration_is_sorted_and_deduped() {
        let cct = tree(&[(
            "pkg.yml",
            "pkg.deps: [a]\npkg.name: x\npkg.deps.F: [b]\n",
        )]);
        assert_eq!(cct.base_keys(), vec!["pkg.deps", "pkg.name"]);
    }
}
