//! System configuration engine.
//!
//! Flattens the syscfg contributions of a package set into a single
//! setting table. Definitions are registered first (at most one defining
//! package per setting); overrides are then applied in ascending package
//! priority, ties broken by canonical package name, so that a target's
//! values beat an app's, an app's beat a bsp's, and so on down the
//! priority table. Finally every int/bool setting is evaluated to a
//! concrete value.
//!
//! Configuration errors accumulate in the state rather than aborting the
//! flatten; the resolver reports them all at once after convergence.

pub mod error;
pub mod setting;

pub use error::SyscfgError;
pub use setting::{Override, Setting, SettingType};

use std::collections::BTreeMap;
use tern_expr::{Env, EvalValue, Evaluator};
use tern_pkg::{Package, PkgError};

/// The flattened configuration of a package set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyscfgState {
    settings: BTreeMap<String, Setting>,
    errors: Vec<SyscfgError>,
}

impl SyscfgState {
    /// An empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a setting by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.get(name)
    }

    /// All settings in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.values()
    }

    /// Number of settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Is the state empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Configuration errors accumulated during flattening.
    #[must_use]
    pub fn errors(&self) -> &[SyscfgError] {
        &self.errors
    }

    /// Did flattening record any configuration error?
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Name-to-value snapshot; equality of snapshots is how the resolver
    /// detects that another iteration changed nothing.
    #[must_use]
    pub fn values(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .map(|(name, s)| (name.clone(), s.value.clone()))
            .collect()
    }

    /// Frozen copy of the current values, usable as an evaluation
    /// environment while this state keeps mutating.
    #[must_use]
    pub fn snapshot(&self) -> SyscfgSnapshot {
        SyscfgSnapshot {
            values: self
                .settings
                .iter()
                .map(|(name, s)| (name.clone(), s.eval_value()))
                .collect(),
        }
    }
}

impl Env for SyscfgState {
    fn lookup(&self, name: &str) -> Option<EvalValue> {
        self.settings.get(name).map(Setting::eval_value)
    }
}

/// Immutable name-to-value environment captured from a [`SyscfgState`].
#[derive(Debug, Clone, Default)]
pub struct SyscfgSnapshot {
    values: BTreeMap<String, EvalValue>,
}

impl Env for SyscfgSnapshot {
    fn lookup(&self, name: &str) -> Option<EvalValue> {
        self.values.get(name).cloned()
    }
}

/// Flatten the syscfg contributions of `packages`.
///
/// Hard failures (malformed descriptors) abort with `Err`; configuration
/// errors land in the returned state's error list.
pub fn flatten(packages: &[&Package]) -> Result<SyscfgState, PkgError> {
    let mut state = SyscfgState::new();

    // Deterministic package order: ascending priority, then canonical name.
    let mut ordered: Vec<&Package> = packages.to_vec();
    ordered.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| a.name().cmp(b.name()))
    });

    // Pass 1: register definitions.
    for pkg in &ordered {
        let defs = pkg.syscfg_defs(&state)?;
        for (name, def) in defs {
            if let Some(existing) = state.settings.get(&name) {
                state.errors.push(SyscfgError::AmbiguousDefinition {
                    setting: name.clone(),
                    first: existing.defining_pkg.clone(),
                    second: pkg.name().clone(),
                });
                continue;
            }
            let setting = Setting::from_def(name.clone(), pkg.name().clone(), &def);
            state.settings.insert(name, setting);
        }
    }

    // Pass 2: apply overrides. Each package's vals — including which
    // conditional vals are selected — are evaluated against the state as of
    // the start of that package's turn.
    for pkg in &ordered {
        let turn_env = state.snapshot();
        let vals = pkg.syscfg_vals(&turn_env)?;
        for (name, value) in vals {
            let Ok(raw) = value.as_str() else {
                state.errors.push(SyscfgError::NonScalarValue {
                    setting: name,
                    pkg: pkg.name().clone(),
                });
                continue;
            };

            let Some(setting) = state.settings.get_mut(&name) else {
                state.errors.push(SyscfgError::OverrideOfUndefined {
                    setting: name,
                    pkg: pkg.name().clone(),
                });
                continue;
            };

            if let Some(allowed) = &setting.restricted_to {
                if !allowed.iter().any(|a| a == &raw) {
                    state.errors.push(SyscfgError::RestrictionViolated {
                        setting: name,
                        pkg: pkg.name().clone(),
                        value: raw,
                        allowed: allowed.clone(),
                    });
                    continue;
                }
            }

            setting.value = raw.clone();
            setting.history.push(Override {
                pkg: pkg.name().clone(),
                value: raw,
            });
        }
    }

    // Pass 3: evaluate int/bool settings to concrete values. Values may
    // reference other settings, so keep sweeping while progress is made.
    evaluate_typed_settings(&mut state);

    tracing::debug!(
        settings = state.len(),
        errors = state.errors.len(),
        "syscfg flattened"
    );
    Ok(state)
}

/// Reduce every int/bool setting's value text to a concrete literal.
fn evaluate_typed_settings(state: &mut SyscfgState) {
    let names: Vec<String> = state.settings.keys().cloned().collect();
    let mut failures: BTreeMap<String, String> = BTreeMap::new();

    loop {
        let mut progress = false;
        for name in &names {
            let setting = &state.settings[name];
            if !matches!(setting.stype, SettingType::Int | SettingType::Bool) {
                continue;
            }
            if setting::parse_scalar_int(&setting.value).is_some() {
                continue;
            }

            let parsed = match tern_expr::parse(&setting.value) {
                Ok(expr) => expr,
                Err(e) => {
                    failures.insert(name.clone(), e.to_string());
                    continue;
                }
            };
            let outcome = Evaluator::new(&*state).eval(&parsed);
            match outcome {
                Ok(result) => {
                    let concrete = match (state.settings[name].stype, &result) {
                        (SettingType::Bool, value) => i64::from(value.is_truthy()).to_string(),
                        (_, EvalValue::Int(i)) => i.to_string(),
                        (_, EvalValue::Str(s)) => {
                            failures.insert(
                                name.clone(),
                                format!("evaluates to string `{s}`, not an integer"),
                            );
                            continue;
                        }
                    };
                    state
                        .settings
                        .get_mut(name)
                        .expect("name came from the map")
                        .value = concrete;
                    failures.remove(name);
                    progress = true;
                }
                Err(e) => {
                    failures.insert(name.clone(), e.to_string());
                }
            }
        }
        if !progress {
            break;
        }
    }

    for (name, reason) in failures {
        let value = state.settings[&name].value.clone();
        state.errors.push(SyscfgError::NonEvaluable {
            setting: name,
            value,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tern_cct::Cct;
    use tern_core::PkgRef;

    fn pkg(repo: &str, path: &str, descriptor: &str) -> Package {
        let mut cct = Cct::new();
        cct.merge_yaml_str(format!("{path}/pkg.yml"), descriptor).unwrap();
        Package::from_cct(PkgRef::new(repo, path), cct).unwrap()
    }

    #[test]
    fn defaults_without_overrides() {
        let a = pkg(
            "core",
            "sys/log",
            "syscfg.defs:\n    LOG_LEVEL: {value: 1, type: int}\n",
        );
        let state = flatten(&[&a]).unwrap();
        assert_eq!(state.get("LOG_LEVEL").unwrap().value, "1");
        assert!(!state.has_errors());
    }

    #[test]
    fn higher_priority_override_wins() {
        let lib = pkg(
            "core",
            "sys/log",
            "syscfg.defs:\n    LOG_LEVEL: {value: 1, type: int}\n",
        );
        let bsp = pkg(
            "core",
            "hw/bsp/native",
            "pkg.type: bsp\nsyscfg.vals:\n    LOG_LEVEL: 2\n",
        );
        let app = pkg(
            "proj",
            "apps/blinky",
            "pkg.type: app\nsyscfg.vals:\n    LOG_LEVEL: 3\n",
        );

        let state = flatten(&[&app, &lib, &bsp]).unwrap();
        let setting = state.get("LOG_LEVEL").unwrap();
        assert_eq!(setting.value, "3");
        // History is ordered by resolution step: bsp first, then app.
        let overriders: Vec<String> =
            setting.history.iter().map(|o| o.pkg.to_string()).collect();
        assert_eq!(overriders, vec!["@core/hw/bsp/native", "@proj/apps/blinky"]);
    }

    #[test]
    fn equal_priority_ties_break_by_name() {
        let one = pkg(
            "core",
            "lib/aaa",
            "syscfg.defs:\n    X: {value: 0, type: int}\nsyscfg.vals:\n    X: 1\n",
        );
        let two = pkg("core", "lib/bbb", "syscfg.vals:\n    X: 2\n");
        let state = flatten(&[&two, &one]).unwrap();
        // lib/bbb sorts after lib/aaa, so its override lands last.
        assert_eq!(state.get("X").unwrap().value, "2");
    }

    #[test]
    fn ambiguous_definition_is_recorded() {
        let a = pkg("core", "a", "syscfg.defs:\n    X: {value: 1}\n");
        let b = pkg("core", "b", "syscfg.defs:\n    X: {value: 2}\n");
        let state = flatten(&[&a, &b]).unwrap();
        assert_eq!(state.errors().len(), 1);
        assert!(matches!(
            &state.errors()[0],
            SyscfgError::AmbiguousDefinition { setting, .. } if setting == "X"
        ));
    }

    #[test]
    fn override_of_undefined_is_recorded() {
        let a = pkg("core", "a", "syscfg.vals:\n    MISSING: 1\n");
        let state = flatten(&[&a]).unwrap();
        assert!(matches!(
            &state.errors()[0],
            SyscfgError::OverrideOfUndefined { setting, .. } if setting == "MISSING"
        ));
    }

    #[test]
    fn restriction_violation_keeps_old_value() {
        let def = pkg(
            "core",
            "a",
            "syscfg.defs:\n    MODE: {value: fast, restricted_to: [fast, small]}\n",
        );
        let bad = pkg("core", "b", "syscfg.vals:\n    MODE: huge\n");
        let state = flatten(&[&def, &bad]).unwrap();
        assert_eq!(state.get("MODE").unwrap().value, "fast");
        assert!(matches!(
            &state.errors()[0],
            SyscfgError::RestrictionViolated { value, .. } if value == "huge"
        ));
    }

    #[test]
    fn conditional_val_sees_same_pass_lower_priority_write() {
        // lib/aaa turns FEATURE on; lib/bbb's conditional val keys off it in
        // the same flatten pass.
        let defs = pkg(
            "core",
            "lib/a_defs",
            "syscfg.defs:\n    FEATURE: {value: 0, type: int}\n    EXTRA: {value: 0, type: int}\n",
        );
        let on = pkg("core", "lib/b_on", "syscfg.vals:\n    FEATURE: 1\n");
        let cond = pkg(
            "core",
            "lib/c_cond",
            "syscfg.vals.FEATURE:\n    EXTRA: 7\n",
        );
        let state = flatten(&[&defs, &on, &cond]).unwrap();
        assert_eq!(state.get("EXTRA").unwrap().value, "7");
    }

    #[test]
    fn value_expressions_evaluate_with_dependencies() {
        let a = pkg(
            "core",
            "a",
            "syscfg.defs:\n    BASE: {value: 4, type: int}\n    DERIVED: {value: 'BASE * 2', type: int}\n",
        );
        let state = flatten(&[&a]).unwrap();
        assert_eq!(state.get("DERIVED").unwrap().value, "8");
        assert!(!state.has_errors());
    }

    #[test]
    fn chained_value_expressions_converge() {
        let a = pkg(
            "core",
            "a",
            "syscfg.defs:\n    A: {value: 1, type: int}\n    B: {value: 'A + 1', type: int}\n    C: {value: 'B + 1', type: int}\n",
        );
        let state = flatten(&[&a]).unwrap();
        assert_eq!(state.get("C").unwrap().value, "3");
    }

    #[test]
    fn non_evaluable_int_is_an_error() {
        let a = pkg(
            "core",
            "a",
            "syscfg.defs:\n    X: {value: 'not an int at all (', type: int}\n",
        );
        let state = flatten(&[&a]).unwrap();
        assert!(matches!(
            &state.errors()[0],
            SyscfgError::NonEvaluable { setting, .. } if setting == "X"
        ));
    }

    #[test]
    fn bool_settings_reduce_to_zero_or_one() {
        let a = pkg(
            "core",
            "a",
            "syscfg.defs:\n    LIMIT: {value: 4, type: int}\n    ON: {value: 'LIMIT > 2', type: bool}\n",
        );
        let state = flatten(&[&a]).unwrap();
        assert_eq!(state.get("ON").unwrap().value, "1");
    }

    #[test]
    fn flatten_is_deterministic() {
        let a = pkg(
            "core",
            "a",
            "syscfg.defs:\n    X: {value: 0, type: int}\n",
        );
        let b = pkg("core", "b", "syscfg.vals:\n    X: 1\n");
        let first = flatten(&[&a, &b]).unwrap();
        let second = flatten(&[&b, &a]).unwrap();
        assert_eq!(first.values(), second.values());
    }
}
