//! The package model.
//!
//! A package is immutable after load: a canonical reference, a type, and
//! the merged conditional configuration tree of its descriptor files.
//! Everything else — dependencies, APIs, syscfg defs and vals, staged
//! entries — is a projection computed from the tree under a caller-supplied
//! environment, and is recomputed whenever the environment shifts.

use crate::error::PkgError;
use crate::ptype::PkgType;
use crate::stage::{StageEntry, StageKey, parse_stage_key};
use std::path::{Path, PathBuf};
use tern_cct::Cct;
use tern_core::{PkgRef, Value};
use tern_expr::{EMPTY_ENV, Env};

/// Descriptor files merged into a package's tree, in load order.
const DESCRIPTOR_FILES: &[&str] = &["pkg.yml", "bsp.yml", "target.yml", "syscfg.yml"];

/// A loaded package.
#[derive(Debug, Clone)]
pub struct Package {
    name: PkgRef,
    ptype: PkgType,
    root: PathBuf,
    cct: Cct,
}

impl Package {
    /// Build a package from an already-merged tree. The type is read from
    /// the tree's `pkg.type` key; a missing key means `lib`.
    pub fn from_cct(name: PkgRef, cct: Cct) -> Result<Self, PkgError> {
        let ptype = match cct.scalar("pkg.type", &EMPTY_ENV)? {
            Some(value) => {
                let text = value.as_str().map_err(|_| PkgError::UnknownType {
                    file: PathBuf::from("pkg.yml"),
                    found: value.render(),
                })?;
                text.parse::<PkgType>()
                    .map_err(|found| PkgError::UnknownType {
                        file: PathBuf::from("pkg.yml"),
                        found,
                    })?
            }
            None => PkgType::Lib,
        };

        Ok(Self {
            name,
            ptype,
            root: PathBuf::new(),
            cct,
        })
    }

    /// Load a package from its directory on disk.
    ///
    /// `pkg.yml` is required; `bsp.yml`, `target.yml`, and `syscfg.yml`
    /// merge in after it when present.
    pub fn load(dir: &Path, name: PkgRef) -> Result<Self, PkgError> {
        let pkg_yml = dir.join("pkg.yml");
        if !pkg_yml.is_file() {
            return Err(PkgError::MissingKey {
                file: pkg_yml,
                key: "pkg.name".to_string(),
            });
        }

        let mut cct = Cct::new();
        for file_name in DESCRIPTOR_FILES {
            let path = dir.join(file_name);
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| PkgError::io(&path, &e))?;
            cct.merge_yaml_str(&path, &text)?;
        }

        let mut pkg = Self::from_cct(name, cct)?;
        pkg.root = dir.to_path_buf();

        if pkg.cct.has_base("pkg.features") {
            tracing::warn!(
                pkg = %pkg.name,
                "deprecated key `pkg.features`; declare settings under `syscfg.defs` instead"
            );
        }

        if let Some(declared) = pkg.cct.scalar("pkg.name", &EMPTY_ENV)? {
            let declared = declared.as_str().unwrap_or_default();
            if !declared.is_empty() && declared != pkg.name.path() {
                tracing::debug!(
                    declared = %declared,
                    canonical = %pkg.name,
                    "pkg.name differs from on-disk path; the path wins"
                );
            }
        }

        Ok(pkg)
    }

    /// Canonical reference.
    #[must_use]
    pub const fn name(&self) -> &PkgRef {
        &self.name
    }

    /// Package type.
    #[must_use]
    pub const fn ptype(&self) -> PkgType {
        self.ptype
    }

    /// Syscfg override priority of this package.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.ptype.priority()
    }

    /// On-disk root, empty for synthetic packages.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The merged descriptor tree.
    #[must_use]
    pub const fn cct(&self) -> &Cct {
        &self.cct
    }

    /// Hard dependencies under `env`, canonicalized.
    pub fn deps(&self, env: &dyn Env) -> Result<Vec<PkgRef>, PkgError> {
        let mut refs = Vec::new();
        for item in self.cct.sequence("pkg.deps", env)? {
            let text = item.as_str().map_err(|_| PkgError::NotAString {
                file: self.root.join("pkg.yml"),
                key: "pkg.deps".to_string(),
                item: item.render(),
            })?;
            refs.push(PkgRef::parse(&text, self.name.repo())?);
        }
        Ok(refs)
    }

    /// APIs this package supplies.
    pub fn apis(&self, env: &dyn Env) -> Result<Vec<String>, PkgError> {
        self.string_list("pkg.apis", env)
    }

    /// APIs this package requires some supplier for.
    pub fn req_apis(&self, env: &dyn Env) -> Result<Vec<String>, PkgError> {
        self.string_list("pkg.req_apis", env)
    }

    /// Syscfg definitions: setting name to definition mapping.
    pub fn syscfg_defs(&self, env: &dyn Env) -> Result<Vec<(String, Value)>, PkgError> {
        Ok(self.cct.mapping("syscfg.defs", env)?)
    }

    /// Syscfg overrides: setting name to override value.
    pub fn syscfg_vals(&self, env: &dyn Env) -> Result<Vec<(String, Value)>, PkgError> {
        Ok(self.cct.mapping("syscfg.vals", env)?)
    }

    /// Init-function entries for the staged init sequence.
    pub fn init_entries(&self, env: &dyn Env) -> Result<Vec<StageEntry>, PkgError> {
        self.function_entries("pkg.init_function", "pkg.init_stage", "pkg.init_list", env)
    }

    /// Shutdown entries for the staged down sequence.
    pub fn down_entries(&self, env: &dyn Env) -> Result<Vec<StageEntry>, PkgError> {
        self.function_entries("pkg.down_function", "pkg.down_stage", "pkg.down_list", env)
    }

    /// Custom commands run before compilation.
    pub fn pre_build_cmds(&self, env: &dyn Env) -> Result<Vec<StageEntry>, PkgError> {
        self.stage_list("pkg.pre_build_cmds", env)
    }

    /// Custom commands run before linking.
    pub fn pre_link_cmds(&self, env: &dyn Env) -> Result<Vec<StageEntry>, PkgError> {
        self.stage_list("pkg.pre_link_cmds", env)
    }

    /// Custom commands run after linking.
    pub fn post_link_cmds(&self, env: &dyn Env) -> Result<Vec<StageEntry>, PkgError> {
        self.stage_list("pkg.post_link_cmds", env)
    }

    /// Compiler flags contributed by this package.
    pub fn cflags(&self, env: &dyn Env) -> Result<Vec<String>, PkgError> {
        self.string_list("pkg.cflags", env)
    }

    /// For target packages: the app package reference.
    pub fn target_app(&self, env: &dyn Env) -> Result<Option<PkgRef>, PkgError> {
        self.ref_scalar("target.app", env)
    }

    /// For target packages: the bsp package reference.
    pub fn target_bsp(&self, env: &dyn Env) -> Result<Option<PkgRef>, PkgError> {
        self.ref_scalar("target.bsp", env)
    }

    /// For bsp packages: the compiler package reference.
    pub fn bsp_compiler(&self, env: &dyn Env) -> Result<Option<PkgRef>, PkgError> {
        self.ref_scalar("bsp.compiler", env)
    }

    fn ref_scalar(&self, base: &str, env: &dyn Env) -> Result<Option<PkgRef>, PkgError> {
        match self.cct.scalar(base, env)? {
            Some(value) if !value.is_empty_scalar() => {
                let text = value.as_str().map_err(|_| PkgError::NotAString {
                    file: self.root.join("pkg.yml"),
                    key: base.to_string(),
                    item: value.render(),
                })?;
                Ok(Some(PkgRef::parse(&text, self.name.repo())?))
            }
            _ => Ok(None),
        }
    }

    fn string_list(&self, base: &str, env: &dyn Env) -> Result<Vec<String>, PkgError> {
        let mut out = Vec::new();
        for item in self.cct.sequence(base, env)? {
            out.push(item.as_str().map_err(|_| PkgError::NotAString {
                file: self.root.join("pkg.yml"),
                key: base.to_string(),
                item: item.render(),
            })?);
        }
        Ok(out)
    }

    /// Entries from the single-function form plus the list form.
    fn function_entries(
        &self,
        function_key: &str,
        stage_key: &str,
        list_key: &str,
        env: &dyn Env,
    ) -> Result<Vec<StageEntry>, PkgError> {
        let mut entries = Vec::new();
        let file = self.root.join("pkg.yml");

        if let Some(name) = self.cct.scalar(function_key, env)? {
            let name = name.as_str().map_err(|_| PkgError::MissingKey {
                file: file.clone(),
                key: function_key.to_string(),
            })?;
            if !name.is_empty() {
                let stage = self
                    .cct
                    .scalar(stage_key, env)?
                    .ok_or_else(|| PkgError::MissingKey {
                        file: file.clone(),
                        key: stage_key.to_string(),
                    })?;
                let stage = stage.as_int().map_err(|_| PkgError::BadStageEntry {
                    file: file.clone(),
                    entry: name.clone(),
                })?;
                entries.push(StageEntry {
                    name,
                    pkg: self.name.clone(),
                    key: StageKey::Number(stage),
                });
            }
        }

        entries.extend(self.stage_list(list_key, env)?);
        Ok(entries)
    }

    fn stage_list(&self, base: &str, env: &dyn Env) -> Result<Vec<StageEntry>, PkgError> {
        let file = self.root.join("pkg.yml");
        let mut entries = Vec::new();
        for (name, value) in self.cct.mapping(base, env)? {
            let key = parse_stage_key(&file, &name, &value)?;
            entries.push(StageEntry {
                name,
                pkg: self.name.clone(),
                key,
            });
        }
        Ok(entries)
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

    fn pkg(texts: &[&str]) -> Package {
        let mut cct = Cct::new();
        for (i, text) in texts.iter().enumerate() {
            cct.merge_yaml_str(format!("file{i}.yml"), text).unwrap();
        }
        Package::from_cct(PkgRef::new("core", "sys/log"), cct).unwrap()
    }

    #[test]
    fn type_defaults_to_lib() {
        let p = pkg(&["pkg.name: sys/log\n"]);
        assert_eq!(p.ptype(), PkgType::Lib);
        assert_eq!(p.priority(), 2);
    }

    #[test]
    fn type_from_descriptor() {
        let p = pkg(&["pkg.type: bsp\n"]);
        assert_eq!(p.ptype(), PkgType::Bsp);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut cct = Cct::new();
        cct.merge_yaml_str("pkg.yml", "pkg.type: widget\n").unwrap();
        assert!(matches!(
            Package::from_cct(PkgRef::new("core", "x"), cct),
            Err(PkgError::UnknownType { .. })
        ));
    }

    #[test]
    fn deps_are_canonicalized_against_own_repo() {
        let p = pkg(&["pkg.deps: [sys/mfg, '@extra/util/crc']\n"]);
        let deps = p.deps(&MapEnv(HashMap::new())).unwrap();
        assert_eq!(
            deps,
            vec![PkgRef::new("core", "sys/mfg"), PkgRef::new("extra", "util/crc")]
        );
    }

    #[test]
    fn conditional_deps_follow_environment() {
        let p = pkg(&["pkg.deps: [base]\npkg.deps.SELFTEST: [test/extra]\n"]);
        let off = p.deps(&MapEnv(HashMap::new())).unwrap();
        assert_eq!(off.len(), 1);
        let on = p
            .deps(&MapEnv([("SELFTEST", 1)].into_iter().collect()))
            .unwrap();
        assert_eq!(on.len(), 2);
    }

    #[test]
    fn init_function_with_stage() {
        let p = pkg(&["pkg.init_function: log_init\npkg.init_stage: 100\n"]);
        let entries = p.init_entries(&MapEnv(HashMap::new())).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "log_init");
        assert_eq!(entries[0].key, StageKey::Number(100));
    }

    #[test]
    fn init_function_without_stage_is_rejected() {
        let p = pkg(&["pkg.init_function: log_init\n"]);
        assert!(matches!(
            p.init_entries(&MapEnv(HashMap::new())),
            Err(PkgError::MissingKey { .. })
        ));
    }

    #[test]
    fn init_list_mixed_shapes() {
        let p = pkg(&[
            "pkg.init_list:\n    early: 10\n    late:\n        after: [early]\n",
        ]);
        let entries = p.init_entries(&MapEnv(HashMap::new())).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, StageKey::Number(10));
        assert_eq!(
            entries[1].key,
            StageKey::Edges {
                afters: vec!["early".to_string()],
                befores: vec![],
            }
        );
    }

    #[test]
    fn target_projections() {
        let p = pkg(&[
            "pkg.type: target\ntarget.app: '@apps/blinky'\ntarget.bsp: hw/bsp/native\n",
        ]);
        let env = MapEnv(HashMap::new());
        assert_eq!(
            p.target_app(&env).unwrap(),
            Some(PkgRef::new("apps", "blinky"))
        );
        assert_eq!(
            p.target_bsp(&env).unwrap(),
            Some(PkgRef::new("core", "hw/bsp/native"))
        );
    }

    #[test]
    fn syscfg_projections() {
        let p = pkg(&[
            "syscfg.defs:\n    LOG_LEVEL:\n        description: verbosity\n        value: 1\n        type: int\nsyscfg.vals:\n    OTHER: 3\n",
        ]);
        let env = MapEnv(HashMap::new());
        let defs = p.syscfg_defs(&env).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].0, "LOG_LEVEL");
        let vals = p.syscfg_vals(&env).unwrap();
        assert_eq!(vals, vec![("OTHER".to_string(), Value::Int(3))]);
    }
}
