//! End-to-end resolver scenarios over in-memory package sets.

use assert_matches::assert_matches;
use tern_cct::Cct;
use tern_core::PkgRef;
use tern_pkg::{Package, PackageIndex};
use tern_resolver::{Problem, ResolveError, Resolver};

/// Build a package from its canonical name and descriptor text.
fn pkg(repo: &str, path: &str, descriptor: &str) -> Package {
    let mut cct = Cct::new();
    cct.merge_yaml_str(format!("{path}/pkg.yml"), descriptor)
        .expect("descriptor parses");
    Package::from_cct(PkgRef::new(repo, path), cct).expect("package builds")
}

fn index(pkgs: Vec<Package>) -> PackageIndex {
    let mut index = PackageIndex::new();
    for p in pkgs {
        index.insert(p);
    }
    index
}

fn seeds() -> Vec<PkgRef> {
    vec![
        PkgRef::new("project", "targets/sim"),
        PkgRef::new("project", "apps/foo"),
        PkgRef::new("core", "hw/bsp/sim"),
        PkgRef::new("core", "compiler/gcc"),
    ]
}

/// The four standard seed packages.
fn seed_pkgs() -> Vec<Package> {
    vec![
        pkg("project", "targets/sim", "pkg.type: target\n"),
        pkg("project", "apps/foo", "pkg.type: app\npkg.deps: ['@core/bar']\npkg.deps.MY_SETTING: ['@core/baz']\n"),
        pkg("core", "hw/bsp/sim", "pkg.type: bsp\n"),
        pkg("core", "compiler/gcc", "pkg.type: compiler\n"),
    ]
}

#[test]
fn conditional_dependency_activated_by_a_dep() {
    // `foo` depends on `bar`, and on `baz` only when MY_SETTING is truthy.
    // `bar` defines MY_SETTING = 1, so pulling in `bar` activates the
    // conditional dependency on the next iteration.
    let mut pkgs = seed_pkgs();
    pkgs.push(pkg(
        "core",
        "bar",
        "syscfg.defs:\n    MY_SETTING: {value: 1, type: int}\n",
    ));
    pkgs.push(pkg("core", "baz", "pkg.name: baz\n"));

    let index = index(pkgs);
    let resolution = Resolver::new(&index).resolve(&seeds()).unwrap();

    assert_eq!(resolution.len(), 6);
    assert!(resolution.contains(&PkgRef::new("core", "bar")));
    assert!(resolution.contains(&PkgRef::new("core", "baz")));
    assert_eq!(resolution.syscfg.get("MY_SETTING").unwrap().value, "1");
}

#[test]
fn resolution_is_a_fixed_point() {
    // Resolving the already-resolved set changes nothing.
    let mut pkgs = seed_pkgs();
    pkgs.push(pkg(
        "core",
        "bar",
        "syscfg.defs:\n    MY_SETTING: {value: 1, type: int}\n",
    ));
    pkgs.push(pkg("core", "baz", "pkg.name: baz\n"));

    let index = index(pkgs);
    let resolver = Resolver::new(&index);
    let first = resolver.resolve(&seeds()).unwrap();
    let second = resolver.resolve(&seeds()).unwrap();

    let names = |r: &tern_resolver::Resolution| -> Vec<String> {
        r.pkgs.iter().map(|p| p.name().to_string()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.syscfg.values(), second.syscfg.values());
}

#[test]
fn imposter_pruning_keeps_the_stronger_supplier() {
    // `a` requires api X; `b` (lib) and `c` (bsp-level priority, pulled in
    // as a hard dep) both supply X. The resolver first admits `b` as the
    // best index supplier, then `c` arrives as a hard dependency with
    // higher priority and supplants it. No api-conflict is raised.
    let mut pkgs = vec![
        pkg("project", "targets/sim", "pkg.type: target\n"),
        pkg(
            "project",
            "apps/foo",
            "pkg.type: app\npkg.deps: ['@core/a', '@core/c']\n",
        ),
        pkg("core", "hw/bsp/sim", "pkg.type: bsp\n"),
        pkg("core", "compiler/gcc", "pkg.type: compiler\n"),
    ];
    pkgs.push(pkg("core", "a", "pkg.req_apis: [X]\n"));
    pkgs.push(pkg("core", "b", "pkg.apis: [X]\n"));
    pkgs.push(pkg("core", "c", "pkg.type: bsp\npkg.apis: [X]\n"));

    let index = index(pkgs);
    let resolution = Resolver::new(&index).resolve(&seeds()).unwrap();

    assert!(resolution.contains(&PkgRef::new("core", "c")));
    assert!(!resolution.contains(&PkgRef::new("core", "b")));
    assert_eq!(
        resolution.api_bindings.get("X"),
        Some(&PkgRef::new("core", "c"))
    );
}

#[test]
fn api_unsatisfied_is_reported() {
    let mut pkgs = seed_pkgs();
    pkgs.push(pkg("core", "bar", "pkg.req_apis: [MISSING_API]\n"));
    pkgs.push(pkg("core", "baz", "pkg.name: baz\n"));

    let index = index(pkgs);
    let err = Resolver::new(&index).resolve(&seeds()).unwrap_err();
    assert_matches!(err, ResolveError::Report { problems } => {
        assert!(problems.iter().any(|p| matches!(
            p,
            Problem::ApiUnsatisfied { api, .. } if api == "MISSING_API"
        )));
    });
}

#[test]
fn api_conflict_on_equal_priority_suppliers() {
    let mut pkgs = vec![
        pkg("project", "targets/sim", "pkg.type: target\n"),
        pkg(
            "project",
            "apps/foo",
            "pkg.type: app\npkg.deps: ['@core/a', '@core/s1', '@core/s2']\n",
        ),
        pkg("core", "hw/bsp/sim", "pkg.type: bsp\n"),
        pkg("core", "compiler/gcc", "pkg.type: compiler\n"),
    ];
    pkgs.push(pkg("core", "a", "pkg.req_apis: [X]\n"));
    pkgs.push(pkg("core", "s1", "pkg.apis: [X]\n"));
    pkgs.push(pkg("core", "s2", "pkg.apis: [X]\n"));

    let index = index(pkgs);
    let err = Resolver::new(&index).resolve(&seeds()).unwrap_err();
    assert_matches!(err, ResolveError::Report { problems } => {
        assert!(problems.iter().any(|p| matches!(
            p,
            Problem::ApiConflict { suppliers, .. } if suppliers.len() == 2
        )));
    });
}

#[test]
fn missing_dependency_is_reported() {
    let mut pkgs = seed_pkgs();
    pkgs.push(pkg("core", "bar", "pkg.deps: ['@core/ghost']\n"));
    pkgs.push(pkg("core", "baz", "pkg.name: baz\n"));

    let index = index(pkgs);
    let err = Resolver::new(&index).resolve(&seeds()).unwrap_err();
    assert_matches!(err, ResolveError::Report { problems } => {
        assert!(problems.iter().any(|p| matches!(
            p,
            Problem::MissingDependency { dep, .. } if dep == &PkgRef::new("core", "ghost")
        )));
    });
}

#[test]
fn missing_seed_fails_immediately() {
    let index = index(seed_pkgs());
    let mut all_seeds = seeds();
    all_seeds.push(PkgRef::new("core", "nonexistent"));
    let err = Resolver::new(&index).resolve(&all_seeds).unwrap_err();
    assert_matches!(err, ResolveError::SeedNotFound { pkg } => {
        assert_eq!(pkg, PkgRef::new("core", "nonexistent"));
    });
}

#[test]
fn iteration_cap_reports_non_convergence() {
    // FLIP defaults to 0. When FLIP is falsy, `a` pulls in `flipper`,
    // whose override turns FLIP on; when FLIP is truthy the dependency
    // disappears, `flipper` is orphaned and pruned, and FLIP falls back to
    // 0 again. The working set oscillates forever.
    let mut pkgs = vec![
        pkg("project", "targets/sim", "pkg.type: target\n"),
        pkg(
            "project",
            "apps/foo",
            "pkg.type: app\npkg.deps: ['@core/a']\n",
        ),
        pkg("core", "hw/bsp/sim", "pkg.type: bsp\n"),
        pkg("core", "compiler/gcc", "pkg.type: compiler\n"),
    ];
    pkgs.push(pkg(
        "core",
        "a",
        "syscfg.defs:\n    FLIP: {value: 0, type: int}\npkg.deps.(!FLIP): ['@core/flipper']\n",
    ));
    pkgs.push(pkg("core", "flipper", "syscfg.vals:\n    FLIP: 1\n"));

    let index = index(pkgs);
    let err = Resolver::new(&index)
        .resolve(&[
            PkgRef::new("project", "targets/sim"),
            PkgRef::new("project", "apps/foo"),
            PkgRef::new("core", "hw/bsp/sim"),
            PkgRef::new("core", "compiler/gcc"),
        ])
        .unwrap_err();
    assert_matches!(err, ResolveError::NonConvergence { .. });
}

#[test]
fn staged_orderings_are_emitted() {
    let mut pkgs = seed_pkgs();
    pkgs.push(pkg(
        "core",
        "bar",
        "syscfg.defs:\n    MY_SETTING: {value: 1, type: int}\npkg.init_function: bar_init\npkg.init_stage: 200\n",
    ));
    pkgs.push(pkg(
        "core",
        "baz",
        "pkg.init_list:\n    baz_early: 100\n    baz_before_bar:\n        before: [bar_init]\n",
    ));

    let index = index(pkgs);
    let resolution = Resolver::new(&index).resolve(&seeds()).unwrap();
    let order: Vec<&str> = resolution
        .init_order
        .iter()
        .map(|e| e.name.as_str())
        .collect();

    let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert!(pos("baz_early") < pos("bar_init"));
    assert!(pos("baz_before_bar") < pos("bar_init"));
}

#[test]
fn output_order_is_canonical() {
    let mut pkgs = seed_pkgs();
    pkgs.push(pkg(
        "core",
        "bar",
        "syscfg.defs:\n    MY_SETTING: {value: 1, type: int}\n",
    ));
    pkgs.push(pkg("core", "baz", "pkg.name: baz\n"));

    let index = index(pkgs);
    let resolution = Resolver::new(&index).resolve(&seeds()).unwrap();
    let names: Vec<String> = resolution
        .pkgs
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
