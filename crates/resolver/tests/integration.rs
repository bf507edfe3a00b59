//! Integration tests for the resolver crate

use sprout_errors::{Error, ResolveError};
use sprout_resolver::{
    Action, InstalledSet, OperationList, PinnedConstraints, ResolveOptions, Resolver, SourceIndex,
};
use sprout_types::{PackageDependency, PackageNode, Version};

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn pkg(name: &str, version: &str) -> PackageNode {
    PackageNode::new(name, v(version))
}

fn dep(spec: &str) -> PackageDependency {
    PackageDependency::parse(spec).unwrap()
}

fn rendered(ops: &OperationList) -> Vec<String> {
    ops.iter().map(ToString::to_string).collect()
}

fn position(ops: &[String], needle: &str) -> usize {
    ops.iter()
        .position(|op| op == needle)
        .unwrap_or_else(|| panic!("expected {needle} in {ops:?}"))
}

/// git -> curl, zlib; curl -> openssl, zlib; leaves have no deps
fn toolchain_source() -> (SourceIndex, PackageNode) {
    let mut source = SourceIndex::new();
    let git = pkg("git", "2.41.0")
        .with_dependency(dep("curl>=8.0.0"))
        .with_dependency(dep("zlib>=1.2.0"));
    source.add(
        pkg("curl", "8.5.0")
            .with_dependency(dep("openssl>=3.0.0"))
            .with_dependency(dep("zlib>=1.2.0")),
    );
    source.add(pkg("openssl", "3.0.0"));
    source.add(pkg("zlib", "1.2.11"));
    source.add(git.clone());
    (source, git)
}

#[test]
fn test_install_resolves_transitive_dependencies() {
    let (source, git) = toolchain_source();
    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);

    let ops = resolver
        .resolve_install(&git, &ResolveOptions::default())
        .unwrap();

    assert_eq!(ops.len(), 4);
    assert!(ops.iter().all(|op| op.action() == Action::Install));

    let plan = rendered(&ops);
    // Dependencies precede their dependents
    assert!(position(&plan, "install openssl-3.0.0") < position(&plan, "install curl-8.5.0"));
    assert!(position(&plan, "install zlib-1.2.11") < position(&plan, "install curl-8.5.0"));
    assert!(position(&plan, "install curl-8.5.0") < position(&plan, "install git-2.41.0"));
    // zlib is shared between curl and git and appears once
    assert_eq!(plan.iter().filter(|op| op.contains("zlib")).count(), 1);
}

#[test]
fn test_resolution_is_deterministic() {
    let (source, git) = toolchain_source();
    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);

    let first = resolver
        .resolve_install(&git, &ResolveOptions::default())
        .unwrap();
    let second = resolver
        .resolve_install(&git, &ResolveOptions::default())
        .unwrap();

    assert_eq!(rendered(&first), rendered(&second));
}

#[test]
fn test_install_noop_when_already_satisfied() {
    let (source, git) = toolchain_source();
    let mut installed = InstalledSet::new();
    installed.insert(
        pkg("curl", "8.5.0")
            .with_dependency(dep("openssl>=3.0.0"))
            .with_dependency(dep("zlib>=1.2.0")),
    );
    installed.insert(pkg("openssl", "3.0.0"));
    installed.insert(pkg("zlib", "1.2.11"));
    installed.insert(git.clone());

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_install(&git, &ResolveOptions::default())
        .unwrap();

    assert!(ops.is_empty());
}

#[test]
fn test_installed_dependency_preferred_over_newer_source() {
    let mut source = SourceIndex::new();
    source.add(pkg("lib", "2.0.0"));
    let app = pkg("app", "1.0.0").with_dependency(dep("lib>=1.0.0"));
    source.add(app.clone());

    let mut installed = InstalledSet::new();
    installed.insert(pkg("lib", "1.5.0"));

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_install(&app, &ResolveOptions::default())
        .unwrap();

    assert_eq!(rendered(&ops), ["install app-1.0.0"]);
}

#[test]
fn test_unresolved_dependency_carries_constraint() {
    let mut source = SourceIndex::new();
    source.add(pkg("lib", "1.0.0"));
    let app = pkg("app", "1.0.0").with_dependency(dep("lib>=2.0.0"));

    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);
    let err = resolver
        .resolve_install(&app, &ResolveOptions::default())
        .unwrap_err();

    match err {
        Error::Resolve(ResolveError::UnresolvedDependency { name, constraint }) => {
            assert_eq!(name, "lib");
            assert_eq!(constraint, ">=2.0.0");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_downgrade_rejected() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("jq", "2.0.0"));

    let resolver = Resolver::new(&installed, &source);
    let err = resolver
        .resolve_install(&pkg("jq", "1.0.0"), &ResolveOptions::default())
        .unwrap_err();

    match err {
        Error::Resolve(ResolveError::DowngradeRejected {
            package,
            installed,
            requested,
        }) => {
            assert_eq!(package, "jq");
            assert_eq!(installed, "2.0.0");
            assert_eq!(requested, "1.0.0");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_upgrade_supersedes_installed_version() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("jq", "1.0.0"));

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_install(&pkg("jq", "2.0.0"), &ResolveOptions::default())
        .unwrap();

    assert_eq!(rendered(&ops), ["uninstall jq-1.0.0", "install jq-2.0.0"]);
}

#[test]
fn test_upgrade_retains_still_needed_dependency() {
    let mut source = SourceIndex::new();
    let new_jq = pkg("jq", "2.0.0").with_dependency(dep("oniguruma>=6.9.0"));
    source.add(new_jq.clone());

    let mut installed = InstalledSet::new();
    installed.insert(pkg("jq", "1.0.0").with_dependency(dep("oniguruma>=6.9.0")));
    installed.insert(pkg("oniguruma", "6.9.0"));

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_install(&new_jq, &ResolveOptions::default())
        .unwrap();

    // The old jq goes, the still-satisfied oniguruma stays put
    assert_eq!(rendered(&ops), ["uninstall jq-1.0.0", "install jq-2.0.0"]);
}

/// Installed a 1.0 pins b to exactly 1.0; installing b 2.0 must upgrade
/// a as well, through the compatible a 2.0
fn cascade_fixture() -> (SourceIndex, InstalledSet, PackageNode) {
    let mut source = SourceIndex::new();
    let new_b = pkg("b", "2.0.0");
    source.add(new_b.clone());
    source.add(pkg("a", "2.0.0").with_dependency(dep("b==2.0.0")));

    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "1.0.0").with_dependency(dep("b==1.0.0")));
    installed.insert(pkg("b", "1.0.0"));

    (source, installed, new_b)
}

#[test]
fn test_conflict_cascade_updates_dependents() {
    let (source, installed, new_b) = cascade_fixture();
    let resolver = Resolver::new(&installed, &source);

    let ops = resolver
        .resolve_install(&new_b, &ResolveOptions::default())
        .unwrap();
    let plan = rendered(&ops);

    assert_eq!(ops.len(), 4);
    // Each replaced package gets an internally consistent pair
    assert!(position(&plan, "uninstall b-1.0.0") < position(&plan, "install b-2.0.0"));
    assert!(position(&plan, "uninstall a-1.0.0") < position(&plan, "install a-2.0.0"));

    // And the cascade is deterministic
    let again = resolver
        .resolve_install(&new_b, &ResolveOptions::default())
        .unwrap();
    assert_eq!(plan, rendered(&again));
}

#[test]
fn test_conflict_without_replacement_fails() {
    // Like the cascade fixture, but no compatible a 2.0 exists
    let new_b = pkg("b", "2.0.0");
    let mut source = SourceIndex::new();
    source.add(new_b.clone());

    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "1.0.0").with_dependency(dep("b==1.0.0")));
    installed.insert(pkg("b", "1.0.0"));

    let resolver = Resolver::new(&installed, &source);
    let err = resolver
        .resolve_install(&new_b, &ResolveOptions::default())
        .unwrap_err();

    match err {
        Error::Resolve(ResolveError::VersionConflict { package, blocking }) => {
            assert_eq!(package, "b-2.0.0");
            assert_eq!(blocking, ["a-1.0.0"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cyclic_dependencies_resolve_once() {
    let mut source = SourceIndex::new();
    let a = pkg("a", "1.0.0").with_dependency(dep("b"));
    source.add(a.clone());
    source.add(pkg("b", "1.0.0").with_dependency(dep("a")));

    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);

    let ops = resolver
        .resolve_install(&a, &ResolveOptions::default())
        .unwrap();

    assert_eq!(rendered(&ops), ["install b-1.0.0", "install a-1.0.0"]);
}

#[test]
fn test_uninstall_removes_orphaned_dependencies() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "1.0.0").with_dependency(dep("b")));
    installed.insert(pkg("b", "1.0.0"));

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_uninstall(
            &pkg("a", "1.0.0"),
            &ResolveOptions::default().with_remove_dependencies(),
        )
        .unwrap();

    assert_eq!(rendered(&ops), ["uninstall b-1.0.0", "uninstall a-1.0.0"]);
}

#[test]
fn test_uninstall_keeps_dependency_with_other_dependents() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "1.0.0").with_dependency(dep("b")));
    installed.insert(pkg("b", "1.0.0"));
    installed.insert(pkg("c", "1.0.0").with_dependency(dep("b")));

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_uninstall(
            &pkg("a", "1.0.0"),
            &ResolveOptions::default().with_remove_dependencies(),
        )
        .unwrap();

    // b survives: c still needs it
    assert_eq!(rendered(&ops), ["uninstall a-1.0.0"]);
}

#[test]
fn test_uninstall_blocked_by_dependents() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "1.0.0").with_dependency(dep("b")));
    installed.insert(pkg("b", "1.0.0"));

    let resolver = Resolver::new(&installed, &source);
    let err = resolver
        .resolve_uninstall(&pkg("b", "1.0.0"), &ResolveOptions::default())
        .unwrap_err();

    match err {
        Error::Resolve(ResolveError::BlockedByDependents { package, dependents }) => {
            assert_eq!(package, "b-1.0.0");
            assert_eq!(dependents, ["a-1.0.0"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // force bypasses the dependent check
    let ops = resolver
        .resolve_uninstall(&pkg("b", "1.0.0"), &ResolveOptions::default().with_force())
        .unwrap();
    assert_eq!(rendered(&ops), ["uninstall b-1.0.0"]);
}

#[test]
fn test_uninstall_without_remove_dependencies_leaves_orphans() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "1.0.0").with_dependency(dep("b")));
    installed.insert(pkg("b", "1.0.0"));

    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_uninstall(&pkg("a", "1.0.0"), &ResolveOptions::default())
        .unwrap();

    assert_eq!(rendered(&ops), ["uninstall a-1.0.0"]);
}

#[test]
fn test_uninstall_requires_exact_installed_version() {
    let source = SourceIndex::new();
    let mut installed = InstalledSet::new();
    installed.insert(pkg("a", "2.0.0"));

    let resolver = Resolver::new(&installed, &source);

    let err = resolver
        .resolve_uninstall(&pkg("a", "1.0.0"), &ResolveOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Resolve(ResolveError::NotInstalled { .. })
    ));

    let err = resolver
        .resolve_uninstall(&pkg("missing", "1.0.0"), &ResolveOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Resolve(ResolveError::NotInstalled { .. })
    ));
}

#[test]
fn test_pinned_constraints_narrow_selection() {
    let mut source = SourceIndex::new();
    source.add(pkg("lib", "1.5.0"));
    source.add(pkg("lib", "1.9.0"));
    source.add(pkg("lib", "2.5.0"));
    let app = pkg("app", "1.0.0").with_dependency(dep("lib>=1.0.0"));
    let installed = InstalledSet::new();

    // Unpinned: the safe version stays within the lowest major
    let resolver = Resolver::new(&installed, &source);
    let ops = resolver
        .resolve_install(&app, &ResolveOptions::default())
        .unwrap();
    assert!(rendered(&ops).contains(&"install lib-1.9.0".to_string()));

    // Pinned below 1.6: selection narrows further
    let mut pins = PinnedConstraints::new();
    pins.pin("lib", "<1.6.0".parse().unwrap());
    let resolver = Resolver::new(&installed, &source).with_constraint_provider(&pins);
    let ops = resolver
        .resolve_install(&app, &ResolveOptions::default())
        .unwrap();
    assert!(rendered(&ops).contains(&"install lib-1.5.0".to_string()));
}

#[test]
fn test_empty_constraint_intersection_fails() {
    let mut source = SourceIndex::new();
    source.add(pkg("lib", "1.5.0"));
    let app = pkg("app", "1.0.0").with_dependency(dep("lib>=1.0.0,<2.0.0"));
    let installed = InstalledSet::new();

    let mut pins = PinnedConstraints::new();
    pins.pin("lib", ">=3.0.0".parse().unwrap());
    let resolver = Resolver::new(&installed, &source).with_constraint_provider(&pins);

    let err = resolver
        .resolve_install(&app, &ResolveOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Version(_)));
}

#[test]
fn test_prerelease_candidates_require_opt_in() {
    let mut source = SourceIndex::new();
    source.add(pkg("lib", "2.0.0-beta"));
    let app = pkg("app", "1.0.0").with_dependency(dep("lib>=1.0.0"));
    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);

    let err = resolver
        .resolve_install(&app, &ResolveOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Resolve(ResolveError::UnresolvedDependency { .. })
    ));

    let ops = resolver
        .resolve_install(&app, &ResolveOptions::default().with_prerelease())
        .unwrap();
    assert!(rendered(&ops).contains(&"install lib-2.0.0-beta".to_string()));
}

#[test]
fn test_platform_incompatible_candidates_skipped() {
    let mut source = SourceIndex::new();
    source.add(pkg("curl", "8.5.0").with_platform("macos-arm64"));
    source.add(pkg("curl", "8.4.0").with_platform("linux-x64"));
    let app = pkg("app", "1.0.0").with_dependency(dep("curl"));
    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);

    let ops = resolver
        .resolve_install(
            &app,
            &ResolveOptions::default().with_target_platform("linux-x64"),
        )
        .unwrap();

    let plan = rendered(&ops);
    assert!(plan.contains(&"install curl-8.4.0".to_string()));
    assert!(!plan.contains(&"install curl-8.5.0".to_string()));
}

#[test]
fn test_ignore_dependencies_installs_only_target() {
    let mut source = SourceIndex::new();
    source.add(pkg("lib", "1.0.0"));
    let app = pkg("app", "1.0.0").with_dependency(dep("lib"));
    let installed = InstalledSet::new();
    let resolver = Resolver::new(&installed, &source);

    let ops = resolver
        .resolve_install(&app, &ResolveOptions::default().with_ignore_dependencies())
        .unwrap();

    assert_eq!(rendered(&ops), ["install app-1.0.0"]);
}
