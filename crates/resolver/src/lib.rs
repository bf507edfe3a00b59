#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency resolution and operation planning for the sprout package
//! manager
//!
//! Given a target package and a view of the environment, the resolver
//! computes an ordered list of install/uninstall operations that brings
//! the environment to a consistent state without violating the version
//! constraints of packages it does not touch. Planning is synchronous,
//! deterministic, and side-effect free: nothing is mutated until a
//! caller executes the returned plan.

mod access;
mod index;
mod install;
mod operations;
mod uninstall;
mod walker;

pub use access::{
    select_safe_version, AggregateConstraints, ConstraintProvider, DeclaredPlatforms,
    InstalledPackages, NoConstraints, PinnedConstraints, PlatformFilter, SourcePackages,
};
pub use index::{InstalledSet, SourceIndex};
pub use operations::{reduce, Action, Operation, OperationList};

use access::Environment;
use install::InstallWalk;
use sprout_errors::{Error, ResolveError};
use sprout_types::{PackageNode, PlatformTag};
use uninstall::UninstallWalk;
use walker::Walker;

/// Options for a single resolution call
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Plan only the target itself, not its dependencies
    pub ignore_dependencies: bool,
    /// Allow pre-release versions when selecting source candidates
    pub allow_prerelease: bool,
    /// Also remove dependencies orphaned by an uninstall
    pub remove_dependencies: bool,
    /// Uninstall even when other packages still depend on the target
    pub force: bool,
    /// Platform candidates must declare support for; `None` disables
    /// the check
    pub target_platform: Option<PlatformTag>,
}

impl ResolveOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ignore_dependencies(mut self) -> Self {
        self.ignore_dependencies = true;
        self
    }

    #[must_use]
    pub fn with_prerelease(mut self) -> Self {
        self.allow_prerelease = true;
        self
    }

    #[must_use]
    pub fn with_remove_dependencies(mut self) -> Self {
        self.remove_dependencies = true;
        self
    }

    #[must_use]
    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    #[must_use]
    pub fn with_target_platform(mut self, tag: impl Into<PlatformTag>) -> Self {
        self.target_platform = Some(tag.into());
        self
    }
}

/// Operation planner over a package environment
///
/// The resolver borrows its environment and is cheap to construct; each
/// `resolve_*` call runs with fresh walk state, so a resolver is
/// reusable across sequential calls.
pub struct Resolver<'a> {
    env: Environment<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(installed: &'a dyn InstalledPackages, source: &'a dyn SourcePackages) -> Self {
        Self {
            env: Environment {
                installed,
                source,
                constraints: &NoConstraints,
                platform: &DeclaredPlatforms,
            },
        }
    }

    /// Restrict candidate selection with externally pinned constraints
    #[must_use]
    pub fn with_constraint_provider(mut self, constraints: &'a dyn ConstraintProvider) -> Self {
        self.env.constraints = constraints;
        self
    }

    /// Replace the platform compatibility check
    #[must_use]
    pub fn with_platform_filter(mut self, platform: &'a dyn PlatformFilter) -> Self {
        self.env.platform = platform;
        self
    }

    /// Plan the operations that install `target` and everything needed
    /// to keep the environment consistent
    ///
    /// # Errors
    ///
    /// Fails with `ResolveError` when a dependency cannot be resolved,
    /// a version conflict has no viable replacement chain, or the
    /// target would downgrade an installed package. On failure the
    /// partial plan is discarded.
    pub fn resolve_install(
        &self,
        target: &PackageNode,
        options: &ResolveOptions,
    ) -> Result<OperationList, Error> {
        tracing::debug!(target = %target, "planning install");
        let mut hooks = InstallWalk::new(self.env, options);
        let mut walker = Walker::new(self.env, options, !options.ignore_dependencies);
        walker.walk(&mut hooks, target)?;
        Ok(hooks.into_operations().reduced())
    }

    /// Plan the operations that remove `target` and, with
    /// `remove_dependencies`, its orphaned dependencies
    ///
    /// # Errors
    ///
    /// Fails with `ResolveError::NotInstalled` when the exact target is
    /// not present, or `ResolveError::BlockedByDependents` when other
    /// packages still require it and `force` is not set.
    pub fn resolve_uninstall(
        &self,
        target: &PackageNode,
        options: &ResolveOptions,
    ) -> Result<OperationList, Error> {
        // The environment's record of the package is authoritative for
        // the walk; the caller names exactly what to remove
        let installed = self
            .env
            .installed
            .find_by_name(target.name())
            .filter(|node| node.version() == target.version())
            .ok_or_else(|| ResolveError::NotInstalled {
                package: target.to_string(),
            })?;
        tracing::debug!(target = %installed, "planning uninstall");
        let mut ops = OperationList::new();
        let mut hooks = UninstallWalk::new(self.env, &mut ops, installed.id(), options.force);
        let mut walker = Walker::new(self.env, options, options.remove_dependencies);
        walker.walk(&mut hooks, &installed)?;
        Ok(ops.reduced())
    }
}
