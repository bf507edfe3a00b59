//! Install planning with conflict detection and resolution
//!
//! Visiting a node whose name is already installed at another version
//! triggers conflict handling: dependents broken by the new version are
//! upgraded to compatible releases when possible, a plain supersede
//! otherwise, and a downgrade is refused outright. Install operations
//! are emitted post-order, so dependencies precede their dependents in
//! the plan.

use crate::access::Environment;
use crate::operations::{Action, Operation, OperationList};
use crate::uninstall::UninstallWalk;
use crate::walker::{Visit, WalkHooks, Walker};
use crate::ResolveOptions;
use sprout_errors::{Error, ResolveError};
use sprout_types::{PackageDependency, PackageName, PackageNode, VersionConstraint};

pub(crate) struct InstallWalk<'a> {
    env: Environment<'a>,
    options: &'a ResolveOptions,
    ops: OperationList,
    /// Call-local pins added while resolving replacement dependents;
    /// popped when the nested walk returns, never shared
    pins: Vec<(PackageName, VersionConstraint)>,
}

impl<'a> InstallWalk<'a> {
    pub fn new(env: Environment<'a>, options: &'a ResolveOptions) -> Self {
        Self {
            env,
            options,
            ops: OperationList::new(),
            pins: Vec::new(),
        }
    }

    pub fn into_operations(self) -> OperationList {
        self.ops
    }

    /// The externally-imposed constraint for a name: the constraint
    /// provider's pin intersected with any cascade-local pins
    fn external_constraint(&self, name: &PackageName) -> Result<Option<VersionConstraint>, Error> {
        let mut combined = self.env.constraints.constraint_for(name)?;
        for (pinned_name, pin) in &self.pins {
            if pinned_name == name {
                combined = Some(match combined {
                    Some(current) => current.intersect(pin)?,
                    None => pin.clone(),
                });
            }
        }
        Ok(combined)
    }

    /// Installed packages whose declared constraint on `node`'s name
    /// rejects the version being installed. Dependents already queued
    /// for removal are out of the picture.
    fn incompatible_dependents(&self, node: &PackageNode) -> Vec<PackageNode> {
        self.env
            .installed
            .dependents_of(node.name())
            .into_iter()
            .filter(|dependent| !self.ops.contains(Action::Uninstall, &dependent.id()))
            .filter(|dependent| {
                dependent
                    .dependencies()
                    .iter()
                    .any(|dep| dep.name() == node.name() && !dep.admits(node.version()))
            })
            .collect()
    }

    /// Find a newer version of `dependent` that accepts `node`'s version
    /// and is itself acceptable under external pins
    fn find_replacement(
        &self,
        dependent: &PackageNode,
        node: &PackageNode,
    ) -> Result<Option<PackageNode>, Error> {
        let external = self.external_constraint(dependent.name())?;
        let mut best: Option<PackageNode> = None;
        for candidate in self.env.source.find_all(dependent.name()) {
            if candidate.version() <= dependent.version() {
                continue;
            }
            if candidate.is_prerelease() && !self.options.allow_prerelease {
                continue;
            }
            if let Some(constraint) = &external {
                if !constraint.satisfies(candidate.version()) {
                    continue;
                }
            }
            if !self.platform_compatible(&candidate) {
                continue;
            }
            let accepts_new_version = candidate
                .dependencies()
                .iter()
                .any(|dep| dep.name() == node.name() && dep.admits(node.version()));
            if !accepts_new_version {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|current| candidate.version() > current.version())
            {
                best = Some(candidate);
            }
        }
        Ok(best)
    }

    fn platform_compatible(&self, candidate: &PackageNode) -> bool {
        match &self.options.target_platform {
            Some(tag) => self.env.platform.is_compatible(candidate, tag),
            None => true,
        }
    }

    /// Queue removal of an installed package, scoped to its own
    /// dependency subtree unless dependencies are ignored
    fn queue_uninstall(&mut self, package: &PackageNode) -> Result<(), Error> {
        if self.ops.contains(Action::Uninstall, &package.id()) {
            return Ok(());
        }
        let nested_options = ResolveOptions::default();
        let mut walker = Walker::new(
            self.env,
            &nested_options,
            !self.options.ignore_dependencies,
        );
        let mut hooks = UninstallWalk::new(self.env, &mut self.ops, package.id(), true);
        walker.walk(&mut hooks, package)
    }

    /// Upgrade every incompatible dependent to a release that accepts
    /// the new version; all must have one or the install fails
    fn resolve_conflict(
        &mut self,
        node: &PackageNode,
        dependents: Vec<PackageNode>,
    ) -> Result<(), Error> {
        let mut replacements = Vec::new();
        let mut blocking = Vec::new();
        for dependent in dependents {
            match self.find_replacement(&dependent, node)? {
                Some(replacement) => replacements.push((dependent, replacement)),
                None => blocking.push(dependent.to_string()),
            }
        }
        if !blocking.is_empty() {
            return Err(ResolveError::VersionConflict {
                package: node.to_string(),
                blocking,
            }
            .into());
        }

        for (old, replacement) in &replacements {
            tracing::debug!(old = %old, new = %replacement, "updating dependent to resolve conflict");
            self.queue_uninstall(old)?;
        }

        // Pin the identifier so replacement subtrees resolve to the
        // exact version being installed
        self.pins.push((
            node.name().clone(),
            VersionConstraint::exact(node.version().clone()),
        ));
        let outcome = self.walk_replacements(&replacements);
        self.pins.pop();
        outcome
    }

    fn walk_replacements(
        &mut self,
        replacements: &[(PackageNode, PackageNode)],
    ) -> Result<(), Error> {
        for (_, replacement) in replacements {
            let mut walker = Walker::new(
                self.env,
                self.options,
                !self.options.ignore_dependencies,
            );
            walker.walk(self, replacement)?;
        }
        Ok(())
    }
}

impl WalkHooks for InstallWalk<'_> {
    fn before_visit(
        &mut self,
        _walker: &mut Walker<'_>,
        node: &PackageNode,
    ) -> Result<Visit, Error> {
        let Some(conflict) = self.env.installed.find_by_name(node.name()) else {
            return Ok(Visit::Descend);
        };
        if conflict.version() == node.version() {
            // Already installed at this exact version
            return Ok(Visit::Descend);
        }

        let dependents = self.incompatible_dependents(node);
        if dependents.is_empty() {
            if node.version() < conflict.version() {
                return Err(ResolveError::DowngradeRejected {
                    package: node.name().to_string(),
                    installed: conflict.version().to_string(),
                    requested: node.version().to_string(),
                }
                .into());
            }
            tracing::debug!(package = %node, replaces = %conflict, "superseding installed version");
            self.queue_uninstall(&conflict)?;
        } else {
            self.resolve_conflict(node, dependents)?;
        }
        Ok(Visit::Descend)
    }

    fn after_visit(&mut self, _walker: &mut Walker<'_>, node: &PackageNode) -> Result<(), Error> {
        if self.env.installed.exists_exact(node.name(), node.version()) {
            // Satisfied by the environment as-is; drop any pending
            // removal queued for it
            self.ops.remove(Action::Uninstall, &node.id());
        } else {
            self.ops.add(Operation::install(node.clone()));
        }
        Ok(())
    }

    fn resolve_dependency(
        &mut self,
        walker: &mut Walker<'_>,
        dependency: &PackageDependency,
    ) -> Result<Option<PackageNode>, Error> {
        let external = self.external_constraint(dependency.name())?;
        let (candidate, effective) =
            walker.resolve_from_environment(dependency, external.as_ref())?;
        match candidate {
            Some(node) => Ok(Some(node)),
            None => self.on_resolve_error(dependency, &effective),
        }
    }
}
