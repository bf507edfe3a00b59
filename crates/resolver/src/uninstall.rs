//! Uninstall planning with dependent protection
//!
//! The target is removed together with dependencies that would become
//! orphaned, and nothing else: a dependency still required by a package
//! outside the current removal run is kept. Removal operations are
//! queued post-order, so every removed dependency's uninstall precedes
//! the root's in the emitted list.

use crate::access::Environment;
use crate::operations::{Action, Operation, OperationList};
use crate::walker::{Visit, VisitMarker, WalkHooks, Walker};
use sprout_errors::{Error, ResolveError};
use sprout_types::{PackageDependency, PackageId, PackageNode};

pub(crate) struct UninstallWalk<'a, 'ops> {
    env: Environment<'a>,
    ops: &'ops mut OperationList,
    root: PackageId,
    force: bool,
}

impl<'a, 'ops> UninstallWalk<'a, 'ops> {
    pub fn new(
        env: Environment<'a>,
        ops: &'ops mut OperationList,
        root: PackageId,
        force: bool,
    ) -> Self {
        Self {
            env,
            ops,
            root,
            force,
        }
    }

    /// Installed dependents of `node` outside the current removal run.
    /// A dependent is part of the run when this walk has reached it or
    /// an uninstall is already queued for it.
    fn remaining_dependents(&self, walker: &Walker<'_>, node: &PackageNode) -> Vec<PackageNode> {
        self.env
            .installed
            .dependents_of(node.name())
            .into_iter()
            .filter(|dependent| walker.marker(&dependent.id()) == VisitMarker::NotVisited)
            .filter(|dependent| !self.ops.contains(Action::Uninstall, &dependent.id()))
            .collect()
    }
}

impl WalkHooks for UninstallWalk<'_, '_> {
    fn before_visit(
        &mut self,
        walker: &mut Walker<'_>,
        node: &PackageNode,
    ) -> Result<Visit, Error> {
        let dependents = self.remaining_dependents(walker, node);
        if dependents.is_empty() {
            return Ok(Visit::Descend);
        }

        if node.id() == self.root {
            if self.force {
                tracing::debug!(package = %node, "removing despite remaining dependents");
                return Ok(Visit::Descend);
            }
            return Err(ResolveError::BlockedByDependents {
                package: node.to_string(),
                dependents: dependents.iter().map(ToString::to_string).collect(),
            }
            .into());
        }

        tracing::warn!(package = %node, "keeping dependency still required by other packages");
        Ok(Visit::Skip)
    }

    fn after_visit(&mut self, _walker: &mut Walker<'_>, node: &PackageNode) -> Result<(), Error> {
        self.ops.add(Operation::uninstall(node.clone()));
        Ok(())
    }

    fn resolve_dependency(
        &mut self,
        _walker: &mut Walker<'_>,
        dependency: &PackageDependency,
    ) -> Result<Option<PackageNode>, Error> {
        // Removal follows what is actually present in the environment;
        // a dependency that is not installed is simply skipped
        Ok(self.env.installed.find_by_name(dependency.name()))
    }
}
