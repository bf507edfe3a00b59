//! Resolution and planning error types
//!
//! Every variant aborts the `resolve_operations` call that raised it;
//! partial operation lists are discarded, never returned.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ResolveError {
    #[error("unable to resolve dependency: {name} {constraint}")]
    UnresolvedDependency { name: String, constraint: String },

    #[error("conflict installing {package}: incompatible with installed {}", .blocking.join(", "))]
    VersionConflict {
        package: String,
        blocking: Vec<String>,
    },

    #[error("downgrade rejected: {package} {installed} is installed, {requested} was requested")]
    DowngradeRejected {
        package: String,
        installed: String,
        requested: String,
    },

    #[error("unable to uninstall {package}: still required by {}", .dependents.join(", "))]
    BlockedByDependents {
        package: String,
        dependents: Vec<String>,
    },

    #[error("dependency walk budget of {budget} exceeded at {package}")]
    CycleBudgetExceeded { package: String, budget: usize },

    #[error("package not installed: {package}")]
    NotInstalled { package: String },
}

impl UserFacingError for ResolveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnresolvedDependency { .. } => {
                Some("Check the package source for a version matching the constraint.")
            }
            Self::VersionConflict { .. } => {
                Some("Update the blocking packages first, or install a compatible version.")
            }
            Self::DowngradeRejected { .. } => {
                Some("Uninstall the newer version before installing an older one.")
            }
            Self::BlockedByDependents { .. } => {
                Some("Remove the dependent packages first, or pass --force.")
            }
            Self::CycleBudgetExceeded { .. } | Self::NotInstalled { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnresolvedDependency { .. } => "resolve.unresolved_dependency",
            Self::VersionConflict { .. } => "resolve.version_conflict",
            Self::DowngradeRejected { .. } => "resolve.downgrade_rejected",
            Self::BlockedByDependents { .. } => "resolve.blocked_by_dependents",
            Self::CycleBudgetExceeded { .. } => "resolve.cycle_budget_exceeded",
            Self::NotInstalled { .. } => "resolve.not_installed",
        };
        Some(code)
    }
}
