//! Version and constraint error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("invalid version constraint: {input}")]
    InvalidConstraint { input: String },

    #[error("invalid constraint bounds: minimum {min} conflicts with maximum {max}")]
    InvalidBounds { min: String, max: String },

    #[error("no version can satisfy both {left} and {right}")]
    EmptyIntersection { left: String, right: String },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersion { .. } => {
                Some("Use dotted numeric versions like 1.2.3 or 1.2.3.4-beta.")
            }
            Self::InvalidConstraint { .. } | Self::InvalidBounds { .. } => {
                Some("Use range constraints like >=1.2,<2.0 or an exact ==1.2.3.")
            }
            Self::EmptyIntersection { .. } => {
                Some("Relax one of the conflicting version requirements.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::InvalidConstraint { .. } => "version.invalid_constraint",
            Self::InvalidBounds { .. } => "version.invalid_bounds",
            Self::EmptyIntersection { .. } => "version.empty_intersection",
        };
        Some(code)
    }
}
