#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the sprout operation planner
//!
//! This crate provides the value types used throughout the system:
//! versions, version range constraints, and package graph nodes.

pub mod package;
pub mod version;

// Re-export commonly used types
pub use package::{PackageDependency, PackageId, PackageName, PackageNode, PlatformTag};
pub use version::{Version, VersionConstraint};
