//! Planned operations and list reduction
//!
//! Planners record intended work as an append-ordered list of
//! install/uninstall operations. Nothing here mutates the environment;
//! executing the list is the caller's concern, and only after the whole
//! plan has been computed and reduced.

use serde::{Deserialize, Serialize};
use sprout_types::{PackageId, PackageNode};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The action an operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Uninstall,
}

impl Action {
    /// The action that cancels this one
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Install => Self::Uninstall,
            Self::Uninstall => Self::Install,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// A planned action on one specific (name, version). Immutable once
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    action: Action,
    package: PackageNode,
}

impl Operation {
    pub fn new(action: Action, package: PackageNode) -> Self {
        Self { action, package }
    }

    pub fn install(package: PackageNode) -> Self {
        Self::new(Action::Install, package)
    }

    pub fn uninstall(package: PackageNode) -> Self {
        Self::new(Action::Uninstall, package)
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn package(&self) -> &PackageNode {
        &self.package
    }

    fn key(&self) -> OpKey {
        OpKey {
            action: self.action,
            id: self.package.id(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.package)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OpKey {
    action: Action,
    id: PackageId,
}

/// Append-ordered operation sequence with O(1) duplicate detection
///
/// Adds are idempotent per (action, name, version); the planners rely on
/// that to keep the list free of duplicates.
#[derive(Debug, Clone, Default)]
pub struct OperationList {
    ops: Vec<Operation>,
    index: HashSet<OpKey>,
}

impl OperationList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation unless an identical one is already queued.
    /// Returns whether the operation was added.
    pub fn add(&mut self, operation: Operation) -> bool {
        if !self.index.insert(operation.key()) {
            return false;
        }
        self.ops.push(operation);
        true
    }

    /// Remove a queued operation. Returns whether one was removed.
    pub fn remove(&mut self, action: Action, id: &PackageId) -> bool {
        let key = OpKey {
            action,
            id: id.clone(),
        };
        if !self.index.remove(&key) {
            return false;
        }
        self.ops
            .retain(|op| op.action != action || op.package.id() != *id);
        true
    }

    #[must_use]
    pub fn contains(&self, action: Action, id: &PackageId) -> bool {
        self.index.contains(&OpKey {
            action,
            id: id.clone(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.ops.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Operation> {
        self.ops
    }

    /// Cancel matched install/uninstall pairs, keeping survivors in
    /// insertion order
    #[must_use]
    pub fn reduced(self) -> Self {
        let mut out = Self::new();
        for op in reduce(self.ops) {
            out.add(op);
        }
        out
    }
}

impl<'a> IntoIterator for &'a OperationList {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Cancel matched install/uninstall pairs over the same (name, version)
///
/// This is multiset cancellation: exactly `min(installs, uninstalls)`
/// pairs cancel per identity, earliest occurrences first, and survivors
/// keep their original relative order.
#[must_use]
pub fn reduce(operations: Vec<Operation>) -> Vec<Operation> {
    let mut counts: HashMap<OpKey, usize> = HashMap::new();
    for op in &operations {
        *counts.entry(op.key()).or_default() += 1;
    }

    let mut to_skip: HashMap<OpKey, usize> = HashMap::new();
    for (key, count) in &counts {
        if key.action != Action::Install {
            continue;
        }
        let opposite = OpKey {
            action: Action::Uninstall,
            id: key.id.clone(),
        };
        let pairs = (*count).min(counts.get(&opposite).copied().unwrap_or(0));
        if pairs > 0 {
            to_skip.insert(key.clone(), pairs);
            to_skip.insert(opposite, pairs);
        }
    }

    let mut survivors = Vec::with_capacity(operations.len());
    for op in operations {
        if let Some(remaining) = to_skip.get_mut(&op.key()) {
            if *remaining > 0 {
                *remaining -= 1;
                continue;
            }
        }
        survivors.push(op);
    }
    survivors
}
