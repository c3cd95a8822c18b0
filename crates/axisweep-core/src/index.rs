//! # Axes Index
//!
//! The ordered prefix snapshot built along one traversal branch.
//!
//! Entries are appended in effective axis order: position 0 is the
//! outermost (slowest-varying) axis. The traversal truncates and re-pushes
//! entries as it backtracks, so a single [`AxesIndex`] instance serves an
//! entire run. Pruning predicates receive the prefix including the querying
//! axis's own provisional entry.

use crate::axis::AxisSource;
use crate::node::SequenceNode;
use crate::types::{AxisKey, Scalar};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// AXIS ENTRY
// =============================================================================

/// One resolved (position, value) pair for an axis on the current branch.
#[derive(Clone)]
pub struct AxisEntry {
    /// Key of the resolved axis.
    pub key: AxisKey,
    /// Position of the value within the axis's own iteration order.
    pub position: usize,
    /// The resolved value; for a nested sequence, its representative value.
    pub value: Scalar,
    /// The axis that produced this entry (the override on nested branches).
    pub axis: Arc<dyn AxisSource>,
}

impl AxisEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(position: usize, value: Scalar, axis: Arc<dyn AxisSource>) -> Self {
        Self {
            key: axis.axis_key().clone(),
            position,
            value,
            axis,
        }
    }
}

impl fmt::Debug for AxisEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisEntry")
            .field("key", &self.key)
            .field("position", &self.position)
            .field("value", &self.value)
            .finish()
    }
}

// =============================================================================
// AXES INDEX
// =============================================================================

/// Ordered snapshot of the axes resolved so far on one branch.
///
/// Keys are unique within the index: an override replaces the ancestor axis
/// before the ancestor ever records an entry on that branch, so no
/// duplicate-key handling is needed here.
#[derive(Debug, Clone, Default)]
pub struct AxesIndex {
    entries: Vec<AxisEntry>,
}

impl AxesIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolved entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no axes have been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry at the next depth.
    pub fn push(&mut self, entry: AxisEntry) {
        self.entries.push(entry);
    }

    /// Drop entries deeper than `depth`, keeping the 0..depth prefix.
    pub fn truncate(&mut self, depth: usize) {
        self.entries.truncate(depth);
    }

    /// All entries in effective order.
    #[must_use]
    pub fn entries(&self) -> &[AxisEntry] {
        &self.entries
    }

    /// The deepest entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&AxisEntry> {
        self.entries.last()
    }

    /// Look up an entry by axis key.
    #[must_use]
    pub fn get(&self, key: &AxisKey) -> Option<&AxisEntry> {
        self.entries.iter().find(|entry| &entry.key == key)
    }

    /// The resolved position of an axis, if present.
    #[must_use]
    pub fn position(&self, key: &AxisKey) -> Option<usize> {
        self.get(key).map(|entry| entry.position)
    }

    /// The resolved value of an axis, if present.
    #[must_use]
    pub fn value(&self, key: &AxisKey) -> Option<&Scalar> {
        self.get(key).map(|entry| &entry.value)
    }

    /// Extract the axis key -> position mapping for event indices.
    #[must_use]
    pub fn positions(&self) -> BTreeMap<AxisKey, usize> {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.position))
            .collect()
    }
}

// =============================================================================
// ACTIVE NODE
// =============================================================================

/// One entry of the active-node stack: a sequence node entered on the
/// current branch and the index depth at which it was entered.
///
/// The root is entered at depth 0; a nested node yielded by the axis at
/// index position d is entered at depth d + 1. Assembly uses the depth to
/// merge node field payloads in traversal order.
#[derive(Debug, Clone)]
pub struct ActiveNode {
    /// The node itself.
    pub node: Arc<SequenceNode>,
    /// Index length at the moment the node was entered.
    pub depth: usize,
}

impl ActiveNode {
    /// Create a new stack entry.
    #[must_use]
    pub fn new(node: Arc<SequenceNode>, depth: usize) -> Self {
        Self { node, depth }
    }
}

// =============================================================================
// TESTS
// =============================================================================
