//! # Core Type Definitions
//!
//! This module contains the plain data types shared across the engine:
//! - Axis identifiers (`AxisKey`)
//! - Value and field payloads (`Scalar`, `FieldMap`)
//! - Axis cardinality (`Cardinality`)
//! - The default output element (`Event`)
//! - Error types (`SweepError`)
//!
//! ## Determinism Guarantees
//!
//! All collection-backed types use `BTreeMap` so that field and index
//! ordering is stable across runs. Floats are carried, compared and
//! serialized but never computed with inside the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// AXIS IDENTIFIERS
// =============================================================================

/// Unique identifier for one axis of variation.
///
/// Keys must be unique among the axes declared by a single node; a nested
/// node reuses a key to override the ancestor axis of the same name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AxisKey(pub String);

impl AxisKey {
    /// Create a new axis key from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AxisKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// SCALAR VALUES
// =============================================================================

/// A single axis value or event field payload.
///
/// The engine never interprets scalars; it records them in the traversal
/// index and hands them to axis contributions and event consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating-point value (stored, never arithmetically combined).
    Float(f64),
    /// Text value.
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Partial event data contributed by one axis or node.
///
/// Keyed by field name; later (deeper) contributions override same-named
/// fields from shallower ones during assembly.
pub type FieldMap = BTreeMap<String, Scalar>;

// =============================================================================
// CARDINALITY
// =============================================================================

/// Number of values an axis will yield.
///
/// `Unbounded` axes iterate forever; any branch containing one never
/// terminates and must be consumed lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// The axis yields exactly this many values.
    Finite(usize),
    /// The axis yields values indefinitely.
    Unbounded,
}

impl Cardinality {
    /// Whether the axis terminates on its own.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// The finite length, if any.
    #[must_use]
    pub const fn as_finite(self) -> Option<usize> {
        match self {
            Self::Finite(n) => Some(n),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

// =============================================================================
// EVENT
// =============================================================================

/// One fully assembled output element.
///
/// `index` records the integer position of every axis actually visited on
/// the branch that produced this event; axes overridden by a nested node
/// are absent. `fields` is the merged result of all node and axis
/// contributions on that branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Event {
    /// Axis key -> position for every axis visited on this branch.
    pub index: BTreeMap<AxisKey, usize>,
    /// Merged contribution fields.
    pub fields: FieldMap,
}

impl Event {
    /// Create a new empty event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The position of the given axis on this event's branch, if visited.
    #[must_use]
    pub fn position(&self, key: &AxisKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// The value of a contribution field, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Scalar> {
        self.fields.get(name)
    }

    /// Return a copy of this event with one field set.
    ///
    /// Transform stages use this instead of mutating their input.
    #[must_use]
    pub fn with_field(&self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        let mut out = self.clone();
        out.fields.insert(name.into(), value.into());
        out
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while building or expanding a sweep.
///
/// - Configuration errors surface at graph construction or on the first
///   traversal entry that reaches the offending node.
/// - All other errors surface synchronously on the pull that triggered
///   them; there is no implicit retry. After an error the stream is fused.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Two axes in one node share a key.
    #[error("duplicate axis key: {0}")]
    DuplicateAxisKey(AxisKey),

    /// An explicit ordering names a key the node does not declare.
    #[error("axis order references unknown key: {0}")]
    UnknownOrderKey(AxisKey),

    /// An explicit ordering omits one of the node's axes.
    #[error("axis order omits axis: {0}")]
    IncompleteOrder(AxisKey),

    /// An explicit ordering lists a key twice.
    #[error("duplicate entry in axis order: {0}")]
    DuplicateOrderKey(AxisKey),

    /// A nested node appears on its own traversal path.
    #[error("nesting cycle: node revisited on its own traversal path")]
    NestingCycle,

    /// A nested node has no representative value for its parent axis.
    #[error("nested sequence yielded by axis {0} has no value")]
    NestedValueMissing(AxisKey),

    /// An axis pruning predicate failed.
    #[error("pruning failed for axis {axis}: {reason}")]
    Pruning {
        /// Axis whose predicate failed.
        axis: AxisKey,
        /// Implementation-supplied failure description.
        reason: String,
    },

    /// An axis contribution failed.
    #[error("contribution failed for axis {axis}: {reason}")]
    Contribution {
        /// Axis whose contribution failed.
        axis: AxisKey,
        /// Implementation-supplied failure description.
        reason: String,
    },

    /// Event assembly failed.
    #[error("event assembly failed: {0}")]
    Assembly(String),

    /// A transform stage failed; the pipeline is aborted from that point.
    #[error("transform stage {stage} failed: {reason}")]
    Transform {
        /// Name of the failing stage.
        stage: String,
        /// Stage-supplied failure description.
        reason: String,
    },
}

// =============================================================================
// TESTS
// =============================================================================
