//! # Axis Sources
//!
//! The capability seam for one dimension of variation.
//!
//! An [`AxisSource`] produces a lazy, restartable, possibly infinite
//! sequence of steps. A step is either a plain scalar value or a nested
//! [`SequenceNode`], which the traversal recurses into with override
//! semantics.
//!
//! Two general-purpose sources live here:
//! - [`ValueAxis`] — finite, explicit steps.
//! - [`TickAxis`] — stepped integer counter, unbounded unless limited.
//!
//! Richer axis kinds (timing plans, stage grids, channel tables) implement
//! the trait in downstream crates; the engine never special-cases them.

use crate::index::AxesIndex;
use crate::node::SequenceNode;
use crate::types::{AxisKey, Cardinality, FieldMap, Scalar, SweepError};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// AXIS STEP
// =============================================================================

/// One element yielded by an axis iterator.
#[derive(Debug, Clone)]
pub enum AxisStep {
    /// A plain value for this axis.
    Value(Scalar),
    /// A nested sequence; its axes override same-keyed ancestors for the
    /// remainder of the branch.
    Nested(Arc<SequenceNode>),
}

impl AxisStep {
    /// Wrap a plain value.
    #[must_use]
    pub fn value(v: impl Into<Scalar>) -> Self {
        Self::Value(v.into())
    }

    /// Wrap a nested sequence.
    #[must_use]
    pub fn nested(node: Arc<SequenceNode>) -> Self {
        Self::Nested(node)
    }
}

/// Owning iterator over the steps of one axis.
///
/// Owning, so that restarting an axis (required for nested re-iteration)
/// never depends on shared mutable state.
pub type AxisIter = Box<dyn Iterator<Item = AxisStep> + Send>;

// =============================================================================
// AXISSOURCE TRAIT
// =============================================================================

/// Capability abstraction for one dimension of a sweep.
///
/// Implementations must be free of externally visible side effects:
/// concurrent or repeated iterations over the same graph must not
/// interfere, and every call to [`AxisSource::iterate`] restarts from the
/// first step with no memory of prior runs.
pub trait AxisSource: Send + Sync {
    /// The unique key identifying this axis within its node.
    fn axis_key(&self) -> &AxisKey;

    /// Begin a fresh iteration over this axis's steps.
    fn iterate(&self) -> AxisIter;

    /// The number of steps this axis yields.
    fn length(&self) -> Cardinality;

    /// Decide whether to prune the branch starting at this axis's current
    /// provisional entry.
    ///
    /// `prefix` contains every shallower entry plus this axis's own
    /// provisional (position, value) entry, in effective order. Returning
    /// `true` abandons the value and its entire sub-tree.
    fn should_skip(&self, _prefix: &AxesIndex) -> Result<bool, SweepError> {
        Ok(false)
    }

    /// Contribute partial event data for this axis's resolved value.
    ///
    /// `index` is the resolved prefix up to and including this axis.
    /// The default contributes nothing.
    fn contribute(&self, _value: &Scalar, _index: &AxesIndex) -> Result<FieldMap, SweepError> {
        Ok(FieldMap::new())
    }

    /// Nested nodes reachable from this axis without iterating values.
    ///
    /// Used by finiteness queries; sources whose steps can contain nested
    /// nodes must report them here.
    fn nested_nodes(&self) -> Vec<Arc<SequenceNode>> {
        Vec::new()
    }
}

impl fmt::Debug for dyn AxisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisSource")
            .field("axis_key", self.axis_key())
            .field("length", &self.length())
            .finish()
    }
}

// =============================================================================
// VALUE AXIS
// =============================================================================

/// A finite axis over explicit steps.
///
/// Steps may be plain scalars or nested sequences. When a field name is
/// set, the axis contributes `{field: value}` for each resolved step.
#[derive(Debug, Clone)]
pub struct ValueAxis {
    key: AxisKey,
    steps: Vec<AxisStep>,
    field: Option<String>,
}

impl ValueAxis {
    /// Create an axis over plain scalar values.
    #[must_use]
    pub fn new(
        key: impl Into<AxisKey>,
        values: impl IntoIterator<Item = impl Into<Scalar>>,
    ) -> Self {
        Self {
            key: key.into(),
            steps: values.into_iter().map(|v| AxisStep::Value(v.into())).collect(),
            field: None,
        }
    }

    /// Create an axis over pre-built steps (scalars and/or nested nodes).
    #[must_use]
    pub fn from_steps(key: impl Into<AxisKey>, steps: Vec<AxisStep>) -> Self {
        Self {
            key: key.into(),
            steps,
            field: None,
        }
    }

    /// Create an axis counting `0..count`.
    #[must_use]
    pub fn counting(key: impl Into<AxisKey>, count: usize) -> Self {
        Self::new(key, (0..count).map(|i| i as i64))
    }

    /// Contribute each resolved value under the given field name.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.field = Some(name.into());
        self
    }
}

impl AxisSource for ValueAxis {
    fn axis_key(&self) -> &AxisKey {
        &self.key
    }

    fn iterate(&self) -> AxisIter {
        Box::new(self.steps.clone().into_iter())
    }

    fn length(&self) -> Cardinality {
        Cardinality::Finite(self.steps.len())
    }

    fn contribute(&self, value: &Scalar, _index: &AxesIndex) -> Result<FieldMap, SweepError> {
        let mut fields = FieldMap::new();
        if let Some(name) = &self.field {
            fields.insert(name.clone(), value.clone());
        }
        Ok(fields)
    }

    fn nested_nodes(&self) -> Vec<Arc<SequenceNode>> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                AxisStep::Nested(node) => Some(Arc::clone(node)),
                AxisStep::Value(_) => None,
            })
            .collect()
    }
}

// =============================================================================
// TICK AXIS
// =============================================================================

/// A stepped integer counter, unbounded unless limited.
///
/// Yields `start`, `start + step`, `start + 2*step`, ... using saturating
/// arithmetic. With no limit it reports [`Cardinality::Unbounded`] and
/// iterates forever; consumers must pull lazily.
#[derive(Debug, Clone)]
pub struct TickAxis {
    key: AxisKey,
    start: i64,
    step: i64,
    limit: Option<usize>,
    field: Option<String>,
}

impl TickAxis {
    /// Create an unbounded counter starting at 0 with step 1.
    #[must_use]
    pub fn new(key: impl Into<AxisKey>) -> Self {
        Self {
            key: key.into(),
            start: 0,
            step: 1,
            limit: None,
            field: None,
        }
    }

    /// Set the first tick value.
    #[must_use]
    pub const fn with_start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    /// Set the increment between ticks.
    #[must_use]
    pub const fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Make the axis finite with exactly `limit` ticks.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Contribute each resolved tick under the given field name.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.field = Some(name.into());
        self
    }
}

impl AxisSource for TickAxis {
    fn axis_key(&self) -> &AxisKey {
        &self.key
    }

    fn iterate(&self) -> AxisIter {
        let start = self.start;
        let step = self.step;
        let ticks = (0u64..).map(move |i| {
            AxisStep::Value(Scalar::Int(
                start.saturating_add(step.saturating_mul(i as i64)),
            ))
        });
        match self.limit {
            Some(limit) => Box::new(ticks.take(limit)),
            None => Box::new(ticks),
        }
    }

    fn length(&self) -> Cardinality {
        self.limit.map_or(Cardinality::Unbounded, Cardinality::Finite)
    }

    fn contribute(&self, value: &Scalar, _index: &AxesIndex) -> Result<FieldMap, SweepError> {
        let mut fields = FieldMap::new();
        if let Some(name) = &self.field {
            fields.insert(name.clone(), value.clone());
        }
        Ok(fields)
    }
}

// =============================================================================
// TESTS
// =============================================================================
