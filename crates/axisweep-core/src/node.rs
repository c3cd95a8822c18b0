//! # Sequence Nodes
//!
//! A [`SequenceNode`] is one level of the declarative axis graph: an
//! ordered set of axes, an optional explicit ordering, an optional value
//! payload plus fixed fields (used when the node is nested inside another
//! axis), an optional assembler and a transform list.
//!
//! Nodes are immutable after construction and shared behind `Arc`, so one
//! graph can serve any number of concurrent iteration runs.
//!
//! ## Override resolution
//!
//! When an axis yields a nested node, the nested node's axes replace
//! same-keyed ancestor axes for the remainder of that branch. The merged
//! effective order is the nested node's own effective order first, then the
//! non-overridden ancestor axes in their existing relative order.

use crate::assemble::{DefaultAssembler, EventAssembler};
use crate::axis::AxisSource;
use crate::iter::SequenceIterator;
use crate::transform::{TransformPipeline, TransformStage};
use crate::types::{AxisKey, Cardinality, Event, FieldMap, Scalar, SweepError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Lazy, fallible stream of assembled and transformed events.
pub type EventStream = Box<dyn Iterator<Item = Result<Event, SweepError>> + Send>;

// =============================================================================
// SEQUENCE NODE
// =============================================================================

/// One node of the axis graph.
///
/// At the top level the `value` payload is ignored. When the node is
/// nested as an axis value, `value` is recorded as the parent axis's entry
/// for that branch, and `fields` is merged into every event of the branch
/// without adding cardinality and without being subject to pruning.
pub struct SequenceNode {
    axes: Vec<Arc<dyn AxisSource>>,
    order: Option<Vec<AxisKey>>,
    value: Option<Scalar>,
    fields: FieldMap,
    assembler: Option<Arc<dyn EventAssembler<Output = Event>>>,
    transforms: Vec<Arc<dyn TransformStage<Event>>>,
}

impl SequenceNode {
    /// Create a node over the given axes, in declaration order.
    ///
    /// Fails if two axes share a key.
    pub fn new(axes: Vec<Arc<dyn AxisSource>>) -> Result<Self, SweepError> {
        validate_axes(&axes)?;
        Ok(Self {
            axes,
            order: None,
            value: None,
            fields: FieldMap::new(),
            assembler: None,
            transforms: Vec::new(),
        })
    }

    /// Set an explicit axis ordering.
    ///
    /// The ordering must be exactly a permutation of this node's own axis
    /// keys: unknown, missing, and duplicate keys are all rejected.
    pub fn with_order(
        mut self,
        order: impl IntoIterator<Item = impl Into<AxisKey>>,
    ) -> Result<Self, SweepError> {
        let order: Vec<AxisKey> = order.into_iter().map(Into::into).collect();
        validate_order(&self.axes, &order)?;
        self.order = Some(order);
        Ok(self)
    }

    /// Set the representative value recorded for the parent axis when this
    /// node is nested.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Add a fixed field merged into every event on this node's branch.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Replace the default event assembler.
    #[must_use]
    pub fn with_assembler(mut self, assembler: Arc<dyn EventAssembler<Output = Event>>) -> Self {
        self.assembler = Some(assembler);
        self
    }

    /// Append a transform stage.
    ///
    /// Stages run in the order they were appended when this node is the
    /// root of iteration.
    #[must_use]
    pub fn with_transform(mut self, stage: Arc<dyn TransformStage<Event>>) -> Self {
        self.transforms.push(stage);
        self
    }

    /// The node's axes in declaration order.
    #[must_use]
    pub fn axes(&self) -> &[Arc<dyn AxisSource>] {
        &self.axes
    }

    /// The explicit ordering, if one was set.
    #[must_use]
    pub fn order(&self) -> Option<&[AxisKey]> {
        self.order.as_deref()
    }

    /// The representative value payload, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Scalar> {
        self.value.as_ref()
    }

    /// The fixed fields merged into every event on this node's branch.
    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// The node's axes in effective order.
    #[must_use]
    pub fn ordered_axes(&self) -> Vec<Arc<dyn AxisSource>> {
        match &self.order {
            None => self.axes.clone(),
            Some(order) => order
                .iter()
                .filter_map(|key| self.axes.iter().find(|ax| ax.axis_key() == key))
                .cloned()
                .collect(),
        }
    }

    /// Merge this (nested) node's axes with the remaining ancestor axes.
    ///
    /// Same-keyed ancestor axes are dropped; survivors keep their relative
    /// order and are scheduled after this node's own axes.
    pub(crate) fn merged_axes(
        &self,
        ancestor_rest: &[Arc<dyn AxisSource>],
    ) -> Vec<Arc<dyn AxisSource>> {
        let mut merged = self.ordered_axes();
        merged.extend(
            ancestor_rest
                .iter()
                .filter(|ancestor| {
                    !self
                        .axes
                        .iter()
                        .any(|own| own.axis_key() == ancestor.axis_key())
                })
                .cloned(),
        );
        merged
    }

    // -------------------------------------------------------------------------
    // CONSUMPTION BOUNDARY
    // -------------------------------------------------------------------------

    /// Stream this node's events through its transform pipeline.
    ///
    /// Lazy and restartable: each call starts a fresh run with no residual
    /// state, and an unbounded graph is served one pull at a time.
    #[must_use]
    pub fn events(self: &Arc<Self>) -> EventStream {
        let assembler: Arc<dyn EventAssembler<Output = Event>> = match &self.assembler {
            Some(assembler) => Arc::clone(assembler),
            None => Arc::new(DefaultAssembler),
        };
        let raw = SequenceIterator::new(Arc::clone(self), assembler);
        TransformPipeline::from_stages(self.transforms.clone()).apply(Box::new(raw))
    }

    /// Stream raw branch resolutions through a caller-supplied assembler.
    ///
    /// Bypasses the node's transform list; the traversal itself is
    /// identical to [`SequenceNode::events`].
    #[must_use]
    pub fn events_with<A: EventAssembler>(self: &Arc<Self>, assembler: A) -> SequenceIterator<A> {
        SequenceIterator::new(Arc::clone(self), assembler)
    }

    /// Per-axis cardinality of this node's own axes.
    #[must_use]
    pub fn lengths(&self) -> BTreeMap<AxisKey, Cardinality> {
        self.axes
            .iter()
            .map(|ax| (ax.axis_key().clone(), ax.length()))
            .collect()
    }

    /// Whether every axis reachable on every branch is finite.
    ///
    /// Walks axes and structurally reachable nested nodes only; no axis
    /// values are iterated.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        let mut visited = BTreeSet::new();
        self.is_finite_inner(&mut visited)
    }

    fn is_finite_inner(&self, visited: &mut BTreeSet<usize>) -> bool {
        if !visited.insert(std::ptr::from_ref(self) as usize) {
            // Node already accounted for on another branch.
            return true;
        }
        self.axes.iter().all(|ax| {
            ax.length().is_finite()
                && ax
                    .nested_nodes()
                    .iter()
                    .all(|nested| nested.is_finite_inner(visited))
        })
    }
}

impl fmt::Debug for SequenceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceNode")
            .field("axes", &self.axes.iter().map(|ax| ax.axis_key()).collect::<Vec<_>>())
            .field("order", &self.order)
            .field("value", &self.value)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_axes(axes: &[Arc<dyn AxisSource>]) -> Result<(), SweepError> {
    let mut seen = BTreeSet::new();
    for ax in axes {
        if !seen.insert(ax.axis_key().clone()) {
            return Err(SweepError::DuplicateAxisKey(ax.axis_key().clone()));
        }
    }
    Ok(())
}

fn validate_order(axes: &[Arc<dyn AxisSource>], order: &[AxisKey]) -> Result<(), SweepError> {
    let mut seen = BTreeSet::new();
    for key in order {
        if !axes.iter().any(|ax| ax.axis_key() == key) {
            return Err(SweepError::UnknownOrderKey(key.clone()));
        }
        if !seen.insert(key.clone()) {
            return Err(SweepError::DuplicateOrderKey(key.clone()));
        }
    }
    for ax in axes {
        if !seen.contains(ax.axis_key()) {
            return Err(SweepError::IncompleteOrder(ax.axis_key().clone()));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
