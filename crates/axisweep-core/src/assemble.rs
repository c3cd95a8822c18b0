//! # Event Assembly
//!
//! Turns a completed [`AxesIndex`] plus the active node stack into one
//! concrete output element.
//!
//! The traversal engine is generic over the assembler, so alternate
//! assemblers may target unrelated output types from the same inputs.

use crate::index::{ActiveNode, AxesIndex};
use crate::types::{Event, FieldMap, SweepError};
use std::sync::Arc;

// =============================================================================
// EVENTASSEMBLER TRAIT
// =============================================================================

/// Builds one output element per resolved branch.
pub trait EventAssembler: Send + Sync {
    /// The concrete element type produced.
    type Output;

    /// Assemble one element from the resolved index and the stack of
    /// active nodes (outermost first).
    fn assemble(&self, index: &AxesIndex, nodes: &[ActiveNode])
    -> Result<Self::Output, SweepError>;
}

impl<E> EventAssembler for Arc<dyn EventAssembler<Output = E>> {
    type Output = E;

    fn assemble(&self, index: &AxesIndex, nodes: &[ActiveNode]) -> Result<E, SweepError> {
        (**self).assemble(index, nodes)
    }
}

// =============================================================================
// DEFAULT ASSEMBLER
// =============================================================================

/// The standard assembler producing [`Event`] values.
///
/// Folds contributions in traversal order: each active node's fixed fields
/// at the depth the node was entered, then each axis's contribution at its
/// depth. Later (deeper) contributions override same-named fields from
/// shallower ones. The structural index always reflects every axis visited
/// on the branch and is not subject to overriding.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAssembler;

impl EventAssembler for DefaultAssembler {
    type Output = Event;

    fn assemble(&self, index: &AxesIndex, nodes: &[ActiveNode]) -> Result<Event, SweepError> {
        let mut fields = FieldMap::new();
        let mut so_far = AxesIndex::new();
        let mut pending_nodes = nodes.iter().peekable();

        for entry in index.entries() {
            while pending_nodes
                .peek()
                .is_some_and(|active| active.depth <= so_far.len())
            {
                if let Some(active) = pending_nodes.next() {
                    fields.extend(active.node.fields().clone());
                }
            }
            so_far.push(entry.clone());
            fields.extend(entry.axis.contribute(&entry.value, &so_far)?);
        }

        // Nodes entered at the full branch depth (a nested node that closed
        // the branch with no further axes).
        for active in pending_nodes {
            fields.extend(active.node.fields().clone());
        }

        Ok(Event {
            index: index.positions(),
            fields,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
