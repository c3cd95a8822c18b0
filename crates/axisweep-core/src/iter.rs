//! # Sequence Traversal
//!
//! The depth-first expansion of an axis graph into branch resolutions.
//!
//! The walk is realized as an explicit frame stack rather than native
//! recursion: nesting depth is bounded by memory, cycles are detected by
//! node identity on the active path, and the whole state machine advances
//! exactly one step per pull so unbounded axes are served lazily.
//!
//! Per depth, each (position, value) pair is recorded provisionally, the
//! owning axis's pruning predicate is consulted on the 0..d prefix, and
//! only surviving values descend further. A completed branch is handed to
//! the assembler together with the stack of active nodes.

use crate::assemble::EventAssembler;
use crate::axis::{AxisIter, AxisSource, AxisStep};
use crate::index::{ActiveNode, AxesIndex, AxisEntry};
use crate::node::SequenceNode;
use crate::types::{Scalar, SweepError};
use std::sync::Arc;

// =============================================================================
// TRAVERSAL FRAME
// =============================================================================

/// One level of the explicit traversal stack.
struct Frame {
    /// The axis being enumerated at this depth.
    axis: Arc<dyn AxisSource>,
    /// Live iteration over the axis's steps.
    steps: AxisIter,
    /// Axes scheduled deeper at this level, in effective order.
    rest: Vec<Arc<dyn AxisSource>>,
    /// Position of the next step.
    position: usize,
    /// Index length before this frame's own entry.
    base_depth: usize,
    /// Whether creating this frame entered a node (root or nested); popping
    /// the frame then leaves that node.
    entered_node: bool,
}

impl Frame {
    fn new(
        axis: Arc<dyn AxisSource>,
        rest: Vec<Arc<dyn AxisSource>>,
        base_depth: usize,
        entered_node: bool,
    ) -> Self {
        let steps = axis.iterate();
        Self {
            axis,
            steps,
            rest,
            position: 0,
            base_depth,
            entered_node,
        }
    }
}

// =============================================================================
// SEQUENCE ITERATOR
// =============================================================================

/// Pull-based traversal over one axis graph, generic over the assembler.
///
/// Created fresh per run via [`SequenceNode::events`] or
/// [`SequenceNode::events_with`]; dropping it mid-run is the only teardown.
/// After yielding an error the iterator is fused.
pub struct SequenceIterator<A: EventAssembler> {
    assembler: A,
    pending_root: Option<Arc<SequenceNode>>,
    index: AxesIndex,
    nodes: Vec<ActiveNode>,
    /// Identities of nodes on the active path, for cycle detection.
    path: Vec<usize>,
    stack: Vec<Frame>,
    done: bool,
}

impl<A: EventAssembler> SequenceIterator<A> {
    /// Create a traversal over `root`, assembled by `assembler`.
    ///
    /// No axis values are pulled until the first call to `next`.
    #[must_use]
    pub fn new(root: Arc<SequenceNode>, assembler: A) -> Self {
        Self {
            assembler,
            pending_root: Some(root),
            index: AxesIndex::new(),
            nodes: Vec::new(),
            path: Vec::new(),
            stack: Vec::new(),
            done: false,
        }
    }

    fn enter_root(&mut self, root: &Arc<SequenceNode>) {
        self.nodes.push(ActiveNode::new(Arc::clone(root), 0));
        self.path.push(Arc::as_ptr(root) as usize);
        let ordered = root.ordered_axes();
        if let Some((first, rest)) = ordered.split_first() {
            self.stack
                .push(Frame::new(Arc::clone(first), rest.to_vec(), 0, true));
        }
        // A node with no axes yields an empty stream.
    }

    fn fail(&mut self, err: SweepError) -> Option<Result<A::Output, SweepError>> {
        self.done = true;
        Some(Err(err))
    }

    fn emit(&mut self) -> Option<Result<A::Output, SweepError>> {
        match self.assembler.assemble(&self.index, &self.nodes) {
            Ok(event) => Some(Ok(event)),
            Err(err) => self.fail(err),
        }
    }
}

impl<A: EventAssembler> Iterator for SequenceIterator<A> {
    type Item = Result<A::Output, SweepError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(root) = self.pending_root.take() {
            self.enter_root(&root);
        }

        loop {
            // Step the innermost frame; back out when it is exhausted.
            let (position, axis, rest, step) = {
                let Some(frame) = self.stack.last_mut() else {
                    self.done = true;
                    return None;
                };
                self.index.truncate(frame.base_depth);
                match frame.steps.next() {
                    None => {
                        if let Some(finished) = self.stack.pop() {
                            if finished.entered_node {
                                self.nodes.pop();
                                self.path.pop();
                            }
                        }
                        continue;
                    }
                    Some(step) => {
                        let position = frame.position;
                        frame.position += 1;
                        (
                            position,
                            Arc::clone(&frame.axis),
                            frame.rest.clone(),
                            step,
                        )
                    }
                }
            };

            // Resolve the representative value and any nested descent.
            let (value, nested): (Scalar, Option<Arc<SequenceNode>>) = match step {
                AxisStep::Value(value) => (value, None),
                AxisStep::Nested(node) => match node.value() {
                    Some(value) => (value.clone(), Some(node)),
                    None => {
                        return self.fail(SweepError::NestedValueMissing(axis.axis_key().clone()));
                    }
                },
            };

            // Provisional entry, then the depth-d pruning decision.
            self.index
                .push(AxisEntry::new(position, value, Arc::clone(&axis)));
            match axis.should_skip(&self.index) {
                Ok(false) => {}
                Ok(true) => continue,
                Err(err) => return self.fail(err),
            }

            if let Some(node) = nested {
                let identity = Arc::as_ptr(&node) as usize;
                if self.path.contains(&identity) {
                    return self.fail(SweepError::NestingCycle);
                }

                let merged = node.merged_axes(&rest);
                let entry_depth = self.index.len();
                if let Some((first, deeper)) = merged.split_first() {
                    self.nodes.push(ActiveNode::new(node, entry_depth));
                    self.path.push(identity);
                    self.stack.push(Frame::new(
                        Arc::clone(first),
                        deeper.to_vec(),
                        entry_depth,
                        true,
                    ));
                    continue;
                }

                // Every deeper axis was overridden away: the branch closes
                // at the nested node itself.
                self.nodes.push(ActiveNode::new(node, entry_depth));
                let emitted = self.emit();
                self.nodes.pop();
                return emitted;
            }

            // Plain value: descend into the next axis, or close the branch.
            match rest.split_first() {
                Some((first, deeper)) => {
                    self.stack.push(Frame::new(
                        Arc::clone(first),
                        deeper.to_vec(),
                        self.index.len(),
                        false,
                    ));
                }
                None => return self.emit(),
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
