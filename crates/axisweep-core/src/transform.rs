//! # Transform Pipeline
//!
//! Ordered post-processing of the raw assembled-event stream.
//!
//! Stages are chained iterator adapters: stage k's output stream is stage
//! k+1's input. Per incoming event a stage may emit zero, one, or many
//! outgoing events; inputs are taken by reference and never mutated.
//!
//! Each stage invocation receives the previous event the same stage
//! emitted downstream and a [`Lookahead`] handle over its own upstream.
//! The lookahead is a single-slot memo: the first peek pulls and buffers
//! the next upstream item, later peeks return the same buffered item, and
//! the buffer is cleared only when the item is consumed as the stage's
//! real next input. Emission order therefore equals traversal order with
//! insertions and deletions localized where a stage acts.

use crate::types::SweepError;
use std::collections::VecDeque;
use std::sync::Arc;

/// Fallible event stream between pipeline stages.
pub type Stream<E> = Box<dyn Iterator<Item = Result<E, SweepError>> + Send>;

// =============================================================================
// TRANSFORMSTAGE TRAIT
// =============================================================================

/// One unit of the post-assembly pipeline.
///
/// Return an empty `Vec` to drop the input, one event to pass it through
/// (possibly rewritten), or several to splice extra events around it.
/// Synthetic events carry whatever index the stage gives them; they are
/// outside every axis cardinality.
pub trait TransformStage<E>: Send + Sync {
    /// Process one incoming event.
    ///
    /// `prev` is the last event this stage emitted downstream, if any.
    /// `next` peeks the next upstream event without consuming it.
    fn apply(
        &self,
        event: &E,
        prev: Option<&E>,
        next: &mut Lookahead<'_, E>,
    ) -> Result<Vec<E>, SweepError>;
}

// =============================================================================
// LOOKAHEAD
// =============================================================================

/// Buffered upstream item state for one stage.
enum Peeked<E> {
    /// Nothing buffered; the next peek or pull hits the upstream.
    Empty,
    /// The next upstream event, pulled by a peek but not yet consumed.
    Buffered(E),
    /// The upstream is exhausted; remembered so it is never re-pulled.
    End,
}

/// Memoized single-step view of a stage's upstream.
pub struct Lookahead<'a, E> {
    upstream: &'a mut (dyn Iterator<Item = Result<E, SweepError>> + Send),
    slot: &'a mut Peeked<E>,
}

impl<'a, E> Lookahead<'a, E> {
    fn new(
        upstream: &'a mut (dyn Iterator<Item = Result<E, SweepError>> + Send),
        slot: &'a mut Peeked<E>,
    ) -> Self {
        Self { upstream, slot }
    }

    /// Peek the next upstream event, if any.
    ///
    /// Pulls at most one item per buffered slot; repeated peeks return the
    /// identical result. An upstream error surfaces here and aborts the
    /// pipeline at the calling stage.
    pub fn peek(&mut self) -> Result<Option<&E>, SweepError> {
        if matches!(self.slot, Peeked::Empty) {
            *self.slot = match self.upstream.next() {
                Some(Ok(event)) => Peeked::Buffered(event),
                Some(Err(err)) => return Err(err),
                None => Peeked::End,
            };
        }
        match &*self.slot {
            Peeked::Buffered(event) => Ok(Some(event)),
            _ => Ok(None),
        }
    }
}

// =============================================================================
// STAGE ADAPTER
// =============================================================================

/// Iterator adapter driving one stage over its upstream.
struct StageIter<E> {
    stage: Arc<dyn TransformStage<E>>,
    upstream: Stream<E>,
    slot: Peeked<E>,
    pending: VecDeque<E>,
    last: Option<E>,
    done: bool,
}

impl<E> StageIter<E> {
    fn new(stage: Arc<dyn TransformStage<E>>, upstream: Stream<E>) -> Self {
        Self {
            stage,
            upstream,
            slot: Peeked::Empty,
            pending: VecDeque::new(),
            last: None,
            done: false,
        }
    }
}

impl<E: Clone> Iterator for StageIter<E> {
    type Item = Result<E, SweepError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(event) = self.pending.pop_front() {
                self.last = Some(event.clone());
                return Some(Ok(event));
            }

            // Real next input: the buffered peek first, then the upstream.
            let input = match std::mem::replace(&mut self.slot, Peeked::Empty) {
                Peeked::Buffered(event) => Some(event),
                Peeked::End => None,
                Peeked::Empty => match self.upstream.next() {
                    Some(Ok(event)) => Some(event),
                    Some(Err(err)) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                    None => None,
                },
            };
            let Some(event) = input else {
                self.done = true;
                return None;
            };

            let mut lookahead = Lookahead::new(&mut *self.upstream, &mut self.slot);
            match self.stage.apply(&event, self.last.as_ref(), &mut lookahead) {
                Ok(emitted) => self.pending.extend(emitted),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Declaration-ordered chain of transform stages.
pub struct TransformPipeline<E> {
    stages: Vec<Arc<dyn TransformStage<E>>>,
}

impl<E: Clone + Send + 'static> TransformPipeline<E> {
    /// Create an empty pipeline (events pass through untouched).
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Create a pipeline over the given stages, in declaration order.
    #[must_use]
    pub fn from_stages(stages: Vec<Arc<dyn TransformStage<E>>>) -> Self {
        Self { stages }
    }

    /// Append a stage at the end of the chain.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn TransformStage<E>>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Number of stages in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wire the chain onto a source stream.
    #[must_use]
    pub fn apply(&self, source: Stream<E>) -> Stream<E> {
        let mut stream = source;
        for stage in &self.stages {
            stream = Box::new(StageIter::new(Arc::clone(stage), stream));
        }
        stream
    }
}

impl<E: Clone + Send + 'static> Default for TransformPipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
