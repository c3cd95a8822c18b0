//! # axisweep-core
//!
//! The deterministic sweep-expansion engine for Axisweep - THE ENGINE.
//!
//! This crate turns a declarative description of a multi-dimensional
//! experiment - time, position, channel, z, and arbitrary custom
//! dimensions, each a composable axis - into an ordered, possibly
//! infinite stream of discrete events.
//!
//! ## Architecture
//!
//! - [`AxisSource`] is the capability seam for one dimension: a lazy,
//!   restartable, possibly infinite producer of values with optional
//!   per-step pruning and per-value event contributions.
//! - [`SequenceNode`] groups axes with an effective ordering; an axis may
//!   yield a nested node, whose axes override same-keyed ancestors for
//!   the remainder of that branch.
//! - [`SequenceIterator`] performs the depth-first expansion on an
//!   explicit stack, one step per pull.
//! - [`EventAssembler`] folds axis and node contributions into one
//!   [`Event`] per resolved branch.
//! - [`TransformPipeline`] post-processes the raw event stream; stages
//!   may rewrite, drop, or splice events with single-step lookahead.
//!
//! ## Architectural Constraints
//!
//! - Single-threaded, synchronous, pull-based; no async, no network,
//!   no persistence.
//! - The declared graph is immutable and `Arc`-shared; concurrent
//!   independent iterations never interfere.
//! - Fail-fast: every error surfaces on the pull that triggered it, and
//!   an event is either fully assembled and transformed or never emitted.

// =============================================================================
// MODULES
// =============================================================================

pub mod assemble;
pub mod axis;
pub mod index;
pub mod iter;
pub mod node;
pub mod stages;
pub mod transform;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AxisKey, Cardinality, Event, FieldMap, Scalar, SweepError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use assemble::{DefaultAssembler, EventAssembler};
pub use axis::{AxisIter, AxisSource, AxisStep, TickAxis, ValueAxis};
pub use index::{ActiveNode, AxesIndex, AxisEntry};
pub use iter::SequenceIterator;
pub use node::{EventStream, SequenceNode};
pub use transform::{Lookahead, Stream, TransformPipeline, TransformStage};

// =============================================================================
// RE-EXPORTS: Stages
// =============================================================================

pub use stages::{HoldFlagStage, InjectOnChangeStage};
