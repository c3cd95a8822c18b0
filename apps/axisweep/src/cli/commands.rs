//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::cli::SweepSpec;
use axisweep_core::{
    AxisSource, AxisStep, HoldFlagStage, InjectOnChangeStage, SequenceNode, SweepError, TickAxis,
    ValueAxis,
};
use std::sync::Arc;
use thiserror::Error;

/// Events emitted for an unbounded graph when no --limit is given.
const DEFAULT_UNBOUNDED_LIMIT: usize = 64;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum AppError {
    /// The engine rejected the graph or failed mid-expansion.
    #[error(transparent)]
    Sweep(#[from] SweepError),

    /// Event output could not be serialized.
    #[error("output serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// GRAPH CONSTRUCTION
// =============================================================================

/// Build the demonstration graph described by `spec`.
fn build_node(spec: &SweepSpec, hold: bool, mark_time: bool) -> Result<Arc<SequenceNode>, SweepError> {
    let time: Arc<dyn AxisSource> = if spec.unbounded {
        Arc::new(TickAxis::new("t").with_field("tick"))
    } else {
        Arc::new(ValueAxis::counting("t", spec.timepoints))
    };

    let positions: Arc<dyn AxisSource> = match spec.positions.split_first() {
        Some((first, rest)) if spec.override_first => {
            let override_z: Arc<dyn AxisSource> =
                Arc::new(ValueAxis::new("z", [spec.slices as i64]).with_field("z_um"));
            let nested = Arc::new(
                SequenceNode::new(vec![override_z])?
                    .with_value(first.as_str())
                    .with_field("pos_name", first.as_str()),
            );
            let mut steps = vec![AxisStep::nested(nested)];
            steps.extend(rest.iter().map(|name| AxisStep::value(name.as_str())));
            Arc::new(ValueAxis::from_steps("p", steps).with_field("pos_name"))
        }
        _ => Arc::new(
            ValueAxis::new("p", spec.positions.iter().map(String::as_str)).with_field("pos_name"),
        ),
    };

    let z: Arc<dyn AxisSource> =
        Arc::new(ValueAxis::new("z", (0..spec.slices).map(|i| i as i64)).with_field("z_um"));

    let mut node = SequenceNode::new(vec![time, positions, z])?;
    if hold {
        node = node.with_transform(Arc::new(HoldFlagStage::new(["z"], "hold")));
    }
    if mark_time {
        node = node.with_transform(Arc::new(InjectOnChangeStage::new(["t"], "time_marker")));
    }
    Ok(Arc::new(node))
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Expand the sweep and print one JSON event per line.
pub fn run(
    spec: &SweepSpec,
    limit: Option<usize>,
    hold: bool,
    mark_time: bool,
) -> Result<(), AppError> {
    let node = build_node(spec, hold, mark_time)?;

    let cap = match limit {
        Some(n) => n,
        None if node.is_finite() => usize::MAX,
        None => {
            tracing::warn!(
                limit = DEFAULT_UNBOUNDED_LIMIT,
                "graph is unbounded and no --limit was given; output will be capped"
            );
            DEFAULT_UNBOUNDED_LIMIT
        }
    };

    let mut emitted = 0usize;
    for item in node.events().take(cap) {
        let event = item?;
        println!("{}", serde_json::to_string(&event)?);
        emitted += 1;
    }

    tracing::info!(events = emitted, "sweep complete");
    Ok(())
}

/// Report per-axis cardinality and whole-graph finiteness.
pub fn lengths(spec: &SweepSpec) -> Result<(), AppError> {
    let node = build_node(spec, false, false)?;

    for (key, cardinality) in node.lengths() {
        println!("{key}: {cardinality}");
    }
    println!("finite: {}", node.is_finite());
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
