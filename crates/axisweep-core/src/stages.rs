//! # General-Purpose Transform Stages
//!
//! Stream modifiers that act purely on event structure (index deltas and
//! boolean marker fields); what a marker means is the consumer's business.
//!
//! - [`HoldFlagStage`] flags events inside a run where only designated
//!   axes keep changing (lookahead-driven).
//! - [`InjectOnChangeStage`] splices a synthetic marker event wherever a
//!   designated axis moves (previous-event-driven).

use crate::transform::{Lookahead, TransformStage};
use crate::types::{AxisKey, Event, SweepError};
use std::collections::BTreeSet;

// =============================================================================
// HOLD FLAG
// =============================================================================

/// Flags an event when the next event differs from it only in the
/// designated axes.
///
/// The flag is absent on the last event of each run and on the final event
/// of the stream, so a consumer can treat flagged events as "more of the
/// same follows immediately".
#[derive(Debug, Clone)]
pub struct HoldFlagStage {
    axes: BTreeSet<AxisKey>,
    field: String,
}

impl HoldFlagStage {
    /// Flag continuity across the given axes, writing the given field.
    #[must_use]
    pub fn new(
        axes: impl IntoIterator<Item = impl Into<AxisKey>>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            axes: axes.into_iter().map(Into::into).collect(),
            field: field.into(),
        }
    }
}

impl TransformStage<Event> for HoldFlagStage {
    fn apply(
        &self,
        event: &Event,
        _prev: Option<&Event>,
        next: &mut Lookahead<'_, Event>,
    ) -> Result<Vec<Event>, SweepError> {
        let Some(upcoming) = next.peek()? else {
            return Ok(vec![event.clone()]);
        };

        let holds = event.index.iter().all(|(key, position)| {
            upcoming.position(key) == Some(*position) || self.axes.contains(key)
        });

        if holds {
            Ok(vec![event.with_field(self.field.as_str(), true)])
        } else {
            Ok(vec![event.clone()])
        }
    }
}

// =============================================================================
// INJECT ON CHANGE
// =============================================================================

/// Splices a synthetic marker event before the stream's first event and
/// before every event where a designated axis changed position.
///
/// The marker is a copy of the triggering event carrying the given field;
/// it lies outside every axis cardinality.
#[derive(Debug, Clone)]
pub struct InjectOnChangeStage {
    axes: BTreeSet<AxisKey>,
    field: String,
}

impl InjectOnChangeStage {
    /// Watch the given axes, writing the given field on injected markers.
    #[must_use]
    pub fn new(
        axes: impl IntoIterator<Item = impl Into<AxisKey>>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            axes: axes.into_iter().map(Into::into).collect(),
            field: field.into(),
        }
    }
}

impl TransformStage<Event> for InjectOnChangeStage {
    fn apply(
        &self,
        event: &Event,
        prev: Option<&Event>,
        _next: &mut Lookahead<'_, Event>,
    ) -> Result<Vec<Event>, SweepError> {
        if self.axes.is_empty() {
            return Ok(vec![event.clone()]);
        }

        let trigger = match prev {
            None => true,
            Some(previous) => self
                .axes
                .iter()
                .any(|key| previous.position(key) != event.position(key)),
        };

        if trigger {
            Ok(vec![
                event.with_field(self.field.as_str(), true),
                event.clone(),
            ])
        } else {
            Ok(vec![event.clone()])
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
