//! # Traversal Acceptance Tests
//!
//! End-to-end behavior of the expansion engine over whole graphs.
//!
//! ## Sections
//! - Order and counts of plain cross products
//! - Nested overrides and the merge rule
//! - Pruning
//! - Transform pipeline on full graphs
//! - Laziness, restartability, and error propagation

use axisweep_core::{
    AxesIndex, AxisIter, AxisKey, AxisSource, AxisStep, Cardinality, Event, EventStream,
    FieldMap, HoldFlagStage, InjectOnChangeStage, Scalar, SequenceNode, SweepError, TickAxis,
    ValueAxis,
};
use std::sync::Arc;

// =============================================================================
// HELPERS
// =============================================================================

fn arc_axis(axis: impl AxisSource + 'static) -> Arc<dyn AxisSource> {
    Arc::new(axis)
}

fn collect(stream: EventStream) -> Vec<Event> {
    stream.collect::<Result<_, _>>().expect("event stream")
}

fn pos(event: &Event, key: &str) -> Option<usize> {
    event.position(&AxisKey::new(key))
}

/// The 2x2x2 reference graph: t, p ("P0"/"P1"), z (0/1).
fn reference_graph() -> Arc<SequenceNode> {
    Arc::new(
        SequenceNode::new(vec![
            arc_axis(ValueAxis::counting("t", 2)),
            arc_axis(ValueAxis::new("p", ["P0", "P1"]).with_field("pos_name")),
            arc_axis(ValueAxis::new("z", [0i64, 1]).with_field("z_um")),
        ])
        .expect("node"),
    )
}

/// The reference graph with P0 replaced by a nested node overriding z=[5].
fn override_graph() -> Arc<SequenceNode> {
    let p0 = Arc::new(
        SequenceNode::new(vec![arc_axis(ValueAxis::new("z", [5i64]).with_field("z_um"))])
            .expect("nested")
            .with_value("P0"),
    );
    Arc::new(
        SequenceNode::new(vec![
            arc_axis(ValueAxis::counting("t", 2)),
            arc_axis(ValueAxis::from_steps(
                "p",
                vec![AxisStep::nested(p0), AxisStep::value("P1")],
            )),
            arc_axis(ValueAxis::new("z", [0i64, 1]).with_field("z_um")),
        ])
        .expect("node"),
    )
}

// =============================================================================
// SECTION 1: ORDER AND COUNTS
// =============================================================================

mod order_and_counts {
    use super::*;

    #[test]
    fn full_cross_product_in_index_order() {
        let events = collect(reference_graph().events());

        let triples: Vec<(usize, usize, usize)> = events
            .iter()
            .map(|e| {
                (
                    pos(e, "t").expect("t"),
                    pos(e, "p").expect("p"),
                    pos(e, "z").expect("z"),
                )
            })
            .collect();

        assert_eq!(
            triples,
            vec![
                (0, 0, 0),
                (0, 0, 1),
                (0, 1, 0),
                (0, 1, 1),
                (1, 0, 0),
                (1, 0, 1),
                (1, 1, 0),
                (1, 1, 1),
            ]
        );
    }

    #[test]
    fn inner_axis_completes_before_outer_advances() {
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::counting("a", 3)),
                arc_axis(ValueAxis::counting("b", 2)),
            ])
            .expect("node"),
        );
        let events = collect(node.events());
        assert_eq!(events.len(), 6);

        for (i, window) in events.windows(2).enumerate() {
            let a0 = pos(&window[0], "a").expect("a");
            let a1 = pos(&window[1], "a").expect("a");
            assert!(a1 >= a0, "outer axis regressed at step {i}");
        }
    }

    #[test]
    fn explicit_order_overrides_declaration_order() {
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::counting("z", 2)),
                arc_axis(ValueAxis::counting("t", 2)),
            ])
            .expect("node")
            .with_order(["t", "z"])
            .expect("order"),
        );
        let events = collect(node.events());

        let pairs: Vec<(usize, usize)> = events
            .iter()
            .map(|e| (pos(e, "t").expect("t"), pos(e, "z").expect("z")))
            .collect();
        // t is outermost despite being declared second.
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn contributions_reach_the_events() {
        let events = collect(reference_graph().events());
        assert_eq!(
            events[0].field("pos_name"),
            Some(&Scalar::Text("P0".to_string()))
        );
        assert_eq!(events[1].field("z_um"), Some(&Scalar::Int(1)));
    }
}

// =============================================================================
// SECTION 2: NESTED OVERRIDES
// =============================================================================

mod nested_overrides {
    use super::*;

    #[test]
    fn override_reduces_count_and_replaces_values() {
        let events = collect(override_graph().events());

        // 2 x (1x1 + 1x2) = 6 events.
        assert_eq!(events.len(), 6);

        for event in &events {
            match pos(event, "p") {
                Some(0) => {
                    // P0 branch: the override's single z value, exclusively.
                    assert_eq!(pos(event, "z"), Some(0));
                    assert_eq!(event.field("z_um"), Some(&Scalar::Int(5)));
                }
                Some(1) => {
                    let z_um = event.field("z_um").expect("z_um");
                    assert!(matches!(z_um, Scalar::Int(0) | Scalar::Int(1)));
                }
                other => unreachable!("unexpected p position: {other:?}"),
            }
        }
    }

    #[test]
    fn nested_value_is_recorded_for_the_parent_axis() {
        let events = collect(override_graph().events());
        // The nested node occupies position 0 of the p axis on its branch.
        let p0_events: Vec<_> = events.iter().filter(|e| pos(e, "p") == Some(0)).collect();
        assert_eq!(p0_events.len(), 2);
    }

    #[test]
    fn nested_fields_apply_to_the_whole_branch() {
        let p0 = Arc::new(
            SequenceNode::new(vec![arc_axis(ValueAxis::new("z", [5i64]))])
                .expect("nested")
                .with_value("P0")
                .with_field("stage", "override"),
        );
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::from_steps(
                    "p",
                    vec![AxisStep::nested(p0), AxisStep::value("P1")],
                )),
                arc_axis(ValueAxis::counting("z", 2)),
            ])
            .expect("node"),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 3);
        for event in &events {
            let expected = pos(event, "p") == Some(0);
            assert_eq!(
                event.field("stage") == Some(&Scalar::Text("override".to_string())),
                expected
            );
        }
    }

    #[test]
    fn nested_new_axes_precede_surviving_ancestors() {
        // The nested node adds a fresh axis q; the surviving ancestor c is
        // scheduled after it, so q varies slower than c on that branch.
        let nested = Arc::new(
            SequenceNode::new(vec![arc_axis(ValueAxis::counting("q", 2))])
                .expect("nested")
                .with_value(1i64),
        );
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::from_steps(
                    "t",
                    vec![AxisStep::value(0i64), AxisStep::nested(nested)],
                )),
                arc_axis(ValueAxis::counting("c", 2)),
            ])
            .expect("node"),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 2 + 4);

        let nested_branch: Vec<(usize, usize)> = events
            .iter()
            .filter(|e| pos(e, "t") == Some(1))
            .map(|e| (pos(e, "q").expect("q"), pos(e, "c").expect("c")))
            .collect();
        assert_eq!(nested_branch, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

        // The plain branch never carries the nested axis.
        assert!(
            events
                .iter()
                .filter(|e| pos(e, "t") == Some(0))
                .all(|e| pos(e, "q").is_none())
        );
    }

    #[test]
    fn deep_nesting_chains_resolve_inside_out() {
        let innermost = Arc::new(
            SequenceNode::new(vec![arc_axis(ValueAxis::new("z", [9i64]).with_field("z_um"))])
                .expect("innermost")
                .with_value("fine"),
        );
        let middle = Arc::new(
            SequenceNode::new(vec![arc_axis(ValueAxis::from_steps(
                "g",
                vec![AxisStep::value("coarse"), AxisStep::nested(innermost)],
            ))])
            .expect("middle")
            .with_value("G0"),
        );
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::from_steps("p", vec![AxisStep::nested(middle)])),
                arc_axis(ValueAxis::new("z", [0i64, 1]).with_field("z_um")),
            ])
            .expect("node"),
        );

        let events = collect(node.events());
        // g=coarse keeps the ancestor z (2 events); g=fine overrides z (1).
        assert_eq!(events.len(), 3);
        let fine: Vec<_> = events
            .iter()
            .filter(|e| pos(e, "g") == Some(1))
            .collect();
        assert_eq!(fine.len(), 1);
        assert_eq!(fine[0].field("z_um"), Some(&Scalar::Int(9)));
    }
}

// =============================================================================
// SECTION 3: PRUNING
// =============================================================================

mod pruning {
    use super::*;

    /// Wraps an axis and prunes every one of its values.
    struct SkipAll(ValueAxis);

    impl AxisSource for SkipAll {
        fn axis_key(&self) -> &AxisKey {
            self.0.axis_key()
        }
        fn iterate(&self) -> AxisIter {
            self.0.iterate()
        }
        fn length(&self) -> Cardinality {
            self.0.length()
        }
        fn should_skip(&self, _prefix: &AxesIndex) -> Result<bool, SweepError> {
            Ok(true)
        }
    }

    /// Prunes values by a predicate over the prefix.
    struct SkipWhere {
        inner: ValueAxis,
        predicate: fn(&AxesIndex) -> bool,
    }

    impl AxisSource for SkipWhere {
        fn axis_key(&self) -> &AxisKey {
            self.inner.axis_key()
        }
        fn iterate(&self) -> AxisIter {
            self.inner.iterate()
        }
        fn length(&self) -> Cardinality {
            self.inner.length()
        }
        fn should_skip(&self, prefix: &AxesIndex) -> Result<bool, SweepError> {
            Ok((self.predicate)(prefix))
        }
    }

    #[test]
    fn always_skipping_axis_empties_the_graph() {
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::counting("t", 2)),
                arc_axis(SkipAll(ValueAxis::counting("z", 3))),
            ])
            .expect("node"),
        );
        assert_eq!(collect(node.events()).len(), 0);
    }

    #[test]
    fn skipping_override_leaves_sibling_branches_intact() {
        let skipped = Arc::new(
            SequenceNode::new(vec![arc_axis(SkipAll(ValueAxis::counting("z", 3)))])
                .expect("nested")
                .with_value("P0"),
        );
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::counting("t", 2)),
                arc_axis(ValueAxis::from_steps(
                    "p",
                    vec![AxisStep::nested(skipped), AxisStep::value("P1")],
                )),
                arc_axis(ValueAxis::counting("z", 2)),
            ])
            .expect("node"),
        );

        let events = collect(node.events());
        // P0 contributes nothing; P1 keeps its 2 z values per timepoint.
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| pos(e, "p") == Some(1)));
    }

    #[test]
    fn prefix_predicate_prunes_combinations_not_axes() {
        // Skip odd z on the first timepoint only.
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::counting("t", 2)),
                arc_axis(SkipWhere {
                    inner: ValueAxis::counting("z", 4),
                    predicate: |prefix| {
                        prefix.position(&AxisKey::new("t")) == Some(0)
                            && prefix
                                .position(&AxisKey::new("z"))
                                .is_some_and(|z| z % 2 == 1)
                    },
                }),
            ])
            .expect("node"),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 2 + 4);
        let t0: Vec<_> = events
            .iter()
            .filter(|e| pos(e, "t") == Some(0))
            .map(|e| pos(e, "z").expect("z"))
            .collect();
        assert_eq!(t0, vec![0, 2]);
    }

    #[test]
    fn pruned_outer_value_skips_its_whole_subtree() {
        // Pruning at the outer axis never enumerates the inner axis.
        struct CountingAxis {
            inner: ValueAxis,
            pulls: Arc<std::sync::atomic::AtomicUsize>,
        }
        impl AxisSource for CountingAxis {
            fn axis_key(&self) -> &AxisKey {
                self.inner.axis_key()
            }
            fn iterate(&self) -> AxisIter {
                self.pulls
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.inner.iterate()
            }
            fn length(&self) -> Cardinality {
                self.inner.length()
            }
        }

        let pulls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(SkipWhere {
                    inner: ValueAxis::counting("t", 3),
                    predicate: |prefix| {
                        prefix.position(&AxisKey::new("t")) == Some(1)
                    },
                }),
                arc_axis(CountingAxis {
                    inner: ValueAxis::counting("z", 2),
                    pulls: Arc::clone(&pulls),
                }),
            ])
            .expect("node"),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 4);
        // The inner axis restarted once per surviving t value only.
        assert_eq!(pulls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}

// =============================================================================
// SECTION 4: TRANSFORMS ON FULL GRAPHS
// =============================================================================

mod transforms {
    use super::*;

    #[test]
    fn inject_on_change_adds_markers_at_time_boundaries() {
        let graph = reference_graph();
        let node = Arc::new(
            SequenceNode::new(graph.axes().to_vec())
                .expect("node")
                .with_transform(Arc::new(InjectOnChangeStage::new(["t"], "marker"))),
        );

        let events = collect(node.events());
        // 8 raw events + one marker per timepoint entry.
        assert_eq!(events.len(), 10);

        let marker_positions: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.field("marker") == Some(&Scalar::Bool(true)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(marker_positions, vec![0, 5]);

        // Stripping markers recovers the untransformed stream.
        let raw: Vec<&Event> = events
            .iter()
            .filter(|e| e.field("marker").is_none())
            .collect();
        assert_eq!(raw.len(), 8);
        assert_eq!(pos(raw[4], "t"), Some(1));
    }

    #[test]
    fn hold_flag_marks_z_runs() {
        let graph = reference_graph();
        let node = Arc::new(
            SequenceNode::new(graph.axes().to_vec())
                .expect("node")
                .with_transform(Arc::new(HoldFlagStage::new(["z"], "hold"))),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 8);
        let flags: Vec<bool> = events
            .iter()
            .map(|e| e.field("hold") == Some(&Scalar::Bool(true)))
            .collect();
        assert_eq!(
            flags,
            vec![true, false, true, false, true, false, true, false]
        );
    }

    #[test]
    fn stages_compose_in_declaration_order() {
        let graph = reference_graph();
        let node = Arc::new(
            SequenceNode::new(graph.axes().to_vec())
                .expect("node")
                .with_transform(Arc::new(HoldFlagStage::new(["z"], "hold")))
                .with_transform(Arc::new(InjectOnChangeStage::new(["t"], "marker"))),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 10);
        // The injected marker copies the hold flag its template carried.
        assert_eq!(events[0].field("marker"), Some(&Scalar::Bool(true)));
        assert_eq!(events[0].field("hold"), Some(&Scalar::Bool(true)));
    }
}

// =============================================================================
// SECTION 5: PLUGGABLE ASSEMBLY
// =============================================================================

mod assembly {
    use super::*;
    use axisweep_core::{ActiveNode, DefaultAssembler, EventAssembler};

    /// Assembles compact text labels instead of events.
    struct LabelAssembler;

    impl EventAssembler for LabelAssembler {
        type Output = String;

        fn assemble(
            &self,
            index: &AxesIndex,
            _nodes: &[ActiveNode],
        ) -> Result<String, SweepError> {
            Ok(index
                .entries()
                .iter()
                .map(|entry| format!("{}{}", entry.key, entry.position))
                .collect::<Vec<_>>()
                .join("/"))
        }
    }

    #[test]
    fn alternate_assemblers_reuse_the_same_traversal() {
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(ValueAxis::counting("t", 2)),
                arc_axis(ValueAxis::counting("z", 2)),
            ])
            .expect("node"),
        );

        let labels: Vec<String> = node
            .events_with(LabelAssembler)
            .collect::<Result<_, _>>()
            .expect("labels");
        assert_eq!(labels, vec!["t0/z0", "t0/z1", "t1/z0", "t1/z1"]);
    }

    #[test]
    fn node_level_assembler_replaces_the_default() {
        /// Stamps every assembled event with a source field.
        struct Stamping;

        impl EventAssembler for Stamping {
            type Output = Event;

            fn assemble(
                &self,
                index: &AxesIndex,
                nodes: &[ActiveNode],
            ) -> Result<Event, SweepError> {
                let event = DefaultAssembler.assemble(index, nodes)?;
                Ok(event.with_field("assembled_by", "stamping"))
            }
        }

        let node = Arc::new(
            SequenceNode::new(vec![arc_axis(ValueAxis::counting("t", 2))])
                .expect("node")
                .with_assembler(Arc::new(Stamping)),
        );

        let events = collect(node.events());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| {
            e.field("assembled_by") == Some(&Scalar::Text("stamping".to_string()))
        }));
    }

    #[test]
    fn assembler_failure_halts_the_stream() {
        struct Rejecting;

        impl EventAssembler for Rejecting {
            type Output = Event;

            fn assemble(
                &self,
                index: &AxesIndex,
                nodes: &[ActiveNode],
            ) -> Result<Event, SweepError> {
                if index.position(&AxisKey::new("t")) == Some(1) {
                    return Err(SweepError::Assembly("branch rejected".to_string()));
                }
                DefaultAssembler.assemble(index, nodes)
            }
        }

        let node = Arc::new(
            SequenceNode::new(vec![arc_axis(ValueAxis::counting("t", 3))]).expect("node"),
        );

        let mut stream = node.events_with(Rejecting);
        assert!(stream.next().expect("first").is_ok());
        let err = stream.next().expect("second").expect_err("failure");
        assert!(matches!(err, SweepError::Assembly(_)));
        assert!(stream.next().is_none());
    }
}

// =============================================================================
// SECTION 6: LAZINESS, RESTARTABILITY, ERRORS
// =============================================================================

mod consumption {
    use super::*;

    #[test]
    fn unbounded_graph_serves_any_prefix() {
        let node = Arc::new(
            SequenceNode::new(vec![
                arc_axis(TickAxis::new("n").with_field("tick")),
                arc_axis(ValueAxis::counting("z", 2)),
            ])
            .expect("node"),
        );

        assert!(!node.is_finite());
        assert_eq!(
            node.lengths().get(&AxisKey::new("n")),
            Some(&Cardinality::Unbounded)
        );

        let events: Vec<Event> = node
            .events()
            .take(7)
            .collect::<Result<_, _>>()
            .expect("prefix");
        assert_eq!(events.len(), 7);
        assert_eq!(pos(&events[6], "n"), Some(3));
        assert_eq!(pos(&events[6], "z"), Some(0));
    }

    #[test]
    fn streams_are_restartable_and_deterministic() {
        let node = override_graph();
        let first = collect(node.events());
        let second = collect(node.events());
        assert_eq!(first, second);
    }

    #[test]
    fn interleaved_runs_do_not_interfere() {
        let node = reference_graph();
        let mut left = node.events();
        let mut right = node.events();

        let mut left_events = Vec::new();
        let mut right_events = Vec::new();
        // Pull alternately, with the right run trailing at half speed.
        for i in 0..8 {
            left_events.push(left.next().expect("left").expect("ok"));
            if i % 2 == 0
                && let Some(item) = right.next()
            {
                right_events.push(item.expect("ok"));
            }
        }
        for item in right {
            right_events.push(item.expect("ok"));
        }
        assert_eq!(left_events, right_events);
    }

    #[test]
    fn contribution_failure_surfaces_on_the_triggering_pull() {
        struct FailingContribution(ValueAxis);
        impl AxisSource for FailingContribution {
            fn axis_key(&self) -> &AxisKey {
                self.0.axis_key()
            }
            fn iterate(&self) -> AxisIter {
                self.0.iterate()
            }
            fn length(&self) -> Cardinality {
                self.0.length()
            }
            fn contribute(
                &self,
                value: &Scalar,
                _index: &AxesIndex,
            ) -> Result<FieldMap, SweepError> {
                if value == &Scalar::Int(1) {
                    return Err(SweepError::Contribution {
                        axis: self.0.axis_key().clone(),
                        reason: "value rejected".to_string(),
                    });
                }
                Ok(FieldMap::new())
            }
        }

        let node = Arc::new(
            SequenceNode::new(vec![arc_axis(FailingContribution(ValueAxis::counting(
                "t", 3,
            )))])
            .expect("node"),
        );

        let mut stream = node.events();
        assert!(stream.next().expect("first").is_ok());
        let err = stream.next().expect("second").expect_err("failure");
        assert!(matches!(err, SweepError::Contribution { axis, .. } if axis.as_str() == "t"));
        assert!(stream.next().is_none());
    }

    #[test]
    fn pruning_failure_surfaces_on_the_triggering_pull() {
        struct FailingPrune(ValueAxis);
        impl AxisSource for FailingPrune {
            fn axis_key(&self) -> &AxisKey {
                self.0.axis_key()
            }
            fn iterate(&self) -> AxisIter {
                self.0.iterate()
            }
            fn length(&self) -> Cardinality {
                self.0.length()
            }
            fn should_skip(&self, prefix: &AxesIndex) -> Result<bool, SweepError> {
                if prefix.position(&AxisKey::new("t")) == Some(2) {
                    return Err(SweepError::Pruning {
                        axis: self.0.axis_key().clone(),
                        reason: "predicate unavailable".to_string(),
                    });
                }
                Ok(false)
            }
        }

        let node = Arc::new(
            SequenceNode::new(vec![arc_axis(FailingPrune(ValueAxis::counting("t", 3)))])
                .expect("node"),
        );

        let results: Vec<_> = node.events().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(
            results[2],
            Err(SweepError::Pruning { .. })
        ));
    }
}
