//! Unit tests for rh-label.
//!
//! Randomized checks use seeded graphs so failures reproduce.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use rh_core::{GeoPoint, NodeId, ScenarioRng};
    use rh_graph::{Direction, EdgeSpec, NoSlowdown, RoadGraph, RoadGraphBuilder, Weight, one_to_all};

    use crate::Cost;

    /// Diamond A→B→D (10 + 10) and A→C→D (5 + 5), all one-way.
    pub fn diamond() -> (Arc<RoadGraph>, [NodeId; 4]) {
        let mut b = RoadGraphBuilder::new();
        let a = b.add_node(1, GeoPoint::new(14.650, 121.030));
        let bb = b.add_node(2, GeoPoint::new(14.651, 121.031));
        let c = b.add_node(3, GeoPoint::new(14.649, 121.031));
        let d = b.add_node(4, GeoPoint::new(14.650, 121.032));
        b.add_directed_edge(a, bb, EdgeSpec::new(100.0, 10, "Upper Road"));
        b.add_directed_edge(bb, d, EdgeSpec::new(100.0, 10, "Upper Road"));
        b.add_directed_edge(a, c, EdgeSpec::new(50.0, 5, "Lower Road"));
        b.add_directed_edge(c, d, EdgeSpec::new(50.0, 5, "Lower Road"));
        (Arc::new(b.build().unwrap()), [a, bb, c, d])
    }

    /// Two triangles with no road between them.
    pub fn two_islands() -> Arc<RoadGraph> {
        let mut b = RoadGraphBuilder::new();
        let mut ids = Vec::new();
        for i in 0..6u64 {
            let lng = if i < 3 { 121.0 + i as f64 * 0.001 } else { 121.1 + i as f64 * 0.001 };
            ids.push(b.add_node(i, GeoPoint::new(14.6, lng)));
        }
        for (x, y) in [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)] {
            b.add_road(ids[x], ids[y], EdgeSpec::new(100.0, 1_000, "Island Road"));
        }
        Arc::new(b.build().unwrap())
    }

    /// Connected random road graph: a random spanning tree plus `n` extra
    /// edges, a third of them one-way.
    pub fn random_graph(seed: u64, n: usize) -> Arc<RoadGraph> {
        let mut rng = ScenarioRng::new(seed);
        let mut b = RoadGraphBuilder::new();
        let ids: Vec<NodeId> = (0..n as u64)
            .map(|i| {
                let lat = 14.60 + rng.random::<f64>() * 0.05;
                let lng = 121.00 + rng.random::<f64>() * 0.05;
                b.add_node(1_000 + i, GeoPoint::new(lat, lng))
            })
            .collect();

        for i in 1..n {
            let j = rng.gen_range(0..i);
            let w: Weight = rng.gen_range(1..60);
            b.add_road(ids[i], ids[j], EdgeSpec::new(w as f64 * 10.0, w, format!("Road {j}")));
        }
        for _ in 0..n {
            let (i, j) = (rng.gen_range(0..n), rng.gen_range(0..n));
            if i == j {
                continue;
            }
            let w: Weight = rng.gen_range(1..60);
            let spec = EdgeSpec::new(w as f64 * 10.0, w, format!("Link {i}"));
            if rng.gen_bool(0.33) {
                b.add_directed_edge(ids[i], ids[j], spec);
            } else {
                b.add_road(ids[i], ids[j], spec);
            }
        }
        Arc::new(b.build().unwrap())
    }

    pub fn base_weights(g: &RoadGraph) -> Vec<Weight> {
        g.weights(&NoSlowdown)
    }

    /// All-pairs reference costs by Dijkstra.
    pub fn reference(g: &RoadGraph, weights: &[Weight]) -> Vec<Vec<Option<Cost>>> {
        (0..g.node_count() as u32)
            .map(|s| {
                let tree = one_to_all(g, weights, NodeId(s), Direction::Forward);
                tree.dist
                    .iter()
                    .zip(&tree.hops)
                    .map(|(&dist, &hops)| (dist != rh_graph::INFINITE_WEIGHT).then_some(Cost { dist, hops }))
                    .collect()
            })
            .collect()
    }
}

// ── Static hub labels ─────────────────────────────────────────────────────────

#[cfg(test)]
mod static_labels {
    use rh_core::NodeId;
    use rh_overlay::{DisruptionOverlay, DisruptionTarget, IncidentType, NewDisruption, Severity};

    use super::helpers;
    use crate::{HubLabels, LabelEngine, LabelError, StaticEngine};

    #[test]
    fn diamond_prefers_cheaper_branch() {
        let (g, [a, _b, c, d]) = helpers::diamond();
        let labels = HubLabels::build(&g, &helpers::base_weights(&g));
        let p = labels.path(a, d).unwrap();
        assert_eq!(p.distance, 10);
        assert_eq!(p.nodes, vec![a, c, d]);
        assert!(!p.fallback);
    }

    #[test]
    fn matches_dijkstra_on_random_graphs() {
        for seed in 0..4 {
            let g = helpers::random_graph(seed, 40);
            let w = helpers::base_weights(&g);
            let labels = HubLabels::build(&g, &w);
            let reference = helpers::reference(&g, &w);
            for s in 0..g.node_count() as u32 {
                for t in 0..g.node_count() as u32 {
                    assert_eq!(labels.cost(NodeId(s), NodeId(t)), reference[s as usize][t as usize], "seed {seed}: {s} → {t}");
                }
            }
        }
    }

    #[test]
    fn unpacked_paths_are_consistent() {
        let g = helpers::random_graph(11, 30);
        let w = helpers::base_weights(&g);
        let labels = HubLabels::build(&g, &w);
        for s in 0..30u32 {
            for t in 0..30u32 {
                let p = labels.path(NodeId(s), NodeId(t)).unwrap();
                let sum: u32 = p.edges.iter().map(|e| w[e.index()]).sum();
                assert_eq!(sum, p.distance);
                assert_eq!(p.nodes.first(), Some(&NodeId(s)));
                assert_eq!(p.nodes.last(), Some(&NodeId(t)));
                for (i, e) in p.edges.iter().enumerate() {
                    assert_eq!(g.endpoints(*e), (p.nodes[i], p.nodes[i + 1]));
                }
            }
        }
    }

    #[test]
    fn disconnected_is_unreachable() {
        let g = helpers::two_islands();
        let labels = HubLabels::build(&g, &helpers::base_weights(&g));
        assert!(matches!(labels.path(NodeId(0), NodeId(4)), Err(LabelError::Unreachable { .. })));
        assert!(labels.path(NodeId(0), NodeId(2)).is_ok());
    }

    #[test]
    fn engine_rebuilds_only_on_version_change() {
        let (g, [a, _b, c, d]) = helpers::diamond();
        let engine = StaticEngine::new();
        let mut overlay = DisruptionOverlay::default();

        let (first, rebuilt) = engine.labels_for(&g, &overlay);
        assert!(rebuilt);
        let (_, rebuilt) = engine.labels_for(&g, &overlay);
        assert!(!rebuilt);
        assert!(first.stats().entries > 0);
        assert!(first.stats().bytes > 0);

        overlay
            .add(&g, NewDisruption::new(DisruptionTarget::NodePair(a, c), IncidentType::Accident, Severity::Heavy))
            .unwrap();
        let (labels, rebuilt) = engine.labels_for(&g, &overlay);
        assert!(rebuilt);
        let p = labels.path(a, d).unwrap();
        assert_eq!(p.distance, 20, "17 + 5 via C loses to 10 + 10 via B");
    }
}

// ── Partition tree ────────────────────────────────────────────────────────────

#[cfg(test)]
mod hierarchy {
    use rh_core::NodeId;
    use rh_graph::Direction;

    use super::helpers;
    use crate::PartitionTree;

    #[test]
    fn every_vertex_has_one_home() {
        let g = helpers::random_graph(3, 60);
        let tree = PartitionTree::build(&g, 4);
        let mut seen = vec![0; g.node_count()];
        for node in &tree.nodes {
            for v in &node.cut {
                seen[v.index()] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
        assert!(tree.height() > 1);
    }

    #[test]
    fn vertex_sets_match_interval_membership() {
        let g = helpers::random_graph(5, 50);
        let tree = PartitionTree::build(&g, 4);
        for (a, node) in tree.nodes.iter().enumerate() {
            for v in 0..g.node_count() as u32 {
                let listed = node.vertices.binary_search(&NodeId(v)).is_ok();
                assert_eq!(listed, tree.contains(a as u32, NodeId(v)));
            }
            for (i, &v) in node.vertices.iter().enumerate() {
                assert_eq!(tree.local_index(v, node.depth), i);
            }
        }
    }

    #[test]
    fn cuts_separate_children() {
        let g = helpers::random_graph(9, 80);
        let tree = PartitionTree::build(&g, 4);
        for a in 0..tree.len() as u32 {
            let children: Vec<u32> = (0..tree.len() as u32)
                .filter(|&c| tree.node(c).parent == Some(a))
                .collect();
            if children.len() < 2 {
                continue;
            }
            let (l, r) = (children[0], children[1]);
            for &v in &tree.node(l).vertices {
                for (_, u) in g.neighbors(v, Direction::Forward).chain(g.neighbors(v, Direction::Backward)) {
                    assert!(!tree.contains(r, u), "edge {v} — {u} crosses the cut of node {a}");
                }
            }
        }
    }

    #[test]
    fn size_counts_only_stored_arrays() {
        let g = helpers::random_graph(11, 40);
        let tree = PartitionTree::build(&g, 4);
        let n = g.node_count();
        let id = std::mem::size_of::<NodeId>();
        let lists: usize = tree.nodes.iter().map(|t| (t.cut.capacity() + t.vertices.capacity()) * id).sum();
        // One local index per (vertex, ancestor) pair, i.e. per vertex-set entry.
        let local: usize = tree.nodes.iter().map(|t| t.vertices.len()).sum();
        let expected = lists
            + tree.len() * std::mem::size_of::<crate::hierarchy::TreeNode>()
            + (n + (n + 1) + local) * 4;
        assert_eq!(tree.size_bytes(), expected);
    }
}

// ── Impact score & threshold ──────────────────────────────────────────────────

#[cfg(test)]
mod impact {
    use crate::{LabelError, RepairStrategy, disruption_score, validate_tau};

    #[test]
    fn score_formula() {
        assert_eq!(disruption_score(0.5, 10.0, false), 0.5);
        assert!((disruption_score(0.3, 7.0, false) - 0.49).abs() < 1e-9);
        assert_eq!(disruption_score(0.9, 10.0, true), 1.0, "closure score is clamped");
        assert_eq!(disruption_score(1.0, 0.0, false), 0.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(RepairStrategy::choose(0.5, 0.5), RepairStrategy::Immediate);
        assert_eq!(RepairStrategy::choose(0.4999, 0.5), RepairStrategy::Lazy);
    }

    #[test]
    fn tau_must_be_in_unit_interval() {
        assert!(validate_tau(0.0).is_ok());
        assert!(validate_tau(1.0).is_ok());
        assert!(matches!(validate_tau(1.5), Err(LabelError::InvalidThreshold(_))));
        assert!(validate_tau(f64::NAN).is_err());
    }
}

// ── Dynamic labels ────────────────────────────────────────────────────────────

#[cfg(test)]
mod dynamic {
    use rh_core::{DisruptionId, EdgeId, NodeId, ScenarioRng};
    use rh_overlay::{DisruptionOverlay, DisruptionTarget, IncidentType, NewDisruption, Severity};

    use super::helpers;
    use crate::{
        DynamicLabels, HubLabels, LabelError, MaintenanceState, RepairStrategy,
    };

    fn assert_matches_rebuild(dynamic: &DynamicLabels, overlay: &DisruptionOverlay, context: &str) {
        let g = dynamic.graph().clone();
        let weights = g.weights(overlay);
        assert_eq!(dynamic.weights(), weights.as_slice(), "{context}: weights drifted");
        let fresh = DynamicLabels::build(g.clone(), weights.clone(), 4);
        let fresh_static = HubLabels::build(&g, &weights);
        for s in 0..g.node_count() as u32 {
            for t in 0..g.node_count() as u32 {
                let (s, t) = (NodeId(s), NodeId(t));
                let got = dynamic.cost(s, t).unwrap();
                assert_eq!(got, fresh.cost(s, t).unwrap(), "{context}: {s} → {t} vs rebuild");
                assert_eq!(got, fresh_static.cost(s, t), "{context}: {s} → {t} vs static");
            }
        }
    }

    #[test]
    fn matches_dijkstra_on_random_graphs() {
        for seed in 0..4 {
            let g = helpers::random_graph(100 + seed, 40);
            let w = helpers::base_weights(&g);
            let reference = helpers::reference(&g, &w);
            let labels = DynamicLabels::build(g.clone(), w, 4);
            for s in 0..40u32 {
                for t in 0..40u32 {
                    assert_eq!(
                        labels.cost(NodeId(s), NodeId(t)).unwrap(),
                        reference[s as usize][t as usize],
                        "seed {seed}: {s} → {t}"
                    );
                }
            }
        }
    }

    #[test]
    fn diamond_scenario() {
        let (g, [a, b, c, d]) = helpers::diamond();
        let mut overlay = DisruptionOverlay::default();
        let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 16);
        assert_eq!(labels.path(a, d).unwrap().nodes, vec![a, c, d]);

        let delta = overlay
            .add(&g, NewDisruption::new(DisruptionTarget::NodePair(a, c), IncidentType::Accident, Severity::Heavy))
            .unwrap();
        labels.apply_delta(&delta, 0.5).unwrap();

        let p = labels.path(a, d).unwrap();
        assert_eq!(p.distance, 20);
        assert_eq!(p.nodes, vec![a, b, d]);
        assert_matches_rebuild(&labels, &overlay, "diamond");
    }

    #[test]
    fn impact_at_threshold_repairs_immediately() {
        let (g, [a, b, _c, d]) = helpers::diamond();
        let mut overlay = DisruptionOverlay::default();
        let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 16);

        let delta = overlay
            .add(
                &g,
                NewDisruption::new(DisruptionTarget::NodePair(a, b), IncidentType::Congestion, Severity::Medium)
                    .with_ratio(0.5)
                    .with_jam_factor(10.0),
            )
            .unwrap();
        let report = labels.apply_delta(&delta, 0.5).unwrap();
        assert_eq!(report.assessment.score, 0.5);
        assert_eq!(report.strategy, RepairStrategy::Immediate);
        assert!(report.columns_repaired > 0);
        assert_eq!(
            report.transitions,
            vec![MaintenanceState::DisruptedPending, MaintenanceState::ImmediateRepair, MaintenanceState::Clean]
        );
        assert_eq!(labels.state(), MaintenanceState::Clean);
        assert_eq!(labels.path(a, d).unwrap().distance, 10);
    }

    #[test]
    fn lazy_repair_converges() {
        let g = helpers::random_graph(21, 30);
        let mut overlay = DisruptionOverlay::default();
        let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 4);

        // Edges of a label path are tight in some column.  Heavy
        // non-closure scores 0.7 · 0.7 = 0.49, below τ = 1.
        let route = labels.path(NodeId(0), NodeId(29)).unwrap();
        let mut flagged = 0;
        for &e in route.edges.iter().take(4) {
            let delta = overlay
                .add(&g, NewDisruption::new(DisruptionTarget::Edge(e), IncidentType::Accident, Severity::Heavy))
                .unwrap();
            let report = labels.apply_delta(&delta, 1.0).unwrap();
            assert_ne!(report.strategy, RepairStrategy::Immediate);
            flagged += report.columns_flagged;
        }
        assert!(flagged > 0);
        assert_eq!(labels.state(), MaintenanceState::LazyRepairFlagged);
        assert_eq!(labels.stale_columns(), flagged);

        assert_matches_rebuild(&labels, &overlay, "lazy");
        assert_eq!(labels.stale_columns(), 0, "all-pairs queries touch every column");
        assert_eq!(labels.lazy_repairs(), flagged);
        assert_eq!(labels.state(), MaintenanceState::Clean);
    }

    #[test]
    fn rebuild_equivalence_under_random_disruptions() {
        for seed in 0..3u64 {
            let g = helpers::random_graph(200 + seed, 30);
            let mut rng = ScenarioRng::new(seed);
            let mut overlay = DisruptionOverlay::default();
            let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 4);
            let mut live: Vec<DisruptionId> = Vec::new();

            for step in 0..12 {
                let delta = if !live.is_empty() && rng.gen_bool(0.3) {
                    let i = rng.gen_range(0..live.len());
                    overlay.remove(&g, live.swap_remove(i))
                } else {
                    let e = EdgeId(rng.gen_range(0..g.edge_count() as u32));
                    let severity = *rng.choose(&[Severity::Light, Severity::Medium, Severity::Heavy]).unwrap();
                    let incident = if rng.gen_bool(0.2) { IncidentType::RoadClosure } else { IncidentType::Congestion };
                    let delta = overlay
                        .add(&g, NewDisruption::new(DisruptionTarget::Edge(e), incident, severity))
                        .unwrap();
                    live.extend(delta.added());
                    delta
                };
                let tau = rng.gen_range(0.0..=1.0);
                labels.apply_delta(&delta, tau).unwrap();
                if step % 4 == 3 {
                    assert_matches_rebuild(&labels, &overlay, &format!("seed {seed} step {step}"));
                }
            }

            let cleared = overlay.clear(&g);
            labels.apply_delta(&cleared, 0.0).unwrap();
            labels.repair_all();
            assert_eq!(labels.state(), MaintenanceState::Clean);
            assert_matches_rebuild(&labels, &overlay, &format!("seed {seed} cleared"));
        }
    }

    #[test]
    fn concurrent_queries_repair_each_column_once() {
        let g = helpers::random_graph(31, 60);
        let mut rng = ScenarioRng::new(31);
        let mut overlay = DisruptionOverlay::default();
        let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 4);

        let mut hit: Vec<EdgeId> = Vec::new();
        while hit.len() < 20 {
            let e = EdgeId(rng.gen_range(0..g.edge_count() as u32));
            if hit.contains(&e) {
                continue;
            }
            hit.push(e);
            let delta = overlay
                .add(&g, NewDisruption::new(DisruptionTarget::Edge(e), IncidentType::Congestion, Severity::Heavy))
                .unwrap();
            let report = labels.apply_delta(&delta, 1.0).unwrap();
            assert_ne!(report.strategy, RepairStrategy::Immediate);
        }

        let stale_before = labels.stale_columns();
        let repairs_before = labels.lazy_repairs();
        assert!(stale_before > 0);

        let expected = HubLabels::build(&g, labels.weights());
        let n = g.node_count() as u32;
        std::thread::scope(|scope| {
            for worker in 0..8u32 {
                let (labels, expected) = (&labels, &expected);
                scope.spawn(move || {
                    // Workers start at different sources so they collide on columns.
                    for i in 0..n {
                        let s = NodeId((i + worker * 7) % n);
                        for t in 0..n {
                            let t = NodeId(t);
                            assert_eq!(labels.cost(s, t).unwrap(), expected.cost(s, t), "worker {worker}: {s} → {t}");
                        }
                    }
                });
            }
        });

        assert_eq!(labels.stale_columns(), 0);
        assert_eq!(labels.lazy_repairs() - repairs_before, stale_before);
        assert_eq!(labels.state(), MaintenanceState::Clean);
    }

    #[test]
    fn removal_is_idempotent() {
        let (g, [a, _b, c, d]) = helpers::diamond();
        let mut overlay = DisruptionOverlay::default();
        let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 16);
        let delta = overlay
            .add(&g, NewDisruption::new(DisruptionTarget::NodePair(a, c), IncidentType::RoadClosure, Severity::Heavy))
            .unwrap();
        let id = delta.added().next().unwrap();
        labels.apply_delta(&delta, 0.5).unwrap();

        let first = overlay.remove(&g, id);
        labels.apply_delta(&first, 0.5).unwrap();
        let second = overlay.remove(&g, id);
        let report = labels.apply_delta(&second, 0.5).unwrap();
        assert_eq!(report.strategy, RepairStrategy::None);
        assert_eq!(report.final_state(), MaintenanceState::Clean);
        assert_eq!(labels.path(a, d).unwrap().distance, 10);
        assert_matches_rebuild(&labels, &overlay, "after double removal");
    }

    #[test]
    fn invalid_tau_leaves_index_untouched() {
        let (g, [a, _b, c, _d]) = helpers::diamond();
        let mut overlay = DisruptionOverlay::default();
        let mut labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 16);
        let delta = overlay
            .add(&g, NewDisruption::new(DisruptionTarget::NodePair(a, c), IncidentType::Accident, Severity::Heavy))
            .unwrap();
        assert!(matches!(labels.apply_delta(&delta, -0.1), Err(LabelError::InvalidThreshold(_))));
        assert_eq!(labels.weights(), helpers::base_weights(&g).as_slice());
    }

    #[test]
    fn disconnected_is_unreachable() {
        let g = helpers::two_islands();
        let labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 2);
        assert!(matches!(labels.path(NodeId(1), NodeId(5)), Err(LabelError::Unreachable { .. })));
        assert_eq!(labels.path(NodeId(3), NodeId(5)).unwrap().distance, 1_000);
    }

    #[test]
    fn poisoned_column_falls_back_to_dijkstra() {
        let (g, [a, _b, c, d]) = helpers::diamond();
        let labels = DynamicLabels::build(g.clone(), helpers::base_weights(&g), 16);
        for id in 0..labels.column_count() {
            labels.poison_column(id);
        }
        let p = labels.path(a, d).unwrap();
        assert!(p.fallback);
        assert_eq!(p.distance, 10);
        assert_eq!(p.nodes, vec![a, c, d]);
    }

    #[test]
    fn paths_follow_real_edges() {
        let g = helpers::random_graph(33, 30);
        let w = helpers::base_weights(&g);
        let labels = DynamicLabels::build(g.clone(), w.clone(), 4);
        for s in 0..30u32 {
            for t in 0..30u32 {
                let p = labels.path(NodeId(s), NodeId(t)).unwrap();
                let sum: u32 = p.edges.iter().map(|e| w[e.index()]).sum();
                assert_eq!(sum, p.distance);
                for (i, e) in p.edges.iter().enumerate() {
                    assert_eq!(g.endpoints(*e), (p.nodes[i], p.nodes[i + 1]));
                }
            }
        }
    }
}
