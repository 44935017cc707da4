//! Unit tests for rh-graph.
//!
//! All tests use hand-built graphs so they run without any data file.

#[cfg(test)]
mod helpers {
    use rh_core::{GeoPoint, NodeId};
    use crate::{EdgeSpec, RoadGraph, RoadGraphBuilder};

    /// Small grid for routing tests.
    ///
    /// Nodes (lat, lng):
    ///   0:(0,0)  1:(0,1)  2:(0,2)
    ///   3:(1,0)           4:(1,2)
    ///
    /// Two-way roads: 0-1, 1-2, 2-4 (10 s each) and 0-3 (50 s), 3-4 (10 s).
    /// Shortest 0→4 is 0→1→2→4 at 30 s.
    pub fn grid_graph() -> (RoadGraph, [NodeId; 5]) {
        let mut b = RoadGraphBuilder::new();
        let n0 = b.add_node(100, GeoPoint::new(0.0, 0.0));
        let n1 = b.add_node(101, GeoPoint::new(0.0, 1.0));
        let n2 = b.add_node(102, GeoPoint::new(0.0, 2.0));
        let n3 = b.add_node(103, GeoPoint::new(1.0, 0.0));
        let n4 = b.add_node(104, GeoPoint::new(1.0, 2.0));

        b.add_road(n0, n1, EdgeSpec::new(100.0, 10_000, "North Road"));
        b.add_road(n1, n2, EdgeSpec::new(100.0, 10_000, "North Road"));
        b.add_road(n2, n4, EdgeSpec::new(100.0, 10_000, "East Road"));
        b.add_road(n0, n3, EdgeSpec::new(500.0, 50_000, "West Road"));
        b.add_road(n3, n4, EdgeSpec::new(100.0, 10_000, "South Road"));

        (b.build().unwrap(), [n0, n1, n2, n3, n4])
    }
}

// ── Builder & graph structure ─────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use rh_core::GeoPoint;
    use crate::{DataError, Direction, Directionality, EdgeSpec, GraphError, RoadGraphBuilder};

    #[test]
    fn empty_build() {
        let g = RoadGraphBuilder::new().build().unwrap();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_empty());
    }

    #[test]
    fn two_way_road_is_two_edges() {
        let mut b = RoadGraphBuilder::new();
        let a = b.add_node(1, GeoPoint::new(14.65, 121.03));
        let c = b.add_node(2, GeoPoint::new(14.66, 121.03));
        b.add_road(a, c, EdgeSpec::new(1_000.0, 75_000, "Katipunan Avenue"));
        let g = b.build().unwrap();
        assert_eq!(g.edge_count(), 2);
        assert!(g.edge_direction.iter().all(|d| *d == Directionality::TwoWay));
        assert_eq!(g.road_names.len(), 1, "names are interned");
    }

    #[test]
    fn forward_and_backward_neighbors() {
        let (g, [n0, n1, n2, _n3, _n4]) = super::helpers::grid_graph();
        let fwd: Vec<_> = g.neighbors(n1, Direction::Forward).map(|(_, v)| v).collect();
        let bwd: Vec<_> = g.neighbors(n1, Direction::Backward).map(|(_, v)| v).collect();
        assert_eq!(fwd.len(), 2);
        assert!(fwd.contains(&n0) && fwd.contains(&n2));
        assert_eq!(bwd.len(), 2);
        assert!(bwd.contains(&n0) && bwd.contains(&n2));
        for (e, v) in g.neighbors(n1, Direction::Backward) {
            assert_eq!(g.endpoints(e), (v, n1));
        }
    }

    #[test]
    fn one_way_has_no_reverse_edge() {
        let mut b = RoadGraphBuilder::new();
        let a = b.add_node(1, GeoPoint::new(0.0, 0.0));
        let c = b.add_node(2, GeoPoint::new(0.0, 0.01));
        b.add_directed_edge(a, c, EdgeSpec::new(100.0, 1_000, "One Way"));
        let g = b.build().unwrap();
        assert_eq!(g.out_degree(a), 1);
        assert_eq!(g.out_degree(c), 0);
        assert_eq!(g.in_degree(c), 1);
        assert_eq!(g.edges_between(a, c).len(), 1);
    }

    #[test]
    fn edges_between_covers_both_directions() {
        let (g, [n0, n1, _, _, n4]) = super::helpers::grid_graph();
        let both = g.edges_between(n0, n1);
        assert_eq!(both.len(), 2);
        assert!(g.edges_between(n0, n4).is_empty());
    }

    #[test]
    fn rejects_duplicate_external_id() {
        let mut b = RoadGraphBuilder::new();
        b.add_node(7, GeoPoint::new(0.0, 0.0));
        b.add_node(7, GeoPoint::new(0.0, 1.0));
        match b.build() {
            Err(GraphError::Data(DataError::DuplicateNode(7))) => {}
            other => panic!("expected DuplicateNode, got {:?}", other.err()),
        }
    }

    #[test]
    fn rejects_zero_travel_time() {
        let mut b = RoadGraphBuilder::new();
        let a = b.add_node(1, GeoPoint::new(0.0, 0.0));
        let c = b.add_node(2, GeoPoint::new(0.0, 1.0));
        b.add_directed_edge(a, c, EdgeSpec::new(10.0, 0, ""));
        assert!(matches!(
            b.build(),
            Err(GraphError::Data(DataError::ZeroTravelTime { edge: 0 }))
        ));
    }
}

// ── Weights ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod weights {
    use rh_core::EdgeId;
    use crate::{EdgeSlowdown, INFINITE_WEIGHT, NoSlowdown, Slowdown, add_weight};

    struct SlowFirst(Slowdown);

    impl EdgeSlowdown for SlowFirst {
        fn slowdown(&self, edge: EdgeId) -> Option<Slowdown> {
            (edge == EdgeId(0)).then_some(self.0)
        }
    }

    #[test]
    fn ratio_divides_base_time() {
        assert_eq!(Slowdown::Ratio(0.5).apply(10_000), 20_000);
        assert_eq!(Slowdown::Ratio(0.3).apply(5), 17);
        assert_eq!(Slowdown::Ratio(1.0).apply(123), 123);
    }

    #[test]
    fn closure_is_infinite() {
        assert_eq!(Slowdown::Closed.apply(10), INFINITE_WEIGHT);
        assert_eq!(Slowdown::Ratio(0.0).apply(10), INFINITE_WEIGHT);
    }

    #[test]
    fn effective_weight_uses_overlay() {
        let (g, _) = super::helpers::grid_graph();
        let base = g.edge_travel_ms[0];
        assert_eq!(g.effective_weight(EdgeId(0), &NoSlowdown), base);
        assert_eq!(g.effective_weight(EdgeId(0), &SlowFirst(Slowdown::Ratio(0.5))), base * 2);
        assert_eq!(g.effective_weight(EdgeId(1), &SlowFirst(Slowdown::Closed)), g.edge_travel_ms[1]);
        let w = g.weights(&SlowFirst(Slowdown::Closed));
        assert_eq!(w[0], INFINITE_WEIGHT);
        assert_eq!(w.len(), g.edge_count());
    }

    #[test]
    fn infinite_absorbs_in_addition() {
        assert_eq!(add_weight(INFINITE_WEIGHT, 1), INFINITE_WEIGHT);
        assert_eq!(add_weight(3, 4), 7);
    }
}

// ── Spatial snapping ──────────────────────────────────────────────────────────

#[cfg(test)]
mod snap {
    use rh_core::GeoPoint;
    use crate::{EdgeSpec, RoadGraph, RoadGraphBuilder};

    #[test]
    fn nearest_node_exact() {
        let (g, [n0, ..]) = super::helpers::grid_graph();
        let (node, d) = g.nearest_node(GeoPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(node, n0);
        assert!(d < 1e-6);
    }

    #[test]
    fn nearest_node_reports_haversine_distance() {
        let (g, [_, _, _, n3, _]) = super::helpers::grid_graph();
        let (node, d) = g.nearest_node(GeoPoint::new(1.01, 0.0)).unwrap();
        assert_eq!(node, n3);
        // 0.01° of latitude ≈ 1112 m.
        assert!((d - 1_112.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn equidistant_tie_goes_to_lowest_node_id() {
        // Dense ids follow insertion order, not external ids.
        let mut b = RoadGraphBuilder::new();
        let first = b.add_node(50, GeoPoint::new(0.0, 1.0));
        let second = b.add_node(10, GeoPoint::new(0.0, -1.0));
        b.add_road(first, second, EdgeSpec::new(10.0, 1_000, ""));
        let g = b.build().unwrap();
        let (node, _) = g.nearest_node(GeoPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(node, first);
        assert!(first < second);
    }

    #[test]
    fn empty_graph_has_no_nearest() {
        assert!(RoadGraph::empty().nearest_node(GeoPoint::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn lookup_by_external_id() {
        let (g, [_, n1, ..]) = super::helpers::grid_graph();
        assert_eq!(g.node_by_external(101), Some(n1));
        assert_eq!(g.node_by_external(999), None);
    }
}

// ── Reference Dijkstra ────────────────────────────────────────────────────────

#[cfg(test)]
mod dijkstra {
    use crate::{Direction, GraphError, INFINITE_WEIGHT, NoSlowdown, one_to_all, shortest_path};

    #[test]
    fn prefers_fast_route() {
        let (g, [n0, n1, n2, _n3, n4]) = super::helpers::grid_graph();
        let w = g.weights(&NoSlowdown);
        let p = shortest_path(&g, &w, n0, n4).unwrap();
        assert_eq!(p.distance, 30_000);
        assert_eq!(p.nodes, vec![n0, n1, n2, n4]);
        assert_eq!(p.hops(), 3);
    }

    #[test]
    fn trivial_path() {
        let (g, [n0, ..]) = super::helpers::grid_graph();
        let w = g.weights(&NoSlowdown);
        let p = shortest_path(&g, &w, n0, n0).unwrap();
        assert_eq!(p.distance, 0);
        assert!(p.edges.is_empty());
        assert_eq!(p.nodes, vec![n0]);
    }

    #[test]
    fn closed_edge_forces_detour() {
        let (g, [n0, _, n2, n3, n4]) = super::helpers::grid_graph();
        let mut w = g.weights(&NoSlowdown);
        for e in g.edges_between(n2, n4) {
            w[e.index()] = INFINITE_WEIGHT;
        }
        let p = shortest_path(&g, &w, n0, n4).unwrap();
        assert_eq!(p.distance, 60_000);
        assert_eq!(p.nodes, vec![n0, n3, n4]);
    }

    #[test]
    fn disconnected_is_no_route() {
        let (g, [n0, n1, ..]) = super::helpers::grid_graph();
        let w = vec![INFINITE_WEIGHT; g.edge_count()];
        assert!(matches!(shortest_path(&g, &w, n0, n1), Err(GraphError::NoRoute { .. })));
    }

    #[test]
    fn backward_search_matches_forward() {
        let (g, nodes) = super::helpers::grid_graph();
        let w = g.weights(&NoSlowdown);
        let target = nodes[4];
        let to_target = one_to_all(&g, &w, target, Direction::Backward);
        for &s in &nodes {
            let p = shortest_path(&g, &w, s, target).unwrap();
            assert_eq!(to_target.dist[s.index()], p.distance);
        }
    }
}

// ── CSV loading ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use crate::{DataError, GraphError, LoadOptions, load_readers};

    const NODES: &str = "node_id,lat,lng\n1,14.6500,121.0300\n2,14.6510,121.0300\n3,14.6520,121.0300\n";

    #[test]
    fn loads_one_way_and_two_way_rows() {
        let edges = "source,target,length_m,travel_time_s,road_name,oneway\n\
                     1,2,111.0,10,Maginhawa Street,no\n\
                     2,3,111.0,,Matalino Street,yes\n";
        let g = load_readers(Cursor::new(NODES), Cursor::new(edges), &LoadOptions::default()).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);

        let n2 = g.node_by_external(2).unwrap();
        let n3 = g.node_by_external(3).unwrap();
        let e = g.edges_between(n2, n3)[0];
        assert_eq!(g.road_name(e), "Matalino Street");
        // 111 m at 30 km/h ≈ 13.3 s → 13 s.
        assert_eq!(g.edge_travel_ms[e.index()], 13_000);
    }

    #[test]
    fn road_class_picks_speed() {
        let edges = "source,target,length_m,travel_time_s,road_name,oneway,highway\n\
                     1,2,1000.0,,Fast Road,yes,primary\n";
        let g = load_readers(Cursor::new(NODES), Cursor::new(edges), &LoadOptions::default()).unwrap();
        // 1 km at 60 km/h = 60 s.
        assert_eq!(g.edge_travel_ms[0], 60_000);
    }

    #[test]
    fn unknown_node_is_rejected() {
        let edges = "source,target,length_m,travel_time_s,road_name,oneway\n1,9,10.0,1,X,no\n";
        match load_readers(Cursor::new(NODES), Cursor::new(edges), &LoadOptions::default()) {
            Err(GraphError::Data(DataError::UnknownNode { edge: 0, node: 9 })) => {}
            other => panic!("expected UnknownNode, got {:?}", other.err()),
        }
    }

    #[test]
    fn non_positive_length_is_rejected() {
        let edges = "source,target,length_m,travel_time_s,road_name,oneway\n1,2,0.0,1,X,no\n";
        assert!(matches!(
            load_readers(Cursor::new(NODES), Cursor::new(edges), &LoadOptions::default()),
            Err(GraphError::Data(DataError::NonPositiveLength { edge: 0, .. }))
        ));
    }

    #[test]
    fn zero_travel_time_is_rejected() {
        let edges = "source,target,length_m,travel_time_s,road_name,oneway\n1,2,10.0,0,X,no\n";
        assert!(matches!(
            load_readers(Cursor::new(NODES), Cursor::new(edges), &LoadOptions::default()),
            Err(GraphError::Data(DataError::ZeroTravelTime { edge: 0 }))
        ));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let nodes = "node_id,lat,lng\n1,0,0\n1,0,1\n";
        let edges = "source,target,length_m,travel_time_s,road_name,oneway\n";
        assert!(matches!(
            load_readers(Cursor::new(nodes), Cursor::new(edges), &LoadOptions::default()),
            Err(GraphError::Data(DataError::DuplicateNode(1)))
        ));
    }
}
