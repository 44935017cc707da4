//! OSM PBF loader, enabled with the `osm` Cargo feature.
//!
//! ```ignore
//! use std::path::Path;
//! use rh_graph::osm::load_from_pbf;
//!
//! let graph = load_from_pbf(Path::new("quezon_city.osm.pbf"))?;
//! ```
//!
//! Only drivable `highway=*` ways are kept.  Each consecutive pair of way
//! nodes becomes one road segment named after the way's `name` tag (falling
//! back to `ref`).  One-way ways add a single directed edge.  OSM node ids
//! become the graph's external node ids.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use osmpbf::{Element, ElementReader};

use rh_core::{GeoPoint, NodeId};

use crate::error::{GraphError, GraphResult};
use crate::loader::road_class_speed_kph;
use crate::network::{EdgeSpec, RoadGraph, RoadGraphBuilder};
use crate::weight::Weight;

/// Speed for drivable classes missing from the speed table.
const FALLBACK_SPEED_KPH: f64 = 30.0;

/// Load a road graph from an OSM PBF file.
///
/// # Errors
///
/// [`GraphError::Osm`] on parse errors, plus any validation error from
/// [`RoadGraphBuilder::build`].
pub fn load_from_pbf(path: &Path) -> GraphResult<RoadGraph> {
    let reader = ElementReader::from_path(path).map_err(|e| GraphError::Osm(e.to_string()))?;

    let mut all_nodes: HashMap<i64, GeoPoint> = HashMap::new();
    let mut road_ways: Vec<OsmWay> = Vec::new();

    reader
        .for_each(|elem| match elem {
            Element::Node(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::DenseNode(n) => {
                all_nodes.insert(n.id(), GeoPoint::new(n.lat(), n.lon()));
            }
            Element::Way(w) => {
                let tags: Vec<(&str, &str)> = w.tags().collect();
                let tag = |key: &str| tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

                let Some(highway) = tag("highway") else { return };
                if !is_drivable(highway) {
                    return;
                }
                let speed_kph = road_class_speed_kph(highway).unwrap_or(FALLBACK_SPEED_KPH);
                let name = tag("name").or_else(|| tag("ref")).unwrap_or("").to_owned();
                let oneway = is_oneway(highway, &tags);
                road_ways.push(OsmWay { refs: w.refs().collect(), speed_kph, oneway, name });
            }
            _ => {}
        })
        .map_err(|e| GraphError::Osm(e.to_string()))?;

    let road_node_ids: HashSet<i64> = road_ways.iter().flat_map(|w| w.refs.iter().copied()).collect();

    let mut builder = RoadGraphBuilder::with_capacity(road_node_ids.len(), road_node_ids.len() * 2);
    let mut osm_to_node: HashMap<i64, NodeId> = HashMap::with_capacity(road_node_ids.len());

    // Sorted so NodeIds are stable across runs on the same file.
    let mut sorted: Vec<i64> = road_node_ids.into_iter().collect();
    sorted.sort_unstable();
    for osm_id in sorted {
        if let Some(&pos) = all_nodes.get(&osm_id) {
            osm_to_node.insert(osm_id, builder.add_node(osm_id as u64, pos));
        }
    }
    drop(all_nodes);

    for way in &road_ways {
        for window in way.refs.windows(2) {
            let (Some(&a), Some(&b)) = (osm_to_node.get(&window[0]), osm_to_node.get(&window[1])) else {
                continue;
            };
            if a == b {
                continue;
            }
            let len_m = builder.node_pos(a).distance_m(builder.node_pos(b));
            if len_m <= 0.0 {
                continue;
            }
            let travel_ms = ((len_m / 1_000.0) / (way.speed_kph / 3_600.0) * 1_000.0).round().max(1.0) as Weight;
            let spec = EdgeSpec::new(len_m, travel_ms, way.name.as_str());
            if way.oneway {
                builder.add_directed_edge(a, b, spec);
            } else {
                builder.add_road(a, b, spec);
            }
        }
    }

    tracing::info!(ways = road_ways.len(), nodes = builder.node_count(), "OSM extract parsed");
    builder.build()
}

struct OsmWay {
    refs:      Vec<i64>,
    speed_kph: f64,
    oneway:    bool,
    name:      String,
}

fn is_drivable(highway: &str) -> bool {
    !matches!(
        highway,
        "footway" | "path" | "cycleway" | "pedestrian" | "steps" | "track" | "bridleway" | "corridor"
    )
}

/// Motorways and motorway links are implicitly one-way in OSM convention.
fn is_oneway(highway: &str, tags: &[(&str, &str)]) -> bool {
    let explicit = tags.iter().any(|(k, v)| *k == "oneway" && matches!(*v, "yes" | "1" | "true"));
    explicit || matches!(highway, "motorway" | "motorway_link")
}
