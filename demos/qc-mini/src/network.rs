//! Synthetic Quezon City road grid.
//!
//! Twelve intersections on a 3 × 4 grid: three east–west avenues crossed by
//! four north–south roads.  C.P. Garcia Avenue carries no travel times, so
//! its weights come from the road-class speed table.

use std::io::Cursor;

use rh_graph::{GraphResult, LoadOptions, RoadGraph, load_readers};

pub const NODES_CSV: &str = "\
node_id,lat,lng
101,14.660,121.030
102,14.660,121.045
103,14.660,121.060
104,14.660,121.075
105,14.650,121.030
106,14.650,121.045
107,14.650,121.060
108,14.650,121.075
109,14.640,121.030
110,14.640,121.045
111,14.640,121.060
112,14.640,121.075
";

pub const EDGES_CSV: &str = "\
source,target,length_m,travel_time_s,road_name,oneway,highway
101,102,1615,145,Tandang Sora Avenue,no,secondary
102,103,1615,145,Tandang Sora Avenue,no,secondary
103,104,1615,150,Tandang Sora Avenue,no,secondary
105,106,1615,110,Quezon Avenue,no,primary
106,107,1615,110,Quezon Avenue,no,primary
107,108,1615,115,Quezon Avenue,no,primary
109,110,1615,160,Aurora Boulevard,no,primary
110,111,1615,165,Aurora Boulevard,no,primary
111,112,1615,160,Aurora Boulevard,no,primary
101,105,1112,90,EDSA,no,trunk
105,109,1112,95,EDSA,no,trunk
102,106,1112,80,Commonwealth Avenue,no,trunk
106,110,1112,85,Commonwealth Avenue,no,trunk
103,107,1112,,C.P. Garcia Avenue,yes,tertiary
107,111,1112,,C.P. Garcia Avenue,no,tertiary
104,108,1112,95,Katipunan Avenue,no,primary
108,112,1112,95,Katipunan Avenue,no,primary
";

/// Traffic feed rows: a crawl on Quezon Avenue, a closure on Commonwealth
/// Avenue, and one free-flowing segment that is skipped.
pub const SCENARIO_CSV: &str = "\
source_lat,source_lon,target_lat,target_lon,source,target,road_name,speed_kph,freeFlow_kph,jamFactor,isClosed,segmentLength
14.650,121.045,14.650,121.060,106,107,Quezon Avenue,8.0,50.0,8.4,False,1615
14.660,121.045,14.650,121.045,102,106,Commonwealth Avenue,0.0,60.0,10.0,True,1112
14.640,121.060,14.640,121.075,111,112,Aurora Boulevard,42.0,40.0,0.5,False,1615
";

pub fn build_network(opts: &LoadOptions) -> GraphResult<RoadGraph> {
    load_readers(Cursor::new(NODES_CSV), Cursor::new(EDGES_CSV), opts)
}
