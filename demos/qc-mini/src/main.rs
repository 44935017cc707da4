//! qc-mini — smallest end-to-end run of the roadhub routing engine.
//!
//! Builds both label indexes over a 12-intersection Quezon City grid,
//! routes across it, admits a user report plus a traffic feed, reroutes,
//! and writes engine comparison metrics for a seeded batch of pairs.
//!
//! ```text
//! RUST_LOG=info cargo run -p qc-mini -- demos/qc-mini/data/config.json
//! ```

mod network;

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use rh_core::{GeoPoint, ScenarioRng, Timestamp};
use rh_engine::{DisruptionReport, EngineConfig, RouteResult, RoutingService, random_od_pairs};
use rh_graph::LoadOptions;
use rh_output::{CsvWriter, MetricsObserver, MetricsWriter};
use rh_overlay::Severity;

use network::{SCENARIO_CSV, build_network};

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:       u64   = 42;
const PAIR_COUNT: usize = 20;
const OUTPUT_DIR: &str  = "output/qc-mini";

/// EDSA corner of Tandang Sora Avenue.
const ORIGIN:      GeoPoint = GeoPoint { lat: 14.660, lng: 121.030 };
/// Katipunan Avenue corner of Aurora Boulevard.
const DESTINATION: GeoPoint = GeoPoint { lat: 14.640, lng: 121.075 };

fn print_route(title: &str, route: &RouteResult) {
    println!("{title} [{}]", route.engine);
    for line in &route.instructions {
        println!("  {line}");
    }
    println!(
        "  {:.0} m, {:.0} s, query {:.3} ms{}",
        route.total_distance_m,
        route.total_time_s,
        route.timing_metrics.query_response_time,
        if route.fallback { " (fallback)" } else { "" },
    );
    if let Some(impact) = &route.impact {
        println!(
            "  {} ({} active, state {:?}, repair {:?})",
            impact.route_comparison, impact.disruptions_considered, impact.maintenance_state, impact.repair_strategy,
        );
    }
    println!();
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== qc-mini — roadhub dynamic hub labeling ===");
    println!();

    // 1. Config: optional JSON path as the first argument.
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_path(Path::new(&path))?,
        None => EngineConfig::default(),
    };
    println!("τ = {}  |  leaf size = {}  |  seed = {SEED}", config.default_tau, config.leaf_size);

    // 2. Graph and indexes.
    let t0 = Instant::now();
    let graph = build_network(&LoadOptions { default_speed_kph: config.default_speed_kph })?;
    println!("Road graph: {} nodes, {} directed edges", graph.node_count(), graph.edge_count());
    let service = RoutingService::new(graph, config)?;
    println!("Indexes built in {:.3} s", t0.elapsed().as_secs_f64());
    println!();

    // 3. Baseline.
    let baseline = service.compute_route(ORIGIN.lat, ORIGIN.lng, DESTINATION.lat, DESTINATION.lng, &[], None)?;
    print_route("Baseline route", &baseline);

    // 4. A user report on Quezon Avenue and a traffic feed.
    let ack = service.report_disruption(&DisruptionReport::described(
        14.6502,
        121.0520,
        "Multi-vehicle collision, two lanes blocked",
        Severity::Heavy,
    ))?;
    println!(
        "Reported {} on {} ({} edges, repair {:?})",
        ack.incident_type.label(),
        ack.road_name,
        ack.edges,
        ack.maintenance.strategy,
    );
    let scenario = service.load_scenario(Cursor::new(SCENARIO_CSV))?;
    println!(
        "Traffic feed: {} admitted, {} free-flowing, {} unresolved",
        scenario.admitted, scenario.skipped, scenario.unresolved
    );
    println!();

    // 5. Reroute with a low threshold so this query sees immediate repair.
    let rerouted = service.compute_route(ORIGIN.lat, ORIGIN.lng, DESTINATION.lat, DESTINATION.lng, &[], Some(0.3))?;
    print_route("Disrupted route", &rerouted);
    let static_route = service.compute_route_static(ORIGIN.lat, ORIGIN.lng, DESTINATION.lat, DESTINATION.lng)?;
    print_route("Static rebuild", &static_route);

    // 6. Side-by-side comparison.
    let comparison = service.compare_routes(ORIGIN.lat, ORIGIN.lng, DESTINATION.lat, DESTINATION.lng, true)?;
    println!("Engines agree: {}", comparison.agree);
    println!("{}", serde_json::to_string_pretty(&comparison.diagnostics)?);
    println!();

    // 7. Active disruptions.
    let summary = service.list_active_disruptions();
    println!("Active disruptions: {} ({} closures)", summary.total, summary.closures);
    for group in &summary.groups {
        println!("  {:<22} {}", group.label, group.count);
    }
    println!();

    // 8. Seeded comparison batches, baseline then disrupted.
    let mut rng = ScenarioRng::new(SEED);
    let pairs = random_od_pairs(service.dataset().graph(), &mut rng, PAIR_COUNT);
    let writer = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let mut obs = MetricsObserver::new(writer, "baseline");
    let base = service.compare_batch(&pairs, false, &mut obs);
    obs.set_run("disrupted");
    let disrupted = service.compare_batch(&pairs, true, &mut obs);
    if let Some(e) = obs.take_error() {
        eprintln!("output error: {e}");
    }
    obs.into_writer().finish()?;

    println!("{:<10} {:>6} {:>8} {:>12} {:>12}", "Run", "Pairs", "Agree", "DHL ms", "HC2L ms");
    println!("{}", "-".repeat(52));
    for (name, s) in [("baseline", base), ("disrupted", disrupted)] {
        println!(
            "{:<10} {:>6} {:>8} {:>12.4} {:>12.4}",
            name,
            s.succeeded,
            s.succeeded - s.disagreements,
            s.mean_dhl_query_ms,
            s.mean_hc2l_query_ms,
        );
    }
    println!("Metrics written to {OUTPUT_DIR}/");
    println!();

    // 9. Two hours later every report has expired.
    service.expire_disruptions(Timestamp::now().plus_secs(7_200))?;
    service.repair_all();
    let status = service.maintenance_state();
    println!(
        "After expiry: {} active, state {:?}, {} lazy repairs so far",
        status.active_disruptions, status.state, status.lazy_repairs
    );

    Ok(())
}
