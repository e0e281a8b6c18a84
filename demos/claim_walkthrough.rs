//! Walk through a claim and a capture against the in-memory store.
//!
//! Run with: cargo run --example claim_walkthrough

use std::sync::Arc;

use territory_core::{
    format_distance, format_duration, ClaimCoordinator, GeoPoint, LocationPermission, MemoryStore,
    ClaimReport, Outcome, Player, RunSession, TerritoryStore,
};

/// A ~45 m square around Trafalgar Square, ending where it started.
fn square_loop() -> Vec<GeoPoint> {
    let corners = [
        GeoPoint::new(51.5080, -0.1281),
        GeoPoint::new(51.5084, -0.1281),
        GeoPoint::new(51.5084, -0.1275),
        GeoPoint::new(51.5080, -0.1275),
    ];
    (0..12)
        .map(|i| if i == 11 { corners[0] } else { corners[i % 4] })
        .collect()
}

/// Run the loop, pretending it took `duration_secs`.
fn run_loop(duration_secs: u64) -> RunSession {
    let mut session = RunSession::default();
    session
        .start(LocationPermission::Granted, 0)
        .expect("permission granted");
    let path = square_loop();
    let per_fix = duration_secs / path.len() as u64;
    for (i, point) in path.into_iter().enumerate() {
        session.on_tick((i as u64 + 1) * per_fix);
        session.on_location_fix(point, Some(5.0));
    }
    session
}

fn print_outcome(who: &Player, report: &ClaimReport) {
    let outcome = match &report.arbitration.outcome {
        Outcome::Claim(_) => "claim",
        Outcome::Captured { .. } => "capture",
        Outcome::Rejected(_) => "rejected",
    };
    println!("   {} -> {} ({})", who.username, outcome, report.arbitration.reason);
    if let Some(zone_id) = &report.zone_id {
        println!("   Zone: {}", zone_id);
    }
}

fn main() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = ClaimCoordinator::new(Arc::clone(&store));

    let ada = coordinator.ensure_player("ada-01", "ada").unwrap();
    let bo = coordinator.ensure_player("bo-02", "bo").unwrap();

    println!("Territory Walkthrough\n");

    // First claim over empty ground
    println!("1. ada runs the loop in 6 minutes:");
    let mut session = run_loop(360);
    let record = session.run_record();
    println!(
        "   Closed after {} points, {} in {}, {} steps",
        session.path().len(),
        format_distance(record.distance_m),
        format_duration(record.duration_secs),
        record.steps
    );
    let zones = store.zones().unwrap();
    let report = coordinator.submit(&mut session, &zones, &ada, 1_000).unwrap();
    print_outcome(&ada, &report);
    println!();

    // Slower challenger
    println!("2. bo runs the same loop in 7 minutes:");
    let zones = store.zones().unwrap();
    let report = coordinator.submit(&mut run_loop(420), &zones, &bo, 2_000).unwrap();
    print_outcome(&bo, &report);
    println!();

    // Faster challenger
    println!("3. bo tries again in 5 minutes:");
    let zones = store.zones().unwrap();
    let report = coordinator.submit(&mut run_loop(300), &zones, &bo, 3_000).unwrap();
    print_outcome(&bo, &report);
    println!();

    println!("Zones:");
    for zone in store.zones().unwrap() {
        println!(
            "  {}: owner {} ({}), record {} / {}, {:.0} m², {} previous owner(s)",
            zone.id,
            zone.owner_name,
            zone.owner_color,
            format_duration(zone.record.duration_secs),
            format_distance(zone.record.distance_m),
            zone.area_square_metres,
            zone.history.len()
        );
    }

    println!("\nPlayers:");
    for id in [&ada.id, &bo.id] {
        if let Some(player) = store.get_player(id).unwrap() {
            println!(
                "  {}: {} zone(s), {} run, {} total",
                player.username,
                player.zones_owned,
                format_distance(player.total_distance),
                format_duration(player.total_time)
            );
        }
    }
}
