//! End-to-end transit scenarios against the in-memory graph store

use chrono::{DateTime, Utc};
use coldchain_simulator::network::NetworkBuilder;
use coldchain_simulator::shipment::{create_package, LabelRequest};
use coldchain_simulator::store::{GraphQuery, GraphStore, MemoryGraph};
use coldchain_simulator::transit::{
    bootstrap_network, package_timeline, persist_package, TransitSimulator,
};
use coldchain_simulator::types::{EventKind, NetworkConfig, TransitState};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn single_carrier_config() -> NetworkConfig {
    let json = r#"{
        "carriers": {
            "NLS": {
                "description": "Northern Logistics",
                "offices": {
                    "DEN": {
                        "hub": true,
                        "description": "Denver, CO",
                        "gmtOffset": "-07:00",
                        "latitude": 39.7392,
                        "longitude": -104.9903
                    },
                    "JFK": {
                        "description": "New York, NY",
                        "gmtOffset": "-05:00",
                        "latitude": 40.7128,
                        "longitude": -74.0060
                    }
                }
            }
        },
        "products": {
            "RnaVaccine": { "handlingCd": "P", "minValue": -80.0, "maxValue": -60.0 }
        },
        "monitoring": { "enabled": false, "violationRate": 0.0 }
    }"#;
    serde_json::from_str(json).unwrap()
}

fn two_carrier_config() -> NetworkConfig {
    let json = r#"{
        "carriers": {
            "NLS": {
                "offices": {
                    "DEN": {
                        "hub": true,
                        "description": "Denver, CO",
                        "gmtOffset": "-07:00",
                        "latitude": 39.7392,
                        "longitude": -104.9903
                    },
                    "JFK": {
                        "description": "New York, NY",
                        "gmtOffset": "-05:00",
                        "latitude": 40.7128,
                        "longitude": -74.0060
                    }
                }
            },
            "WCX": {
                "offices": {
                    "LAX": {
                        "hub": true,
                        "description": "Los Angeles, CA",
                        "gmtOffset": "-08:00",
                        "latitude": 34.0522,
                        "longitude": -118.2437
                    },
                    "SEA": {
                        "description": "Seattle, WA",
                        "gmtOffset": "-08:00",
                        "latitude": 47.6062,
                        "longitude": -122.3321
                    }
                }
            }
        },
        "products": {},
        "monitoring": { "enabled": false, "violationRate": 0.0 }
    }"#;
    serde_json::from_str(json).unwrap()
}

fn label_request(sender_state: &str, recipient_state: &str, handling: &str, product: &str) -> LabelRequest {
    let json = format!(
        r#"{{
            "handlingCd": "{handling}",
            "sender": {{ "name": "Acme Labs", "stateProvince": "{sender_state}" }},
            "recipient": {{ "name": "Beta Clinic", "stateProvince": "{recipient_state}" }},
            "content": {{ "product": "{product}", "count": 4 }}
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

fn containment_periods<S: GraphStore>(
    store: &S,
    uid: &str,
) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
    let result = store.query(
        &GraphQuery::nodes("package")
            .has("trackingID", uid)
            .in_edges("contains")
            .has("childType", "P")
            .far_nodes(),
    );
    let mut periods: Vec<_> = result
        .paths
        .iter()
        .filter_map(|path| {
            let edge = *path.edges.last()?;
            let container = *path.nodes.last()?;
            Some((
                store.node_key(container),
                store.edge_attr(edge, "eventTimestamp").as_instant(),
                store.edge_attr(edge, "outTimestamp").as_instant(),
            ))
        })
        .collect();
    periods.sort_by_key(|(_, start, _)| *start);
    periods
}

fn simulate(
    config: &NetworkConfig,
    request: &LabelRequest,
    seed: u64,
) -> (TransitSimulator<MemoryGraph>, coldchain_simulator::transit::DeliveryReport, String) {
    let model = NetworkBuilder::build(config).unwrap();
    let mut store = MemoryGraph::new();
    let mut rng = StdRng::seed_from_u64(seed);
    bootstrap_network(&mut store, &model, &mut rng).unwrap();

    let package = create_package(&model, request, &mut rng).unwrap();
    persist_package(&mut store, &package).unwrap();
    let uid = package.uid.clone();

    let mut simulator = TransitSimulator::new(model, store, config.monitor.clone(), Some(seed));
    let report = simulator.pickup_package(&uid).unwrap();
    (simulator, report, uid)
}

#[test]
fn test_hub_origin_pickup_to_spoke_delivery() {
    let config = single_carrier_config();
    let request = label_request("CO", "NY", "N", "OfficeSupplies");
    let (simulator, report, uid) = simulate(&config, &request, 17);

    assert!(report.pickup_time < report.delivery_time);
    assert!(!report.transferred);

    let periods = containment_periods(simulator.store(), &uid);
    assert_eq!(periods.len(), 3, "ground at origin, one flight, ground at destination");
    assert_eq!(report.containment_legs, 3);

    // Non-monitored packages ride top-level vehicles; vehicle UIDs end 001.
    for (container, _, _) in &periods {
        assert!(container.ends_with("001"), "expected a vehicle, got {container}");
    }

    // Strictly increasing, contiguous containment from pickup to delivery.
    assert_eq!(periods[0].1, report.pickup_time);
    assert_eq!(periods[2].2, report.delivery_time);
    for pair in periods.windows(2) {
        assert!(pair[0].1 < pair[1].1, "starts must strictly increase");
        assert_eq!(pair[0].2, pair[1].1, "consecutive periods must touch");
    }

    // Pickup before the flight arrival, flight arrival before delivery.
    let flight_arrival = periods[1].2;
    assert!(report.pickup_time < flight_arrival);
    assert!(flight_arrival < report.delivery_time);
}

#[test]
fn test_spoke_origin_adds_origin_flight() {
    let config = single_carrier_config();
    let request = label_request("NY", "CO", "N", "OfficeSupplies");
    let (simulator, report, uid) = simulate(&config, &request, 29);

    // Ground at JFK, flight to the DEN hub, ground delivery at DEN.
    let periods = containment_periods(simulator.store(), &uid);
    assert_eq!(periods.len(), 3);
    assert!(!report.transferred);
    assert!(periods[0].1 < periods[1].1 && periods[1].1 < periods[2].1);
}

#[test]
fn test_cross_carrier_transfer_records_custody_handoff() {
    let config = two_carrier_config();
    let request = label_request("NY", "WA", "N", "OfficeSupplies");
    let (simulator, report, uid) = simulate(&config, &request, 41);

    assert!(report.transferred);
    // Ground JFK, JFK->DEN flight, LAX->SEA flight, ground SEA.
    assert_eq!(report.containment_legs, 4);

    let store = simulator.store();
    let transfers = store.query(
        &GraphQuery::nodes("package")
            .has("trackingID", uid.as_str())
            .in_edges("transfers"),
    );
    assert_eq!(transfers.edges.len(), 2);
    let mut directions: Vec<String> = transfers
        .edges
        .iter()
        .map(|e| store.edge_attr(*e, "direction").as_text().to_string())
        .collect();
    directions.sort();
    assert_eq!(directions, vec!["from", "to"]);

    let mut times: Vec<_> = transfers
        .edges
        .iter()
        .map(|e| store.edge_attr(*e, "eventTimestamp").as_instant())
        .collect();
    times.sort();
    assert_eq!((times[1] - times[0]).num_seconds(), 30);
}

#[test]
fn test_timeline_reconstruction_orders_events() {
    let config = single_carrier_config();
    let request = label_request("CO", "NY", "N", "OfficeSupplies");
    let (simulator, report, uid) = simulate(&config, &request, 53);

    let timeline = package_timeline(simulator.store(), &uid).unwrap();
    assert_eq!(timeline.package, uid);
    assert!(timeline.violations.is_empty());

    let first = timeline.entries.first().unwrap();
    let last = timeline.entries.last().unwrap();
    assert_eq!(first.event, EventKind::Pickup);
    assert_eq!(first.state, TransitState::PickedUp);
    assert_eq!(first.time, report.pickup_time);
    assert_eq!(last.event, EventKind::Deliver);
    assert_eq!(last.state, TransitState::Delivered);
    assert_eq!(last.time, report.delivery_time);

    for pair in timeline.entries.windows(2) {
        assert!(pair[0].time <= pair[1].time);
    }

    // The flight into JFK parks the package at its destination spoke.
    assert!(timeline
        .entries
        .iter()
        .any(|e| e.event == EventKind::Arrive && e.state == TransitState::AtDestinationHub));
}

#[test]
fn test_unknown_package_is_fatal() {
    let config = single_carrier_config();
    let model = NetworkBuilder::build(&config).unwrap();
    let mut store = MemoryGraph::new();
    let mut rng = StdRng::seed_from_u64(3);
    bootstrap_network(&mut store, &model, &mut rng).unwrap();

    let mut simulator = TransitSimulator::new(model, store, config.monitor.clone(), Some(3));
    let result = simulator.pickup_package("does-not-exist");
    assert!(matches!(
        result,
        Err(coldchain_simulator::SimulationError::PackageNotFound(_))
    ));
}
