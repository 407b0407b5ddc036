//! Monitored-package scenarios: measurement generation along the transit path

use coldchain_simulator::compliance::container_measurements;
use coldchain_simulator::network::NetworkBuilder;
use coldchain_simulator::shipment::{create_package, LabelRequest};
use coldchain_simulator::store::{GraphStore, MemoryGraph};
use coldchain_simulator::transit::{bootstrap_network, persist_package, TransitSimulator};
use coldchain_simulator::types::NetworkConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn monitored_config(violation_rate: f64) -> NetworkConfig {
    let json = format!(
        r#"{{
            "carriers": {{
                "NLS": {{
                    "offices": {{
                        "DEN": {{
                            "hub": true,
                            "description": "Denver, CO",
                            "gmtOffset": "-07:00",
                            "latitude": 39.7392,
                            "longitude": -104.9903
                        }},
                        "JFK": {{
                            "description": "New York, NY",
                            "gmtOffset": "-05:00",
                            "latitude": 40.7128,
                            "longitude": -74.0060
                        }}
                    }}
                }}
            }},
            "products": {{
                "RnaVaccine": {{ "handlingCd": "P", "minValue": -80.0, "maxValue": -60.0 }}
            }},
            "monitoring": {{ "enabled": false, "violationRate": {violation_rate} }}
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

fn vaccine_request() -> LabelRequest {
    let json = r#"{
        "handlingCd": "P",
        "sender": { "name": "Acme Labs", "stateProvince": "CO" },
        "recipient": { "name": "Beta Clinic", "stateProvince": "NY" },
        "content": { "product": "RnaVaccine", "count": 12 }
    }"#;
    serde_json::from_str(json).unwrap()
}

fn simulate(violation_rate: f64, seed: u64) -> (TransitSimulator<MemoryGraph>, String, usize) {
    let config = monitored_config(violation_rate);
    let model = NetworkBuilder::build(&config).unwrap();
    let mut store = MemoryGraph::new();
    let mut rng = StdRng::seed_from_u64(seed);
    bootstrap_network(&mut store, &model, &mut rng).unwrap();

    let package = create_package(&model, &vaccine_request(), &mut rng).unwrap();
    persist_package(&mut store, &package).unwrap();
    let uid = package.uid.clone();

    let mut simulator = TransitSimulator::new(model, store, config.monitor.clone(), Some(seed));
    let report = simulator.pickup_package(&uid).unwrap();
    (simulator, uid, report.measurements)
}

#[test]
fn test_monitored_package_rides_freezers() {
    let (simulator, uid, _) = simulate(0.0, 7);
    let store = simulator.store();
    let result = store.query(
        &coldchain_simulator::store::GraphQuery::nodes("package")
            .has("trackingID", uid.as_str())
            .in_edges("contains")
            .has("childType", "P")
            .far_nodes(),
    );
    assert!(!result.nodes.is_empty());
    for container in result.nodes {
        assert_eq!(store.node_attr(container, "type").as_text(), "F");
        assert_eq!(store.node_attr(container, "monitor").as_text(), "RnaVaccine");
    }
}

#[test]
fn test_lookahead_covers_each_day_per_monitored_leg() {
    let (simulator, _, written) = simulate(0.0, 13);
    assert!(written > 0);

    // The origin ground freezer is the first monitored container.
    let store = simulator.store();
    let freezer = store.get_node("container", "NLS000002").unwrap();
    let measurements = container_measurements(store, freezer);
    assert!(!measurements.is_empty());

    let days: BTreeSet<_> = measurements.iter().map(|m| m.end.date_naive()).collect();
    assert!(days.len() >= 3, "expected measurements on 3 lookahead days, got {:?}", days);
}

#[test]
fn test_violation_band_and_clean_band_values() {
    let (simulator, _, _) = simulate(1.0, 19);
    let store = simulator.store();
    let freezer = store.get_node("container", "NLS000002").unwrap();
    let measurements = container_measurements(store, freezer);

    let violated: Vec<_> = measurements.iter().filter(|m| m.violated).collect();
    let clean: Vec<_> = measurements.iter().filter(|m| !m.violated).collect();
    assert!(!violated.is_empty());
    for m in &violated {
        assert!(m.min_value > -60.0, "violated min {} within tolerance band", m.min_value);
    }
    for m in &clean {
        assert!(m.max_value <= -60.0, "clean max {} above tolerance band", m.max_value);
    }
}

#[test]
fn test_repeated_simulation_writes_no_duplicate_measurements() {
    let (mut simulator, uid, first_written) = simulate(0.0, 23);
    assert!(first_written > 0);

    let before = simulator.store().edge_count();
    let report = simulator.pickup_package(&uid).unwrap();
    assert_eq!(report.measurements, 0, "second run must skip covered windows");

    let after = simulator.store().edge_count();
    // The second run appends containment/event edges but no measures edges.
    let added = after - before;
    let freezer = simulator.store().get_node("container", "NLS000002").unwrap();
    let measurements = container_measurements(simulator.store(), freezer);
    assert_eq!(
        measurements.len(),
        measurements
            .iter()
            .map(|m| (m.start, m.end))
            .collect::<BTreeSet<_>>()
            .len(),
        "measurement periods must not duplicate"
    );
    assert!(added > 0);
}
