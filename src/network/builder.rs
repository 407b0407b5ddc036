//! Network model construction
//!
//! Turns a validated network definition into the immutable topology: offices
//! normalized, hub designated, the fixed route schedule laid down, and each
//! route's container hierarchy built one level per threshold.
//!
//! Schedule convention: the spoke to hub Air leg departs 16:00 local, the
//! hub to spoke return leg departs 00:00 local, and every office runs a
//! Ground self-loop departing 08:00 and arriving 15:00. The return leg
//! reuses the outbound leg's vehicle, it is the same physical aircraft.

use crate::network::model::{Carrier, Container, NetworkModel, Office, Route, Threshold};
use crate::schedule::{arrival_time, Waypoint};
use crate::types::{ConfigError, ContainerKind, NetworkConfig, RouteKind};
use std::collections::BTreeMap;
use tracing::info;

const SPOKE_TO_HUB_DEPART: &str = "16:00";
const HUB_TO_SPOKE_DEPART: &str = "00:00";
const GROUND_DEPART: &str = "08:00";
const GROUND_ARRIVE: &str = "15:00";

/// Builds a [`NetworkModel`] from a network definition
#[derive(Debug)]
pub struct NetworkBuilder;

impl NetworkBuilder {
    /// Build the full topology, validating the definition first
    pub fn build(config: &NetworkConfig) -> Result<NetworkModel, ConfigError> {
        config.validate()?;

        let thresholds = build_thresholds(config);
        let mut carriers = BTreeMap::new();

        for (name, carrier_config) in &config.carriers {
            let mut offices: BTreeMap<String, Office> = carrier_config
                .offices
                .iter()
                .map(|(iata, office)| {
                    (
                        iata.clone(),
                        Office {
                            iata: iata.clone(),
                            is_hub: office.is_hub,
                            carrier: name.clone(),
                            state: state_token(&office.description),
                            description: office.description.clone(),
                            gmt_offset: normalize_gmt_offset(&office.gmt_offset),
                            latitude: office.latitude,
                            longitude: office.longitude,
                            routes: Vec::new(),
                        },
                    )
                })
                .collect();

            // Validation guarantees exactly one hub per carrier.
            let hub = offices
                .values()
                .find(|o| o.is_hub)
                .map(|o| {
                    (o.iata.clone(), o.gmt_offset.clone(), o.latitude, o.longitude)
                })
                .ok_or(crate::types::ConfigValidationError::HubCount {
                    carrier: name.clone(),
                    count: 0,
                })?;

            let mut seq = 0usize;
            let iatas: Vec<String> = offices.keys().cloned().collect();
            for iata in &iatas {
                let spoke = &offices[iata];
                let spoke_is_hub = spoke.is_hub;
                let spoke_offset = spoke.gmt_offset.clone();
                let spoke_point = Waypoint {
                    gmt_offset: &spoke_offset,
                    latitude: spoke.latitude,
                    longitude: spoke.longitude,
                };
                let hub_point = Waypoint {
                    gmt_offset: &hub.1,
                    latitude: hub.2,
                    longitude: hub.3,
                };

                if !spoke_is_hub {
                    let outbound_number = route_number(name, &mut seq);
                    let outbound = Route {
                        number: outbound_number.clone(),
                        kind: RouteKind::Air,
                        depart_local: SPOKE_TO_HUB_DEPART.to_string(),
                        arrival_local: arrival_time(SPOKE_TO_HUB_DEPART, spoke_point, hub_point),
                        from_iata: iata.clone(),
                        to_iata: hub.0.clone(),
                        vehicle: Some(air_vehicle(&outbound_number, &thresholds)),
                        vehicle_route: outbound_number.clone(),
                    };

                    let return_number = route_number(name, &mut seq);
                    let return_leg = Route {
                        number: return_number,
                        kind: RouteKind::Air,
                        depart_local: HUB_TO_SPOKE_DEPART.to_string(),
                        arrival_local: arrival_time(HUB_TO_SPOKE_DEPART, hub_point, spoke_point),
                        from_iata: hub.0.clone(),
                        to_iata: iata.clone(),
                        vehicle: None,
                        vehicle_route: outbound_number.clone(),
                    };

                    if let Some(office) = offices.get_mut(iata) {
                        office.routes.push(outbound);
                    }
                    if let Some(hub_office) = offices.get_mut(&hub.0) {
                        hub_office.routes.push(return_leg);
                    }
                }

                let ground_number = route_number(name, &mut seq);
                let ground = Route {
                    number: ground_number.clone(),
                    kind: RouteKind::Ground,
                    depart_local: GROUND_DEPART.to_string(),
                    arrival_local: GROUND_ARRIVE.to_string(),
                    from_iata: iata.clone(),
                    to_iata: iata.clone(),
                    vehicle: Some(ground_vehicle(&ground_number, &thresholds)),
                    vehicle_route: ground_number,
                };
                if let Some(office) = offices.get_mut(iata) {
                    office.routes.push(ground);
                }
            }

            info!(
                carrier = %name,
                offices = offices.len(),
                routes = seq,
                "carrier network constructed"
            );
            carriers.insert(
                name.clone(),
                Carrier {
                    name: name.clone(),
                    description: carrier_config.description.clone(),
                    offices,
                },
            );
        }

        Ok(NetworkModel { carriers, thresholds })
    }
}

fn build_thresholds(config: &NetworkConfig) -> BTreeMap<String, Threshold> {
    config
        .products
        .iter()
        .map(|(product, t)| {
            (
                product.clone(),
                Threshold {
                    product: product.clone(),
                    item_type: t.item_type.clone(),
                    min_value: t.min_value,
                    max_value: t.max_value,
                    uom: if t.uom.is_empty() {
                        default_uom(&t.item_type).to_string()
                    } else {
                        t.uom.clone()
                    },
                },
            )
        })
        .collect()
}

/// Default unit of measure by item type
fn default_uom(item_type: &str) -> &'static str {
    match item_type {
        "P" => "C",
        "D" => "kg",
        _ => "",
    }
}

/// State or province token: the trimmed second comma-delimited token
fn state_token(description: &str) -> String {
    description
        .splitn(2, ',')
        .nth(1)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Ensure an explicit leading sign on the GMT offset
fn normalize_gmt_offset(offset: &str) -> String {
    let trimmed = offset.trim();
    if trimmed.starts_with('+') || trimmed.starts_with('-') {
        trimmed.to_string()
    } else {
        format!("+{}", trimmed)
    }
}

fn route_number(carrier: &str, seq: &mut usize) -> String {
    let number = format!("{}{:03}", carrier, *seq);
    *seq += 1;
    number
}

fn container_uid(route: &str, seq: &mut usize) -> String {
    *seq += 1;
    format!("{}{:03}", route, *seq)
}

/// Air hierarchy: Vehicle holding one ULD per threshold, each ULD holding
/// one tagged Freezer
fn air_vehicle(route: &str, thresholds: &BTreeMap<String, Threshold>) -> Container {
    let mut seq = 0usize;
    let mut vehicle = Container {
        uid: container_uid(route, &mut seq),
        kind: ContainerKind::Vehicle,
        monitor: None,
        children: Vec::new(),
    };
    for product in thresholds.keys() {
        let uld_uid = container_uid(route, &mut seq);
        let freezer = Container {
            uid: container_uid(route, &mut seq),
            kind: ContainerKind::Freezer,
            monitor: Some(product.clone()),
            children: Vec::new(),
        };
        vehicle.children.push(Container {
            uid: uld_uid,
            kind: ContainerKind::Uld,
            monitor: None,
            children: vec![freezer],
        });
    }
    vehicle
}

/// Ground hierarchy: Vehicle holding one tagged Freezer per threshold
fn ground_vehicle(route: &str, thresholds: &BTreeMap<String, Threshold>) -> Container {
    let mut seq = 0usize;
    let mut vehicle = Container {
        uid: container_uid(route, &mut seq),
        kind: ContainerKind::Vehicle,
        monitor: None,
        children: Vec::new(),
    };
    for product in thresholds.keys() {
        vehicle.children.push(Container {
            uid: container_uid(route, &mut seq),
            kind: ContainerKind::Freezer,
            monitor: Some(product.clone()),
            children: Vec::new(),
        });
    }
    vehicle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkConfig;

    fn sample_config() -> NetworkConfig {
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
                "RnaVaccine": { "handlingCd": "P", "minValue": -80.0, "maxValue": -60.0 },
                "SeafoodBox": { "handlingCd": "P", "minValue": -10.0, "maxValue": 0.0 }
            },
            "monitoring": { "enabled": false, "violationRate": 0.1 }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_office_normalization() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let den = model.office("NLS", "DEN").unwrap();
        let jfk = model.office("NLS", "JFK").unwrap();
        assert!(den.is_hub);
        assert_eq!(den.state, "CO");
        assert_eq!(jfk.state, "NY");
        assert_eq!(model.office_by_state("NY").unwrap().iata, "JFK");
    }

    #[test]
    fn test_gmt_offset_gains_explicit_sign() {
        assert_eq!(normalize_gmt_offset("05:30"), "+05:30");
        assert_eq!(normalize_gmt_offset("-07:00"), "-07:00");
        assert_eq!(normalize_gmt_offset("+08:00"), "+08:00");
    }

    #[test]
    fn test_uom_defaults_by_item_type() {
        assert_eq!(default_uom("P"), "C");
        assert_eq!(default_uom("D"), "kg");
        assert_eq!(default_uom("X"), "");
    }

    #[test]
    fn test_spoke_routes_and_schedule_convention() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let jfk = model.office("NLS", "JFK").unwrap();
        let den = model.office("NLS", "DEN").unwrap();

        let outbound = jfk.air_route_to("DEN").unwrap();
        assert_eq!(outbound.depart_local, "16:00");
        // 16:00 EST is 14:00 MST, plus 4h07m of flight time.
        assert_eq!(outbound.arrival_local, "18:07");

        let return_leg = den.air_route_to("JFK").unwrap();
        assert_eq!(return_leg.depart_local, "00:00");
        assert_eq!(return_leg.arrival_local, "06:07");

        let ground = jfk.ground_route().unwrap();
        assert_eq!(ground.depart_local, "08:00");
        assert_eq!(ground.arrival_local, "15:00");
        assert_eq!(ground.from_iata, ground.to_iata);
    }

    #[test]
    fn test_hub_has_ground_route_but_no_outbound_spoke_leg() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let den = model.office("NLS", "DEN").unwrap();
        assert!(den.ground_route().is_some());
        assert!(den.routes.iter().all(|r| r.kind != RouteKind::Air || r.from_iata == "DEN"));
    }

    #[test]
    fn test_return_leg_shares_outbound_vehicle() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let jfk = model.office("NLS", "JFK").unwrap();
        let den = model.office("NLS", "DEN").unwrap();
        let outbound = jfk.air_route_to("DEN").unwrap();
        let return_leg = den.air_route_to("JFK").unwrap();
        assert!(outbound.vehicle.is_some());
        assert!(return_leg.vehicle.is_none());
        assert_eq!(return_leg.vehicle_route, outbound.number);
    }

    #[test]
    fn test_air_hierarchy_one_uld_per_threshold() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let jfk = model.office("NLS", "JFK").unwrap();
        let vehicle = jfk.air_route_to("DEN").unwrap().vehicle.as_ref().unwrap();
        assert_eq!(vehicle.kind, ContainerKind::Vehicle);
        assert_eq!(vehicle.children.len(), 2);

        let mut products = Vec::new();
        for uld in &vehicle.children {
            assert_eq!(uld.kind, ContainerKind::Uld);
            assert_eq!(uld.children.len(), 1);
            let freezer = &uld.children[0];
            assert_eq!(freezer.kind, ContainerKind::Freezer);
            products.push(freezer.monitor.clone().unwrap());
        }
        products.sort();
        assert_eq!(products, vec!["RnaVaccine", "SeafoodBox"]);
    }

    #[test]
    fn test_ground_hierarchy_freezers_under_vehicle() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let den = model.office("NLS", "DEN").unwrap();
        let vehicle = den.ground_route().unwrap().vehicle.as_ref().unwrap();
        assert_eq!(vehicle.children.len(), 2);
        for freezer in &vehicle.children {
            assert_eq!(freezer.kind, ContainerKind::Freezer);
            assert!(freezer.monitor.is_some());
            assert!(freezer.children.is_empty());
        }
    }

    #[test]
    fn test_monitored_lookup() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        assert!(model.is_monitored("P", "RnaVaccine"));
        assert!(!model.is_monitored("N", "RnaVaccine"));
        assert!(!model.is_monitored("P", "Gravel"));
        let threshold = model.threshold("RnaVaccine").unwrap();
        assert_eq!(threshold.uom, "C");
        assert_eq!(threshold.min_value, -80.0);
    }

    #[test]
    fn test_find_monitored_descends_air_hierarchy() {
        let model = NetworkBuilder::build(&sample_config()).unwrap();
        let jfk = model.office("NLS", "JFK").unwrap();
        let vehicle = jfk.air_route_to("DEN").unwrap().vehicle.as_ref().unwrap();
        let freezer = vehicle.find_monitored("SeafoodBox").unwrap();
        assert_eq!(freezer.kind, ContainerKind::Freezer);
        assert!(vehicle.find_monitored("Gravel").is_none());
    }
}
