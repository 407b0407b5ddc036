//! Package timeline reconstruction
//!
//! Rebuilds a package's transit history purely from the graph: custody
//! events, containment periods mapped to leg depart/arrive entries, and the
//! temperature violations recorded by the containers it rode in.

use crate::compliance::{container_measurements, Measurement};
use crate::store::{GraphQuery, GraphStore, NodeId};
use crate::transit::error::SimulationError;
use crate::types::{ChildKind, EventKind, RouteKind, TransitState};
use chrono::{DateTime, Utc};

/// One reconstructed timeline entry
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    /// When the event occurred
    pub time: DateTime<Utc>,
    /// Event kind
    pub event: EventKind,
    /// Package state after the event
    pub state: TransitState,
    /// Office IATA code or container UID where the event occurred
    pub location: String,
    /// Route involved, for leg events
    pub route: Option<String>,
}

/// A package's full reconstructed history
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Tracking identifier
    pub package: String,
    /// Entries in chronological order
    pub entries: Vec<TimelineEntry>,
    /// Violations recorded by containers the package rode in, overlapping
    /// its containment periods
    pub violations: Vec<Measurement>,
}

/// Reconstruct the transit timeline of a package
pub fn package_timeline<S: GraphStore>(
    store: &S,
    uid: &str,
) -> Result<Timeline, SimulationError> {
    if store.get_node("package", uid).is_none() {
        return Err(SimulationError::PackageNotFound(uid.to_string()));
    }

    let mut entries = Vec::new();
    let mut violations = Vec::new();

    for (edge, office) in incoming(store, uid, "pickup") {
        entries.push(TimelineEntry {
            time: store.edge_attr(edge, "eventTimestamp").as_instant(),
            event: EventKind::Pickup,
            state: TransitState::Created,
            location: store.node_key(office),
            route: None,
        });
    }
    for (edge, office) in incoming(store, uid, "delivery") {
        entries.push(TimelineEntry {
            time: store.edge_attr(edge, "eventTimestamp").as_instant(),
            event: EventKind::Deliver,
            state: TransitState::Created,
            location: store.node_key(office),
            route: None,
        });
    }
    for (edge, office) in incoming(store, uid, "transfers") {
        let event = if store.edge_attr(edge, "direction").as_text() == "from" {
            EventKind::Transfer
        } else {
            EventKind::TransferAck
        };
        entries.push(TimelineEntry {
            time: store.edge_attr(edge, "eventTimestamp").as_instant(),
            event,
            state: TransitState::Created,
            location: store.node_key(office),
            route: None,
        });
    }

    for (edge, container) in incoming(store, uid, "contains") {
        if store.edge_attr(edge, "childType").as_text() != ChildKind::Package.code() {
            continue;
        }
        let start = store.edge_attr(edge, "eventTimestamp").as_instant();
        let end = store.edge_attr(edge, "outTimestamp").as_instant();
        let route = match store.edge_attr(edge, "routeNbr").as_text() {
            "" => route_of_container(store, container),
            number => Some(number.to_string()),
        };
        let location = store.node_key(container);
        entries.push(TimelineEntry {
            time: start,
            event: EventKind::Depart,
            state: TransitState::Created,
            location: location.clone(),
            route: route.clone(),
        });
        entries.push(TimelineEntry {
            time: end,
            event: EventKind::Arrive,
            state: TransitState::Created,
            location,
            route,
        });

        for measurement in container_measurements(store, container) {
            if measurement.violated && measurement.start < end && measurement.end > start {
                violations.push(measurement);
            }
        }
    }

    entries.sort_by_key(|e| (e.time, event_rank(e.event)));
    assign_states(store, &mut entries);
    violations.sort_by_key(|m| m.start);
    violations.dedup();

    Ok(Timeline { package: uid.to_string(), entries, violations })
}

/// Incoming edges of one label on the package, with their source nodes
fn incoming<S: GraphStore>(store: &S, uid: &str, label: &str) -> Vec<(crate::store::EdgeId, NodeId)> {
    let result = store.query(
        &GraphQuery::nodes("package")
            .has("trackingID", uid)
            .in_edges(label)
            .far_nodes(),
    );
    result
        .paths
        .iter()
        .filter_map(|path| {
            let edge = path.edges.last().copied()?;
            let node = path.nodes.last().copied()?;
            Some((edge, node))
        })
        .collect()
}

/// The route a container is assigned to, climbing the containment tree to
/// the vehicle when needed
fn route_of_container<S: GraphStore>(store: &S, container: NodeId) -> Option<String> {
    let mut current = container;
    for _ in 0..4 {
        let uid = store.node_key(current);
        let assigned = store.query(
            &GraphQuery::nodes("container")
                .has("uid", uid.as_str())
                .in_edges("assigned")
                .far_nodes(),
        );
        if let Some(route) = assigned.first_node() {
            return Some(store.node_key(route));
        }
        let parent = store.query(
            &GraphQuery::nodes("container")
                .has("uid", uid.as_str())
                .in_edges("contains")
                .has("childType", "C")
                .far_nodes(),
        );
        match parent.first_node() {
            Some(node) => current = node,
            None => return None,
        }
    }
    None
}

fn event_rank(event: EventKind) -> u8 {
    match event {
        EventKind::Pickup => 0,
        EventKind::Arrive => 1,
        EventKind::Transfer => 2,
        EventKind::TransferAck => 3,
        EventKind::Depart => 4,
        EventKind::Deliver => 5,
    }
}

/// Fold transit states over the sorted entries
fn assign_states<S: GraphStore>(store: &S, entries: &mut [TimelineEntry]) {
    let mut state = TransitState::Created;
    for entry in entries.iter_mut() {
        state = match entry.event {
            EventKind::Pickup => TransitState::PickedUp,
            EventKind::Transfer | EventKind::TransferAck => TransitState::Transferred,
            EventKind::Deliver => TransitState::Delivered,
            EventKind::Arrive => arrival_state(store, entry.route.as_deref(), state),
            EventKind::Depart => state,
        };
        entry.state = state;
    }
}

/// State after arriving a leg: a hub arrival parks the package at the
/// origin hub, an air arrival at a spoke means the destination is reached,
/// a ground arrival changes nothing
fn arrival_state<S: GraphStore>(
    store: &S,
    route: Option<&str>,
    current: TransitState,
) -> TransitState {
    let Some(route) = route else {
        return current;
    };
    let Some(route_node) = store.get_node("route", route) else {
        return current;
    };
    let kind = RouteKind::from_code(store.node_attr(route_node, "type").as_text());
    if kind != Some(RouteKind::Air) {
        return current;
    }
    let to_iata = store.node_attr(route_node, "toIata").as_text().to_string();
    let arrived_at_hub = store
        .get_node("office", &to_iata)
        .map(|office| store.node_attr(office, "hub").as_flag())
        .unwrap_or(false);
    if arrived_at_hub {
        TransitState::AtOriginHub
    } else {
        TransitState::AtDestinationHub
    }
}
