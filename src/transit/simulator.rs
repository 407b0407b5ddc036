//! Package transit simulation
//!
//! Drives one package through the full lifecycle: local pickup, flight to
//! the origin hub, custody transfer when the destination belongs to another
//! carrier, flight out to the destination spoke, and local delivery. Each
//! leg resolves its container, appends the containment period, records the
//! custody event, and, for monitored packages, runs the compliance monitor
//! over the leg's schedule.
//!
//! Occurrence synthesis is staleness-driven: a leg reuses the route's latest
//! recorded occurrence when it is still in the future, so re-simulating the
//! same day does not duplicate occurrences. Reading the latest occurrence
//! and appending a new one is not safe across concurrent simulations of the
//! same route; the simulator holds the store by value, which serializes all
//! simulations in a process.

use crate::compliance::{
    container_measurements, post_quietly, ComplianceMonitor, ComplianceSink, LegSchedule,
    LoggingSink, PackageTransaction, TemperatureUpdate,
};
use crate::network::{NetworkModel, Office, Route};
use crate::schedule::{
    advance_to_after, local_delay_hours, random_occurrence_time, OCCURRENCE_JITTER_MINUTES,
};
use crate::shipment::fnv1a64;
use crate::store::{EdgeSpec, GraphQuery, GraphStore, NodeId, SortOrder};
use crate::transit::error::SimulationError;
use crate::transit::resolver::resolve_container;
use crate::types::ChildKind;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument};

/// Delay between the transfer handoff and its acknowledgment
const TRANSFER_ACK_DELAY_SECONDS: i64 = 30;

/// Outcome of a completed pickup-to-delivery simulation
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    /// Tracking identifier of the package
    pub package: String,
    /// When the package was picked up at the sender
    pub pickup_time: DateTime<Utc>,
    /// When the package was delivered to the recipient
    pub delivery_time: DateTime<Utc>,
    /// Whether custody crossed carriers
    pub transferred: bool,
    /// Number of containment periods recorded
    pub containment_legs: usize,
    /// Number of measurement records written along the way
    pub measurements: usize,
}

struct PackageInfo {
    node: NodeId,
    uid: String,
    carrier: String,
    handling_cd: String,
    product: String,
    sender_state: String,
    sender_lat: f64,
    sender_lon: f64,
    recipient_state: String,
    recipient_lat: f64,
    recipient_lon: f64,
}

struct MonitoredLeg {
    container: NodeId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Simulates package transit against a graph store
pub struct TransitSimulator<S: GraphStore> {
    model: NetworkModel,
    store: S,
    monitor: ComplianceMonitor,
    sink: Box<dyn ComplianceSink>,
    events: crate::types::MonitorConfig,
    rng: StdRng,
}

impl<S: GraphStore> std::fmt::Debug for TransitSimulator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitSimulator")
            .field("carriers", &self.model.carriers.len())
            .finish_non_exhaustive()
    }
}

impl<S: GraphStore> TransitSimulator<S> {
    /// New simulator over a bootstrapped store
    pub fn new(
        model: NetworkModel,
        store: S,
        events: crate::types::MonitorConfig,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        TransitSimulator {
            monitor: ComplianceMonitor::new(events.violation_rate),
            model,
            store,
            sink: Box::new(LoggingSink),
            events,
            rng,
        }
    }

    /// Replace the compliance sink
    pub fn with_sink(mut self, sink: Box<dyn ComplianceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The network model driving this simulator
    pub fn model(&self) -> &NetworkModel {
        &self.model
    }

    /// The underlying graph store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Simulate the full transit of a labeled package
    #[instrument(skip(self), fields(package = %uid))]
    pub fn pickup_package(&mut self, uid: &str) -> Result<DeliveryReport, SimulationError> {
        let package = self.load_package(uid)?;
        let monitored = self.model.is_monitored(&package.handling_cd, &package.product);

        let origin = self
            .model
            .carrier_office_by_state(&package.carrier, &package.sender_state)
            .cloned()
            .ok_or_else(|| SimulationError::OfficeNotFound {
                carrier: package.carrier.clone(),
                iata: package.sender_state.clone(),
            })?;
        let origin_hub = self.model.hub(&package.carrier).cloned().ok_or_else(|| {
            SimulationError::OfficeNotFound {
                carrier: package.carrier.clone(),
                iata: "hub".to_string(),
            }
        })?;
        let destination = self
            .model
            .office_by_state(&package.recipient_state)
            .cloned()
            .ok_or_else(|| SimulationError::OfficeNotFound {
                carrier: String::new(),
                iata: package.recipient_state.clone(),
            })?;
        let destination_hub =
            self.model.hub(&destination.carrier).cloned().ok_or_else(|| {
                SimulationError::OfficeNotFound {
                    carrier: destination.carrier.clone(),
                    iata: "hub".to_string(),
                }
            })?;

        let mut monitored_legs = Vec::new();
        let mut measurements = 0usize;
        let mut containment_legs = 0usize;

        // Local pickup on the origin office's ground loop.
        let ground = origin
            .ground_route()
            .cloned()
            .ok_or_else(|| SimulationError::RouteNotFound(format!("{}:ground", origin.iata)))?;
        let (g_depart, g_arrive) =
            self.ensure_occurrence(&ground, &origin, &origin, Utc::now())?;
        let pickup_delay =
            local_delay_hours(package.sender_lat, package.sender_lon, origin.latitude, origin.longitude);
        let pickup_time = g_depart + Duration::minutes((pickup_delay * 60.0) as i64);
        let truck_arrival = if g_arrive > pickup_time {
            g_arrive
        } else {
            advance_to_after(g_arrive, pickup_time)
        };
        let container = self.assign_containment(
            &ground,
            &package,
            pickup_time,
            truck_arrival,
        )?;
        containment_legs += 1;
        self.record_custody_event(
            "pickup",
            &origin,
            &package,
            pickup_time,
            package.sender_lat,
            package.sender_lon,
        )?;
        if monitored {
            measurements +=
                self.monitor_leg(container, &package, &ground, &origin, &origin)?;
            monitored_legs.push(MonitoredLeg { container, start: pickup_time, end: truck_arrival });
            self.post_custody_event(
                &package,
                &self.events.pickup.clone(),
                pickup_time,
                package.sender_lat,
                package.sender_lon,
                &package.carrier.clone(),
            );
        }
        info!(package = %package.uid, office = %origin.iata, %pickup_time, "package picked up");

        // Flight to the origin hub, skipped when the sender is already
        // served by the hub.
        let mut position_time = truck_arrival;
        if origin.iata != origin_hub.iata {
            let air = origin
                .air_route_to(&origin_hub.iata)
                .cloned()
                .ok_or_else(|| {
                    SimulationError::RouteNotFound(format!("{}-{}", origin.iata, origin_hub.iata))
                })?;
            let (_depart, arrive) =
                self.ensure_occurrence(&air, &origin, &origin_hub, position_time)?;
            let container =
                self.assign_containment(&air, &package, position_time, arrive)?;
            containment_legs += 1;
            if monitored {
                measurements +=
                    self.monitor_leg(container, &package, &air, &origin, &origin_hub)?;
                monitored_legs.push(MonitoredLeg { container, start: position_time, end: arrive });
            }
            info!(package = %package.uid, route = %air.number, %arrive, "package at origin hub");
            position_time = arrive;
        }

        // Custody transfer, only when the recipient's office belongs to a
        // different carrier.
        let transferred = destination.carrier != package.carrier;
        if transferred {
            let ack_time = position_time + Duration::seconds(TRANSFER_ACK_DELAY_SECONDS);
            self.record_transfer(&origin_hub, &package, position_time, "from")?;
            self.record_transfer(&destination_hub, &package, ack_time, "to")?;
            if monitored {
                self.post_custody_event(
                    &package,
                    &self.events.transfer.clone(),
                    position_time,
                    origin_hub.latitude,
                    origin_hub.longitude,
                    &package.carrier.clone(),
                );
                self.post_custody_event(
                    &package,
                    &self.events.transfer_ack.clone(),
                    ack_time,
                    destination_hub.latitude,
                    destination_hub.longitude,
                    &destination.carrier.clone(),
                );
            }
            info!(
                package = %package.uid,
                from = %package.carrier,
                to = %destination.carrier,
                "custody transferred"
            );
            position_time = ack_time;
        }

        // Flight from the destination carrier's hub out to the spoke.
        if destination.iata != destination_hub.iata {
            let air = destination_hub
                .air_route_to(&destination.iata)
                .cloned()
                .ok_or_else(|| {
                    SimulationError::RouteNotFound(format!(
                        "{}-{}",
                        destination_hub.iata, destination.iata
                    ))
                })?;
            let (_depart, arrive) =
                self.ensure_occurrence(&air, &destination_hub, &destination, position_time)?;
            let container =
                self.assign_containment(&air, &package, position_time, arrive)?;
            containment_legs += 1;
            if monitored {
                measurements +=
                    self.monitor_leg(container, &package, &air, &destination_hub, &destination)?;
                monitored_legs.push(MonitoredLeg { container, start: position_time, end: arrive });
            }
            info!(package = %package.uid, route = %air.number, %arrive, "package at destination spoke");
            position_time = arrive;
        }

        // Local delivery on the destination office's ground loop.
        let ground = destination
            .ground_route()
            .cloned()
            .ok_or_else(|| {
                SimulationError::RouteNotFound(format!("{}:ground", destination.iata))
            })?;
        let (g_depart, _g_arrive) =
            self.ensure_occurrence(&ground, &destination, &destination, position_time)?;
        let delivery_delay = local_delay_hours(
            package.recipient_lat,
            package.recipient_lon,
            destination.latitude,
            destination.longitude,
        );
        let mut delivery_time = g_depart + Duration::minutes((delivery_delay * 60.0) as i64);
        if delivery_time <= position_time {
            delivery_time = advance_to_after(delivery_time, position_time);
        }
        let container =
            self.assign_containment(&ground, &package, position_time, delivery_time)?;
        containment_legs += 1;
        self.record_custody_event(
            "delivery",
            &destination,
            &package,
            delivery_time,
            package.recipient_lat,
            package.recipient_lon,
        )?;
        if monitored {
            measurements +=
                self.monitor_leg(container, &package, &ground, &destination, &destination)?;
            monitored_legs.push(MonitoredLeg {
                container,
                start: position_time,
                end: delivery_time,
            });
            self.post_custody_event(
                &package,
                &self.events.delivery.clone(),
                delivery_time,
                package.recipient_lat,
                package.recipient_lon,
                &destination.carrier.clone(),
            );
        }
        info!(package = %package.uid, office = %destination.iata, %delivery_time, "package delivered");

        self.report_violations(&package, &monitored_legs);

        Ok(DeliveryReport {
            package: package.uid,
            pickup_time,
            delivery_time,
            transferred,
            containment_legs,
            measurements,
        })
    }

    fn load_package(&self, uid: &str) -> Result<PackageInfo, SimulationError> {
        let node = self
            .store
            .get_node("package", uid)
            .ok_or_else(|| SimulationError::PackageNotFound(uid.to_string()))?;
        let (sender_state, sender_lat, sender_lon) = self.load_address(uid, "sender")?;
        let (recipient_state, recipient_lat, recipient_lon) =
            self.load_address(uid, "recipient")?;
        Ok(PackageInfo {
            node,
            uid: uid.to_string(),
            carrier: self.store.node_attr(node, "carrier").as_text().to_string(),
            handling_cd: self.store.node_attr(node, "handlingCd").as_text().to_string(),
            product: self.store.node_attr(node, "product").as_text().to_string(),
            sender_state,
            sender_lat,
            sender_lon,
            recipient_state,
            recipient_lat,
            recipient_lon,
        })
    }

    fn load_address(
        &self,
        uid: &str,
        edge_label: &str,
    ) -> Result<(String, f64, f64), SimulationError> {
        let address = self
            .store
            .query(
                &GraphQuery::nodes("package")
                    .has("trackingID", uid)
                    .out_edges(edge_label)
                    .far_nodes(),
            )
            .first_node()
            .ok_or_else(|| SimulationError::PackageNotFound(uid.to_string()))?;
        Ok((
            self.store.node_attr(address, "state").as_text().to_string(),
            self.store.node_attr(address, "latitude").as_number(),
            self.store.node_attr(address, "longitude").as_number(),
        ))
    }

    /// Latest occurrence of a route, synthesizing a fresh pair when the
    /// recorded one is not strictly after `after`
    fn ensure_occurrence(
        &mut self,
        route: &Route,
        from: &Office,
        to: &Office,
        after: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), SimulationError> {
        let route_node = self
            .store
            .get_node("route", &route.number)
            .ok_or_else(|| SimulationError::RouteNotFound(route.number.clone()))?;

        let latest_depart = self.latest_occurrence(&route.number, "departs");
        if let Some(depart) = latest_depart {
            if depart > after {
                let arrive = match self.latest_occurrence(&route.number, "arrives") {
                    Some(arrive) if arrive > depart => arrive,
                    Some(arrive) => advance_to_after(arrive, depart),
                    None => {
                        return Err(SimulationError::OccurrenceNotFound(route.number.clone()))
                    }
                };
                return Ok((depart, arrive));
            }
        }

        let from_node = self
            .store
            .get_node("office", &from.iata)
            .ok_or_else(|| SimulationError::OfficeNotFound {
                carrier: from.carrier.clone(),
                iata: from.iata.clone(),
            })?;
        let to_node = self.store.get_node("office", &to.iata).ok_or_else(|| {
            SimulationError::OfficeNotFound {
                carrier: to.carrier.clone(),
                iata: to.iata.clone(),
            }
        })?;

        let depart = advance_to_after(
            random_occurrence_time(
                &route.depart_local,
                &from.gmt_offset,
                OCCURRENCE_JITTER_MINUTES,
                &mut self.rng,
            ),
            after,
        );
        let arrive = advance_to_after(
            random_occurrence_time(
                &route.arrival_local,
                &to.gmt_offset,
                OCCURRENCE_JITTER_MINUTES,
                &mut self.rng,
            ),
            depart,
        );

        self.store.insert_edge(
            EdgeSpec::new("departs", route_node, from_node).attr("eventTimestamp", depart),
        )?;
        self.store.commit()?;
        self.store.insert_edge(
            EdgeSpec::new("arrives", route_node, to_node).attr("eventTimestamp", arrive),
        )?;
        self.store.commit()?;
        Ok((depart, arrive))
    }

    fn latest_occurrence(&self, route_number: &str, edge_label: &str) -> Option<DateTime<Utc>> {
        let result = self.store.query(
            &GraphQuery::nodes("route")
                .has("routeNbr", route_number)
                .out_edges(edge_label)
                .order_by("eventTimestamp", SortOrder::Descending)
                .limit(1),
        );
        result
            .first_edge()
            .map(|edge| self.store.edge_attr(edge, "eventTimestamp").as_instant())
    }

    /// Resolve the leg's container and append the containment period
    fn assign_containment(
        &mut self,
        route: &Route,
        package: &PackageInfo,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<NodeId, SimulationError> {
        let container = resolve_container(
            &self.store,
            &self.model,
            &route.number,
            &package.handling_cd,
            &package.product,
        )?;
        // The route rides along on the edge: return legs share the outbound
        // leg's vehicle, so the vehicle alone cannot name the leg.
        self.store.insert_edge(
            EdgeSpec::new("contains", container, package.node)
                .attr("childType", ChildKind::Package.code())
                .attr("routeNbr", route.number.as_str())
                .attr("eventTimestamp", start)
                .attr("outTimestamp", end),
        )?;
        self.store.commit()?;
        Ok(container)
    }

    fn record_custody_event(
        &mut self,
        label: &str,
        office: &Office,
        package: &PackageInfo,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), SimulationError> {
        let office_node = self
            .store
            .get_node("office", &office.iata)
            .ok_or_else(|| SimulationError::OfficeNotFound {
                carrier: office.carrier.clone(),
                iata: office.iata.clone(),
            })?;
        self.store.insert_edge(
            EdgeSpec::new(label, office_node, package.node)
                .attr("eventTimestamp", time)
                .attr("trackingID", package.uid.as_str())
                .attr("employeeID", employee_id(&office.carrier, label, latitude, longitude))
                .attr("latitude", latitude)
                .attr("longitude", longitude),
        )?;
        self.store.commit()?;
        Ok(())
    }

    fn record_transfer(
        &mut self,
        office: &Office,
        package: &PackageInfo,
        time: DateTime<Utc>,
        direction: &str,
    ) -> Result<(), SimulationError> {
        let office_node = self
            .store
            .get_node("office", &office.iata)
            .ok_or_else(|| SimulationError::OfficeNotFound {
                carrier: office.carrier.clone(),
                iata: office.iata.clone(),
            })?;
        self.store.insert_edge(
            EdgeSpec::new("transfers", office_node, package.node)
                .attr("eventTimestamp", time)
                .attr("trackingID", package.uid.as_str())
                .attr(
                    "employeeID",
                    employee_id(&office.carrier, direction, office.latitude, office.longitude),
                )
                .attr("direction", direction)
                .attr("latitude", office.latitude)
                .attr("longitude", office.longitude),
        )?;
        self.store.commit()?;
        Ok(())
    }

    /// Run the compliance monitor over one leg's schedule
    fn monitor_leg(
        &mut self,
        container: NodeId,
        package: &PackageInfo,
        route: &Route,
        from: &Office,
        to: &Office,
    ) -> Result<usize, SimulationError> {
        let threshold = self
            .model
            .threshold(&package.product)
            .cloned()
            .ok_or_else(|| SimulationError::ThresholdNotFound(package.product.clone()))?;
        let threshold_node = self
            .store
            .get_node("threshold", &package.product)
            .ok_or_else(|| SimulationError::ThresholdNotFound(package.product.clone()))?;
        let leg = LegSchedule {
            depart_local: route.depart_local.clone(),
            depart_offset: from.gmt_offset.clone(),
            arrival_local: route.arrival_local.clone(),
            arrival_offset: to.gmt_offset.clone(),
        };
        Ok(self.monitor.monitor_container(
            &mut self.store,
            container,
            threshold_node,
            &threshold,
            &leg,
            &mut self.rng,
        )?)
    }

    fn post_custody_event(
        &mut self,
        package: &PackageInfo,
        event_type: &str,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        carrier: &str,
    ) {
        if !self.events.enabled {
            return;
        }
        let payload = PackageTransaction {
            uid: package.uid.clone(),
            event_type: event_type.to_string(),
            event_time: time,
            latitude,
            longitude,
            carrier: carrier.to_string(),
            employee_id: employee_id(carrier, event_type, latitude, longitude),
        };
        post_quietly(self.sink.as_ref(), carrier, event_type, &payload);
    }

    /// Forward every violation overlapping the package's monitored
    /// containment periods to the sink
    fn report_violations(&mut self, package: &PackageInfo, legs: &[MonitoredLeg]) {
        if !self.events.enabled || legs.is_empty() {
            return;
        }
        let event_type = self.events.update_temperature.clone();
        for leg in legs {
            let container_uid = self.store.node_key(leg.container);
            for measurement in container_measurements(&self.store, leg.container) {
                let overlaps = measurement.violated
                    && measurement.start < leg.end
                    && measurement.end > leg.start;
                if overlaps {
                    let payload = TemperatureUpdate {
                        uid: package.uid.clone(),
                        container: container_uid.clone(),
                        product: package.product.clone(),
                        period_start: measurement.start,
                        period_end: measurement.end,
                        min_value: measurement.min_value,
                        max_value: measurement.max_value,
                        uom: measurement.uom.clone(),
                        violated: true,
                    };
                    post_quietly(self.sink.as_ref(), &package.carrier, &event_type, &payload);
                }
            }
        }
    }
}

/// Deterministic-per-context employee identifier
fn employee_id(carrier: &str, direction: &str, latitude: f64, longitude: f64) -> String {
    let context = format!("{}:{}:{}:{}", carrier, direction, latitude, longitude);
    fnv1a64(context.as_bytes()).to_string()
}
