//! Environmental compliance simulation
//!
//! Generates randomized temperature measurements for a monitored container
//! over a rolling 3-day lookahead, one monitoring window per day around the
//! leg's scheduled depart/arrive times. Generation is idempotent per
//! (container, day): a window whose measurements already exist is skipped.

use crate::network::Threshold;
use crate::schedule::scheduled_time_of_day;
use crate::store::{EdgeSpec, GraphQuery, GraphStore, NodeId, SortOrder, StoreError};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

/// Days of measurement lookahead per monitored leg
pub const LOOKAHEAD_DAYS: i64 = 3;

/// One recorded measurement period
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Period start
    pub start: DateTime<Utc>,
    /// Period end
    pub end: DateTime<Utc>,
    /// Minimum observed value
    pub min_value: f64,
    /// Maximum observed value
    pub max_value: f64,
    /// Unit of measure
    pub uom: String,
    /// Whether the period violated the threshold band
    pub violated: bool,
}

/// The scheduled window of one leg, as local times with offsets
#[derive(Debug, Clone)]
pub struct LegSchedule {
    /// Scheduled local departure `HH:MM`
    pub depart_local: String,
    /// GMT offset at the departure office
    pub depart_offset: String,
    /// Scheduled local arrival `HH:MM`
    pub arrival_local: String,
    /// GMT offset at the arrival office
    pub arrival_offset: String,
}

/// Generates measurement records for monitored containers
#[derive(Debug, Clone)]
pub struct ComplianceMonitor {
    violation_rate: f64,
}

impl ComplianceMonitor {
    /// New monitor with the configured violation-injection probability
    pub fn new(violation_rate: f64) -> Self {
        ComplianceMonitor { violation_rate }
    }

    /// Generate measurements for one leg's monitored container
    ///
    /// Walks day offsets `0..LOOKAHEAD_DAYS`; for each day the monitoring
    /// window is the scheduled leg padded by one hour on both ends. Days
    /// whose window is already covered by an existing measurement are
    /// skipped. Returns the number of measurement records written.
    pub fn monitor_container<S: GraphStore, R: Rng>(
        &self,
        store: &mut S,
        container: NodeId,
        threshold_node: NodeId,
        threshold: &Threshold,
        leg: &LegSchedule,
        rng: &mut R,
    ) -> Result<usize, StoreError> {
        let mut written = 0;
        for day in 0..LOOKAHEAD_DAYS {
            let start =
                scheduled_time_of_day(&leg.depart_local, &leg.depart_offset, day)
                    - Duration::hours(1);
            let mut end =
                scheduled_time_of_day(&leg.arrival_local, &leg.arrival_offset, day)
                    + Duration::hours(1);
            if end <= start {
                // Overnight leg, the arrival falls on the next calendar day.
                end += Duration::days(1);
            }

            if self.window_covered(store, container, end) {
                debug!(container = %store.node_key(container), day, "window already measured");
                continue;
            }

            for measurement in self.generate_window(threshold, start, end, rng) {
                store.insert_edge(
                    EdgeSpec::new("measures", container, threshold_node)
                        .attr("startTimestamp", measurement.start)
                        .attr("eventTimestamp", measurement.end)
                        .attr("minValue", measurement.min_value)
                        .attr("maxValue", measurement.max_value)
                        .attr("uom", measurement.uom.as_str())
                        .attr("violated", measurement.violated),
                )?;
                store.commit()?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Whether an existing measurement already covers a window ending at
    /// `end`: its end falls on a later calendar day, or within one hour
    fn window_covered<S: GraphStore>(
        &self,
        store: &S,
        container: NodeId,
        end: DateTime<Utc>,
    ) -> bool {
        let key = store.node_key(container);
        let latest = store.query(
            &GraphQuery::nodes("container")
                .has("uid", key.as_str())
                .out_edges("measures")
                .order_by("eventTimestamp", SortOrder::Descending)
                .limit(1),
        );
        let Some(edge) = latest.first_edge() else {
            return false;
        };
        let last_end = store.edge_attr(edge, "eventTimestamp").as_instant();
        last_end.date_naive() > end.date_naive()
            || (last_end - end).num_seconds().abs() < 3600
    }

    /// Partition one window into 1 to 3 chronological sub-periods
    ///
    /// With probability `violation_rate` exactly one sub-period is a
    /// violation: random duration of at most 10% of the window, values drawn
    /// above the threshold band. All values round to two decimals.
    fn generate_window<R: Rng>(
        &self,
        threshold: &Threshold,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<Measurement> {
        let total_seconds = (end - start).num_seconds().max(1);
        let mut periods = Vec::new();

        if rng.gen::<f64>() < self.violation_rate {
            let max_violation = (total_seconds as f64 * 0.1) as i64;
            let violation_seconds = rng.gen_range(1..=max_violation.max(1));
            let latest_start = total_seconds - violation_seconds;
            let violation_offset = if latest_start > 0 {
                rng.gen_range(0..=latest_start)
            } else {
                0
            };

            let violation_start = start + Duration::seconds(violation_offset);
            let violation_end = violation_start + Duration::seconds(violation_seconds);
            if violation_start > start {
                periods.push(self.nominal_period(threshold, start, violation_start, rng));
            }
            periods.push(self.violation_period(threshold, violation_start, violation_end, rng));
            if violation_end < end {
                periods.push(self.nominal_period(threshold, violation_end, end, rng));
            }
        } else {
            let count = rng.gen_range(1..=3);
            let mut cuts: Vec<i64> =
                (1..count).map(|_| rng.gen_range(1..total_seconds.max(2))).collect();
            cuts.sort_unstable();
            let mut cursor = start;
            for cut in cuts {
                let boundary = start + Duration::seconds(cut);
                if boundary > cursor {
                    periods.push(self.nominal_period(threshold, cursor, boundary, rng));
                    cursor = boundary;
                }
            }
            periods.push(self.nominal_period(threshold, cursor, end, rng));
        }
        periods
    }

    fn nominal_period<R: Rng>(
        &self,
        threshold: &Threshold,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rng: &mut R,
    ) -> Measurement {
        let (min_value, max_value) =
            sample_band(threshold.min_value, threshold.max_value, rng);
        Measurement {
            start,
            end,
            min_value,
            max_value,
            uom: threshold.uom.clone(),
            violated: false,
        }
    }

    fn violation_period<R: Rng>(
        &self,
        threshold: &Threshold,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rng: &mut R,
    ) -> Measurement {
        // Violation values sit in the band mirrored above the maximum.
        let (min_value, max_value) = sample_band(
            threshold.max_value,
            2.0 * threshold.max_value - threshold.min_value,
            rng,
        );
        Measurement {
            start,
            end,
            min_value,
            max_value,
            uom: threshold.uom.clone(),
            violated: true,
        }
    }
}

fn sample_band<R: Rng>(low: f64, high: f64, rng: &mut R) -> (f64, f64) {
    let a = round2(rng.gen_range(low..high));
    let b = round2(rng.gen_range(low..high));
    (a.min(b), a.max(b))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// All measurements recorded for a container, ordered by period start
pub fn container_measurements<S: GraphStore>(store: &S, container: NodeId) -> Vec<Measurement> {
    let key = store.node_key(container);
    let result = store.query(
        &GraphQuery::nodes("container")
            .has("uid", key.as_str())
            .out_edges("measures")
            .order_by("startTimestamp", SortOrder::Ascending),
    );
    result
        .edges
        .iter()
        .map(|edge| Measurement {
            start: store.edge_attr(*edge, "startTimestamp").as_instant(),
            end: store.edge_attr(*edge, "eventTimestamp").as_instant(),
            min_value: store.edge_attr(*edge, "minValue").as_number(),
            max_value: store.edge_attr(*edge, "maxValue").as_number(),
            uom: store.edge_attr(*edge, "uom").as_text().to_string(),
            violated: store.edge_attr(*edge, "violated").as_flag(),
        })
        .collect()
}
