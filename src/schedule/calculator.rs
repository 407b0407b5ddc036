//! Schedule calculations for route legs
//!
//! Cross-timezone arrival estimation, jittered occurrence timestamps, and
//! stale-occurrence advancement. The flight-time and local-delay formulas are
//! deliberately simplified (raw coordinate differences, not geodesic
//! distance) and are kept exactly as-is for compatibility with persisted
//! schedules.
//!
//! Parsing is fail-soft by policy: a malformed GMT offset reads as +00:00
//! and an unparseable `HH:MM` string reads as "now". These paths never
//! return errors.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use rand::Rng;
use tracing::warn;

/// Jitter span in minutes for synthesized depart/arrive occurrences
pub const OCCURRENCE_JITTER_MINUTES: f64 = 5.0;

/// A schedule endpoint: an office's timezone and coordinates
#[derive(Debug, Clone, Copy)]
pub struct Waypoint<'a> {
    /// GMT offset in `±HH:MM` form
    pub gmt_offset: &'a str,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Parse a `±HH:MM` GMT offset into a fixed timezone offset
///
/// Malformed input falls back to +00:00.
pub fn parse_gmt_offset(offset: &str) -> FixedOffset {
    let zero = FixedOffset::east_opt(0).expect("zero offset is valid");
    let trimmed = offset.trim();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let mut parts = rest.splitn(2, ':');
    let hours: i32 = match parts.next().and_then(|h| h.parse().ok()) {
        Some(h) => h,
        None => {
            warn!(offset, "malformed GMT offset, defaulting to +00:00");
            return zero;
        }
    };
    let minutes: i32 = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).unwrap_or(zero)
}

/// Parse a scheduled `HH:MM` local time string
pub fn parse_schedule(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()
}

/// Flight duration in hours between two waypoints
///
/// `sqrt(dlat^2 + dlon^2) * 4/30` over raw coordinate differences. Not a
/// geodesic distance; preserved bit-for-bit.
pub fn flight_time_hours(from: Waypoint<'_>, to: Waypoint<'_>) -> f64 {
    let dlat = from.latitude - to.latitude;
    let dlon = from.longitude - to.longitude;
    let dist = (dlat * dlat + dlon * dlon).sqrt();
    dist * 4.0 / 30.0
}

/// Estimate the local arrival time `HH:MM` at the destination
///
/// Converts the departure time from the origin timezone into the destination
/// timezone, then adds the flight duration with minutes truncated toward
/// zero. The result wraps across midnight as needed.
pub fn arrival_time(depart_local: &str, from: Waypoint<'_>, to: Waypoint<'_>) -> String {
    let from_offset = parse_gmt_offset(from.gmt_offset);
    let to_offset = parse_gmt_offset(to.gmt_offset);

    // Reference date only; the output is a time-of-day string.
    let depart = at_local_time(reference_date(), depart_local, from_offset);
    let local = depart.with_timezone(&to_offset);

    let flight_minutes = (flight_time_hours(from, to) * 60.0) as i64;
    let arrived = local + Duration::minutes(flight_minutes);
    format!("{:02}:{:02}", arrived.hour(), arrived.minute())
}

/// Generate a random occurrence timestamp around a scheduled local time
///
/// Builds "today" at `scheduled_local` in the given offset, then applies a
/// uniform jitter of up to `span_minutes` in either direction (whole
/// seconds).
pub fn random_occurrence_time<R: Rng>(
    scheduled_local: &str,
    gmt_offset: &str,
    span_minutes: f64,
    rng: &mut R,
) -> DateTime<Utc> {
    let offset = parse_gmt_offset(gmt_offset);
    let today = Utc::now().with_timezone(&offset).date_naive();
    let base = at_local_time(today, scheduled_local, offset);

    let jitter_minutes = rng.gen::<f64>() * 2.0 * span_minutes - span_minutes;
    base.with_timezone(&Utc) + Duration::seconds((jitter_minutes * 60.0) as i64)
}

/// Advance an estimated time past a reference time by whole days
///
/// Returns `estimated` unchanged when it is already strictly after `after`;
/// otherwise adds whole days (day-of-year difference, minimum one day) until
/// the result is strictly after `after`, preserving the time-of-day
/// component. Correct across year boundaries.
pub fn advance_to_after(estimated: DateTime<Utc>, after: DateTime<Utc>) -> DateTime<Utc> {
    if estimated > after {
        return estimated;
    }
    let day_diff = i64::from(after.ordinal()) - i64::from(estimated.ordinal());
    let mut corrected = estimated;
    if day_diff > 0 {
        corrected += Duration::days(day_diff);
    }
    while corrected <= after {
        corrected += Duration::days(1);
    }
    corrected
}

/// Absolute time of a scheduled `HH:MM` on today plus `day_offset` days
pub fn scheduled_time_of_day(
    scheduled_local: &str,
    gmt_offset: &str,
    day_offset: i64,
) -> DateTime<Utc> {
    let offset = parse_gmt_offset(gmt_offset);
    let today = Utc::now().with_timezone(&offset).date_naive();
    let base = at_local_time(today, scheduled_local, offset).with_timezone(&Utc);
    base + Duration::days(day_offset)
}

/// Local pickup or delivery delay in hours, from the straight coordinate
/// distance to the office
///
/// `7 * (|dlat| + |dlon|) / 0.4` — deliberately linear, preserved exactly.
pub fn local_delay_hours(
    latitude: f64,
    longitude: f64,
    office_latitude: f64,
    office_longitude: f64,
) -> f64 {
    let dlat = (latitude - office_latitude).abs();
    let dlon = (longitude - office_longitude).abs();
    7.0 * (dlat + dlon) / 0.4
}

/// Estimated local pickup or delivery time
///
/// Local service starts at 08:00; when today's run has already started the
/// estimate moves to tomorrow, then the distance-based delay is applied in
/// whole minutes.
pub fn estimate_local_start(gmt_offset: &str, delay_hours: f64) -> DateTime<Utc> {
    let offset = parse_gmt_offset(gmt_offset);
    let now = Utc::now();
    let today = now.with_timezone(&offset).date_naive();
    let mut start = at_local_time(today, "08:00", offset).with_timezone(&Utc);
    if start < now {
        start += Duration::hours(24);
    }
    start + Duration::minutes((delay_hours * 60.0) as i64)
}

/// A local `HH:MM` on a given date in a fixed offset, falling back to "now"
/// for unparseable time strings
fn at_local_time(date: NaiveDate, time: &str, offset: FixedOffset) -> DateTime<FixedOffset> {
    let parsed = match parse_schedule(time) {
        Some(t) => t,
        None => {
            warn!(time, "unparseable schedule time, defaulting to now");
            return Utc::now().with_timezone(&offset);
        }
    };
    match offset.from_local_datetime(&date.and_time(parsed)).single() {
        Some(t) => t,
        // Unreachable for fixed offsets, kept as the same soft fallback.
        None => Utc::now().with_timezone(&offset),
    }
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid reference date")
}
