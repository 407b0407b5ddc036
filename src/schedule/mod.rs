//! Schedule and timing calculations

pub mod calculator;

pub use calculator::{
    advance_to_after, arrival_time, estimate_local_start, flight_time_hours, local_delay_hours,
    parse_gmt_offset, parse_schedule, random_occurrence_time, scheduled_time_of_day, Waypoint,
    OCCURRENCE_JITTER_MINUTES,
};
