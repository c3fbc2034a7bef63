//! GPS week / time of week arithmetics
use hifitime::{Epoch, Unit};

use crate::constants::{NANOS_PER_WEEK, SECONDS_PER_WEEK, SPEED_OF_LIGHT_M_S};

/// Returns `current_ns - previous_ns`, both expressed as nanoseconds
/// since the beginning of their GPS week. When the week rolled over
/// in between, one week is added so the difference remains positive.
pub fn gps_time_diff_with_rollover_correction(previous_ns: i64, current_ns: i64) -> i64 {
    let dt_ns = current_ns - previous_ns;
    if dt_ns < 0 {
        dt_ns + NANOS_PER_WEEK
    } else {
        dt_ns
    }
}

/// GPS time expressed as week counter and seconds of week.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GpsWeekTime {
    /// GPS week counter
    pub week: i32,
    /// Time of week (s)
    pub tow_s: f64,
}

impl GpsWeekTime {
    pub fn new(week: i32, tow_s: f64) -> Self {
        Self { week, tow_s }
    }

    /// Brings time of week back within a single week,
    /// updating the week counter accordingly.
    pub fn normalized(&self) -> Self {
        let mut s = *self;
        let week_s = SECONDS_PER_WEEK as f64;
        if s.tow_s < 0.0 {
            s.tow_s += week_s;
            s.week -= 1;
        } else if s.tow_s > week_s {
            s.tow_s -= week_s;
            s.week += 1;
        }
        s
    }

    /// Offsets this time by given amount of seconds, with rollover correction.
    pub fn offset_seconds(&self, dt_s: f64) -> Self {
        Self::new(self.week, self.tow_s + dt_s).normalized()
    }

    /// Time of transmission of a signal received at this instant,
    /// which travelled `pseudorange_m`.
    pub fn transmission_time(&self, pseudorange_m: f64) -> Self {
        self.offset_seconds(-pseudorange_m / SPEED_OF_LIGHT_M_S)
    }

    /// Seconds elapsed since (week, tow_s) reference instant, typically an
    /// ephemeris ToE or ToC.
    pub fn seconds_since(&self, week: i32, tow_s: f64) -> f64 {
        (self.week - week) as f64 * SECONDS_PER_WEEK as f64 + self.tow_s - tow_s
    }
}

/// Receiver time descriptors, deduced from the receiver clock.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReceiverTime {
    /// GPS week counter
    pub week: i32,
    /// Arrival time since beginning of the GPS week (ns)
    pub arrival_time_since_gps_week_ns: i64,
    /// Day of year, between 1 and 366
    pub day_of_year: u16,
}

impl ReceiverTime {
    /// Builds [ReceiverTime] from nanoseconds elapsed since the GPS epoch
    /// (1980-01-06T00:00:00 GPST).
    pub fn from_gpst_nanoseconds(nanos: u64) -> Self {
        let t = Epoch::from_gpst_nanoseconds(nanos);
        let (week, nanos_of_week) = t.to_time_of_week();

        let (year, _, _, _, _, _, _) = t.to_gregorian_utc();
        let new_year = Epoch::from_gregorian_utc_at_midnight(year, 1, 1);
        let day_of_year = (t - new_year).to_unit(Unit::Day).floor() as u16 + 1;

        Self {
            week: week as i32,
            arrival_time_since_gps_week_ns: nanos_of_week as i64,
            day_of_year,
        }
    }

    /// Receiver time of week (s)
    pub fn tow_s(&self) -> f64 {
        self.arrival_time_since_gps_week_ns as f64 * 1.0E-9
    }
}
