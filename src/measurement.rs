//! Raw GPS measurements and pseudorange formation
use itertools::Itertools;
use log::debug;

use crate::{
    constants::{SECONDS_PER_NANO, SPEED_OF_LIGHT_M_S},
    satellite::SatelliteMap,
};

/// Arbitrary common transit time (s), assigned to the earliest signal
const COMMON_TRANSIT_TIME_S: f64 = 0.070;

/// Early minus late correlator spacing (chips)
const CORRELATOR_SPACING_CHIPS: f64 = 0.1;

/// Code chip duration (s)
const CHIP_DURATION_S: f64 = 1.0E-6;

/// Predetection integration time (s)
const INTEGRATION_TIME_S: f64 = 0.02;

/// Per satellite GPS measurement, as reported by the receiver
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GpsMeasurement {
    /// Arrival time since beginning of GPS week (ns)
    pub arrival_time_since_gps_week_ns: i64,
    /// Accumulated delta range (m)
    pub accumulated_delta_range_m: f64,
    /// True when the accumulated delta range is usable
    pub accumulated_delta_range_valid: bool,
    /// Accumulated delta range uncertainty (m)
    pub accumulated_delta_range_uncertainty_m: f64,
    /// Pseudorange rate (m/s)
    pub pseudorange_rate_m_s: f64,
    /// Pseudorange rate uncertainty (m/s)
    pub pseudorange_rate_uncertainty_m_s: f64,
    /// Carrier to noise density ratio (dB-Hz)
    pub cn0_dbhz: f64,
}

/// [GpsMeasurement] with its pseudorange
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct RangeMeasurement {
    pub measurement: GpsMeasurement,
    /// Pseudorange (m)
    pub pseudorange_m: f64,
    /// Pseudorange uncertainty (m)
    pub pseudorange_uncertainty_m: f64,
}

impl RangeMeasurement {
    pub fn new(
        measurement: GpsMeasurement,
        pseudorange_m: f64,
        pseudorange_uncertainty_m: f64,
    ) -> Self {
        Self {
            measurement,
            pseudorange_m,
            pseudorange_uncertainty_m,
        }
    }

    /// Copies and returns [RangeMeasurement] with updated pseudorange and uncertainty
    pub fn with_range(&self, pseudorange_m: f64, pseudorange_uncertainty_m: f64) -> Self {
        let mut s = *self;
        s.pseudorange_m = pseudorange_m;
        s.pseudorange_uncertainty_m = pseudorange_uncertainty_m;
        s
    }
}

/// Pseudorange uncertainty (m), deduced from the carrier to noise density ratio
/// with a code tracking loop model.
pub fn pseudorange_uncertainty_m(cn0_dbhz: f64) -> f64 {
    let cn0 = 10.0_f64.powf(cn0_dbhz / 10.0);
    SPEED_OF_LIGHT_M_S
        * CHIP_DURATION_S
        * (CORRELATOR_SPACING_CHIPS / (4.0 * INTEGRATION_TIME_S * cn0)).sqrt()
}

/// Forms pseudoranges from a common reception time. Absolute transit
/// times are unknown: the satellite with the largest received time of week
/// (shortest transit) is given a 70 ms transit and the others are
/// offset by their received time of week difference. The resulting common
/// bias is absorbed in the receiver clock bias.
pub fn pseudoranges_from_common_reception_time(
    measurements: &SatelliteMap<GpsMeasurement>,
    received_tow_ns: &SatelliteMap<i64>,
    largest_tow_ns: i64,
) -> SatelliteMap<RangeMeasurement> {
    let ranges = received_tow_ns
        .iter()
        .filter_map(|(sv, tow_ns)| {
            let measurement = measurements.get(sv)?;
            let dt_s = (largest_tow_ns - tow_ns) as f64 * SECONDS_PER_NANO;
            let pseudorange_m = (COMMON_TRANSIT_TIME_S + dt_s) * SPEED_OF_LIGHT_M_S;
            let uncertainty_m = pseudorange_uncertainty_m(measurement.cn0_dbhz);
            Some((
                sv,
                RangeMeasurement::new(*measurement, pseudorange_m, uncertainty_m),
            ))
        })
        .collect::<SatelliteMap<_>>();

    debug!(
        "pseudoranges - [{}]",
        ranges
            .iter()
            .map(|(sv, range)| format!("{}={:.3}m", sv, range.pseudorange_m))
            .join(", ")
    );

    ranges
}
