//! Epoch by epoch positioning, from raw receiver measurements
use itertools::Itertools;
use log::{debug, error, info, warn};

use crate::{
    bias::ElevationSource,
    cfg::Config,
    constants::MAX_GPS_PRN,
    coords::NeuVelocity,
    ephemeris::NavigationMessage,
    error::Error,
    measurement::{pseudoranges_from_common_reception_time, GpsMeasurement},
    navigation::{PositionSolution, WlsSolution, WlsSolver},
    prelude::{Constellation, SV},
    satellite::SatelliteMap,
    smoothing::{smoother, PseudorangeSmoother},
    time::ReceiverTime,
};

/// Measurement state bit: time of week decoded
pub const STATE_TOW_DECODED: u32 = 1 << 3;

/// Accumulated delta range state bit: valid
pub const ADR_STATE_VALID: u16 = 1 << 0;

/// Receiver clock, as reported with each measurement epoch
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ReceiverClock {
    /// Receiver internal clock (ns)
    pub time_ns: i64,
    /// Difference between the internal clock and GPS time (ns),
    /// GPS time being `time_ns - full_bias_ns`.
    pub full_bias_ns: i64,
}

impl ReceiverClock {
    /// GPS time of this epoch, elapsed since the GPS epoch (ns)
    pub fn gpst_nanoseconds(&self) -> i64 {
        self.time_ns - self.full_bias_ns
    }
}

/// Raw receiver measurement
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RawMeasurement {
    pub sv: SV,
    /// Carrier to noise density ratio (dB-Hz)
    pub cn0_dbhz: f64,
    /// Tracking state bit field
    pub state: u32,
    /// Received satellite time of week (ns)
    pub received_sv_time_ns: i64,
    /// Accumulated delta range (m)
    pub accumulated_delta_range_m: f64,
    /// Accumulated delta range state bit field
    pub accumulated_delta_range_state: u16,
    /// Accumulated delta range uncertainty (m)
    pub accumulated_delta_range_uncertainty_m: f64,
    /// Pseudorange rate (m/s)
    pub pseudorange_rate_m_s: f64,
    /// Pseudorange rate uncertainty (m/s)
    pub pseudorange_rate_uncertainty_m_s: f64,
}

/// Approximate user position, used to request assistance data.
/// Coordinates are expressed in 1E-7 degrees and 1E-7 meters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ReferencePosition {
    pub latitude_e7: i64,
    pub longitude_e7: i64,
    pub altitude_e7: i64,
}

/// Navigation message provider (assistance server), used when the
/// receiver did not decode the navigation message itself.
pub trait AssistanceSource {
    /// Returns the [NavigationMessage] valid around this [ReferencePosition]
    fn navigation_message(
        &mut self,
        reference: &ReferencePosition,
    ) -> Result<NavigationMessage, Error>;
}

/// Reported position
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    /// Latitude (°)
    pub latitude_deg: f64,
    /// Longitude (°)
    pub longitude_deg: f64,
    /// Altitude above the ellipsoid (m)
    pub altitude_m: f64,
    /// Local velocity
    pub velocity: NeuVelocity,
    /// Complete solution
    pub solution: WlsSolution,
}

impl From<WlsSolution> for PositionFix {
    fn from(solution: WlsSolution) -> Self {
        let geo = solution.solution.geodetic();
        Self {
            latitude_deg: geo.latitude_rad.to_degrees(),
            longitude_deg: geo.longitude_rad.to_degrees(),
            altitude_m: geo.altitude_m,
            velocity: solution.solution.local_velocity(),
            solution,
        }
    }
}

/// Positioning engine: selects the useful measurements of each epoch,
/// gathers the navigation data, smoothes the pseudoranges and solves.
pub struct PositionEngine<A: AssistanceSource> {
    cfg: Config,
    assistance: A,
    smoother: Box<dyn PseudorangeSmoother>,
    pub(crate) solver: WlsSolver,
    reference: Option<ReferencePosition>,
    /// Navigation message decoded by the receiver
    decoded_nav: Option<NavigationMessage>,
    /// Latest assistance data, and the GPS time (ns) it was obtained
    assisted_nav: Option<(NavigationMessage, i64)>,
    /// True until the first useful epoch went by
    first_useful_epoch: bool,
    /// Last valid fix
    fix: Option<PositionFix>,
}

impl<A: AssistanceSource> PositionEngine<A> {
    pub fn new(cfg: &Config, assistance: A, elevation: Box<dyn ElevationSource>) -> Self {
        info!(
            "position engine - smoothing: {:?}, min cn0: {}dB-Hz",
            cfg.smoothing.method, cfg.receiver.min_cn0_dbhz
        );

        Self {
            cfg: *cfg,
            assistance,
            smoother: smoother(&cfg.smoothing),
            solver: WlsSolver::new(cfg, elevation),
            reference: None,
            decoded_nav: None,
            assisted_nav: None,
            first_useful_epoch: true,
            fix: None,
        }
    }

    /// Defines the [ReferencePosition] used to request assistance data
    pub fn set_reference_position(&mut self, reference: ReferencePosition) {
        self.reference = Some(reference);
    }

    /// Updates the [NavigationMessage] decoded by the receiver
    pub fn set_decoded_navigation_message(&mut self, nav: NavigationMessage) {
        self.decoded_nav = Some(nav);
    }

    /// Last valid [PositionFix]
    pub fn position_fix(&self) -> Option<&PositionFix> {
        self.fix.as_ref()
    }

    /// Selects the useful measurements: GPS with PRN up to 32,
    /// TOW decoded and above the carrier to noise mask.
    fn useful_measurements(
        &self,
        arrival_time_since_gps_week_ns: i64,
        measurements: &[RawMeasurement],
    ) -> (SatelliteMap<GpsMeasurement>, SatelliteMap<i64>) {
        let mut useful = SatelliteMap::<GpsMeasurement>::new();
        let mut received_tow_ns = SatelliteMap::<i64>::new();

        for m in measurements {
            if m.sv.constellation != Constellation::GPS || m.sv.prn > MAX_GPS_PRN {
                continue;
            }

            if m.cn0_dbhz < self.cfg.receiver.min_cn0_dbhz || m.state & STATE_TOW_DECODED == 0 {
                debug!("{} - discarded (cn0={:.1}, state={:#x})", m.sv, m.cn0_dbhz, m.state);
                continue;
            }

            let adr_valid = m.accumulated_delta_range_state & ADR_STATE_VALID != 0;

            let measurement = GpsMeasurement {
                arrival_time_since_gps_week_ns,
                accumulated_delta_range_m: m.accumulated_delta_range_m,
                accumulated_delta_range_valid: adr_valid,
                accumulated_delta_range_uncertainty_m: m.accumulated_delta_range_uncertainty_m,
                pseudorange_rate_m_s: m.pseudorange_rate_m_s,
                pseudorange_rate_uncertainty_m_s: m.pseudorange_rate_uncertainty_m_s,
                cn0_dbhz: m.cn0_dbhz,
            };

            let inserted = useful
                .insert(m.sv, measurement)
                .and_then(|_| received_tow_ns.insert(m.sv, m.received_sv_time_ns));

            if let Err(e) = inserted {
                warn!("{}", e);
                useful.remove(m.sv);
            }
        }

        (useful, received_tow_ns)
    }

    /// Returns the [NavigationMessage] to use for these satellites: the decoded
    /// one, when it describes them all and has an ionospheric model, the
    /// assistance data otherwise.
    fn navigation_message(
        &mut self,
        visible: &[SV],
        now_ns: i64,
    ) -> Result<NavigationMessage, Error> {
        if let Some(nav) = &self.decoded_nav {
            if nav.iono.is_some() && visible.iter().all(|sv| nav.contains(*sv)) {
                return Ok(nav.clone());
            }
        }

        let refresh_ns = (self.cfg.receiver.assistance_refresh_s * 1.0E9) as i64;

        if let Some((nav, obtained_ns)) = &self.assisted_nav {
            if now_ns - obtained_ns <= refresh_ns {
                return Ok(nav.clone());
            }
        }

        let reference = self.reference.ok_or(Error::NoReferencePosition)?;

        let nav = self.assistance.navigation_message(&reference)?;

        if nav.is_empty() {
            return Err(Error::EmptyNavigationMessage);
        }

        info!(
            "assistance data: {} ephemerides [{}]",
            nav.ephemerides.len(),
            nav.ephemerides.iter().map(|eph| eph.sv).join(", ")
        );

        self.assisted_nav = Some((nav.clone(), now_ns));
        Ok(nav)
    }

    /// Processes one measurement epoch. Returns the new [PositionFix]
    /// or None when this epoch is skipped. On error, the last valid fix
    /// remains untouched.
    pub fn process(
        &mut self,
        clock: &ReceiverClock,
        measurements: &[RawMeasurement],
    ) -> Result<Option<PositionFix>, Error> {
        let gpst_ns = clock.gpst_nanoseconds();
        let rx_time = ReceiverTime::from_gpst_nanoseconds(gpst_ns.max(0) as u64);

        let (mut useful, mut received_tow_ns) =
            self.useful_measurements(rx_time.arrival_time_since_gps_week_ns, measurements);

        if useful.len() < self.cfg.solver.min_sv {
            debug!("{} - {} useful satellites", rx_time.tow_s(), useful.len());
            return Err(Error::NotEnoughSatellites);
        }

        let nav = self.navigation_message(&useful.satellites(), gpst_ns)?;

        // satellites the navigation message does not describe are excluded
        for sv in useful.satellites() {
            if !nav.contains(sv) {
                warn!("{}", Error::MissingEphemeris(sv));
                useful.remove(sv);
                received_tow_ns.remove(sv);
            }
        }

        if useful.len() < self.cfg.solver.min_sv {
            return Err(Error::NotEnoughSatellites);
        }

        if self.first_useful_epoch {
            self.first_useful_epoch = false;
            if self.cfg.receiver.skip_first_epoch {
                debug!("{} - first useful epoch: skipped", rx_time.tow_s());
                return Ok(None);
            }
        }

        let largest_tow_ns = received_tow_ns
            .iter()
            .map(|(_, tow_ns)| *tow_ns)
            .max()
            .unwrap_or_default();

        let ranges =
            pseudoranges_from_common_reception_time(&useful, &received_tow_ns, largest_tow_ns);

        let smoothed = self.smoother.update(&ranges);

        let solution = self
            .solver
            .solve(
                &nav,
                &smoothed,
                rx_time.tow_s(),
                rx_time.week,
                rx_time.day_of_year,
                &PositionSolution::default(),
            )
            .map_err(|e| {
                error!("{} - {}", rx_time.tow_s(), e);
                e
            })?;

        let fix = PositionFix::from(solution);

        info!(
            "{} - lat={:.7}° lon={:.7}° alt={:.2}m (north={:.2} east={:.2} up={:.2} m/s)",
            rx_time.tow_s(),
            fix.latitude_deg,
            fix.longitude_deg,
            fix.altitude_m,
            fix.velocity.north_m_s,
            fix.velocity.east_m_s,
            fix.velocity.up_m_s
        );

        self.fix = Some(fix.clone());
        Ok(Some(fix))
    }
}
