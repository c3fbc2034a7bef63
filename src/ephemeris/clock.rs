use log::debug;

use crate::{
    cfg::Modeling,
    constants::{RELATIVISTIC_F, SPEED_OF_LIGHT_M_S},
    ephemeris::GpsEphemeris,
    error::Error,
    time::GpsWeekTime,
};

/// The clock correction depends on the eccentric anomaly, which depends
/// on the corrected time: this fixed point converges in a few iterations.
const CLOCK_ITERATIONS: usize = 5;

/// Satellite clock correction, at time of transmission
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SatelliteClock {
    /// Satellite clock offset to GPS time, expressed in meters.
    /// Includes the relativistic term and the group delay.
    pub correction_m: f64,
    /// Satellite clock drift (m/s)
    pub rate_correction_m_s: f64,
    /// Eccentric anomaly at corrected transmission time (rad)
    pub eccentric_anomaly_rad: f64,
    /// Corrected transmission time, elapsed since ToE (s)
    pub t_k_s: f64,
    /// Corrected transmission time, in GPS time
    pub transmission_time: GpsWeekTime,
}

impl SatelliteClock {
    /// Resolves the satellite clock, from the transmission time
    /// expressed in the satellite time frame
    /// (receiver time of reception minus pseudorange transit).
    pub fn resolve(
        eph: &GpsEphemeris,
        t_sv: GpsWeekTime,
        modeling: &Modeling,
    ) -> Result<Self, Error> {
        let e = eph.eccentricity;
        let sqrt_a = eph.semi_major_axis_m.sqrt();

        let t_k0 = t_sv.seconds_since(eph.week, eph.toe_s);
        let t_c0 = t_sv.seconds_since(eph.week, eph.toc_s);

        let mut dt_sv_s = 0.0_f64;
        let mut t_k = t_k0;
        let mut t_c = t_c0;
        let mut e_k = 0.0_f64;

        for _ in 0..CLOCK_ITERATIONS {
            t_k = t_k0 - dt_sv_s;
            t_c = t_c0 - dt_sv_s;
            e_k = eph.eccentric_anomaly_rad(t_k)?;

            dt_sv_s = 0.0;

            if modeling.sv_clock_bias {
                dt_sv_s += eph.af0_s + eph.af1_s_s * t_c + eph.af2_s_s2 * t_c.powi(2) - eph.tgd_s;
            }

            if modeling.relativistic_clock_bias {
                dt_sv_s += RELATIVISTIC_F * e * sqrt_a * e_k.sin();
            }
        }

        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let e_k_dot = eph.mean_motion_rad_s() / (1.0 - e * cos_e_k);

        let mut rate_s_s = 0.0_f64;

        if modeling.sv_clock_bias {
            rate_s_s += eph.af1_s_s + 2.0 * eph.af2_s_s2 * t_c;
        }

        if modeling.relativistic_clock_bias {
            rate_s_s += RELATIVISTIC_F * e * sqrt_a * cos_e_k * e_k_dot;
        }

        debug!(
            "{}({}) - clock correction={:.9}s drift={:.3E}s/s (E={:.6} sin={:.6})",
            t_sv.tow_s, eph.sv, dt_sv_s, rate_s_s, e_k, sin_e_k
        );

        Ok(Self {
            correction_m: dt_sv_s * SPEED_OF_LIGHT_M_S,
            rate_correction_m_s: rate_s_s * SPEED_OF_LIGHT_M_S,
            eccentric_anomaly_rad: e_k,
            t_k_s: t_k,
            transmission_time: t_sv.offset_seconds(-dt_sv_s),
        })
    }
}
