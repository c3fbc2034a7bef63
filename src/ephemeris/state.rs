use nalgebra::{Rotation3, Vector3};

use crate::{
    constants::{EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    ephemeris::{GpsEphemeris, SatelliteClock},
};

/// Satellite position and velocity, in ECEF at time of reception
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SatelliteState {
    /// Position (m)
    pub position_m: Vector3<f64>,
    /// Velocity (m/s)
    pub velocity_m_s: Vector3<f64>,
}

impl SatelliteState {
    /// Resolves the Keplerian state at the corrected transmission time of
    /// this [SatelliteClock]. When `earth_rotation` is set, the state is rotated
    /// into the ECEF frame at time of reception, by the Earth rotation during
    /// the signal transit towards `user_m`.
    pub fn resolve(
        eph: &GpsEphemeris,
        clock: &SatelliteClock,
        user_m: &Vector3<f64>,
        earth_rotation: bool,
    ) -> Self {
        let e = eph.eccentricity;
        let e_2 = e.powi(2);
        let a = eph.semi_major_axis_m;

        let (cus, cuc) = eph.cus_cuc_rad;
        let (cis, cic) = eph.cis_cic_rad;
        let (crs, crc) = eph.crs_crc_m;
        let (i0, idot) = (eph.i0_rad, eph.idot_rad_s);
        let (omega0, omega, omega_dot) = (eph.omega0_rad, eph.omega_rad, eph.omega_dot_rad_s);

        let t_k = clock.t_k_s;
        let e_k = clock.eccentric_anomaly_rad;

        let (sin_e_k, cos_e_k) = e_k.sin_cos();
        let v_k = ((1.0 - e_2).sqrt() * sin_e_k).atan2(cos_e_k - e);

        let phi = v_k + omega;
        let (sin_2phi, cos_2phi) = (2.0 * phi).sin_cos();

        let u_k = phi + cuc * cos_2phi + cus * sin_2phi;
        let r_k = a * (1.0 - e * cos_e_k) + crc * cos_2phi + crs * sin_2phi;
        let i_k = i0 + idot * t_k + cic * cos_2phi + cis * sin_2phi;
        let omega_k_dot = omega_dot - EARTH_ANGULAR_VEL_RAD;
        let omega_k = omega0 + omega_k_dot * t_k - EARTH_ANGULAR_VEL_RAD * eph.toe_s;

        let (sin_u_k, cos_u_k) = u_k.sin_cos();
        let (sin_i_k, cos_i_k) = i_k.sin_cos();
        let (sin_omega_k, cos_omega_k) = omega_k.sin_cos();

        // position in orbital plane
        let (x_p, y_p) = (r_k * cos_u_k, r_k * sin_u_k);

        let position_m = Vector3::new(
            x_p * cos_omega_k - y_p * cos_i_k * sin_omega_k,
            x_p * sin_omega_k + y_p * cos_i_k * cos_omega_k,
            y_p * sin_i_k,
        );

        // time derivatives
        let e_k_dot = eph.mean_motion_rad_s() / (1.0 - e * cos_e_k);
        let v_k_dot = e_k_dot * (1.0 - e_2).sqrt() / (1.0 - e * cos_e_k);
        let u_k_dot = v_k_dot * (1.0 + 2.0 * (cus * cos_2phi - cuc * sin_2phi));
        let r_k_dot = a * e * sin_e_k * e_k_dot + 2.0 * v_k_dot * (crs * cos_2phi - crc * sin_2phi);
        let i_k_dot = idot + 2.0 * v_k_dot * (cis * cos_2phi - cic * sin_2phi);

        let x_p_dot = r_k_dot * cos_u_k - r_k * u_k_dot * sin_u_k;
        let y_p_dot = r_k_dot * sin_u_k + r_k * u_k_dot * cos_u_k;

        let velocity_m_s = Vector3::new(
            x_p_dot * cos_omega_k - y_p_dot * cos_i_k * sin_omega_k
                + y_p * sin_i_k * sin_omega_k * i_k_dot
                - position_m[1] * omega_k_dot,
            x_p_dot * sin_omega_k + y_p_dot * cos_i_k * cos_omega_k
                - y_p * sin_i_k * cos_omega_k * i_k_dot
                + position_m[0] * omega_k_dot,
            y_p_dot * sin_i_k + y_p * cos_i_k * i_k_dot,
        );

        if !earth_rotation {
            return Self {
                position_m,
                velocity_m_s,
            };
        }

        // frame rotation during signal transit
        let transit_s = (position_m - user_m).norm() / SPEED_OF_LIGHT_M_S;
        let rot3 = Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            -EARTH_ANGULAR_VEL_RAD * transit_s,
        );

        Self {
            position_m: rot3 * position_m,
            velocity_m_s: rot3 * velocity_m_s,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cfg::Modeling,
        constants::EARTH_GRAVITATION_MU_M3_S2,
        prelude::{Constellation, SV},
        time::GpsWeekTime,
    };

    fn ephemeris() -> GpsEphemeris {
        GpsEphemeris {
            sv: SV::new(Constellation::GPS, 7),
            week: 2000,
            toe_s: 100_800.0,
            toc_s: 100_800.0,
            af0_s: 0.0,
            af1_s_s: 0.0,
            af2_s_s2: 0.0,
            tgd_s: 0.0,
            semi_major_axis_m: 26_560.0E3,
            eccentricity: 0.012,
            m0_rad: 0.3,
            i0_rad: 55.0_f64.to_radians(),
            idot_rad_s: 1.0E-10,
            dn_rad_s: 4.0E-9,
            omega0_rad: -1.2,
            omega_rad: 0.8,
            omega_dot_rad_s: -8.0E-9,
            cus_cuc_rad: (8.0E-6, -2.0E-6),
            cis_cic_rad: (1.0E-7, -5.0E-8),
            crs_crc_m: (-30.0, 250.0),
        }
    }

    fn state_at(eph: &GpsEphemeris, tow_s: f64, earth_rotation: bool) -> SatelliteState {
        let clock = SatelliteClock::resolve(
            eph,
            GpsWeekTime::new(eph.week, tow_s),
            &Modeling::no_modeling(),
        )
        .unwrap();

        SatelliteState::resolve(eph, &clock, &Vector3::zeros(), earth_rotation)
    }

    #[test]
    fn orbit_radius() {
        let eph = ephemeris();
        let circular = GpsEphemeris {
            eccentricity: 0.0,
            cus_cuc_rad: (0.0, 0.0),
            cis_cic_rad: (0.0, 0.0),
            crs_crc_m: (0.0, 0.0),
            dn_rad_s: 0.0,
            idot_rad_s: 0.0,
            omega_dot_rad_s: 0.0,
            ..eph
        };

        for dt_s in [-7200.0, 0.0, 3600.0] {
            let state = state_at(&circular, 100_800.0 + dt_s, false);
            assert!((state.position_m.norm() - 26_560.0E3).abs() < 1.0E-6);

            // in rotating frame: inertial velocity minus ωe × r
            let omega = Vector3::new(0.0, 0.0, EARTH_ANGULAR_VEL_RAD);
            let inertial = state.velocity_m_s + omega.cross(&state.position_m);
            let expected = (EARTH_GRAVITATION_MU_M3_S2 / 26_560.0E3).sqrt();
            assert!((inertial.norm() - expected).abs() < 1.0E-6);
        }
    }

    #[test]
    fn velocity_is_position_derivative() {
        let eph = ephemeris();

        for tow_s in [93_600.0, 100_800.0, 108_000.0] {
            let state = state_at(&eph, tow_s, false);
            let before = state_at(&eph, tow_s - 0.5, false);
            let after = state_at(&eph, tow_s + 0.5, false);

            let derivative = after.position_m - before.position_m;
            let error = (derivative - state.velocity_m_s).norm();
            assert!(error < 1.0E-3, "velocity error {} at {}", error, tow_s);
        }
    }

    #[test]
    fn earth_rotation_correction() {
        let eph = ephemeris();
        let fixed = state_at(&eph, 100_800.0, false);
        let rotated = state_at(&eph, 100_800.0, true);

        // rotation about z: preserves the norm and the z component
        assert!((fixed.position_m.norm() - rotated.position_m.norm()).abs() < 1.0E-6);
        assert!((fixed.position_m[2] - rotated.position_m[2]).abs() < 1.0E-9);

        // ~0.09 s transit from the geocenter: about 6.4E-6 rad
        let shift = (fixed.position_m - rotated.position_m).norm();
        assert!(shift > 1.0 && shift < 200.0, "shift={}", shift);
    }
}
