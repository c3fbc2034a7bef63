use std::f64::consts::PI;

use crate::{
    bias::{Bias, BiasRuntime},
    constants::{L1_FREQUENCY_HZ, SPEED_OF_LIGHT_M_S},
};

/// Klobuchar Model, as broadcast in GPS subframe 4.
/// Coefficients are expressed in seconds and semi-circles.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct KlobucharModel {
    /// alpha coefficients (amplitude)
    pub alpha: [f64; 4],
    /// beta coefficients (period)
    pub beta: [f64; 4],
}

impl KlobucharModel {
    /// Ionospheric delay (s) on the carrier of this [BiasRuntime] (ICD-GPS-200 20.3.3.5.2.5).
    pub fn delay_s(&self, rtm: &BiasRuntime) -> f64 {
        // semi-circles
        let phi_u = rtm.user.latitude_rad / PI;
        let lambda_u = rtm.user.longitude_rad / PI;
        let elev = rtm.sv.elevation_rad / PI;
        let azim_rad = rtm.sv.azimuth_rad;

        // earth centered angle
        let psi = 0.0137 / (elev + 0.11) - 0.022;

        // ionospheric pierce point
        let phi_i = (phi_u + psi * azim_rad.cos()).clamp(-0.416, 0.416);
        let lambda_i = lambda_u + psi * azim_rad.sin() / (phi_i * PI).cos();

        // geomagnetic latitude
        let phi_m = phi_i + 0.064 * ((lambda_i - 1.617) * PI).cos();

        // local time
        let t_s = (4.32E4 * lambda_i + rtm.tow_s).rem_euclid(86_400.0);

        let amplitude = polynomial(&self.alpha, phi_m).max(0.0);
        let period = polynomial(&self.beta, phi_m).max(72_000.0);

        let x = 2.0 * PI * (t_s - 50_400.0) / period;

        // obliquity factor
        let f = 1.0 + 16.0 * (0.53 - elev).powi(3);

        let delay_l1_s = if x.abs() < 1.57 {
            f * (5.0E-9 + amplitude * (1.0 - x.powi(2) / 2.0 + x.powi(4) / 24.0))
        } else {
            f * 5.0E-9
        };

        delay_l1_s * (L1_FREQUENCY_HZ / rtm.frequency_hz).powi(2)
    }
}

fn polynomial(coefficients: &[f64; 4], phi_m: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, coefficient| acc * phi_m + coefficient)
}

impl Bias for KlobucharModel {
    fn bias_m(&self, rtm: &BiasRuntime) -> f64 {
        self.delay_s(rtm) * SPEED_OF_LIGHT_M_S
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coords::{GeodeticCoordinates, Topocentric};

    fn runtime(tow_s: f64, elevation_deg: f64, frequency_hz: f64) -> BiasRuntime {
        BiasRuntime {
            tow_s,
            day_of_year: 100,
            user: GeodeticCoordinates::default(),
            altitude_above_sea_m: 0.0,
            sv: Topocentric {
                elevation_rad: elevation_deg.to_radians(),
                azimuth_rad: 0.0,
                range_m: 20_000.0E3,
            },
            frequency_hz,
        }
    }

    #[test]
    fn night_time_delay() {
        let model = KlobucharModel {
            alpha: [0.0; 4],
            beta: [100_000.0, 0.0, 0.0, 0.0],
        };

        // constant 5ns, scaled by the obliquity factor
        let delay = model.delay_s(&runtime(0.0, 90.0, L1_FREQUENCY_HZ));
        let f = 1.0 + 16.0 * 0.03_f64.powi(3);
        assert!((delay - f * 5.0E-9).abs() < 1.0E-15);

        // slant path is longer
        let low = model.delay_s(&runtime(0.0, 10.0, L1_FREQUENCY_HZ));
        assert!(low > 2.0 * delay);
    }

    #[test]
    fn daytime_peak() {
        let model = KlobucharModel {
            alpha: [1.0E-8, 0.0, 0.0, 0.0],
            beta: [100_000.0, 0.0, 0.0, 0.0],
        };

        // 14h local time at longitude 0
        let peak = model.delay_s(&runtime(50_400.0, 90.0, L1_FREQUENCY_HZ));
        let f = 1.0 + 16.0 * 0.03_f64.powi(3);
        assert!((peak - f * 1.5E-8).abs() < 1.0E-15);

        // a few hours later, one day later
        let later = model.delay_s(&runtime(86_400.0 + 50_400.0 + 7_200.0, 90.0, L1_FREQUENCY_HZ));
        assert!(later < peak);
        assert!(later > f * 5.0E-9);

        let bias_m = model.bias_m(&runtime(50_400.0, 90.0, L1_FREQUENCY_HZ));
        assert!((bias_m - peak * SPEED_OF_LIGHT_M_S).abs() < 1.0E-9);
    }

    #[test]
    fn frequency_scaling() {
        let model = KlobucharModel {
            alpha: [1.0E-8, 0.0, 0.0, 0.0],
            beta: [100_000.0, 0.0, 0.0, 0.0],
        };

        let l1 = model.delay_s(&runtime(50_400.0, 45.0, L1_FREQUENCY_HZ));
        let l5 = model.delay_s(&runtime(50_400.0, 45.0, 1176.45E6));
        assert!((l5 / l1 - (1575.42_f64 / 1176.45).powi(2)).abs() < 1.0E-9);
    }
}
