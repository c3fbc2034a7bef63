use std::f64::consts::PI;

use log::debug;

use crate::bias::{Bias, BiasRuntime};

/// Meteorological parameters, indexing the UNB3 look up tables
#[derive(Copy, Clone, Debug)]
enum MeteoParam {
    // pressure in mBar
    Pressure = 0,
    // temperature in Kelvin
    Temperature = 1,
    // water vapour pressure in mBar
    WaterVapourPressure = 2,
    // beta is temperature lapse rate (Kelvin/m)
    Beta = 3,
    // lambda is wvp height factor (N/A)
    Lambda = 4,
}

/// Annual averages, per latitude band
const AVERAGE_LUT: [(f64, [f64; 5]); 5] = [
    (15.0, [1013.25, 299.65, 26.31, 6.30E-3, 2.77]),
    (30.0, [1017.25, 294.15, 21.79, 6.05E-3, 3.15]),
    (45.0, [1015.75, 283.15, 11.66, 5.58E-3, 2.57]),
    (60.0, [1011.75, 272.15, 6.78, 5.39E-3, 1.81]),
    (75.0, [1013.00, 263.65, 4.11, 4.53E-3, 1.55]),
];

/// Seasonal variation amplitudes, per latitude band
const AMPLITUDE_LUT: [(f64, [f64; 5]); 5] = [
    (15.0, [0.0, 0.0, 0.0, 0.0, 0.0]),
    (30.0, [-3.75, 7.0, 8.85, 0.25E-3, 0.33]),
    (45.0, [-2.25, 11.0, 7.24, 0.32E-3, 0.46]),
    (60.0, [-1.75, 15.0, 5.36, 0.81E-3, 0.74]),
    (75.0, [-0.50, 14.5, 3.39, 0.62E-3, 0.30]),
];

const K_1: f64 = 77.604;
const K_2: f64 = 382000.0;
const R_D: f64 = 287.054;
const G: f64 = 9.80665;
const G_M: f64 = 9.784;

/// EGNOS (RTCA DO-229) obliquity factor, equals 1 at zenith
fn mapping(elevation_rad: f64) -> f64 {
    1.001 / (0.002001 + elevation_rad.sin().powi(2)).sqrt()
}

/// Troposphere delay model: EGNOS (RTCA DO-229) zenith delays,
/// based on the UNB3 meteorological tables, and DO-229 mapping.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TroposphereModel {}

impl TroposphereModel {
    /// Linear interpolation of one parameter, within the 15° latitude bands
    fn interpolate(lut: &[(f64, [f64; 5]); 5], prm: MeteoParam, abs_lat_deg: f64) -> f64 {
        let prm = prm as usize;

        if abs_lat_deg <= lut[0].0 {
            return lut[0].1[prm];
        }

        if abs_lat_deg >= lut[4].0 {
            return lut[4].1[prm];
        }

        let index = ((abs_lat_deg - lut[0].0) / 15.0).floor() as usize;
        let (lat_0, values_0) = lut[index];
        let (_, values_1) = lut[index + 1];

        values_0[prm] + (values_1[prm] - values_0[prm]) * (abs_lat_deg - lat_0) / 15.0
    }

    /// Seasonal value of one meteorological parameter
    fn parameter(prm: MeteoParam, latitude_deg: f64, day_of_year: u16) -> f64 {
        // day of minimal values, per hemisphere
        let d_min = if latitude_deg < 0.0 { 211.0 } else { 28.0 };

        let abs_lat_deg = latitude_deg.abs();
        let average = Self::interpolate(&AVERAGE_LUT, prm, abs_lat_deg);
        let amplitude = Self::interpolate(&AMPLITUDE_LUT, prm, abs_lat_deg);

        average - amplitude * (2.0 * PI * (day_of_year as f64 - d_min) / 365.25).cos()
    }

    /// Returns (hydrostatic, wet) zenith delays (m),
    /// at given altitude above mean sea level.
    pub fn zenith_delays_m(latitude_deg: f64, altitude_m: f64, day_of_year: u16) -> (f64, f64) {
        let p = Self::parameter(MeteoParam::Pressure, latitude_deg, day_of_year);
        let temp = Self::parameter(MeteoParam::Temperature, latitude_deg, day_of_year);
        let e = Self::parameter(MeteoParam::WaterVapourPressure, latitude_deg, day_of_year);
        let beta = Self::parameter(MeteoParam::Beta, latitude_deg, day_of_year);
        let lambda = Self::parameter(MeteoParam::Lambda, latitude_deg, day_of_year);

        let z0_hyd = 1.0E-6 * K_1 * R_D * p / G_M;
        let z0_wet = 1.0E-6 * K_2 * R_D / ((lambda + 1.0) * G_M - beta * R_D) * e / temp;

        let value = 1.0 - beta * altitude_m / temp;

        let z_hyd = value.powf(G / R_D / beta) * z0_hyd;
        let z_wet = value.powf((lambda + 1.0) * G / R_D / beta - 1.0) * z0_wet;

        debug!(
            "tropo - [beta: {:.3E}, p: {:.3}, temp: {:.3}, e: {:.3}, lambda: {:.3}] \
             zhd(h={:.3}) {:.3} zwd(h={:.3}) {:.3}",
            beta, p, temp, e, lambda, altitude_m, z_hyd, altitude_m, z_wet
        );

        (z_hyd, z_wet)
    }
}

impl Bias for TroposphereModel {
    fn bias_m(&self, rtm: &BiasRuntime) -> f64 {
        let (z_hyd, z_wet) = Self::zenith_delays_m(
            rtm.user.latitude_rad.to_degrees(),
            rtm.altitude_above_sea_m,
            rtm.day_of_year,
        );

        (z_hyd + z_wet) * mapping(rtm.sv.elevation_rad)
    }
}
