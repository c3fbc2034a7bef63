use crate::{bias::KlobucharModel, constants::EARTH_GRAVITATION_MU_M3_S2, error::Error, prelude::SV};

mod clock;
mod state;

pub use clock::SatelliteClock;
pub use state::SatelliteState;

/// Kepler equation: maximal number of Newton iterations
const KEPLER_MAX_ITER: usize = 10;

/// Kepler equation: convergence criterion on the eccentric anomaly (rad)
const KEPLER_TOLERANCE_RAD: f64 = 1.0E-12;

/// GPS broadcast ephemeris (ICD-GPS-200 LNAV subframes 1 to 3)
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GpsEphemeris {
    /// [SV]
    pub sv: SV,

    /// GPS week of ToE and ToC
    pub week: i32,

    /// Time of ephemeris (s of week)
    pub toe_s: f64,

    /// Time of clock (s of week)
    pub toc_s: f64,

    /// Clock bias (s)
    pub af0_s: f64,

    /// Clock drift (s/s)
    pub af1_s_s: f64,

    /// Clock drift rate (s/s²)
    pub af2_s_s2: f64,

    /// Total group delay (s)
    pub tgd_s: f64,

    /// Semi-major axis (in meters)
    pub semi_major_axis_m: f64,

    /// Eccentricity
    pub eccentricity: f64,

    /// m0 (in radians)
    pub m0_rad: f64,

    /// (in radians)
    pub i0_rad: f64,

    /// (in radians/s)
    pub idot_rad_s: f64,

    /// Mean motion correction (in radians/s)
    pub dn_rad_s: f64,

    /// (in radians)
    pub omega0_rad: f64,

    /// (in radians)
    pub omega_rad: f64,

    /// (in radians/s)
    pub omega_dot_rad_s: f64,

    /// Sine / Cosine (in radians)
    pub cus_cuc_rad: (f64, f64),

    /// Sine / Cosine (in radians)
    pub cis_cic_rad: (f64, f64),

    /// Sine / Cosine (in meters)
    pub crs_crc_m: (f64, f64),
}

impl GpsEphemeris {
    /// Corrected mean motion (rad/s)
    pub(crate) fn mean_motion_rad_s(&self) -> f64 {
        (EARTH_GRAVITATION_MU_M3_S2 / self.semi_major_axis_m.powi(3)).sqrt() + self.dn_rad_s
    }

    /// Solves Kepler's equation for the eccentric anomaly, `t_k` seconds after ToE.
    pub(crate) fn eccentric_anomaly_rad(&self, t_k: f64) -> Result<f64, Error> {
        let e = self.eccentricity;
        let m = self.m0_rad + self.mean_motion_rad_s() * t_k;

        let mut e_k = m;

        for _ in 0..KEPLER_MAX_ITER {
            let (sin_e_k, cos_e_k) = e_k.sin_cos();
            let delta = (e_k - e * sin_e_k - m) / (1.0 - e * cos_e_k);
            e_k -= delta;
            if delta.abs() < KEPLER_TOLERANCE_RAD {
                return Ok(e_k);
            }
        }

        Err(Error::KeplerSolver(self.sv))
    }
}

/// Decoded navigation message: ephemerides and ionospheric model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationMessage {
    /// One [GpsEphemeris] per satellite
    pub ephemerides: Vec<GpsEphemeris>,
    /// Broadcast ionospheric model, if known
    pub iono: Option<KlobucharModel>,
}

impl NavigationMessage {
    /// Returns [GpsEphemeris] of this [SV], if described
    pub fn ephemeris(&self, sv: SV) -> Option<&GpsEphemeris> {
        self.ephemerides.iter().find(|eph| eph.sv == sv)
    }

    /// True when this [NavigationMessage] describes this [SV]
    pub fn contains(&self, sv: SV) -> bool {
        self.ephemeris(sv).is_some()
    }

    /// True when this [NavigationMessage] carries no ephemeris at all
    pub fn is_empty(&self) -> bool {
        self.ephemerides.is_empty()
    }
}
