use crate::coords::{GeodeticCoordinates, Topocentric};

mod iono;
mod tropo;

pub use iono::KlobucharModel;
pub use tropo::TroposphereModel;

/// Modeled propagation delay
pub trait Bias {
    /// Delay (m), for this signal and this user to satellite geometry
    fn bias_m(&self, rtm: &BiasRuntime) -> f64;
}

/// Parameters of one bias evaluation: signal, epoch and geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BiasRuntime {
    /// GPS time of week (s), at transmission
    pub tow_s: f64,
    /// Day of year, between 1 and 366
    pub day_of_year: u16,
    /// User position
    pub user: GeodeticCoordinates,
    /// User altitude above mean sea level (m)
    pub altitude_above_sea_m: f64,
    /// Satellite, as seen from the user
    pub sv: Topocentric,
    /// Carrier frequency (Hz)
    pub frequency_hz: f64,
}

/// Terrain elevation provider. The troposphere model needs the altitude
/// above mean sea level, while positions are solved above the ellipsoid.
pub trait ElevationSource {
    /// Terrain elevation above mean sea level (m) at this location,
    /// None when unknown.
    fn elevation_above_sea_level_m(&self, latitude_deg: f64, longitude_deg: f64) -> Option<f64>;
}

/// [ElevationSource] that places every location at sea level
#[derive(Debug, Default, Copy, Clone)]
pub struct SeaLevel;

impl ElevationSource for SeaLevel {
    fn elevation_above_sea_level_m(&self, _: f64, _: f64) -> Option<f64> {
        Some(0.0)
    }
}
