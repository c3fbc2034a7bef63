#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod bias;
mod cfg;
mod constants;
mod coords;
mod engine;
mod ephemeris;
mod error;
mod measurement;
mod navigation;
mod satellite;
mod smoothing;
mod time;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::bias::{
        Bias, BiasRuntime, ElevationSource, KlobucharModel, SeaLevel, TroposphereModel,
    };
    pub use crate::cfg::{
        Config, Modeling, ReceiverOpts, SmoothingConfig, SmoothingMethod, SolverOpts,
    };
    pub use crate::coords::{
        ecef_to_geodetic, ecef_to_topocentric, ecef_velocity_to_enu, geodetic_to_ecef,
        GeodeticCoordinates, NeuVelocity, Topocentric,
    };
    pub use crate::engine::{
        AssistanceSource, PositionEngine, PositionFix, RawMeasurement, ReceiverClock,
        ReferencePosition, ADR_STATE_VALID, STATE_TOW_DECODED,
    };
    pub use crate::ephemeris::{GpsEphemeris, NavigationMessage, SatelliteClock, SatelliteState};
    pub use crate::error::Error;
    pub use crate::measurement::{
        pseudorange_uncertainty_m, pseudoranges_from_common_reception_time, GpsMeasurement,
        RangeMeasurement,
    };
    pub use crate::navigation::{
        DilutionOfPrecision, PositionSolution, PvtUncertainty, WlsSolution, WlsSolver,
    };
    pub use crate::satellite::SatelliteMap;
    pub use crate::smoothing::{
        smoother, HatchFilter, NoSmoothing, PseudorangeSmoother, SmootherState,
    };
    pub use crate::time::{gps_time_diff_with_rollover_correction, GpsWeekTime, ReceiverTime};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::Epoch;
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
