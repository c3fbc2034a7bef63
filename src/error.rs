use thiserror::Error;

use crate::prelude::SV;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Position solving requires at least 4 satellites with both
    /// a smoothed measurement and an ephemeris. We never degrade to 2D.
    #[error("not enough satellites: at least 4 are required (3D only)")]
    NotEnoughSatellites,

    /// The iterative least squares did not meet its tolerance
    /// within the maximal number of iterations.
    #[error("maximal number of least square iterations reached without convergence")]
    MaxIterationsReached,

    /// Satellite is visible but the navigation message does not
    /// describe it. This only excludes the satellite from the current epoch.
    #[error("{0}: missing ephemeris")]
    MissingEphemeris(SV),

    /// Only GPS satellites with PRN 1..=32 may be tracked.
    #[error("{0}: invalid satellite (GPS PRN 1..=32 only)")]
    InvalidSatellite(SV),

    /// Kepler equation did not converge for this satellite
    #[error("{0}: kepler solver failure")]
    KeplerSolver(SV),

    /// Normal equations (GᵗWG) could not be inverted, usually
    /// caused by a degenerate satellite geometry.
    #[error("failed to invert matrix")]
    MatrixInversion,

    /// Rank deficient velocity system.
    #[error("velocity solver failure (rank deficient system)")]
    VelocitySolver,

    /// Navigation message without ephemerides or ionospheric model.
    #[error("empty navigation message")]
    EmptyNavigationMessage,

    /// Assistance data provider failure.
    #[error("assistance data error: {0}")]
    Assistance(String),

    /// Assistance data is requested around a reference position, which
    /// has not been defined yet.
    #[error("no reference position: cannot request assistance data")]
    NoReferencePosition,
}
