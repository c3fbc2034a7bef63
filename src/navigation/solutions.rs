//! Position solutions
use nalgebra::{DVector, Vector3};

use crate::{
    coords::{ecef_to_geodetic, ecef_velocity_to_enu, GeodeticCoordinates, NeuVelocity},
    navigation::DilutionOfPrecision,
    prelude::SV,
};

/// Position, velocity and clock state in ECEF.
/// Equivalent to the `[x, y, z, b, vx, vy, vz, b_dot]` vector.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PositionSolution {
    /// Position (m)
    pub position_m: Vector3<f64>,
    /// Receiver clock bias (m)
    pub clock_bias_m: f64,
    /// Velocity (m/s)
    pub velocity_m_s: Vector3<f64>,
    /// Receiver clock drift (m/s)
    pub clock_drift_m_s: f64,
}

impl PositionSolution {
    pub fn from_array(x: [f64; 8]) -> Self {
        Self {
            position_m: Vector3::new(x[0], x[1], x[2]),
            clock_bias_m: x[3],
            velocity_m_s: Vector3::new(x[4], x[5], x[6]),
            clock_drift_m_s: x[7],
        }
    }

    pub fn to_array(&self) -> [f64; 8] {
        [
            self.position_m[0],
            self.position_m[1],
            self.position_m[2],
            self.clock_bias_m,
            self.velocity_m_s[0],
            self.velocity_m_s[1],
            self.velocity_m_s[2],
            self.clock_drift_m_s,
        ]
    }

    /// Applies a (dx, dy, dz, db) correction
    pub(crate) fn correct_position(&mut self, dx: &DVector<f64>) {
        self.position_m += Vector3::new(dx[0], dx[1], dx[2]);
        self.clock_bias_m += dx[3];
    }

    /// Position, as geodetic coordinates
    pub fn geodetic(&self) -> GeodeticCoordinates {
        ecef_to_geodetic(self.position_m[0], self.position_m[1], self.position_m[2])
    }

    /// Velocity, in the local tangent plane
    pub fn local_velocity(&self) -> NeuVelocity {
        ecef_velocity_to_enu(&self.position_m, &self.velocity_m_s)
    }
}

/// Position, velocity and clock uncertainties (1 sigma).
/// Position and velocity are expressed in the local frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PvtUncertainty {
    /// (east, north, up) position uncertainty (m)
    pub position_enu_m: Vector3<f64>,
    /// Receiver clock bias uncertainty (m)
    pub clock_bias_m: f64,
    /// (east, north, up) velocity uncertainty (m/s)
    pub velocity_enu_m_s: Vector3<f64>,
    /// Receiver clock drift uncertainty (m/s)
    pub clock_drift_m_s: f64,
}

/// Least squares solution and its diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct WlsSolution {
    pub solution: PositionSolution,
    /// Satellites that contributed, in increasing PRN order
    pub satellites: Vec<SV>,
    /// Last pseudorange residuals (m), one per contributing satellite
    pub residuals_m: Vec<f64>,
    /// Total number of least squares iterations
    pub iterations: usize,
    /// Uncertainty of this solution, when the normal equations are invertible
    pub uncertainty: Option<PvtUncertainty>,
    /// Geometry of this solution
    pub dop: Option<DilutionOfPrecision>,
}
