#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod modeling;
pub use modeling::Modeling;

/// Pseudorange smoothing strategy
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SmoothingMethod {
    /// Raw pseudoranges are used as is
    None,
    /// Hatch filter, propagated with the pseudorange rate (doppler)
    #[default]
    Doppler,
    /// Hatch filter, propagated with the accumulated delta range when
    /// it is valid, falling back to doppler otherwise.
    CarrierPhase,
}

fn default_smoothing_window() -> usize {
    100
}

fn default_max_gap_s() -> f64 {
    1.0
}

fn default_min_sv() -> usize {
    4
}

/// Pseudorange smoothing configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothingConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub method: SmoothingMethod,
    /// Maximal number of samples averaged per satellite
    #[cfg_attr(feature = "serde", serde(default = "default_smoothing_window"))]
    pub window_size: usize,
    /// Maximal time gap (s) between two samples of one satellite.
    /// Larger gaps restart the average.
    #[cfg_attr(feature = "serde", serde(default = "default_max_gap_s"))]
    pub max_gap_s: f64,
    /// Minimal number of fully smoothed satellites. When fewer satellites
    /// reach the largest window, all windows are reset.
    #[cfg_attr(feature = "serde", serde(default = "default_min_sv"))]
    pub min_sv: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            method: SmoothingMethod::default(),
            window_size: default_smoothing_window(),
            max_gap_s: default_max_gap_s(),
            min_sv: default_min_sv(),
        }
    }
}

fn default_max_iterations() -> usize {
    100
}

fn default_convergence_m() -> f64 {
    4.0E-8
}

fn default_atmospheric_threshold_m() -> f64 {
    1000.0
}

fn default_max_residual_m() -> f64 {
    20.0
}

fn default_singular_covariance() -> f64 {
    1.0E-10
}

/// Weighted least squares solver options
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOpts {
    /// Minimal number of satellites (3D solutions only)
    #[cfg_attr(feature = "serde", serde(default = "default_min_sv"))]
    pub min_sv: usize,
    /// Maximal number of iterations per least squares run
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
    /// Convergence criterion: sum of absolute position corrections (m)
    #[cfg_attr(feature = "serde", serde(default = "default_convergence_m"))]
    pub convergence_m: f64,
    /// Atmospheric delays are modeled once the position correction
    /// drops below this value (m)
    #[cfg_attr(feature = "serde", serde(default = "default_atmospheric_threshold_m"))]
    pub atmospheric_threshold_m: f64,
    /// Satellites with larger absolute post-fit residual (m) are rejected
    #[cfg_attr(feature = "serde", serde(default = "default_max_residual_m"))]
    pub max_residual_m: f64,
    /// Covariance matrices with smaller determinant are considered singular
    /// and the solver falls back to ordinary least squares.
    #[cfg_attr(feature = "serde", serde(default = "default_singular_covariance"))]
    pub singular_covariance: f64,
}

impl Default for SolverOpts {
    fn default() -> Self {
        Self {
            min_sv: default_min_sv(),
            max_iterations: default_max_iterations(),
            convergence_m: default_convergence_m(),
            atmospheric_threshold_m: default_atmospheric_threshold_m(),
            max_residual_m: default_max_residual_m(),
            singular_covariance: default_singular_covariance(),
        }
    }
}

fn default_min_cn0_dbhz() -> f64 {
    18.0
}

fn default_assistance_refresh_s() -> f64 {
    1800.0
}

fn default_skip_first_epoch() -> bool {
    true
}

/// Receiver side (measurement selection) options
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceiverOpts {
    /// Measurements below this carrier to noise density ratio are discarded
    #[cfg_attr(feature = "serde", serde(default = "default_min_cn0_dbhz"))]
    pub min_cn0_dbhz: f64,
    /// Assistance data is requested again once older than this (s)
    #[cfg_attr(feature = "serde", serde(default = "default_assistance_refresh_s"))]
    pub assistance_refresh_s: f64,
    /// Discard the first useful epoch, whose reception time
    /// may not be accurate yet.
    #[cfg_attr(feature = "serde", serde(default = "default_skip_first_epoch"))]
    pub skip_first_epoch: bool,
}

impl Default for ReceiverOpts {
    fn default() -> Self {
        Self {
            min_cn0_dbhz: default_min_cn0_dbhz(),
            assistance_refresh_s: default_assistance_refresh_s(),
            skip_first_epoch: default_skip_first_epoch(),
        }
    }
}

/// Positioning [Config]
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Physical [Modeling] applied to the predicted pseudoranges
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,
    /// Pseudorange smoothing
    #[cfg_attr(feature = "serde", serde(default))]
    pub smoothing: SmoothingConfig,
    /// Solver customization
    #[cfg_attr(feature = "serde", serde(default))]
    pub solver: SolverOpts,
    /// Measurement selection and assistance
    #[cfg_attr(feature = "serde", serde(default))]
    pub receiver: ReceiverOpts,
}

impl Config {
    /// Copies and returns [Config] with updated [Modeling]
    pub fn with_modeling(&self, modeling: Modeling) -> Self {
        let mut s = *self;
        s.modeling = modeling;
        s
    }

    /// Copies and returns [Config] with desired [SmoothingMethod]
    pub fn with_smoothing_method(&self, method: SmoothingMethod) -> Self {
        let mut s = *self;
        s.smoothing.method = method;
        s
    }

    /// Copies and returns [Config] with a different carrier to noise mask
    pub fn with_min_cn0_dbhz(&self, min_cn0_dbhz: f64) -> Self {
        let mut s = *self;
        s.receiver.min_cn0_dbhz = min_cn0_dbhz;
        s
    }

    /// Copies and returns [Config] that (does not) skip the first epoch
    pub fn with_first_epoch_skipped(&self, skipped: bool) -> Self {
        let mut s = *self;
        s.receiver.skip_first_epoch = skipped;
        s
    }
}
