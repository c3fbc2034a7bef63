#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn default_sv_clock() -> bool {
    true
}

fn default_relativistic_clock() -> bool {
    true
}

fn default_iono_delay() -> bool {
    true
}

fn default_tropo_delay() -> bool {
    true
}

fn default_earth_rot() -> bool {
    true
}

/// Physical and atmospherical phenomena the pseudorange model accounts for
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modeling {
    /// Compensate for onboard clock offset to system time (+/- 300km),
    /// including the broadcast group delay.
    #[cfg_attr(feature = "serde", serde(default = "default_sv_clock"))]
    pub sv_clock_bias: bool,

    /// Compensate for relativistic effect on onboard clock (+/- 10m)
    #[cfg_attr(feature = "serde", serde(default = "default_relativistic_clock"))]
    pub relativistic_clock_bias: bool,

    /// Compensate for ionosphere delay, using the broadcast Klobuchar model (+/- 30m).
    /// Only effective when the navigation message carries the model.
    #[cfg_attr(feature = "serde", serde(default = "default_iono_delay"))]
    pub iono_delay: bool,

    /// Compensate for troposphere delay (+/- 20m)
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_delay"))]
    pub tropo_delay: bool,

    /// Compensate for Earth rotation during signal propagation
    /// (static +5/+10m eastern error).
    #[cfg_attr(feature = "serde", serde(default = "default_earth_rot"))]
    pub earth_rotation: bool,
}

impl Default for Modeling {
    fn default() -> Self {
        Self {
            sv_clock_bias: default_sv_clock(),
            relativistic_clock_bias: default_relativistic_clock(),
            iono_delay: default_iono_delay(),
            tropo_delay: default_tropo_delay(),
            earth_rotation: default_earth_rot(),
        }
    }
}

impl Modeling {
    /// Defines a null [Modeling] structure where no physical
    /// phenomenon is accounted for. This is not the default value!
    /// Use this for teaching or testing purposes only.
    pub fn no_modeling() -> Modeling {
        Modeling {
            sv_clock_bias: false,
            relativistic_clock_bias: false,
            iono_delay: false,
            tropo_delay: false,
            earth_rotation: false,
        }
    }
}
