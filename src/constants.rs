/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// Earth gravitational constant (m^3 s-2), as broadcast in ICD-GPS-200
pub const EARTH_GRAVITATION_MU_M3_S2: f64 = 3.986005E14;

/// Relativistic clock correction constant F (s.m^-1/2)
pub const RELATIVISTIC_F: f64 = -4.442807633E-10;

/// WGS84 Earth Frame Ellipsoid semi-major axis (meters)
pub const EARTH_SEMI_MAJOR_AXIS_WGS84: f64 = 6378137.0_f64;

/// WGS84 Earth Frame Ellipsoid semi-minor axis (meters)
pub const EARTH_SEMI_MINOR_AXIS_WGS84: f64 = 6356752.3142_f64;

/// GPS L1 carrier frequency (Hz)
pub const L1_FREQUENCY_HZ: f64 = 1575.42E6;

/// Highest GPS PRN we track
pub const MAX_GPS_PRN: u8 = 32;

/// Seconds in one GPS week
pub const SECONDS_PER_WEEK: u32 = 604_800;

/// Nanoseconds in one GPS week
pub const NANOS_PER_WEEK: i64 = SECONDS_PER_WEEK as i64 * 1_000_000_000;

/// Nanoseconds to seconds
pub const SECONDS_PER_NANO: f64 = 1.0E-9;
