use nalgebra::{Matrix3, Matrix4};

/// Rotates the position block of a 4x4 (position, clock) covariance
/// matrix, from ECEF to the local (east, north, up) frame.
pub(crate) fn q_enu(mat: &Matrix4<f64>, lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    // columns: east, north, up unit vectors
    let r = Matrix3::<f64>::new(
        -sin_lon,
        -sin_lat * cos_lon,
        cos_lat * cos_lon,
        cos_lon,
        -sin_lat * sin_lon,
        cos_lat * sin_lon,
        0.0_f64,
        cos_lat,
        sin_lat,
    );

    let q_3 = mat.fixed_view::<3, 3>(0, 0).into_owned();

    r.transpose() * q_3 * r
}

/// Solution [DilutionOfPrecision]
#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,

    /// Position DOP
    pub pdop: f64,

    /// Horizontal DOP
    pub hdop: f64,

    /// Vertical DOP
    pub vdop: f64,

    /// Temporal DOP
    pub tdop: f64,
}

impl DilutionOfPrecision {
    /// Creates new [DilutionOfPrecision].
    ///
    /// ## Input
    /// - g_gt_inv = (Gᵗ.G)⁻¹ matrix
    /// - user latitude and longitude (rad)
    pub fn new(g_gt_inv: &Matrix4<f64>, lat_rad: f64, lon_rad: f64) -> Self {
        let q_enu = q_enu(g_gt_inv, lat_rad, lon_rad);

        Self {
            gdop: g_gt_inv.trace().sqrt(),
            pdop: (g_gt_inv[(0, 0)] + g_gt_inv[(1, 1)] + g_gt_inv[(2, 2)]).sqrt(),
            tdop: g_gt_inv[(3, 3)].sqrt(),
            vdop: q_enu[(2, 2)].sqrt(),
            hdop: (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn diagonal_covariance() {
        let q = Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, 4.0, 9.0, 16.0));

        // equator, longitude 0: east=y, north=z, up=x
        let dop = DilutionOfPrecision::new(&q, 0.0, 0.0);

        assert!((dop.gdop - 30.0_f64.sqrt()).abs() < 1.0E-12);
        assert!((dop.pdop - 14.0_f64.sqrt()).abs() < 1.0E-12);
        assert!((dop.tdop - 4.0).abs() < 1.0E-12);
        assert!((dop.vdop - 1.0).abs() < 1.0E-12);
        assert!((dop.hdop - 13.0_f64.sqrt()).abs() < 1.0E-12);

        // rotation preserves the trace
        let q_enu = q_enu(&q, 0.7, -2.1);
        assert!((q_enu.trace() - 14.0).abs() < 1.0E-12);
    }
}
