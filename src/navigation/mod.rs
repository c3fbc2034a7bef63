use itertools::Itertools;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Matrix4, Vector3};

mod dop;
mod solutions;

pub use dop::DilutionOfPrecision;
pub use solutions::{PositionSolution, PvtUncertainty, WlsSolution};

use crate::{
    bias::{Bias, BiasRuntime, ElevationSource, TroposphereModel},
    cfg::Config,
    constants::{L1_FREQUENCY_HZ, SPEED_OF_LIGHT_M_S},
    coords::{ecef_to_topocentric, GeodeticCoordinates},
    ephemeris::{GpsEphemeris, NavigationMessage, SatelliteClock, SatelliteState},
    error::Error,
    measurement::RangeMeasurement,
    prelude::SV,
    satellite::SatelliteMap,
    time::GpsWeekTime,
};

/// Satellites that have both a measurement and an ephemeris
type Usable<'a> = SatelliteMap<(&'a RangeMeasurement, &'a GpsEphemeris)>;

/// Geoid height: difference between the ellipsoid altitude
/// and the altitude above mean sea level.
#[derive(Debug, Copy, Clone, PartialEq)]
enum GeoidHeight {
    /// Terrain elevation not requested yet
    Unknown,
    /// Terrain elevation (m) is known, awaiting a first solution
    Pending { elevation_m: f64 },
    /// Geoid height (m), kept for the lifetime of the solver
    Known(f64),
}

/// Residuals of the current estimate, one per usable satellite,
/// in increasing PRN order.
struct ResidualPass {
    satellites: Vec<SV>,
    positions_m: Vec<Vector3<f64>>,
    residuals_m: DVector<f64>,
    covariance_m2: DMatrix<f64>,
}

/// Builds the geometry matrix: one row per satellite, made of the unit vector
/// from satellite to user, and 1 (clock bias column).
fn geometry_matrix(positions_m: &[Vector3<f64>], user_m: &Vector3<f64>) -> DMatrix<f64> {
    let mut g = DMatrix::<f64>::zeros(positions_m.len(), 4);
    for (i, sv_m) in positions_m.iter().enumerate() {
        let los = user_m - sv_m;
        let norm = los.norm();
        g[(i, 0)] = los[0] / norm;
        g[(i, 1)] = los[1] / norm;
        g[(i, 2)] = los[2] / norm;
        g[(i, 3)] = 1.0;
    }
    g
}

/// Weight matrix, inverse of the measurement covariance. None when the
/// covariance is singular: ordinary least squares applies.
fn weight_matrix(covariance_m2: &DMatrix<f64>, epsilon: f64) -> Option<DMatrix<f64>> {
    let det = covariance_m2.clone().lu().determinant();
    if det < epsilon {
        warn!("singular covariance (det={:.3E}): unweighted least squares", det);
        return None;
    }
    covariance_m2.clone().try_inverse()
}

/// (Gᵗ W G)⁻¹ Gᵗ W residuals, W being identity when not provided
fn position_correction(
    g: &DMatrix<f64>,
    weight: Option<&DMatrix<f64>>,
    residuals_m: &DVector<f64>,
) -> Result<DVector<f64>, Error> {
    let g_t = g.transpose();

    let g_t_w = match weight {
        Some(w) => &g_t * w,
        None => g_t,
    };

    let h = (&g_t_w * g).try_inverse().ok_or(Error::MatrixInversion)?;

    Ok(h * g_t_w * residuals_m)
}

/// (Gᵗ diag(weights) G)⁻¹
fn normal_matrix_inverse(g: &DMatrix<f64>, weights: &[f64]) -> Option<Matrix4<f64>> {
    let mut n = Matrix4::<f64>::zeros();
    for (k, w) in weights.iter().enumerate() {
        for i in 0..4 {
            for j in 0..4 {
                n[(i, j)] += g[(k, i)] * w * g[(k, j)];
            }
        }
    }
    n.try_inverse()
}

/// Convergence criterion of the iterative least squares
fn correction_m(dx: &DVector<f64>) -> f64 {
    dx[0].abs() + dx[1].abs() + dx[2].abs()
}

/// Iterative weighted least squares solver
pub struct WlsSolver {
    pub(crate) cfg: Config,
    /// Terrain elevation provider
    elevation: Box<dyn ElevationSource>,
    geoid: GeoidHeight,
    troposphere: TroposphereModel,
}

impl WlsSolver {
    /// Builds a new [WlsSolver], using this [ElevationSource]
    /// to model the troposphere.
    pub fn new(cfg: &Config, elevation: Box<dyn ElevationSource>) -> Self {
        Self {
            cfg: *cfg,
            elevation,
            geoid: GeoidHeight::Unknown,
            troposphere: TroposphereModel::default(),
        }
    }

    /// Geoid height (m), once determined. It is determined
    /// on the first solution and then reused.
    pub fn geoid_height_m(&self) -> Option<f64> {
        match self.geoid {
            GeoidHeight::Known(geoid_m) => Some(geoid_m),
            _ => None,
        }
    }

    /// Solves position, velocity and clock state.
    ///
    /// ## Input
    /// - nav: [NavigationMessage] that should describe all the satellites
    /// - ranges: (smoothed) pseudorange measurements
    /// - rx_tow_s, rx_week: GPS time of reception
    /// - day_of_year: used by the troposphere model
    /// - initial: initial guess, the geocenter works
    pub fn solve(
        &mut self,
        nav: &NavigationMessage,
        ranges: &SatelliteMap<RangeMeasurement>,
        rx_tow_s: f64,
        rx_week: i32,
        day_of_year: u16,
        initial: &PositionSolution,
    ) -> Result<WlsSolution, Error> {
        let opts = self.cfg.solver;

        let mut usable: Usable = ranges
            .iter()
            .filter_map(|(sv, range)| match nav.ephemeris(sv) {
                Some(eph) => Some((sv, (range, eph))),
                None => {
                    warn!("{}", Error::MissingEphemeris(sv));
                    None
                },
            })
            .collect();

        if usable.len() < opts.min_sv {
            debug!(
                "{} - {} usable satellites: not enough",
                rx_tow_s,
                usable.len()
            );
            return Err(Error::NotEnoughSatellites);
        }

        let rx = GpsWeekTime::new(rx_week, rx_tow_s);
        let mut x = *initial;
        let mut iterations = 0;

        let (pass, g) = loop {
            let mut pass = self.residuals(nav, &usable, rx, day_of_year, &x, false)?;
            let mut g = geometry_matrix(&pass.positions_m, &x.position_m);

            let weight = weight_matrix(&pass.covariance_m2, opts.singular_covariance);

            let mut dx = position_correction(&g, weight.as_ref(), &pass.residuals_m)?;
            x.correct_position(&dx);
            iterations += 1;

            let mut atmospheric = false;
            let mut inner_iterations = 0;

            while correction_m(&dx) >= opts.convergence_m {
                if correction_m(&dx) < opts.atmospheric_threshold_m {
                    atmospheric = true;
                }

                pass = self.residuals(nav, &usable, rx, day_of_year, &x, atmospheric)?;
                g = geometry_matrix(&pass.positions_m, &x.position_m);

                dx = position_correction(&g, weight.as_ref(), &pass.residuals_m)?;
                x.correct_position(&dx);

                iterations += 1;
                inner_iterations += 1;

                debug!(
                    "{} - iteration #{} correction={:.3E}m clock={:.3}m",
                    rx_tow_s,
                    iterations,
                    correction_m(&dx),
                    x.clock_bias_m
                );

                if inner_iterations > opts.max_iterations {
                    return Err(Error::MaxIterationsReached);
                }
            }

            // post fit residuals rejection: we keep at least min_sv
            let mut remaining = pass.satellites.len();
            let mut rejected = Vec::<SV>::new();

            for (sv, residual_m) in pass.satellites.iter().zip(pass.residuals_m.iter()) {
                if remaining > opts.min_sv && residual_m.abs() > opts.max_residual_m {
                    rejected.push(*sv);
                    remaining -= 1;
                }
            }

            if rejected.is_empty() {
                break (pass, g);
            }

            debug!(
                "{} - rejected [{}]: residual above {}m",
                rx_tow_s,
                rejected.iter().join(", "),
                opts.max_residual_m
            );

            for sv in rejected {
                usable.remove(sv);
            }
        };

        let geo = x.geodetic();

        if let GeoidHeight::Pending { elevation_m } = self.geoid {
            let geoid_m = geo.altitude_m - elevation_m;
            debug!("{} - geoid height: {:.3}m", rx_tow_s, geoid_m);
            self.geoid = GeoidHeight::Known(geoid_m);
        }

        let (velocity_m_s, clock_drift_m_s) = self.velocity(&usable, rx, &x, &g)?;
        x.velocity_m_s = velocity_m_s;
        x.clock_drift_m_s = clock_drift_m_s;

        let pr_weights = usable
            .iter()
            .map(|(_, (range, _))| 1.0 / range.pseudorange_uncertainty_m)
            .collect::<Vec<_>>();

        let prr_weights = usable
            .iter()
            .map(|(_, (range, _))| 1.0 / range.measurement.pseudorange_rate_uncertainty_m_s)
            .collect::<Vec<_>>();

        let uncertainty = match (
            normal_matrix_inverse(&g, &pr_weights),
            normal_matrix_inverse(&g, &prr_weights),
        ) {
            (Some(h_pos), Some(h_vel)) => {
                let q_pos = dop::q_enu(&h_pos, geo.latitude_rad, geo.longitude_rad);
                let q_vel = dop::q_enu(&h_vel, geo.latitude_rad, geo.longitude_rad);
                Some(PvtUncertainty {
                    position_enu_m: q_pos.diagonal().map(f64::sqrt),
                    clock_bias_m: h_pos[(3, 3)].sqrt(),
                    velocity_enu_m_s: q_vel.diagonal().map(f64::sqrt),
                    clock_drift_m_s: h_vel[(3, 3)].sqrt(),
                })
            },
            _ => None,
        };

        let dop = normal_matrix_inverse(&g, &vec![1.0; pass.satellites.len()])
            .map(|q| DilutionOfPrecision::new(&q, geo.latitude_rad, geo.longitude_rad));

        debug!(
            "{} - solved lat={:.6}° lon={:.6}° alt={:.3}m in {} iterations with [{}]",
            rx_tow_s,
            geo.latitude_rad.to_degrees(),
            geo.longitude_rad.to_degrees(),
            geo.altitude_m,
            iterations,
            pass.satellites.iter().join(", ")
        );

        Ok(WlsSolution {
            solution: x,
            residuals_m: pass.residuals_m.iter().copied().collect(),
            satellites: pass.satellites,
            iterations,
            uncertainty,
            dop,
        })
    }

    /// Satellite states and pseudorange residuals, at current estimate
    fn residuals(
        &mut self,
        nav: &NavigationMessage,
        usable: &Usable,
        rx: GpsWeekTime,
        day_of_year: u16,
        x: &PositionSolution,
        atmospheric: bool,
    ) -> Result<ResidualPass, Error> {
        let modeling = self.cfg.modeling;
        let nb_sv = usable.len();
        let user_m = x.position_m;

        // reception time, in GPS time
        let rx = rx.offset_seconds(-x.clock_bias_m / SPEED_OF_LIGHT_M_S);

        let geo = if atmospheric {
            Some(x.geodetic())
        } else {
            None
        };

        let mut pass = ResidualPass {
            satellites: Vec::with_capacity(nb_sv),
            positions_m: Vec::with_capacity(nb_sv),
            residuals_m: DVector::zeros(nb_sv),
            covariance_m2: DMatrix::zeros(nb_sv, nb_sv),
        };

        for (k, (sv, &(range, eph))) in usable.iter().enumerate() {
            pass.covariance_m2[(k, k)] = range.pseudorange_uncertainty_m.powi(2);

            let t_sv = rx.transmission_time(range.pseudorange_m);
            let clock = SatelliteClock::resolve(eph, t_sv, &modeling)?;
            let state = SatelliteState::resolve(eph, &clock, &user_m, modeling.earth_rotation);

            let (iono_m, tropo_m) = match &geo {
                Some(geo) => self.atmospheric_delays_m(
                    nav,
                    geo,
                    &user_m,
                    &state.position_m,
                    clock.transmission_time.tow_s,
                    day_of_year,
                ),
                None => (0.0, 0.0),
            };

            let predicted_m = (state.position_m - user_m).norm() - clock.correction_m
                + iono_m
                + tropo_m
                + x.clock_bias_m;

            pass.residuals_m[k] = range.pseudorange_m - predicted_m;
            pass.satellites.push(sv);
            pass.positions_m.push(state.position_m);
        }

        Ok(pass)
    }

    /// Returns (iono, tropo) delays (m)
    fn atmospheric_delays_m(
        &mut self,
        nav: &NavigationMessage,
        geo: &GeodeticCoordinates,
        user_m: &Vector3<f64>,
        sv_m: &Vector3<f64>,
        tow_s: f64,
        day_of_year: u16,
    ) -> (f64, f64) {
        let modeling = self.cfg.modeling;

        let altitude_above_sea_m = if modeling.tropo_delay {
            self.altitude_above_sea_m(geo)
        } else {
            geo.altitude_m
        };

        let rtm = BiasRuntime {
            tow_s,
            day_of_year,
            user: *geo,
            altitude_above_sea_m,
            sv: ecef_to_topocentric(user_m, &(sv_m - user_m)),
            frequency_hz: L1_FREQUENCY_HZ,
        };

        let iono_m = match &nav.iono {
            Some(model) if modeling.iono_delay => model.bias_m(&rtm),
            _ => 0.0,
        };

        let tropo_m = if modeling.tropo_delay {
            self.troposphere.bias_m(&rtm)
        } else {
            0.0
        };

        (iono_m, tropo_m)
    }

    /// Altitude above mean sea level (m). Until the first solution, the
    /// terrain elevation is used. Then the ellipsoid altitude is corrected
    /// with the geoid height determined by that first solution.
    fn altitude_above_sea_m(&mut self, geo: &GeodeticCoordinates) -> f64 {
        match self.geoid {
            GeoidHeight::Known(geoid_m) => geo.altitude_m - geoid_m,
            GeoidHeight::Pending { elevation_m } => elevation_m,
            GeoidHeight::Unknown => {
                let lat_deg = geo.latitude_rad.to_degrees();
                let lon_deg = geo.longitude_rad.to_degrees();

                let elevation_m = match self
                    .elevation
                    .elevation_above_sea_level_m(lat_deg, lon_deg)
                {
                    Some(elevation_m) => elevation_m,
                    None => {
                        warn!(
                            "unknown terrain elevation at lat={:.3}° lon={:.3}°: using sea level",
                            lat_deg, lon_deg
                        );
                        0.0
                    },
                };

                self.geoid = GeoidHeight::Pending { elevation_m };
                elevation_m
            },
        }
    }

    /// Solves velocity and clock drift from the pseudorange rates,
    /// at converged position.
    fn velocity(
        &self,
        usable: &Usable,
        rx: GpsWeekTime,
        x: &PositionSolution,
        g: &DMatrix<f64>,
    ) -> Result<(Vector3<f64>, f64), Error> {
        let modeling = self.cfg.modeling;
        let nb_sv = usable.len();
        let rx = rx.offset_seconds(-x.clock_bias_m / SPEED_OF_LIGHT_M_S);

        let mut weighted_g = DMatrix::<f64>::zeros(nb_sv, 4);
        let mut weighted_delta = DVector::<f64>::zeros(nb_sv);

        for (k, (_, &(range, eph))) in usable.iter().enumerate() {
            let t_sv = rx.transmission_time(range.pseudorange_m);
            let clock = SatelliteClock::resolve(eph, t_sv, &modeling)?;
            let state =
                SatelliteState::resolve(eph, &clock, &x.position_m, modeling.earth_rotation);

            let los = Vector3::new(g[(k, 0)], g[(k, 1)], g[(k, 2)]);
            let range_rate_m_s = -state.velocity_m_s.dot(&los);

            let delta_m_s = range.measurement.pseudorange_rate_m_s - range_rate_m_s
                + clock.rate_correction_m_s;

            let weight = 1.0 / range.measurement.pseudorange_rate_uncertainty_m_s;

            for j in 0..4 {
                weighted_g[(k, j)] = weight * g[(k, j)];
            }
            weighted_delta[k] = weight * delta_m_s;
        }

        let qr = weighted_g.qr();
        let (q, r) = (qr.q(), qr.r());

        let v = r
            .solve_upper_triangular(&(q.transpose() * weighted_delta))
            .ok_or(Error::VelocitySolver)?;

        Ok((Vector3::new(v[0], v[1], v[2]), v[3]))
    }
}
