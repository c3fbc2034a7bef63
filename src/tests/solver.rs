use nalgebra::Vector3;
use rstest::*;

use crate::{
    bias::SeaLevel,
    cfg::{Config, Modeling},
    error::Error,
    navigation::{PositionSolution, WlsSolver},
    prelude::{Constellation, SV},
    tests::{
        init_logger, Scenario, DAY_OF_YEAR, FOUR_SATELLITES, KLOBUCHAR, RX_ALT_M, RX_LAT_DEG,
        RX_LON_DEG, TWELVE_SATELLITES,
    },
};

/// Geometry only: no clock, no atmosphere
fn geometric_modeling() -> Modeling {
    let mut modeling = Modeling::no_modeling();
    modeling.earth_rotation = true;
    modeling
}

fn solver(cfg: &Config) -> WlsSolver {
    WlsSolver::new(cfg, Box::new(SeaLevel))
}

#[fixture]
fn twelve_satellites() -> Scenario {
    Scenario::mountain_view(&TWELVE_SATELLITES).with_modeling(geometric_modeling())
}

#[fixture]
fn four_satellites() -> Scenario {
    Scenario::mountain_view(&FOUR_SATELLITES).with_modeling(geometric_modeling())
}

#[rstest]
fn four_satellites_from_geocenter(four_satellites: Scenario) {
    init_logger();

    let cfg = Config::default().with_modeling(geometric_modeling());
    let mut solver = solver(&cfg);

    let solution = solver
        .solve(
            &four_satellites.nav,
            &four_satellites.ranges(),
            four_satellites.rx.tow_s,
            four_satellites.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    let err_m = four_satellites.position_error_m(&solution.solution.position_m);
    assert!(err_m < 1.0E-3, "position error {}m", err_m);
    assert!(solution.iterations < 10, "{} iterations", solution.iterations);
    assert!(solution.solution.clock_bias_m.abs() < 1.0E-3);

    assert_eq!(solution.satellites, four_satellites.satellites());
    assert_eq!(solution.residuals_m.len(), 4);

    for residual_m in solution.residuals_m.iter() {
        assert!(residual_m.abs() < 1.0E-3);
    }

    let geo = solution.solution.geodetic();
    assert!((geo.latitude_rad.to_degrees() - RX_LAT_DEG).abs() < 1.0E-7);
    assert!((geo.longitude_rad.to_degrees() - RX_LON_DEG).abs() < 1.0E-7);
    assert!((geo.altitude_m - RX_ALT_M).abs() < 1.0E-3);
}

#[rstest]
#[case(0.0)]
#[case(1234.5)]
#[case(-85_000.0)]
fn receiver_clock_bias(twelve_satellites: Scenario, #[case] clock_bias_m: f64) {
    init_logger();

    let scenario = twelve_satellites.with_clock(clock_bias_m, 0.0);
    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &scenario.nav,
            &scenario.ranges(),
            scenario.rx.tow_s,
            scenario.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    assert!(scenario.position_error_m(&solution.solution.position_m) < 1.0E-3);
    assert!((solution.solution.clock_bias_m - clock_bias_m).abs() < 1.0E-3);
    assert_eq!(solution.satellites.len(), 12);
}

#[rstest]
fn outlier_rejection(twelve_satellites: Scenario) {
    init_logger();

    let scenario = twelve_satellites.with_offset(7, 50.0);
    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &scenario.nav,
            &scenario.ranges(),
            scenario.rx.tow_s,
            scenario.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    let g07 = SV::new(Constellation::GPS, 7);

    assert_eq!(solution.satellites.len(), 11);
    assert!(!solution.satellites.contains(&g07));

    // remaining satellites are error free
    assert!(scenario.position_error_m(&solution.solution.position_m) < 1.0E-3);

    for residual_m in solution.residuals_m.iter() {
        assert!(residual_m.abs() < 1.0E-3);
    }
}

#[rstest]
fn outlier_kept_with_minimal_geometry(four_satellites: Scenario) {
    init_logger();

    // no satellite can be rejected: the bias spreads over the solution
    let scenario = four_satellites.with_offset(1, 50.0);
    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &scenario.nav,
            &scenario.ranges(),
            scenario.rx.tow_s,
            scenario.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    assert_eq!(solution.satellites.len(), 4);
    assert!(scenario.position_error_m(&solution.solution.position_m) > 1.0);
}

#[rstest]
fn atmospheric_delays(twelve_satellites: Scenario) {
    init_logger();

    let scenario = twelve_satellites
        .with_modeling(Modeling::default())
        .with_iono(KLOBUCHAR);

    let cfg = Config::default();
    let mut solver = solver(&cfg);

    assert!(solver.geoid_height_m().is_none());

    for _ in 0..2 {
        let solution = solver
            .solve(
                &scenario.nav,
                &scenario.ranges(),
                scenario.rx.tow_s,
                scenario.rx.week,
                DAY_OF_YEAR,
                &PositionSolution::default(),
            )
            .unwrap();

        let err_m = scenario.position_error_m(&solution.solution.position_m);
        assert!(err_m < 1.0E-3, "position error {}m", err_m);

        // sea level terrain: geoid height is the ellipsoid altitude
        let geoid_m = solver.geoid_height_m().unwrap();
        assert!((geoid_m - RX_ALT_M).abs() < 1.0E-3);
    }
}

#[rstest]
fn unmodeled_atmosphere(twelve_satellites: Scenario) {
    init_logger();

    let scenario = twelve_satellites
        .with_modeling(Modeling::default())
        .with_iono(KLOBUCHAR);

    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &scenario.nav,
            &scenario.ranges(),
            scenario.rx.tow_s,
            scenario.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    // delays are mostly absorbed by the clock and the vertical component
    let err_m = scenario.position_error_m(&solution.solution.position_m);
    assert!(err_m > 1.0E-2, "position error {}m", err_m);
    assert!(solution.solution.clock_bias_m > 1.0);
}

#[rstest]
fn velocity_and_clock_drift(twelve_satellites: Scenario) {
    init_logger();

    let velocity_m_s = Vector3::new(10.0, -5.0, 2.0);

    let scenario = twelve_satellites
        .with_velocity(velocity_m_s)
        .with_clock(100.0, 0.5);

    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &scenario.nav,
            &scenario.ranges(),
            scenario.rx.tow_s,
            scenario.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    let err_m_s = (solution.solution.velocity_m_s - velocity_m_s).norm();
    assert!(err_m_s < 1.0E-3, "velocity error {}m/s", err_m_s);
    assert!((solution.solution.clock_drift_m_s - 0.5).abs() < 1.0E-3);

    let local = solution.solution.local_velocity();
    let speed_m_s =
        (local.north_m_s.powi(2) + local.east_m_s.powi(2) + local.up_m_s.powi(2)).sqrt();
    assert!((speed_m_s - velocity_m_s.norm()).abs() < 1.0E-3);
}

#[rstest]
fn uncertainty_and_dop(twelve_satellites: Scenario, four_satellites: Scenario) {
    init_logger();

    let cfg = Config::default().with_modeling(geometric_modeling());

    let mut gdops = Vec::new();

    for scenario in [twelve_satellites, four_satellites] {
        let solution = solver(&cfg)
            .solve(
                &scenario.nav,
                &scenario.ranges(),
                scenario.rx.tow_s,
                scenario.rx.week,
                DAY_OF_YEAR,
                &PositionSolution::default(),
            )
            .unwrap();

        let dop = solution.dop.unwrap();
        let uncertainty = solution.uncertainty.unwrap();

        assert!(dop.gdop > dop.pdop);
        assert!(dop.pdop > dop.hdop);
        assert!((dop.pdop.powi(2) - dop.hdop.powi(2) - dop.vdop.powi(2)).abs() < 1.0E-6);

        // pseudoranges: 1/σ=0.5 weights, pseudorange rates: 1/σ=10 weights
        let (e, n, u) = (
            uncertainty.position_enu_m[0],
            uncertainty.position_enu_m[1],
            uncertainty.position_enu_m[2],
        );
        assert!((e.powi(2) + n.powi(2) - 2.0 * dop.hdop.powi(2)).abs() < 1.0E-6);
        assert!((u.powi(2) - 2.0 * dop.vdop.powi(2)).abs() < 1.0E-6);

        let v_up = uncertainty.velocity_enu_m_s[2];
        assert!((v_up.powi(2) - dop.vdop.powi(2) / 10.0).abs() < 1.0E-6);

        let tdop_sq = dop.tdop.powi(2);
        assert!((uncertainty.clock_bias_m.powi(2) - 2.0 * tdop_sq).abs() < 1.0E-9 * tdop_sq);
        assert!((uncertainty.clock_drift_m_s.powi(2) - tdop_sq / 10.0).abs() < 1.0E-9 * tdop_sq);

        gdops.push(dop.gdop);
    }

    assert!(gdops[0] < gdops[1]);
}

#[rstest]
fn singular_covariance(twelve_satellites: Scenario) {
    init_logger();

    // determinant of the covariance falls below threshold
    let ranges = twelve_satellites
        .ranges()
        .map(|_, range| range.with_range(range.pseudorange_m, 0.01));

    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &twelve_satellites.nav,
            &ranges,
            twelve_satellites.rx.tow_s,
            twelve_satellites.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    assert!(twelve_satellites.position_error_m(&solution.solution.position_m) < 1.0E-3);
}

#[rstest]
fn missing_ephemeris(twelve_satellites: Scenario) {
    init_logger();

    let ranges = twelve_satellites.ranges();

    let g03 = SV::new(Constellation::GPS, 3);
    let mut nav = twelve_satellites.nav.clone();
    nav.ephemerides.retain(|eph| eph.sv != g03);

    let cfg = Config::default().with_modeling(geometric_modeling());

    let solution = solver(&cfg)
        .solve(
            &nav,
            &ranges,
            twelve_satellites.rx.tow_s,
            twelve_satellites.rx.week,
            DAY_OF_YEAR,
            &PositionSolution::default(),
        )
        .unwrap();

    assert_eq!(solution.satellites.len(), 11);
    assert!(!solution.satellites.contains(&g03));
    assert!(twelve_satellites.position_error_m(&solution.solution.position_m) < 1.0E-3);
}

#[rstest]
fn not_enough_satellites(four_satellites: Scenario) {
    init_logger();

    let cfg = Config::default().with_modeling(geometric_modeling());
    let mut solver = solver(&cfg);

    let mut ranges = four_satellites.ranges();
    ranges.remove(SV::new(Constellation::GPS, 2));

    let result = solver.solve(
        &four_satellites.nav,
        &ranges,
        four_satellites.rx.tow_s,
        four_satellites.rx.week,
        DAY_OF_YEAR,
        &PositionSolution::default(),
    );

    assert_eq!(result, Err(Error::NotEnoughSatellites));

    // four measurements, three ephemerides
    let mut nav = four_satellites.nav.clone();
    nav.ephemerides.pop();

    let result = solver.solve(
        &nav,
        &four_satellites.ranges(),
        four_satellites.rx.tow_s,
        four_satellites.rx.week,
        DAY_OF_YEAR,
        &PositionSolution::default(),
    );

    assert_eq!(result, Err(Error::NotEnoughSatellites));
}

#[rstest]
fn max_iterations(twelve_satellites: Scenario) {
    init_logger();

    let mut cfg = Config::default().with_modeling(geometric_modeling());
    cfg.solver.max_iterations = 1;

    let result = solver(&cfg).solve(
        &twelve_satellites.nav,
        &twelve_satellites.ranges(),
        twelve_satellites.rx.tow_s,
        twelve_satellites.rx.week,
        DAY_OF_YEAR,
        &PositionSolution::default(),
    );

    assert_eq!(result, Err(Error::MaxIterationsReached));
}
