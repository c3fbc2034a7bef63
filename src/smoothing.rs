use std::collections::VecDeque;

use log::{debug, error};

use crate::{
    cfg::{SmoothingConfig, SmoothingMethod},
    constants::SECONDS_PER_NANO,
    measurement::RangeMeasurement,
    prelude::SV,
    satellite::SatelliteMap,
    time::gps_time_diff_with_rollover_correction,
};

/// Pseudorange smoothing, epoch after epoch
pub trait PseudorangeSmoother {
    /// Smoothes this epoch. Returns the satellites that contribute to
    /// the solution, with their smoothed pseudorange.
    fn update(&mut self, ranges: &SatelliteMap<RangeMeasurement>) -> SatelliteMap<RangeMeasurement>;
}

/// Builds the [PseudorangeSmoother] described by this [SmoothingConfig]
pub fn smoother(cfg: &SmoothingConfig) -> Box<dyn PseudorangeSmoother> {
    match cfg.method {
        SmoothingMethod::None => Box::new(NoSmoothing),
        SmoothingMethod::Doppler | SmoothingMethod::CarrierPhase => Box::new(HatchFilter::new(cfg)),
    }
}

/// Raw pseudoranges pass through
#[derive(Debug, Default, Copy, Clone)]
pub struct NoSmoothing;

impl PseudorangeSmoother for NoSmoothing {
    fn update(
        &mut self,
        ranges: &SatelliteMap<RangeMeasurement>,
    ) -> SatelliteMap<RangeMeasurement> {
        ranges.clone()
    }
}

/// Per satellite smoothing state
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SmootherState {
    /// No sample
    Empty,
    /// Fewer samples than the most smoothed satellite: no output
    Accumulating,
    /// Contributes to the output
    Smoothing,
}

/// Hatch filter: pseudoranges are averaged over a sliding window, each
/// previous smoothed value being propagated to the current epoch with
/// the carrier phase (accumulated delta range) or the doppler.
pub struct HatchFilter {
    /// Propagate with carrier phase when possible
    carrier_phase: bool,
    /// Maximal number of averaged samples
    window_size: usize,
    /// Larger gaps restart the average
    max_gap_ns: i64,
    /// Minimal number of satellites in [SmootherState::Smoothing]
    min_sv: usize,
    /// Smoothed samples, most recent last
    windows: SatelliteMap<VecDeque<RangeMeasurement>>,
}

impl HatchFilter {
    pub fn new(cfg: &SmoothingConfig) -> Self {
        Self {
            carrier_phase: cfg.method == SmoothingMethod::CarrierPhase,
            window_size: cfg.window_size.max(1),
            max_gap_ns: (cfg.max_gap_s * 1.0E9) as i64,
            min_sv: cfg.min_sv,
            windows: SatelliteMap::new(),
        }
    }

    /// Current number of samples in the window of this [SV]
    pub fn samples(&self, sv: SV) -> usize {
        self.windows.get(sv).map(|w| w.len()).unwrap_or(0)
    }

    fn largest_window(&self) -> usize {
        self.windows.iter().map(|(_, w)| w.len()).max().unwrap_or(0)
    }

    /// [SmootherState] of this [SV]
    pub fn state(&self, sv: SV) -> SmootherState {
        match self.samples(sv) {
            0 => SmootherState::Empty,
            n if n == self.largest_window() => SmootherState::Smoothing,
            _ => SmootherState::Accumulating,
        }
    }

    /// Clears all windows
    pub fn reset(&mut self) {
        self.windows.clear();
    }

    /// Propagates the `previous` smoothed sample to the `current` epoch
    /// and averages it with the `current` raw pseudorange. Propagation and
    /// measurement noises are considered uncorrelated.
    fn propagate(
        carrier_phase: bool,
        previous: &RangeMeasurement,
        current: &RangeMeasurement,
        dt_s: f64,
        n: usize,
    ) -> RangeMeasurement {
        let (prev, cur) = (&previous.measurement, &current.measurement);

        let (delta_m, delta_var_m2) = if carrier_phase
            && prev.accumulated_delta_range_valid
            && cur.accumulated_delta_range_valid
        {
            (
                cur.accumulated_delta_range_m - prev.accumulated_delta_range_m,
                cur.accumulated_delta_range_uncertainty_m.powi(2)
                    + prev.accumulated_delta_range_uncertainty_m.powi(2),
            )
        } else {
            (
                cur.pseudorange_rate_m_s * dt_s,
                (cur.pseudorange_rate_uncertainty_m_s * dt_s).powi(2),
            )
        };

        let n = n as f64;
        let k = (n - 1.0) / n;

        let pseudorange_m = current.pseudorange_m / n + k * (previous.pseudorange_m + delta_m);

        let uncertainty_m = ((current.pseudorange_uncertainty_m / n).powi(2)
            + k.powi(2) * (previous.pseudorange_uncertainty_m.powi(2) + delta_var_m2))
            .sqrt();

        current.with_range(pseudorange_m, uncertainty_m)
    }
}

impl PseudorangeSmoother for HatchFilter {
    fn update(
        &mut self,
        ranges: &SatelliteMap<RangeMeasurement>,
    ) -> SatelliteMap<RangeMeasurement> {
        let (carrier_phase, window_size, max_gap_ns) =
            (self.carrier_phase, self.window_size, self.max_gap_ns);

        // lost satellites restart from scratch
        self.windows.retain(|sv, _| ranges.contains(sv));

        for (sv, range) in ranges.iter() {
            let Some(window) = self.windows.get_mut(sv) else {
                let mut window = VecDeque::with_capacity(window_size + 1);
                window.push_back(*range);
                if let Err(e) = self.windows.insert(sv, window) {
                    error!("{}", e);
                }
                continue;
            };

            let smoothed = match window.back() {
                Some(previous) => {
                    let dt_ns = gps_time_diff_with_rollover_correction(
                        previous.measurement.arrival_time_since_gps_week_ns,
                        range.measurement.arrival_time_since_gps_week_ns,
                    );

                    if dt_ns > max_gap_ns {
                        debug!("{} - smoothing gap {}ns: restarting", sv, dt_ns);
                        window.clear();
                        *range
                    } else {
                        let n = (window.len() + 1).min(window_size);
                        let dt_s = dt_ns as f64 * SECONDS_PER_NANO;
                        Self::propagate(carrier_phase, previous, range, dt_s, n)
                    }
                },
                None => *range,
            };

            window.push_back(smoothed);

            if window.len() > window_size {
                window.pop_front();
            }
        }

        let largest = self.largest_window();

        let smoothed = self
            .windows
            .iter()
            .filter(|(_, window)| window.len() == largest)
            .filter_map(|(sv, window)| window.back().map(|range| (sv, *range)))
            .collect::<SatelliteMap<_>>();

        if smoothed.len() < self.min_sv {
            debug!(
                "smoothing - only {} satellites with {} samples: reset",
                smoothed.len(),
                largest
            );
            self.reset();
            return ranges.clone();
        }

        smoothed
    }
}
