//! Session analytics over a simulated BAC series.
//!
//! Finds the peak, decides whether the session went over the legal
//! threshold and, if so, when BAC falls back to it. When the series ends
//! before that happens the last sample is reported as a projection.

use crate::engine::SOBER_BAC;
use crate::{SessionAnalytics, SimulationPoint, ThresholdStatus};
use chrono::Duration;

/// Fixed legal reference BAC (percent)
pub const LEGAL_THRESHOLD_BAC: f64 = 0.05;

/// Derive peak and threshold facts from a series
///
/// Returns `None` for fewer than two samples; there is nothing to report.
pub fn analyze(points: &[SimulationPoint]) -> Option<SessionAnalytics> {
    if points.len() < 2 {
        return None;
    }

    // First occurrence wins on ties
    let mut peak_idx = 0;
    for (i, point) in points.iter().enumerate().skip(1) {
        if point.bac_percent > points[peak_idx].bac_percent {
            peak_idx = i;
        }
    }
    let peak = points[peak_idx];

    let status = if peak.bac_percent < LEGAL_THRESHOLD_BAC {
        ThresholdStatus::UnderThreshold
    } else {
        match points[peak_idx..]
            .iter()
            .find(|p| p.bac_percent <= LEGAL_THRESHOLD_BAC)
        {
            Some(crossing) => ThresholdStatus::OverThreshold {
                crossing_time_ms: crossing.time_ms,
                crossing_bac_percent: crossing.bac_percent,
                is_projected: false,
            },
            None => {
                let last = points[points.len() - 1];
                tracing::debug!(
                    "Series ended at {:.4} BAC before crossing the threshold, projecting",
                    last.bac_percent
                );
                ThresholdStatus::OverThreshold {
                    crossing_time_ms: last.time_ms,
                    crossing_bac_percent: last.bac_percent,
                    is_projected: true,
                }
            }
        }
    };

    Some(SessionAnalytics {
        peak_bac_percent: peak.bac_percent,
        peak_time_ms: peak.time_ms,
        status,
    })
}

/// Estimate BAC at an arbitrary instant
///
/// Linear interpolation between samples. Before the series starts there is
/// no estimate. After it ends, a sober tail reads as zero; a series cut off
/// by the horizon keeps its last value.
pub fn estimate_at(points: &[SimulationPoint], time_ms: i64) -> Option<f64> {
    let first = points.first()?;
    let last = points.last()?;

    if time_ms < first.time_ms {
        return None;
    }

    if time_ms >= last.time_ms {
        return Some(if last.bac_percent <= SOBER_BAC {
            0.0
        } else {
            last.bac_percent
        });
    }

    // Index of the first sample strictly after `time_ms`; always >= 1 here
    let upper = points.partition_point(|p| p.time_ms <= time_ms);
    let a = points[upper - 1];
    let b = points[upper];

    let span = (b.time_ms - a.time_ms) as f64;
    let t = (time_ms - a.time_ms) as f64 / span;
    Some(a.bac_percent + (b.bac_percent - a.bac_percent) * t)
}

impl SessionAnalytics {
    /// Time left until BAC is back at the threshold
    ///
    /// Zero once the crossing has passed; `None` when the session never went
    /// over the threshold.
    pub fn remaining_until_threshold(&self, now_ms: i64) -> Option<Duration> {
        let crossing = self.threshold_crossing_time_ms()?;
        Some(Duration::milliseconds((crossing - now_ms).max(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> Vec<SimulationPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &bac)| SimulationPoint {
                time_ms: i as i64 * 1000,
                bac_percent: bac,
            })
            .collect()
    }

    #[test]
    fn test_too_few_points() {
        assert!(analyze(&[]).is_none());
        assert!(analyze(&series(&[0.2])).is_none());
    }

    #[test]
    fn test_crossing_after_peak() {
        let points = series(&[0.01, 0.08, 0.06, 0.03]);
        let result = analyze(&points).unwrap();

        assert_eq!(result.peak_bac_percent, 0.08);
        assert_eq!(result.peak_time_ms, 1000);
        assert_eq!(
            result.status,
            ThresholdStatus::OverThreshold {
                crossing_time_ms: 3000,
                crossing_bac_percent: 0.03,
                is_projected: false,
            }
        );
    }

    #[test]
    fn test_under_threshold() {
        let result = analyze(&series(&[0.01, 0.02, 0.03])).unwrap();

        assert_eq!(result.peak_bac_percent, 0.03);
        assert_eq!(result.status, ThresholdStatus::UnderThreshold);
        assert_eq!(result.threshold_crossing_time_ms(), None);
    }

    #[test]
    fn test_projection_when_series_ends_high() {
        let result = analyze(&series(&[0.2, 0.15, 0.09])).unwrap();

        assert!(result.is_projected());
        assert_eq!(result.threshold_crossing_time_ms(), Some(2000));
    }

    #[test]
    fn test_crossing_exactly_at_threshold() {
        let result = analyze(&series(&[0.07, 0.05, 0.02])).unwrap();
        assert_eq!(result.threshold_crossing_time_ms(), Some(1000));
        assert!(!result.is_projected());
    }

    #[test]
    fn test_peak_exactly_at_threshold_is_over() {
        let result = analyze(&series(&[0.01, 0.05, 0.04])).unwrap();

        // The peak itself satisfies <= threshold
        assert_eq!(result.threshold_crossing_time_ms(), Some(1000));
    }

    #[test]
    fn test_first_peak_wins_on_ties() {
        let result = analyze(&series(&[0.06, 0.09, 0.04, 0.09, 0.01])).unwrap();

        assert_eq!(result.peak_time_ms, 1000);
        assert_eq!(result.threshold_crossing_time_ms(), Some(2000));
    }

    #[test]
    fn test_estimate_interpolates() {
        let points = series(&[0.0, 0.1, 0.04]);

        assert_eq!(estimate_at(&points, -1), None);
        assert_eq!(estimate_at(&points, 0), Some(0.0));
        assert_relative_eq!(estimate_at(&points, 500).unwrap(), 0.05);
        assert_relative_eq!(estimate_at(&points, 1000).unwrap(), 0.1);
        assert_relative_eq!(estimate_at(&points, 1250).unwrap(), 0.085, epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_after_series_end() {
        let sober = series(&[0.05, 0.02, 0.0005]);
        assert_eq!(estimate_at(&sober, 10_000), Some(0.0));

        let cut_off = series(&[0.3, 0.25, 0.2]);
        assert_eq!(estimate_at(&cut_off, 10_000), Some(0.2));

        assert_eq!(estimate_at(&[], 0), None);
    }

    #[test]
    fn test_remaining_until_threshold() {
        let result = analyze(&series(&[0.01, 0.08, 0.06, 0.03])).unwrap();

        assert_eq!(
            result.remaining_until_threshold(1000),
            Some(Duration::milliseconds(2000))
        );
        assert_eq!(
            result.remaining_until_threshold(5000),
            Some(Duration::zero())
        );

        let under = analyze(&series(&[0.01, 0.02])).unwrap();
        assert_eq!(under.remaining_until_threshold(0), None);
    }

    #[test]
    fn test_on_simulated_session() {
        use crate::{simulate, DrinkEvent, SimulationParameters};

        let mut drink = DrinkEvent::new("test", 100.0, 5.0, 0);
        drink.standard_drinks = 10.0;
        let points = simulate(&[drink], &SimulationParameters::default());
        let result = analyze(&points).unwrap();

        assert_eq!(result.peak_time_ms, 0);
        assert!(!result.is_projected());
        let crossing = result.threshold_crossing_time_ms().unwrap();
        let at_crossing = estimate_at(&points, crossing).unwrap();
        assert!(at_crossing <= LEGAL_THRESHOLD_BAC);
    }
}
