//! Daily audience curve
//!
//! The expected listener level over a day is modeled as a sum of Gaussian
//! bumps (morning drive, lunch, afternoon peak, evening), with distinct bump
//! sets for weekdays and weekends. The curve is sampled on a 5-minute grid,
//! min-max normalized to [0, 1] and cached for the lifetime of the
//! estimator. A floor-clamped inverted Gaussian centered near 02:30
//! suppresses the overnight hours without ever reaching zero.

use chrono::{Datelike, NaiveDate, Weekday};

/// Grid resolution: 5-minute steps over 24 hours, endpoints inclusive
const GRID_POINTS: usize = 24 * 12 + 1;

// ============================================================================
// Day Class
// ============================================================================

/// Weekday vs weekend, each with its own peak level and curve shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayClass {
    Weekday,
    Weekend,
}

impl DayClass {
    /// Classify a calendar date
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => Self::Weekend,
            _ => Self::Weekday,
        }
    }
}

// ============================================================================
// Curve Shapes
// ============================================================================

fn gauss(x: f64, mu: f64, sigma: f64, amp: f64) -> f64 {
    amp * (-0.5 * ((x - mu) / sigma).powi(2)).exp()
}

/// Weekday shape: morning drive, lunch, afternoon peak, smaller evening rise
fn weekday_shape(h: f64) -> f64 {
    gauss(h, 7.9, 1.2, 0.9)
        + gauss(h, 12.5, 1.3, 0.45)
        + gauss(h, 17.3, 1.3, 0.85)
        + gauss(h, 20.3, 1.8, 0.35)
}

/// Weekend shape: later ramp-up, strong afternoon
fn weekend_shape(h: f64) -> f64 {
    gauss(h, 10.0, 1.7, 0.35) + gauss(h, 14.0, 2.0, 0.95) + gauss(h, 19.5, 2.0, 0.55)
}

/// Overnight depressor, clamped to [0.2, 1.0] with its valley near 02:30
#[must_use]
pub fn night_depressor(h: f64) -> f64 {
    let valley = (-0.5 * ((h - 2.5) / 2.0).powi(2)).exp();
    (1.0 - 0.8 * valley).max(0.2)
}

// ============================================================================
// Day Curve
// ============================================================================

/// Normalized daily curve on a 5-minute grid
#[derive(Debug, Clone)]
pub struct DayCurve {
    values: Vec<f64>,
}

impl DayCurve {
    /// Build and normalize the curve for one day class
    #[must_use]
    pub fn build(class: DayClass) -> Self {
        let raw: Vec<f64> = (0..GRID_POINTS)
            .map(|i| {
                let h = i as f64 / 12.0;
                match class {
                    DayClass::Weekday => weekday_shape(h),
                    DayClass::Weekend => weekend_shape(h),
                }
            })
            .collect();

        Self {
            values: normalize(&raw),
        }
    }

    /// Normalized curve value at an hour-of-day position, nearest grid point
    #[must_use]
    pub fn value_at(&self, h: f64) -> f64 {
        let idx = (h * 12.0).round() as usize;
        self.values[idx.min(self.values.len() - 1)]
    }
}

/// Min-max normalize into [0, 1]; a flat input maps to all zeros
fn normalize(raw: &[f64]) -> Vec<f64> {
    let lo = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi <= lo {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|v| (v - lo) / (hi - lo)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_class_of() {
        // 2025-01-06 is a Monday, 2025-01-04 a Saturday
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        assert_eq!(DayClass::of(monday), DayClass::Weekday);
        assert_eq!(DayClass::of(saturday), DayClass::Weekend);
    }

    #[test]
    fn test_curve_is_normalized() {
        for class in [DayClass::Weekday, DayClass::Weekend] {
            let curve = DayCurve::build(class);
            let lo = curve.values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = curve
                .values
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((lo - 0.0).abs() < 1e-12);
            assert!((hi - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_weekday_morning_above_night() {
        let curve = DayCurve::build(DayClass::Weekday);
        assert!(curve.value_at(8.0) > curve.value_at(3.0));
    }

    #[test]
    fn test_weekend_afternoon_is_peak() {
        let curve = DayCurve::build(DayClass::Weekend);
        assert!((curve.value_at(14.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_night_depressor_bounds() {
        for i in 0..=288 {
            let h = i as f64 / 12.0;
            let d = night_depressor(h);
            assert!((0.2..=1.0).contains(&d), "depressor out of range at {h}");
        }
        // valley center is fully clamped
        assert!((night_depressor(2.5) - 0.2).abs() < 1e-9);
        // midday is essentially undepressed
        assert!(night_depressor(13.0) > 0.99);
    }

    #[test]
    fn test_value_at_clamps_end_of_day() {
        let curve = DayCurve::build(DayClass::Weekday);
        // 23:59 rounds past the last grid point
        let v = curve.value_at(23.99);
        assert!((0.0..=1.0).contains(&v));
    }
}
