//! Deterministic listener estimation
//!
//! Turns wall-clock time plus a stable seed key into a believable,
//! non-repeating listener count. The estimate is the daily audience curve
//! scaled into [night_min, peak], perturbed by two clipped Gaussian jitters
//! (a slow one stable per time bucket and song, a fast per-tick one), with
//! extra volatility and an absolute wiggle near the floor, and dithered
//! rounding so consecutive integers do not plateau.
//!
//! The whole pipeline is pure: identical (now, seed key, fast tick) inputs
//! against the same [`EstimatorConfig`] always produce the identical output.

pub mod curve;
pub mod jitter;

use chrono::{DateTime, Local, Timelike};

use crate::config::EstimatorConfig;
use curve::{night_depressor, DayClass, DayCurve};

/// Intermediate values of one estimation, exposed for diagnostics and tests
#[derive(Debug, Clone)]
pub struct EstimateDetail {
    /// Expected level from the daily curve, before jitter
    pub base: f64,

    /// Slow jitter after volatility scaling
    pub slow: f64,

    /// Fast jitter after volatility scaling
    pub fast: f64,

    /// Normalized position between floor and peak, 0 = floor, 1 = peak
    pub phase: f64,

    /// Volatility multiplier applied to both jitters
    pub volatility: f64,

    /// Value after composition and clamping, before dithered rounding
    pub clamped: f64,

    /// Final integer estimate
    pub value: u32,
}

/// Listener estimator with precomputed day curves
///
/// Construction samples and normalizes both day-class curves once; after
/// that the estimator is immutable and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct ListenerEstimator {
    config: EstimatorConfig,
    weekday: DayCurve,
    weekend: DayCurve,
}

impl ListenerEstimator {
    /// Build an estimator for the given configuration
    #[must_use]
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            weekday: DayCurve::build(DayClass::Weekday),
            weekend: DayCurve::build(DayClass::Weekend),
        }
    }

    /// Peak level for a day class
    #[must_use]
    pub fn peak_for(&self, class: DayClass) -> f64 {
        match class {
            DayClass::Weekday => self.config.weekday_peak,
            DayClass::Weekend => self.config.weekend_peak,
        }
    }

    /// Expected listener level from the daily curve, scaled into
    /// [night_min, peak] for the day class of `now`
    #[must_use]
    pub fn expected_base(&self, now: DateTime<Local>) -> f64 {
        let h = f64::from(now.hour()) + f64::from(now.minute()) / 60.0;
        let class = DayClass::of(now.date_naive());
        let curve = match class {
            DayClass::Weekday => &self.weekday,
            DayClass::Weekend => &self.weekend,
        };

        let floor = self.config.base_floor;
        let base01 = (floor + (1.0 - floor) * curve.value_at(h)) * night_depressor(h);
        let peak = self.peak_for(class);
        self.config.night_min + base01 * (peak - self.config.night_min)
    }

    /// Estimate the listener count at `now`
    ///
    /// `seed_key` is typically the song key; `fast_tick_ms` overrides the
    /// fast-jitter tick and defaults to the millisecond timestamp of `now`.
    #[must_use]
    pub fn estimate(
        &self,
        now: DateTime<Local>,
        seed_key: &str,
        fast_tick_ms: Option<i64>,
    ) -> u32 {
        self.estimate_detail(now, seed_key, fast_tick_ms).value
    }

    /// Estimate with the full intermediate breakdown
    #[must_use]
    pub fn estimate_detail(
        &self,
        now: DateTime<Local>,
        seed_key: &str,
        fast_tick_ms: Option<i64>,
    ) -> EstimateDetail {
        let cfg = &self.config;
        let base = self.expected_base(now);
        let peak = self.peak_for(DayClass::of(now.date_naive()));

        let epoch_secs = now.timestamp();
        let tick_ms = fast_tick_ms.unwrap_or_else(|| now.timestamp_millis());

        let mut slow = jitter::slow_jitter(
            seed_key,
            epoch_secs,
            cfg.slow_bucket_secs,
            cfg.slow_sigma,
            cfg.slow_clip,
        );
        let mut fast = jitter::fast_jitter(tick_ms, cfg.fast_sigma, cfg.fast_clip);

        // phase 0..1: 0 = at the floor, 1 = at the peak
        let phase = if peak > cfg.night_min {
            ((base - cfg.night_min) / (peak - cfg.night_min)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // amplify both jitters towards the floor
        let volatility = 1.0 + cfg.night_volatility * (1.0 - phase);
        slow *= volatility;
        fast *= volatility;

        // jitter applies to the above-floor portion only
        let above = (base - cfg.night_min).max(0.0);
        let mut value = cfg.night_min + above * (1.0 + slow + fast);

        // absolute wiggle, strong at the floor, gone at the peak
        if cfg.night_wiggle > 0.0 {
            value += cfg.night_wiggle * (1.0 - phase) * (slow + fast);
        }

        let clamped = value.clamp(cfg.night_min, peak);
        let rounded = jitter::dithered_round(
            clamped,
            seed_key,
            now.timestamp_millis() as f64 / 1000.0,
            cfg.dither_hz,
        );

        // the dither step may cross a fractional bound; the integer stays
        // inside [ceil(night_min), floor(peak)]
        let lo = cfg.night_min.ceil() as u32;
        let hi = (peak.floor() as u32).max(lo);

        EstimateDetail {
            base,
            slow,
            fast,
            phase,
            volatility,
            clamped,
            value: rounded.clamp(lo, hi),
        }
    }
}
