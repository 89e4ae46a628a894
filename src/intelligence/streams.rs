// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Activity stream cleaning
//!
//! Turns raw Strava streams into chart-ready heart-rate and speed series:
//! speed derivation, outlier trimming, physiological clipping, uniform
//! resampling, smoothing and a pause mask. Values that cannot be computed are
//! carried as `NaN` internally and emitted as `None`.

use serde::Serialize;

use crate::config::SeriesSettings;
use crate::constants::limits::MS_TO_KMH;
use crate::models::ActivityStreams;

/// Cleaned series for one activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanSeries {
    /// Seconds since the activity start
    pub time_s: Vec<f64>,
    /// Beats per minute, `None` during pauses or when not recorded
    pub heartrate: Vec<Option<f64>>,
    /// km/h
    pub speed_kmh: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CleanSeries {
    fn empty(note: impl Into<String>) -> Self {
        Self {
            time_s: Vec::new(),
            heartrate: Vec::new(),
            speed_kmh: Vec::new(),
            note: Some(note.into()),
        }
    }
}

/// How the cleaned samples are laid out in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Uniform grid at `resample_hz`, smoothed
    Resampled,
    /// Every `n`th raw sample, unsmoothed
    Decimated(usize),
}

/// Numerical derivative of `y` with respect to `x`
///
/// Second-order differences on a non-uniform grid inside, first-order
/// one-sided differences at both ends. Fewer than two samples give zeros.
pub fn gradient(y: &[f64], x: &[f64]) -> Vec<f64> {
    let n = y.len().min(x.len());
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = vec![0.0; n];
    out[0] = (y[1] - y[0]) / (x[1] - x[0]);
    out[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        let hd = x[i] - x[i - 1];
        let hs = x[i + 1] - x[i];
        out[i] = (hd * hd * y[i + 1] + (hs * hs - hd * hd) * y[i] - hs * hs * y[i - 1])
            / (hd * hs * (hd + hs));
    }
    out
}

/// Speed in km/h: `velocity_smooth` when it is aligned with `time`, else the
/// gradient of distance over time
pub fn derive_speed_kmh(streams: &ActivityStreams, time: &[f64]) -> Option<Vec<f64>> {
    if let Some(velocity) = streams.velocity_smooth.as_ref().filter(|v| v.len() == time.len()) {
        return Some(velocity.iter().map(|v| v * MS_TO_KMH).collect());
    }
    let distance = streams.distance.as_ref().filter(|d| d.len() == time.len())?;
    Some(gradient(distance, time).into_iter().map(|v| v * MS_TO_KMH).collect())
}

/// Linear-interpolation percentile of the finite values, `pct` in 0..=100
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Clamp values to the `[pct, 100 - pct]` percentile range
pub fn winsorize(values: &mut [f64], pct: f64) {
    let (Some(low), Some(high)) = (percentile(values, pct), percentile(values, 100.0 - pct)) else {
        return;
    };
    clip(values, low, high);
}

/// Clamp every finite value to `[min, max]`; NaN stays NaN
pub fn clip(values: &mut [f64], min: f64, max: f64) {
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = v.clamp(min, max);
    }
}

/// Slack added to the grid end so a duration like 0.3 s at 10 Hz keeps its
/// last sample despite rounding
const GRID_EPSILON: f64 = 1e-9;

/// Uniform grid `[0, T]` at `hz` samples per second, where `T` is the span
/// of `time`
pub fn uniform_grid(time: &[f64], hz: f64) -> Vec<f64> {
    let (Some(&start), Some(&end)) = (time.first(), time.last()) else {
        return Vec::new();
    };
    if end <= start || hz <= 0.0 {
        return vec![0.0];
    }
    let count = ((end - start + GRID_EPSILON) * hz).ceil() as usize;
    (0..count).map(|i| i as f64 / hz).collect()
}

/// Piecewise-linear interpolation of `(x, y)` at `grid`, skipping NaN
/// samples and holding the end values outside the sampled range
pub fn interpolate(x: &[f64], y: &[f64], grid: &[f64]) -> Vec<f64> {
    let known: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(xi, yi)| xi.is_finite() && yi.is_finite())
        .map(|(xi, yi)| (*xi, *yi))
        .collect();

    let (Some(&(first_x, first_y)), Some(&(last_x, last_y))) = (known.first(), known.last()) else {
        return vec![f64::NAN; grid.len()];
    };

    let mut j = 0;
    grid.iter()
        .map(|&g| {
            if g <= first_x {
                return first_y;
            }
            if g >= last_x {
                return last_y;
            }
            while known[j + 1].0 < g {
                j += 1;
            }
            let (x0, y0) = known[j];
            let (x1, y1) = known[j + 1];
            if x1 == x0 {
                y1
            } else {
                y0 + (y1 - y0) * (g - x0) / (x1 - x0)
            }
        })
        .collect()
}

/// Centered moving average over `window` samples, zero-padded at the edges
/// so the output keeps the input length
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.is_empty() {
        return values.to_vec();
    }
    let n = values.len() as isize;
    let shift = ((window - 1) / 2) as isize;
    (0..n)
        .map(|i| {
            let sum: f64 = (0..window as isize)
                .map(|j| i + shift - j)
                .filter(|k| (0..n).contains(k))
                .map(|k| values[k as usize])
                .sum();
            sum / window as f64
        })
        .collect()
}

/// Every `step`th sample starting with the first
pub fn decimate(values: &[f64], step: usize) -> Vec<f64> {
    values.iter().step_by(step.max(1)).copied().collect()
}

fn to_options(values: Vec<f64>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| if v.is_finite() { Some(v) } else { None })
        .collect()
}

/// Run the whole cleaning pipeline on one activity's streams
pub fn clean_streams(
    streams: &ActivityStreams,
    settings: &SeriesSettings,
    sampling: Sampling,
) -> CleanSeries {
    let raw_time = streams.time.as_deref().unwrap_or_default();
    if raw_time.len() < 2 {
        return CleanSeries::empty("fewer than two time samples");
    }
    // elapsed seconds since the first sample
    let time: Vec<f64> = raw_time.iter().map(|t| t - raw_time[0]).collect();

    let nan_series = || vec![f64::NAN; time.len()];
    let mut speed = derive_speed_kmh(streams, &time).unwrap_or_else(nan_series);
    let mut heartrate = streams
        .heartrate
        .clone()
        .filter(|hr| hr.len() == time.len())
        .unwrap_or_else(nan_series);

    winsorize(&mut heartrate, settings.winsor_pct);
    clip(&mut heartrate, settings.hr_min, settings.hr_max);
    winsorize(&mut speed, settings.winsor_pct);
    clip(&mut speed, 0.0, settings.speed_max_kmh);

    let (time_s, heartrate, speed) = match sampling {
        Sampling::Decimated(step) => (
            decimate(&time, step),
            decimate(&heartrate, step),
            decimate(&speed, step),
        ),
        Sampling::Resampled => {
            let grid = uniform_grid(&time, settings.resample_hz);
            let window = (settings.smooth_win_s * settings.resample_hz).round().max(1.0) as usize;
            let heartrate = moving_average(&interpolate(&time, &heartrate, &grid), window);
            let speed = moving_average(&interpolate(&time, &speed, &grid), window);
            (grid, heartrate, speed)
        }
    };

    let heartrate = heartrate
        .iter()
        .zip(&speed)
        .map(|(hr, sp)| if *sp < settings.min_speed_kmh { f64::NAN } else { *hr })
        .collect();

    let note = if streams.heartrate.is_none() {
        Some("no heart-rate stream".to_string())
    } else {
        None
    };

    CleanSeries {
        time_s,
        heartrate: to_options(heartrate),
        speed_kmh: to_options(speed),
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_gradient_uniform_spacing() {
        let y = [0.0, 1.0, 4.0, 9.0];
        let x = [0.0, 1.0, 2.0, 3.0];
        assert_close(&gradient(&y, &x), &[1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_gradient_non_uniform_spacing() {
        // y = x^2 is differentiated exactly inside by the second-order formula
        let x = [0.0, 1.0, 3.0];
        let y = [0.0, 1.0, 9.0];
        let g = gradient(&y, &x);
        assert!((g[1] - 2.0).abs() < 1e-9);
        assert!((g[0] - 1.0).abs() < 1e-9);
        assert!((g[2] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_same_mode() {
        assert_close(&moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3), &[1.0, 2.0, 3.0, 4.0, 3.0]);
        assert_close(&moving_average(&[10.0; 5], 5), &[6.0, 8.0, 10.0, 8.0, 6.0]);
    }

    #[test]
    fn test_moving_average_even_window() {
        // offset (w - 1) / 2 = 1: out[i] = (x[i+1] + x[i] + x[i-1] + x[i-2]) / 4
        assert_close(&moving_average(&[4.0, 4.0, 4.0, 4.0], 4), &[2.0, 3.0, 4.0, 3.0]);
    }

    #[test]
    fn test_percentile_linear() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), Some(2.5));
        assert_eq!(percentile(&[3.0, f64::NAN, 1.0], 0.0), Some(1.0));
        assert_eq!(percentile(&[f64::NAN], 50.0), None);
    }

    #[test]
    fn test_winsorize_trims_spikes() {
        let mut values: Vec<f64> = (0..1000).map(|i| 100.0 + (i % 10) as f64).collect();
        values[500] = 400.0;
        winsorize(&mut values, 0.5);
        assert!(values.iter().all(|v| *v <= 109.0));
    }

    #[test]
    fn test_interpolate_skips_nan_and_holds_ends() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [f64::NAN, 10.0, 20.0, 40.0];
        let out = interpolate(&x, &y, &[0.0, 1.5, 3.0, 5.0]);
        assert_close(&out, &[10.0, 15.0, 30.0, 40.0]);
    }

    #[test]
    fn test_uniform_grid() {
        assert_close(&uniform_grid(&[0.0, 1.0, 3.5], 1.0), &[0.0, 1.0, 2.0, 3.0]);
        assert_close(&uniform_grid(&[0.0, 1.0], 2.0), &[0.0, 0.5, 1.0]);
        assert_close(&uniform_grid(&[5.0, 5.0], 1.0), &[0.0]);
    }

    #[test]
    fn test_uniform_grid_starts_at_zero() {
        assert_close(&uniform_grid(&[100.0, 101.0, 103.0], 1.0), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_uniform_grid_keeps_rounded_end() {
        // 0.3 * 10 is 2.9999999999999996 in binary floating point
        let grid = uniform_grid(&[0.0, 0.3], 10.0);
        assert_eq!(grid.len(), 4);
        assert!((grid[3] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_decimate() {
        assert_eq!(decimate(&[0.0, 1.0, 2.0, 3.0, 4.0], 2), vec![0.0, 2.0, 4.0]);
        assert_eq!(decimate(&[0.0, 1.0], 0), vec![0.0, 1.0]);
    }

    #[test]
    fn test_speed_from_distance_when_velocity_misaligned() {
        let streams = ActivityStreams {
            time: Some(vec![0.0, 1.0, 2.0]),
            distance: Some(vec![0.0, 3.0, 6.0]),
            velocity_smooth: Some(vec![1.0]),
            heartrate: None,
        };
        let speed = derive_speed_kmh(&streams, &[0.0, 1.0, 2.0]).unwrap();
        assert_close(&speed, &[10.8, 10.8, 10.8]);
    }

    #[test]
    fn test_short_activity_gets_note() {
        let streams = ActivityStreams {
            time: Some(vec![0.0]),
            distance: None,
            velocity_smooth: None,
            heartrate: None,
        };
        let series = clean_streams(&streams, &SeriesSettings::default(), Sampling::Resampled);
        assert!(series.time_s.is_empty());
        assert!(series.note.is_some());
    }

    #[test]
    fn test_pause_masks_heartrate() {
        let time: Vec<f64> = (0..20).map(f64::from).collect();
        let mut velocity = vec![3.0; 20];
        for v in &mut velocity[8..12] {
            *v = 0.0;
        }
        let streams = ActivityStreams {
            time: Some(time),
            distance: None,
            velocity_smooth: Some(velocity),
            heartrate: Some(vec![150.0; 20]),
        };
        let settings = SeriesSettings {
            winsor_pct: 0.0,
            ..SeriesSettings::default()
        };

        let series = clean_streams(&streams, &settings, Sampling::Decimated(1));
        assert_eq!(series.heartrate[9], None);
        assert_eq!(series.heartrate[2], Some(150.0));
        assert!((series.speed_kmh[2].unwrap() - 10.8).abs() < 1e-9);
    }

    #[test]
    fn test_resampled_series_has_uniform_time() {
        let streams = ActivityStreams {
            time: Some(vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]),
            distance: None,
            velocity_smooth: Some(vec![3.0; 6]),
            heartrate: Some(vec![140.0; 6]),
        };
        let series = clean_streams(&streams, &SeriesSettings::default(), Sampling::Resampled);
        assert_eq!(series.time_s.len(), 11);
        assert_eq!(series.speed_kmh.len(), 11);
        // interior samples are unaffected by zero padding
        let mid = series.speed_kmh[5].unwrap();
        assert!((mid - 10.8).abs() < 1e-9);
    }

    #[test]
    fn test_series_time_is_elapsed_seconds() {
        let streams = ActivityStreams {
            time: Some(vec![3600.0, 3601.0, 3602.0, 3603.0]),
            distance: None,
            velocity_smooth: Some(vec![3.0; 4]),
            heartrate: Some(vec![140.0; 4]),
        };
        let settings = SeriesSettings::default();

        let resampled = clean_streams(&streams, &settings, Sampling::Resampled);
        assert_close(&resampled.time_s, &[0.0, 1.0, 2.0, 3.0]);

        let decimated = clean_streams(&streams, &settings, Sampling::Decimated(2));
        assert_close(&decimated.time_s, &[0.0, 2.0]);
    }
}
