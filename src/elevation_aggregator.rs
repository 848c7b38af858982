//! Elevation Change Aggregation
//!
//! Cleans, smooths and then compares the smoothed profile at a fixed index
//! stride. Changes above the threshold count as ascent, changes below its
//! negative count as descent, everything in between is treated as noise.
//!
//! Usage:
//! ```rust
//! use gpx_altitude::config::ElevationParams;
//! use gpx_altitude::elevation_aggregator::calculate_elevation_changes;
//!
//! let summary = calculate_elevation_changes(&[100.0, 104.0, 109.0], &ElevationParams {
//!     sampling_step: 1,
//!     threshold_m: 0.0,
//!     window_size: 1,
//!     max_change_m: 50.0,
//! }).unwrap();
//! assert_eq!(summary.total_ascent, 9.0);
//! ```
use tracing::debug;

use crate::config::ElevationParams;
use crate::elevation_cleaner::handle_outliers;
use crate::elevation_smoother::smooth_elevations;
use crate::error::{AltitudeError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ElevationSummary {
    pub total_ascent: f64,
    pub total_descent: f64,
    /// Last minus first cleaned (unsmoothed) sample. Not necessarily
    /// `total_ascent - total_descent`.
    pub net_difference: f64,
    /// One entry per stride, `smoothed[i] - smoothed[i - step]`
    pub changes: Vec<f64>,
    pub cleaned: Vec<f64>,
    pub smoothed: Vec<f64>,
}

pub fn calculate_elevation_changes(
    elevations: &[f64],
    params: &ElevationParams,
) -> Result<ElevationSummary> {
    if elevations.is_empty() {
        return Err(AltitudeError::NoElevationData);
    }
    if params.sampling_step == 0 {
        return Err(AltitudeError::InvalidParameter(
            "sampling step must be at least 1".into(),
        ));
    }

    let cleaned = handle_outliers(elevations, params.max_change_m);
    let smoothed = smooth_elevations(&cleaned, params.window_size);

    let step = params.sampling_step;
    let threshold = params.threshold_m;
    let mut total_ascent = 0.0;
    let mut total_descent = 0.0;
    let mut changes = Vec::with_capacity(smoothed.len() / step);

    for i in (step..smoothed.len()).step_by(step) {
        let change = smoothed[i] - smoothed[i - step];
        changes.push(change);
        if change > threshold {
            total_ascent += change;
        } else if change < -threshold {
            total_descent += change.abs();
        }
    }

    let net_difference = cleaned[cleaned.len() - 1] - cleaned[0];

    debug!(
        "Elevation changes: {} strides of {}, ascent {:.1}m, descent {:.1}m",
        changes.len(),
        step,
        total_ascent,
        total_descent
    );

    Ok(ElevationSummary {
        total_ascent,
        total_descent,
        net_difference,
        changes,
        cleaned,
        smoothed,
    })
}
