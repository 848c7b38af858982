//! Elevation statistics for GPX tracks.
//!
//! The pipeline loads the track points that carry an elevation, repairs
//! implausible jumps, smooths the profile, and sums ascent and descent over
//! a sampling stride. Cumulative geodesic distances and loop detection run on
//! the same points. Two converters write GPX elevations and NTv2 grid shift
//! nodes to CSV.
pub mod config;
pub mod csv_export;
pub mod distance;
pub mod elevation_aggregator;
pub mod elevation_cleaner;
pub mod elevation_smoother;
pub mod error;
pub mod grid_shift;
pub mod loop_detector;
pub mod profile_chart;
pub mod track_loader;

use std::path::Path;

use tracing::info;

pub use crate::config::{AnalysisConfig, ElevationParams, LoopParams, LoopSearch};
pub use crate::elevation_aggregator::ElevationSummary;
pub use crate::error::{AltitudeError, Result};
pub use crate::loop_detector::Circle;
pub use crate::track_loader::{Track, TrackPoint};

/// Everything computed for one track.
#[derive(Debug, Clone)]
pub struct TrackAnalysis {
    pub track: Track,
    pub elevation: ElevationSummary,
    /// Cumulative meters, aligned with the track points
    pub distances: Vec<f64>,
    pub circles: Vec<Circle>,
    pub average_spacing_m: f64,
}

/// Run the full analysis on an already loaded track.
pub fn analyze_track(track: Track, config: &AnalysisConfig) -> Result<TrackAnalysis> {
    config.validate()?;
    if track.is_empty() {
        return Err(AltitudeError::NoElevationData);
    }

    let elevation =
        elevation_aggregator::calculate_elevation_changes(track.elevations(), &config.elevation)?;
    let distances = distance::calculate_cumulative_distances(track.points());
    let circles = loop_detector::detect_circles(track.points(), &distances, &config.loops);
    let average_spacing_m = distance::average_spacing(&distances);

    info!(
        "Analysed {} points over {:.1}km: +{:.0}m / -{:.0}m, {} loop(s)",
        track.len(),
        distances.last().copied().unwrap_or(0.0) / 1000.0,
        elevation.total_ascent,
        elevation.total_descent,
        circles.len()
    );

    Ok(TrackAnalysis {
        track,
        elevation,
        distances,
        circles,
        average_spacing_m,
    })
}

/// Load a GPX file and analyse it. The configuration is checked before the
/// file is touched.
pub fn analyze_file(path: &Path, config: &AnalysisConfig) -> Result<TrackAnalysis> {
    config.validate()?;
    let track = track_loader::load_track(path)?;
    analyze_track(track, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_climb(count: usize) -> Track {
        let points = (0..count)
            .map(|i| TrackPoint {
                latitude: 46.5 + i as f64 * 0.0001,
                longitude: 7.9,
            })
            .collect();
        let elevations = (0..count).map(|i| 1000.0 + i as f64).collect();
        Track::new(points, elevations).unwrap().with_name("Climb")
    }

    #[test]
    fn test_analyze_straight_climb() {
        let config = AnalysisConfig {
            elevation: ElevationParams {
                sampling_step: 1,
                threshold_m: 0.0,
                window_size: 1,
                max_change_m: 50.0,
            },
            ..AnalysisConfig::default()
        };
        let analysis = analyze_track(straight_climb(21), &config).unwrap();

        assert_eq!(analysis.track.name.as_deref(), Some("Climb"));
        assert_eq!(analysis.elevation.total_ascent, 20.0);
        assert_eq!(analysis.elevation.total_descent, 0.0);
        assert_eq!(analysis.elevation.net_difference, 20.0);
        assert_eq!(analysis.distances.len(), 21);
        assert!((analysis.average_spacing_m - 11.1).abs() < 0.1);
        assert!(analysis.circles.is_empty());
    }

    #[test]
    fn test_empty_track_has_no_elevation_data() {
        let err = analyze_track(Track::default(), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AltitudeError::NoElevationData));
    }
}
