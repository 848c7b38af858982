//! Cumulative track distance on the WGS-84 ellipsoid.
use geo::{point, GeodesicDistance};

use crate::track_loader::TrackPoint;

/// Geodesic distance between two track points in meters.
pub fn geodesic_distance(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let point_a = point!(x: a.longitude, y: a.latitude);
    let point_b = point!(x: b.longitude, y: b.latitude);
    point_a.geodesic_distance(&point_b)
}

/// Distance from the first point to every point, in meters.
pub fn calculate_cumulative_distances(points: &[TrackPoint]) -> Vec<f64> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut distances = Vec::with_capacity(points.len());
    distances.push(0.0);

    for i in 1..points.len() {
        let segment_distance = geodesic_distance(&points[i - 1], &points[i]);
        distances.push(distances[i - 1] + segment_distance);
    }

    distances
}

/// Mean spacing between consecutive points, 0 for fewer than two points.
pub fn average_spacing(distances: &[f64]) -> f64 {
    match distances {
        [] | [_] => 0.0,
        [first, .., last] => (last - first) / (distances.len() - 1) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(latitude: f64, longitude: f64) -> TrackPoint {
        TrackPoint {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_latitude_step() {
        let distances = calculate_cumulative_distances(&[tp(50.0, 10.0), tp(50.001, 10.0)]);
        assert_eq!(distances[0], 0.0);
        assert!((distances[1] - 111.2).abs() < 0.5, "{}", distances[1]);
    }

    #[test]
    fn test_longitude_step() {
        let distances = calculate_cumulative_distances(&[tp(50.0, 10.0), tp(50.0, 10.001)]);
        assert_eq!(distances[0], 0.0);
        assert!((distances[1] - 71.7).abs() < 0.5, "{}", distances[1]);
    }

    #[test]
    fn test_distances_are_non_decreasing() {
        let points = vec![
            tp(48.38, 15.42),
            tp(48.38, 15.42),
            tp(48.381, 15.425),
            tp(48.379, 15.43),
            tp(48.38, 15.42),
        ];
        let distances = calculate_cumulative_distances(&points);
        assert_eq!(distances.len(), points.len());
        assert_eq!(distances[0], 0.0);
        assert!(distances[1].abs() < 1e-9);
        assert!(distances.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_empty_track() {
        assert!(calculate_cumulative_distances(&[]).is_empty());
        assert_eq!(average_spacing(&[]), 0.0);
        assert_eq!(average_spacing(&[0.0]), 0.0);
    }

    #[test]
    fn test_average_spacing() {
        assert_eq!(average_spacing(&[0.0, 10.0, 30.0]), 15.0);
    }
}
