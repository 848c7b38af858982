//! Loop ("circle") detection
//!
//! A loop starts at a point `s` and closes at the first later point `e` that
//! comes back within `proximity_km` of it. Its length is the path travelled
//! from `s` to `e` and must reach `min_loop_distance_m`.
//!
//! With [`LoopSearch::FirstMatch`] the search ends at the first start point
//! that has any point close enough, whether or not that loop was long enough,
//! so at most one loop is reported. [`LoopSearch::AllLoops`] continues past
//! confirmed loops and skips proximity hits that are too short.
use tracing::debug;

use crate::config::{LoopParams, LoopSearch};
use crate::distance::geodesic_distance;
use crate::track_loader::TrackPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    pub start_index: usize,
    pub end_index: usize,
}

/// Find loops along a track.
///
/// # Arguments
/// * `points` - track points in recording order
/// * `distances` - cumulative distances in meters, aligned with `points`
/// * `params` - proximity (km), minimum loop length (m) and search mode
pub fn detect_circles(points: &[TrackPoint], distances: &[f64], params: &LoopParams) -> Vec<Circle> {
    let n = points.len().min(distances.len());
    let proximity_m = params.proximity_km * 1000.0;
    let mut visited = vec![false; n];
    let mut circles = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }

        let closing = (start + 1..n).find(|&end| {
            geodesic_distance(&points[start], &points[end]) < proximity_m
                && (params.search == LoopSearch::FirstMatch
                    || distances[end] - distances[start] >= params.min_loop_distance_m)
        });

        let Some(end) = closing else {
            continue;
        };

        let path_length = distances[end] - distances[start];
        if path_length >= params.min_loop_distance_m {
            visited[start..=end].iter_mut().for_each(|v| *v = true);
            circles.push(Circle {
                start_index: start,
                end_index: end,
            });
            debug!(
                "Loop {}..{} closes after {:.0}m",
                start, end, path_length
            );
        }

        if params.search == LoopSearch::FirstMatch {
            break;
        }
    }

    circles
}
