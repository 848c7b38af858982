//! Outlier repair for GPS elevation samples
//!
//! One left-to-right pass. A sample that jumps more than `max_change_m` away
//! from its (already repaired) predecessor is replaced by the midpoint of its
//! neighbours, or by the predecessor when it is the last sample.
//!
//! Only the jumping sample itself is touched, so a run of two or more
//! consecutive outliers is only partly corrected by a single pass.
use tracing::debug;

pub fn handle_outliers(elevations: &[f64], max_change_m: f64) -> Vec<f64> {
    let mut cleaned = elevations.to_vec();
    let last = cleaned.len().saturating_sub(1);
    let mut corrected = 0;

    for i in 1..cleaned.len() {
        let change = (cleaned[i] - cleaned[i - 1]).abs();
        if change > max_change_m {
            cleaned[i] = if i < last {
                (cleaned[i - 1] + cleaned[i + 1]) / 2.0
            } else {
                cleaned[i - 1]
            };
            corrected += 1;
        }
    }

    if corrected > 0 {
        debug!(
            "Outlier repair: {} of {} samples exceeded {:.1}m",
            corrected,
            elevations.len(),
            max_change_m
        );
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_preserved() {
        for input in [vec![], vec![100.0], vec![100.0, 400.0], vec![1.0, 90.0, 2.0, 3.0]] {
            assert_eq!(handle_outliers(&input, 50.0).len(), input.len());
        }
    }

    #[test]
    fn test_single_spike_is_interpolated() {
        let cleaned = handle_outliers(&[100.0, 101.0, 300.0, 103.0, 104.0], 50.0);
        assert_eq!(cleaned, vec![100.0, 101.0, 102.0, 103.0, 104.0]);
    }

    #[test]
    fn test_last_sample_copies_predecessor() {
        let cleaned = handle_outliers(&[100.0, 101.0, 500.0], 50.0);
        assert_eq!(cleaned, vec![100.0, 101.0, 101.0]);
    }

    #[test]
    fn test_consecutive_outliers_are_only_partly_corrected() {
        // i=2 becomes (101 + 300) / 2 = 200.5, which is still > 50 away from
        // 101; i=3 then sees 300 - 200.5 = 99.5 and is averaged with 104.
        let cleaned = handle_outliers(&[100.0, 101.0, 300.0, 300.0, 104.0], 50.0);
        assert_eq!(cleaned[2], 200.5);
        assert_eq!(cleaned[3], (200.5 + 104.0) / 2.0);
        assert_eq!(cleaned[4], 104.0);
    }

    #[test]
    fn test_clean_data_is_a_fixed_point() {
        let data = vec![100.0, 120.0, 140.0, 135.0, 180.0, 150.0];
        let once = handle_outliers(&data, 50.0);
        assert_eq!(once, data);
        assert_eq!(handle_outliers(&once, 50.0), once);
    }

    #[test]
    fn test_change_equal_to_limit_is_kept() {
        let cleaned = handle_outliers(&[0.0, 50.0, 100.0], 50.0);
        assert_eq!(cleaned, vec![0.0, 50.0, 100.0]);
    }
}
