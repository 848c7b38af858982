//! Box-filter smoothing
//!
//! Same-length convolution with `window_size` taps of `1 / window_size`.
//! Samples outside the track count as zero, so the first and last
//! `window_size / 2` values are pulled towards zero. For an even window the
//! kernel reaches one sample further back than forward.

/// Moving average of `window_size` samples, same length as the input.
pub fn smooth_elevations(elevations: &[f64], window_size: usize) -> Vec<f64> {
    let n = elevations.len();
    if window_size == 0 || n == 0 {
        return elevations.to_vec();
    }

    let weight = 1.0 / window_size as f64;
    let offset = (window_size - 1) / 2;

    (0..n)
        .map(|i| {
            let hi = (i + offset + 1).min(n);
            let lo = (i + offset + 1).saturating_sub(window_size).min(hi);
            elevations[lo..hi].iter().map(|e| e * weight).sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_length_is_preserved() {
        for n in [0usize, 1, 2, 4, 5, 17] {
            let data: Vec<f64> = (0..n).map(|i| i as f64).collect();
            for w in [1usize, 2, 5, 8, 30] {
                assert_eq!(smooth_elevations(&data, w).len(), n);
            }
        }
    }

    #[test]
    fn test_constant_series_attenuates_only_at_edges() {
        let smoothed = smooth_elevations(&[200.0; 10], 5);
        assert_close(
            &smoothed,
            &[120.0, 160.0, 200.0, 200.0, 200.0, 200.0, 200.0, 200.0, 160.0, 120.0],
        );
    }

    #[test]
    fn test_odd_window_is_centred() {
        assert_close(&smooth_elevations(&[1.0, 2.0, 3.0], 3), &[1.0, 2.0, 5.0 / 3.0]);
    }

    #[test]
    fn test_even_window_leans_backwards() {
        // full convolution with ones(4): [1, 3, 6, 10, 14, 12, 9, 5], centre slice from 1
        let smoothed = smooth_elevations(&[1.0, 2.0, 3.0, 4.0, 5.0], 4);
        assert_close(&smoothed, &[0.75, 1.5, 2.5, 3.5, 3.0]);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let data = vec![3.0, -1.0, 7.5];
        assert_eq!(smooth_elevations(&data, 1), data);
    }
}
