//! Analysis parameters
//!
//! Defaults reproduce the reference profile run: sampling every 5th point,
//! 1 m noise threshold, 5-point smoothing and a 50 m outlier limit.
//! Values can be overridden from a TOML file with `[elevation]` and `[loops]`
//! tables and then again from the command line.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AltitudeError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationParams {
    /// Index stride between compared samples
    pub sampling_step: usize,
    /// Changes within +/- this many meters are ignored
    pub threshold_m: f64,
    /// Moving-average window length in samples
    pub window_size: usize,
    /// Largest plausible change between neighbouring samples in meters
    pub max_change_m: f64,
}

impl Default for ElevationParams {
    fn default() -> Self {
        ElevationParams {
            sampling_step: 5,
            threshold_m: 1.0,
            window_size: 5,
            max_change_m: 50.0,
        }
    }
}

/// How far the loop search goes after its first proximity hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopSearch {
    /// Stop after the first start point that has any nearby end point.
    #[default]
    FirstMatch,
    /// Keep searching after each confirmed loop.
    AllLoops,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopParams {
    /// Two points closer than this (kilometres) close a loop
    pub proximity_km: f64,
    /// Minimum path length of a loop in meters
    pub min_loop_distance_m: f64,
    pub search: LoopSearch,
}

impl Default for LoopParams {
    fn default() -> Self {
        LoopParams {
            proximity_km: 0.005,
            min_loop_distance_m: 3.0,
            search: LoopSearch::FirstMatch,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub elevation: ElevationParams,
    pub loops: LoopParams,
}

impl AnalysisConfig {
    /// Read a configuration file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AltitudeError::MissingFile(path.to_path_buf()));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        let parsed: AnalysisConfig = settings.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        let elevation = &self.elevation;
        if elevation.sampling_step == 0 {
            return Err(AltitudeError::InvalidParameter(
                "sampling step must be at least 1".into(),
            ));
        }
        if elevation.window_size == 0 {
            return Err(AltitudeError::InvalidParameter(
                "window size must be at least 1".into(),
            ));
        }
        check_non_negative("threshold", elevation.threshold_m)?;
        check_non_negative("max change", elevation.max_change_m)?;
        check_non_negative("minimum loop distance", self.loops.min_loop_distance_m)?;

        if !(self.loops.proximity_km.is_finite() && self.loops.proximity_km > 0.0) {
            return Err(AltitudeError::InvalidParameter(format!(
                "loop proximity must be a positive number of kilometres, got {}",
                self.loops.proximity_km
            )));
        }

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AltitudeError::InvalidParameter(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_match_reference_run() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.elevation.sampling_step, 5);
        assert_eq!(cfg.elevation.threshold_m, 1.0);
        assert_eq!(cfg.elevation.window_size, 5);
        assert_eq!(cfg.elevation.max_change_m, 50.0);
        assert_eq!(cfg.loops.proximity_km, 0.005);
        assert_eq!(cfg.loops.search, LoopSearch::FirstMatch);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_step_and_window() {
        let mut cfg = AnalysisConfig::default();
        cfg.elevation.sampling_step = 0;
        assert!(matches!(cfg.validate(), Err(AltitudeError::InvalidParameter(_))));

        let mut cfg = AnalysisConfig::default();
        cfg.elevation.window_size = 0;
        assert!(matches!(cfg.validate(), Err(AltitudeError::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut cfg = AnalysisConfig::default();
        cfg.elevation.threshold_m = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.elevation.max_change_m = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.loops.proximity_km = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let path = std::env::temp_dir().join(format!(
            "gpx_altitude_config_{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            "[elevation]\nsampling_step = 2\n\n[loops]\nmin_loop_distance_m = 3000.0\nsearch = \"all-loops\"\n",
        )
        .unwrap();

        let cfg = AnalysisConfig::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(cfg.elevation.sampling_step, 2);
        assert_eq!(cfg.elevation.window_size, 5);
        assert_eq!(cfg.loops.min_loop_distance_m, 3000.0);
        assert_eq!(cfg.loops.search, LoopSearch::AllLoops);
    }

    #[test]
    fn test_missing_config_file() {
        let err = AnalysisConfig::from_file(Path::new("/nonexistent/altitude.toml")).unwrap_err();
        assert!(matches!(err, AltitudeError::MissingFile(_)));
    }
}
