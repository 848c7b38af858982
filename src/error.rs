use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, analysing or exporting track data.
#[derive(Error, Debug)]
pub enum AltitudeError {
    #[error("input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("error parsing {}: ensure the file is valid GPX ({reason})", .path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("an error occurred while reading {}: {cause}", .path.display())]
    Unexpected { path: PathBuf, cause: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("track contains no points with elevation data")]
    NoElevationData,

    #[error("invalid grid shift file {}: {reason}", .path.display())]
    GridShift { path: PathBuf, reason: String },

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render chart: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, AltitudeError>;
