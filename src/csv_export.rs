//! CSV converters
//!
//! `Elevation` column export of every `<ele>` text in a GPX file, and the
//! `Longitude,Latitude,Delta_Latitude,Delta_Longitude,Accuracy` export of a
//! grid shift file.
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::grid_shift::{GridNode, GridShiftReader};
use crate::track_loader::load_elevation_texts;

pub const DEFAULT_ELEVATIONS_FILE: &str = "elevations.csv";
pub const DEFAULT_GRID_FILE: &str = "Altitude_data.csv";

#[derive(Debug, Serialize)]
struct ElevationRecord<'a> {
    #[serde(rename = "Elevation")]
    elevation: &'a str,
}

#[derive(Debug, Serialize)]
struct GridRecord {
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Delta_Latitude")]
    delta_latitude: f64,
    #[serde(rename = "Delta_Longitude")]
    delta_longitude: f64,
    #[serde(rename = "Accuracy")]
    accuracy: f64,
}

impl From<&GridNode> for GridRecord {
    fn from(node: &GridNode) -> Self {
        GridRecord {
            longitude: node.longitude,
            latitude: node.latitude,
            delta_latitude: node.delta_latitude,
            delta_longitude: node.delta_longitude,
            accuracy: node.accuracy(),
        }
    }
}

/// Relative output names are placed next to the input file.
pub fn resolve_output(input: &Path, output: &Path) -> PathBuf {
    match input.parent() {
        Some(dir) => dir.join(output),
        None => output.to_path_buf(),
    }
}

/// Values are written as given, so the converter never reformats numbers.
pub fn write_elevations_csv<S: AsRef<str>, W: Write>(elevations: &[S], writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    if elevations.is_empty() {
        wtr.write_record(["Elevation"])?;
    }
    for elevation in elevations {
        wtr.serialize(ElevationRecord {
            elevation: elevation.as_ref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_grid_csv<W: Write>(nodes: &[GridNode], writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    if nodes.is_empty() {
        wtr.write_record([
            "Longitude",
            "Latitude",
            "Delta_Latitude",
            "Delta_Longitude",
            "Accuracy",
        ])?;
    }
    for node in nodes {
        wtr.serialize(GridRecord::from(node))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write every elevation of `gpx_path` to `output`; returns the file written.
pub fn export_elevations(gpx_path: &Path, output: &Path) -> Result<PathBuf> {
    let elevations = load_elevation_texts(gpx_path)?;
    let output_path = resolve_output(gpx_path, output);

    let file = File::create(&output_path)?;
    write_elevations_csv(&elevations, file)?;

    info!(
        "Elevations successfully written to {} ({} rows)",
        output_path.display(),
        elevations.len()
    );
    Ok(output_path)
}

/// Convert a grid shift file to CSV; returns the file written.
pub fn export_grid_shift<G: GridShiftReader>(
    reader: &G,
    grid_path: &Path,
    output: &Path,
) -> Result<PathBuf> {
    let nodes = reader.read_nodes(grid_path)?;
    let output_path = resolve_output(grid_path, output);

    let file = File::create(&output_path)?;
    write_grid_csv(&nodes, file)?;

    info!(
        "Data successfully saved to {} ({} nodes)",
        output_path.display(),
        nodes.len()
    );
    Ok(output_path)
}
