//! NTv2 grid shift reader
//!
//! NTv2 (`.gsb`) files are a sequence of 16-byte records: an 8-byte ASCII
//! key and an 8-byte value. An overview header is followed by one or more
//! sub-grids, each with its own header and `GS_COUNT` nodes of four `f32`
//! values (latitude shift, longitude shift, latitude accuracy, longitude
//! accuracy). Angles in the headers and shifts are given in `GS_TYPE` units,
//! longitudes are positive west, and nodes run row by row from the south
//! edge, each row from east to west.
//!
//! Output nodes use east-positive degrees for positions and east-positive
//! arc-seconds for the shifts.
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{AltitudeError, Result};

const RECORD_LEN: usize = 16;
const OVERVIEW_RECORDS: usize = 11;
const SUBGRID_RECORDS: usize = 11;

/// One node of a grid shift file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridNode {
    /// Degrees, east positive
    pub longitude: f64,
    /// Degrees
    pub latitude: f64,
    /// Arc-seconds
    pub delta_latitude: f64,
    /// Arc-seconds, east positive
    pub delta_longitude: f64,
    pub latitude_accuracy: f64,
    pub longitude_accuracy: f64,
}

impl GridNode {
    /// The less accurate of the two directions.
    pub fn accuracy(&self) -> f64 {
        self.latitude_accuracy.max(self.longitude_accuracy)
    }
}

/// Source of grid shift nodes.
pub trait GridShiftReader {
    fn read_nodes(&self, path: &Path) -> Result<Vec<GridNode>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ntv2Reader;

impl GridShiftReader for Ntv2Reader {
    fn read_nodes(&self, path: &Path) -> Result<Vec<GridNode>> {
        if !path.exists() {
            return Err(AltitudeError::MissingFile(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let grid = parse_ntv2(&bytes).map_err(|reason| AltitudeError::GridShift {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(
            "Read {} sub-grids with {} nodes from {}",
            grid.subgrids.len(),
            grid.node_count(),
            path.display()
        );
        Ok(grid.into_nodes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ntv2File {
    pub system_from: String,
    pub system_to: String,
    pub subgrids: Vec<SubGrid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubGrid {
    pub name: String,
    pub parent: String,
    pub rows: usize,
    pub columns: usize,
    pub nodes: Vec<GridNode>,
}

impl Ntv2File {
    pub fn node_count(&self) -> usize {
        self.subgrids.iter().map(|grid| grid.nodes.len()).sum()
    }

    pub fn into_nodes(self) -> Vec<GridNode> {
        self.subgrids
            .into_iter()
            .flat_map(|grid| grid.nodes)
            .collect()
    }
}

struct RecordCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    order: ByteOrder,
}

impl<'a> RecordCursor<'a> {
    fn next_record(&mut self, expected_key: &str) -> std::result::Result<&'a [u8], String> {
        let bytes = self.bytes;
        let record = bytes
            .get(self.offset..self.offset + RECORD_LEN)
            .ok_or_else(|| format!("file truncated while reading {}", expected_key.trim_end()))?;
        let key = String::from_utf8_lossy(&record[..8]);
        let key = key.trim_end_matches(['\0', ' ']);
        if key != expected_key.trim_end() {
            return Err(format!(
                "expected record {} at byte {}, found {:?}",
                expected_key.trim_end(),
                self.offset,
                key
            ));
        }
        self.offset += RECORD_LEN;
        Ok(&record[8..])
    }

    fn int(&mut self, key: &str) -> std::result::Result<i32, String> {
        let value = self.next_record(key)?;
        let raw = [value[0], value[1], value[2], value[3]];
        Ok(match self.order {
            ByteOrder::Little => i32::from_le_bytes(raw),
            ByteOrder::Big => i32::from_be_bytes(raw),
        })
    }

    fn float(&mut self, key: &str) -> std::result::Result<f64, String> {
        let value = self.next_record(key)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(value);
        Ok(match self.order {
            ByteOrder::Little => f64::from_le_bytes(raw),
            ByteOrder::Big => f64::from_be_bytes(raw),
        })
    }

    fn text(&mut self, key: &str) -> std::result::Result<String, String> {
        let value = self.next_record(key)?;
        Ok(String::from_utf8_lossy(value).trim_end_matches(['\0', ' ']).to_string())
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn node_values(&mut self) -> std::result::Result<[f32; 4], String> {
        let bytes = self.bytes;
        let record = bytes
            .get(self.offset..self.offset + RECORD_LEN)
            .ok_or_else(|| "file truncated inside grid node data".to_string())?;
        self.offset += RECORD_LEN;

        let mut values = [0f32; 4];
        for (i, chunk) in record.chunks_exact(4).enumerate() {
            let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
            values[i] = match self.order {
                ByteOrder::Little => f32::from_le_bytes(raw),
                ByteOrder::Big => f32::from_be_bytes(raw),
            };
        }
        Ok(values)
    }
}

/// Parse an in-memory NTv2 file.
pub fn parse_ntv2(bytes: &[u8]) -> std::result::Result<Ntv2File, String> {
    let order = detect_byte_order(bytes)?;
    let mut cursor = RecordCursor {
        bytes,
        offset: 0,
        order,
    };

    let overview_records = cursor.int("NUM_OREC")?;
    let subgrid_records = cursor.int("NUM_SREC")?;
    if overview_records as usize != OVERVIEW_RECORDS || subgrid_records as usize != SUBGRID_RECORDS {
        return Err(format!(
            "unsupported header layout ({overview_records} overview / {subgrid_records} sub-grid records)"
        ));
    }
    let subgrid_count = cursor.int("NUM_FILE")?;
    let gs_type = cursor.text("GS_TYPE")?;
    let _version = cursor.text("VERSION")?;
    let system_from = cursor.text("SYSTEM_F")?;
    let system_to = cursor.text("SYSTEM_T")?;
    for key in ["MAJOR_F", "MINOR_F", "MAJOR_T", "MINOR_T"] {
        cursor.float(key)?;
    }

    let to_seconds = match gs_type.trim().to_ascii_uppercase().as_str() {
        "SECONDS" => 1.0,
        "MINUTES" => 60.0,
        "DEGREES" => 3600.0,
        other => return Err(format!("unknown GS_TYPE {other:?}")),
    };

    if subgrid_count < 0 {
        return Err(format!("negative sub-grid count {subgrid_count}"));
    }

    let mut subgrids = Vec::new();
    for _ in 0..subgrid_count {
        subgrids.push(parse_subgrid(&mut cursor, to_seconds)?);
    }

    Ok(Ntv2File {
        system_from,
        system_to,
        subgrids,
    })
}

fn parse_subgrid(cursor: &mut RecordCursor<'_>, to_seconds: f64) -> std::result::Result<SubGrid, String> {
    let name = cursor.text("SUB_NAME")?;
    let parent = cursor.text("PARENT")?;
    cursor.text("CREATED")?;
    cursor.text("UPDATED")?;
    let south = cursor.float("S_LAT")? * to_seconds;
    let north = cursor.float("N_LAT")? * to_seconds;
    let east = cursor.float("E_LONG")? * to_seconds;
    let west = cursor.float("W_LONG")? * to_seconds;
    let lat_inc = cursor.float("LAT_INC")? * to_seconds;
    let lon_inc = cursor.float("LONG_INC")? * to_seconds;
    let count = cursor.int("GS_COUNT")?;

    if [south, north, east, west, lat_inc, lon_inc]
        .iter()
        .any(|value| !value.is_finite())
    {
        return Err(format!("sub-grid {name}: extent or increment is not a finite number"));
    }
    if !(lat_inc > 0.0 && lon_inc > 0.0) {
        return Err(format!("sub-grid {name}: increments must be positive"));
    }
    if north < south || west < east {
        return Err(format!("sub-grid {name}: inverted extent"));
    }

    let rows = grid_dimension(north - south, lat_inc)
        .ok_or_else(|| format!("sub-grid {name}: too many rows"))?;
    let columns = grid_dimension(west - east, lon_inc)
        .ok_or_else(|| format!("sub-grid {name}: too many columns"))?;
    let expected = rows
        .checked_mul(columns)
        .ok_or_else(|| format!("sub-grid {name}: {rows} x {columns} nodes overflow"))?;
    if usize::try_from(count).ok() != Some(expected) {
        return Err(format!(
            "sub-grid {name}: GS_COUNT {count} does not match {rows} x {columns} nodes"
        ));
    }

    let node_bytes = expected.checked_mul(RECORD_LEN);
    if node_bytes.map_or(true, |needed| needed > cursor.remaining()) {
        return Err(format!(
            "sub-grid {name}: file truncated, {expected} nodes announced but only {} bytes left",
            cursor.remaining()
        ));
    }

    let mut nodes = Vec::with_capacity(expected);
    for row in 0..rows {
        for column in 0..columns {
            let [lat_shift, lon_shift, lat_accuracy, lon_accuracy] = cursor.node_values()?;
            let latitude_s = south + row as f64 * lat_inc;
            let west_longitude_s = east + column as f64 * lon_inc;
            nodes.push(GridNode {
                longitude: -west_longitude_s / 3600.0,
                latitude: latitude_s / 3600.0,
                delta_latitude: f64::from(lat_shift) * to_seconds,
                delta_longitude: -f64::from(lon_shift) * to_seconds,
                latitude_accuracy: f64::from(lat_accuracy) * to_seconds,
                longitude_accuracy: f64::from(lon_accuracy) * to_seconds,
            });
        }
    }

    Ok(SubGrid {
        name,
        parent,
        rows,
        columns,
        nodes,
    })
}

/// Number of nodes along one axis, `None` when it does not fit in memory.
fn grid_dimension(span: f64, increment: f64) -> Option<usize> {
    let steps = (span / increment).round();
    if !steps.is_finite() || steps < 0.0 || steps > f64::from(u32::MAX) {
        return None;
    }
    (steps as usize).checked_add(1)
}

fn detect_byte_order(bytes: &[u8]) -> std::result::Result<ByteOrder, String> {
    let value = bytes
        .get(8..12)
        .ok_or_else(|| "file too short for an NTv2 header".to_string())?;
    let raw = [value[0], value[1], value[2], value[3]];
    if i32::from_le_bytes(raw) == OVERVIEW_RECORDS as i32 {
        Ok(ByteOrder::Little)
    } else if i32::from_be_bytes(raw) == OVERVIEW_RECORDS as i32 {
        Ok(ByteOrder::Big)
    } else {
        Err("NUM_OREC is not 11 in either byte order; not an NTv2 file".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds NTv2 files in memory.
    struct GsbBuilder {
        big_endian: bool,
        bytes: Vec<u8>,
    }

    impl GsbBuilder {
        fn new(big_endian: bool) -> Self {
            GsbBuilder {
                big_endian,
                bytes: Vec::new(),
            }
        }

        fn key(&mut self, key: &str) {
            let mut padded = [b' '; 8];
            padded[..key.len()].copy_from_slice(key.as_bytes());
            self.bytes.extend_from_slice(&padded);
        }

        fn int(&mut self, key: &str, value: i32) {
            self.key(key);
            let raw = if self.big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
            self.bytes.extend_from_slice(&raw);
            self.bytes.extend_from_slice(&[0; 4]);
        }

        fn float(&mut self, key: &str, value: f64) {
            self.key(key);
            let raw = if self.big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
            self.bytes.extend_from_slice(&raw);
        }

        fn text(&mut self, key: &str, value: &str) {
            self.key(key);
            let mut padded = [b' '; 8];
            padded[..value.len()].copy_from_slice(value.as_bytes());
            self.bytes.extend_from_slice(&padded);
        }

        fn node(&mut self, values: [f32; 4]) {
            for v in values {
                let raw = if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
                self.bytes.extend_from_slice(&raw);
            }
        }

        fn overview(&mut self, subgrids: i32) {
            self.int("NUM_OREC", 11);
            self.int("NUM_SREC", 11);
            self.int("NUM_FILE", subgrids);
            self.text("GS_TYPE", "SECONDS");
            self.text("VERSION", "NTv2.0");
            self.text("SYSTEM_F", "MGI");
            self.text("SYSTEM_T", "ETRS89");
            self.float("MAJOR_F", 6_377_397.155);
            self.float("MINOR_F", 6_356_078.963);
            self.float("MAJOR_T", 6_378_137.0);
            self.float("MINOR_T", 6_356_752.314);
        }

        /// `[south, north, east, west]` in seconds, positive west.
        fn subgrid_header(&mut self, extent: [f64; 4], increment: f64, count: i32) {
            self.text("SUB_NAME", "AT");
            self.text("PARENT", "NONE");
            self.text("CREATED", "20210928");
            self.text("UPDATED", "20210928");
            self.float("S_LAT", extent[0]);
            self.float("N_LAT", extent[1]);
            self.float("E_LONG", extent[2]);
            self.float("W_LONG", extent[3]);
            self.float("LAT_INC", increment);
            self.float("LONG_INC", increment);
            self.int("GS_COUNT", count);
        }

        /// 2 rows x 3 columns between 48N..48.01N and 16E..16.02E.
        fn small_subgrid(&mut self, count: i32) {
            self.subgrid_header([172_800.0, 172_836.0, -57_672.0, -57_600.0], 36.0, count);
            for i in 0..6 {
                self.node([i as f32 * 0.5, 1.0, 0.25, 0.75]);
            }
        }

        fn finish(mut self) -> Vec<u8> {
            self.key("END");
            self.bytes.extend_from_slice(&[0; 8]);
            self.bytes
        }
    }

    fn sample(big_endian: bool) -> Vec<u8> {
        let mut builder = GsbBuilder::new(big_endian);
        builder.overview(1);
        builder.small_subgrid(6);
        builder.finish()
    }

    #[test]
    fn test_little_endian_grid() {
        let grid = parse_ntv2(&sample(false)).unwrap();
        assert_eq!(grid.system_from, "MGI");
        assert_eq!(grid.system_to, "ETRS89");
        assert_eq!(grid.subgrids.len(), 1);

        let sub = &grid.subgrids[0];
        assert_eq!(sub.name, "AT");
        assert_eq!((sub.rows, sub.columns), (2, 3));
        assert_eq!(sub.nodes.len(), 6);

        // First node is the south-east corner; the row runs westwards.
        let first = sub.nodes[0];
        assert!((first.latitude - 48.0).abs() < 1e-12);
        assert!((first.longitude - 16.02).abs() < 1e-12);
        assert!((sub.nodes[2].longitude - 16.0).abs() < 1e-12);
        assert!((sub.nodes[3].latitude - 48.01).abs() < 1e-12);

        assert_eq!(sub.nodes[1].delta_latitude, 0.5);
        assert_eq!(first.delta_longitude, -1.0);
        assert_eq!(first.accuracy(), 0.75);
    }

    #[test]
    fn test_big_endian_matches_little_endian() {
        assert_eq!(parse_ntv2(&sample(true)).unwrap(), parse_ntv2(&sample(false)).unwrap());
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let mut builder = GsbBuilder::new(false);
        builder.overview(1);
        builder.small_subgrid(5);
        let err = parse_ntv2(&builder.finish()).unwrap_err();
        assert!(err.contains("GS_COUNT"), "{err}");
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let bytes = sample(false);
        let err = parse_ntv2(&bytes[..bytes.len() - 40]).unwrap_err();
        assert!(err.contains("truncated"), "{err}");
    }

    #[test]
    fn test_huge_node_count_without_data_is_rejected() {
        // 46340 x 46340 nodes announced in a header-only file.
        let mut builder = GsbBuilder::new(false);
        builder.overview(1);
        builder.subgrid_header([0.0, 46_339.0, 0.0, 46_339.0], 1.0, 46_340 * 46_340);
        let err = parse_ntv2(&builder.finish()).unwrap_err();
        assert!(err.contains("truncated"), "{err}");
    }

    #[test]
    fn test_infinite_extent_is_rejected() {
        let mut builder = GsbBuilder::new(false);
        builder.overview(1);
        builder.subgrid_header([0.0, f64::INFINITY, 0.0, 36.0], 36.0, 4);
        let err = parse_ntv2(&builder.finish()).unwrap_err();
        assert!(err.contains("finite"), "{err}");

        let mut builder = GsbBuilder::new(false);
        builder.overview(1);
        builder.subgrid_header([0.0, 1.0e300, 0.0, 36.0], 1.0e-300, 4);
        let err = parse_ntv2(&builder.finish()).unwrap_err();
        assert!(err.contains("finite") || err.contains("too many"), "{err}");
    }

    #[test]
    fn test_oversized_subgrid_count_is_rejected() {
        let mut builder = GsbBuilder::new(false);
        builder.overview(i32::MAX);
        builder.small_subgrid(6);
        let err = parse_ntv2(&builder.finish()).unwrap_err();
        assert!(err.contains("SUB_NAME"), "{err}");
    }

    #[test]
    fn test_not_an_ntv2_file() {
        assert!(parse_ntv2(b"definitely not a grid shift file").is_err());
        assert!(parse_ntv2(b"short").is_err());
    }

    #[test]
    fn test_reader_on_disk() {
        let path = std::env::temp_dir().join(format!("gpx_altitude_grid_{}.gsb", std::process::id()));
        fs::write(&path, sample(false)).unwrap();
        let nodes = Ntv2Reader.read_nodes(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(nodes.len(), 6);

        let missing = Ntv2Reader.read_nodes(Path::new("/nonexistent/grid.gsb")).unwrap_err();
        assert!(matches!(missing, AltitudeError::MissingFile(_)));
    }
}
