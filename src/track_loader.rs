//! GPX Track Loader
//!
//! Parses a GPX 1.1 document with the `gpx` crate and keeps every track point
//! that carries an elevation. Points without `<ele>` are dropped from both
//! the coordinate and the elevation sequence so the two stay index-aligned.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use gpx::{read, Gpx};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{AltitudeError, Result};

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Track points and their elevations, index-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    points: Vec<TrackPoint>,
    elevations: Vec<f64>,
}

impl Track {
    pub fn new(points: Vec<TrackPoint>, elevations: Vec<f64>) -> Result<Self> {
        if points.len() != elevations.len() {
            return Err(AltitudeError::InvalidParameter(format!(
                "{} track points but {} elevations",
                points.len(),
                elevations.len()
            )));
        }
        Ok(Track {
            name: None,
            points,
            elevations,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Load the track points of a GPX file.
pub fn load_track(path: &Path) -> Result<Track> {
    let reader = open_gpx(path)?;
    let track = read_track(reader).map_err(|err| attach_path(err, path))?;
    debug!(
        "Extracted {} points with elevation data from {}",
        track.len(),
        path.display()
    );
    Ok(track)
}

/// Parse a GPX document from any reader.
///
/// Errors carry an empty path; [`load_track`] fills in the file name.
pub fn read_track<R: Read>(reader: R) -> Result<Track> {
    let gpx = parse_document(reader)?;

    let name = gpx.tracks.iter().find_map(|track| track.name.clone());
    let mut points = Vec::new();
    let mut elevations = Vec::new();

    for track in &gpx.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                if let Some(elevation) = point.elevation {
                    let position = point.point();
                    points.push(TrackPoint {
                        latitude: position.y(),
                        longitude: position.x(),
                    });
                    elevations.push(elevation);
                }
            }
        }
    }

    Ok(Track {
        name,
        points,
        elevations,
    })
}

/// The text of every `<ele>` element of a GPX file, in document order.
pub fn load_elevation_texts(path: &Path) -> Result<Vec<String>> {
    let reader = open_gpx(path)?;
    read_elevation_texts(reader).map_err(|err| attach_path(err, path))
}

/// Values are kept exactly as written (`212` stays `212`, `210.50` stays
/// `210.50`); an empty `<ele/>` yields an empty string. The document must
/// pass the same checks as [`read_track`].
pub fn read_elevation_texts<R: Read>(reader: R) -> Result<Vec<String>> {
    let bytes = read_bytes(reader)?;
    parse_bytes(&bytes)?;
    collect_elevation_texts(&bytes)
}

fn open_gpx(path: &Path) -> Result<BufReader<File>> {
    if !path.exists() {
        return Err(AltitudeError::MissingFile(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| attach_path(unexpected(e.to_string()), path))?;
    Ok(BufReader::new(file))
}

fn read_bytes<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| unexpected(e.to_string()))?;
    Ok(bytes)
}

fn parse_document<R: Read>(reader: R) -> Result<Gpx> {
    let bytes = read_bytes(reader)?;
    parse_bytes(&bytes)
}

fn parse_bytes(bytes: &[u8]) -> Result<Gpx> {
    check_document(bytes)?;
    read(bytes).map_err(|e| unexpected(e.to_string()))
}

/// Unprefixed `ele` elements only; the root already declared GPX 1.1 as the
/// default namespace.
fn collect_elevation_texts(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(bytes);
    let mut texts = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"ele" => current = Some(String::new()),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"ele" => texts.push(String::new()),
            Ok(Event::End(e)) if e.name().as_ref() == b"ele" => {
                if let Some(text) = current.take() {
                    texts.push(text);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let Some(text) = current.as_mut() {
                    push_reference(text, &e);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&e.to_string())),
            _ => {}
        }
    }

    Ok(texts)
}

fn push_reference(text: &mut String, reference: &BytesRef<'_>) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        text.push(ch);
        return;
    }
    let name: &[u8] = reference;
    match name {
        b"amp" => text.push('&'),
        b"lt" => text.push('<'),
        b"gt" => text.push('>'),
        b"quot" => text.push('"'),
        b"apos" => text.push('\''),
        _ => {}
    }
}

/// Well-formedness and namespace gate run before the GPX parser.
///
/// Syntax problems surface as `MalformedInput`; a well-formed document whose
/// root is not a GPX 1.1 `<gpx>` element is `Unexpected`.
fn check_document(bytes: &[u8]) -> Result<()> {
    let mut reader = Reader::from_reader(bytes);
    let mut depth = 0usize;
    let mut root_namespace: Option<Option<Vec<u8>>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root_namespace.is_none() {
                    root_namespace = Some(root_gpx_namespace(&e)?);
                } else if depth == 0 {
                    return Err(malformed("more than one root element"));
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if root_namespace.is_none() {
                    root_namespace = Some(root_gpx_namespace(&e)?);
                } else if depth == 0 {
                    return Err(malformed("more than one root element"));
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Text(text)) if depth == 0 => {
                if text.iter().any(|b| !b.is_ascii_whitespace()) {
                    return Err(malformed("text outside the root element"));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(&e.to_string())),
            _ => {}
        }
    }

    if depth != 0 {
        return Err(malformed("unexpected end of document"));
    }

    match root_namespace {
        None => Err(malformed("no root element")),
        Some(None) => Err(unexpected(format!(
            "root element is not <gpx> or does not declare the {GPX_NAMESPACE} namespace"
        ))),
        Some(Some(ns)) if ns == GPX_NAMESPACE.as_bytes() => Ok(()),
        Some(Some(ns)) => Err(unexpected(format!(
            "unsupported GPX namespace {}, expected {GPX_NAMESPACE}",
            String::from_utf8_lossy(&ns)
        ))),
    }
}

/// Default namespace of a `<gpx>` root; `None` for any other root element.
fn root_gpx_namespace(start: &BytesStart<'_>) -> Result<Option<Vec<u8>>> {
    if start.local_name().as_ref() != b"gpx" {
        return Ok(None);
    }
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(&e.to_string()))?;
        if attr.key.as_ref() == b"xmlns" {
            return Ok(Some(attr.value.into_owned()));
        }
    }
    Ok(None)
}

fn malformed(reason: &str) -> AltitudeError {
    AltitudeError::MalformedInput {
        path: Default::default(),
        reason: reason.to_string(),
    }
}

fn unexpected(cause: String) -> AltitudeError {
    AltitudeError::Unexpected {
        path: Default::default(),
        cause,
    }
}

fn attach_path(err: AltitudeError, path: &Path) -> AltitudeError {
    match err {
        AltitudeError::MalformedInput { reason, .. } => AltitudeError::MalformedInput {
            path: path.to_path_buf(),
            reason,
        },
        AltitudeError::Unexpected { cause, .. } => AltitudeError::Unexpected {
            path: path.to_path_buf(),
            cause,
        },
        other => other,
    }
}
