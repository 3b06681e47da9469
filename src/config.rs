//! Extract configuration files.
//!
//! One extract per line, fields separated by tabs or spaces:
//!
//! ```text
//! # output            type  argument
//! out/berlin.osm.xz   BBOX  13.08,52.33,13.76,52.68
//! out/germany.osm     POLY  polygons/germany.poly
//! out/city.osm        OSM   boundaries/city.osm
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SplitError};
use crate::geometry::{parse_bbox, read_osm_boundary, read_poly_file};
use crate::region::{BoundingBox, Containment};

/// Where the region of an extract comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSource {
    BoundingBox(BoundingBox),
    PolyFile(PathBuf),
    OsmFile(PathBuf),
}

impl RegionSource {
    /// Build the containment test, reading files as needed.
    pub fn load(&self) -> Result<Box<dyn Containment>> {
        Ok(match self {
            RegionSource::BoundingBox(bbox) => Box::new(*bbox),
            RegionSource::PolyFile(path) => Box::new(read_poly_file(path)?),
            RegionSource::OsmFile(path) => Box::new(read_osm_boundary(path)?),
        })
    }
}

/// One configured extract.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSpec {
    /// Output path; also used as the extract's name.
    pub output: PathBuf,
    pub region: RegionSource,
    /// 1-based line number in the configuration file.
    pub line: usize,
}

fn config_error(line: usize, message: impl Into<String>) -> SplitError {
    SplitError::Config {
        line,
        message: message.into(),
    }
}

/// Parse configuration text. Relative region file paths are kept as written.
pub fn parse_config(text: &str) -> Result<Vec<ExtractSpec>> {
    let mut specs = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [output, kind, argument] = fields.as_slice() else {
            return Err(config_error(
                line,
                format!("expected 3 fields (output, type, argument), found {}", fields.len()),
            ));
        };

        let region = match *kind {
            "BBOX" => RegionSource::BoundingBox(
                parse_bbox(argument).map_err(|e| config_error(line, e.to_string()))?,
            ),
            "POLY" => RegionSource::PolyFile(PathBuf::from(argument)),
            "OSM" => RegionSource::OsmFile(PathBuf::from(argument)),
            other => {
                return Err(config_error(
                    line,
                    format!("unknown region type '{}' (expected BBOX, POLY or OSM)", other),
                ))
            }
        };

        specs.push(ExtractSpec {
            output: PathBuf::from(output),
            region,
            line,
        });
    }

    Ok(specs)
}

/// Read and parse a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Vec<ExtractSpec>> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}
