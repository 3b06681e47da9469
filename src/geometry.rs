//! Region loaders: bounding box strings, Osmosis `.poly` files and OSM
//! boundary files.

use std::fs;
use std::path::Path;
use std::str;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use log::{info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rustc_hash::FxHashMap;

use crate::error::{Result, SplitError};
use crate::osm::reader::{open_path, parse_i64_fast};
use crate::region::{BoundingBox, PolygonRegion};

/// Parse `minlon,minlat,maxlon,maxlat`.
pub fn parse_bbox(text: &str) -> Result<BoundingBox> {
    let values: Vec<f64> = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| SplitError::parse("bbox", format!("'{}': {}", text, e)))?;

    match values.as_slice() {
        &[min_lon, min_lat, max_lon, max_lat] => {
            Ok(BoundingBox::new(min_lon, min_lat, max_lon, max_lat))
        }
        _ => Err(SplitError::parse(
            "bbox",
            format!("'{}': expected minlon,minlat,maxlon,maxlat", text),
        )),
    }
}

fn polygon_error(path: &Path, message: impl Into<String>) -> SplitError {
    SplitError::Polygon {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Union a list of rings into one multipolygon.
fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        })
}

fn close_ring(mut coords: Vec<Coord<f64>>, path: &Path) -> LineString<f64> {
    if coords.first() != coords.last() {
        if let Some(&first) = coords.first() {
            warn!(path = path.display().to_string().as_str(); "auto-closing unclosed ring");
            coords.push(first);
        }
    }
    LineString::new(coords)
}

/// Parse the text of a `.poly` file.
///
/// Layout: a title line, then sections of `lon lat` lines each closed by
/// `END` (a section whose header starts with `!` is a hole), then a final
/// `END`. The region is the union of outer rings minus the union of holes.
pub fn parse_poly(text: &str, path: &Path) -> Result<PolygonRegion> {
    let mut lines = text.lines().enumerate();
    if lines.next().is_none() {
        return Err(polygon_error(path, "missing title line"));
    }

    let mut outer = Vec::new();
    let mut inner = Vec::new();
    // (is_hole, coordinates) of the section being read
    let mut section: Option<(bool, Vec<Coord<f64>>)> = None;
    let mut terminated = false;

    for (index, raw) in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match section.take() {
            None => {
                if line.starts_with("END") {
                    terminated = true;
                    break;
                }
                section = Some((line.starts_with('!'), Vec::new()));
            }
            Some((is_hole, coords)) => {
                if line.starts_with("END") {
                    if coords.is_empty() {
                        return Err(polygon_error(
                            path,
                            format!("empty ring ending at line {}", index + 1),
                        ));
                    }
                    let ring = Polygon::new(close_ring(coords, path), Vec::new());
                    if is_hole {
                        inner.push(ring);
                    } else {
                        outer.push(ring);
                    }
                } else {
                    let mut coords = coords;
                    coords.push(parse_coordinate(line).ok_or_else(|| {
                        polygon_error(
                            path,
                            format!("unparseable coordinate at line {}: '{}'", index + 1, line),
                        )
                    })?);
                    section = Some((is_hole, coords));
                }
            }
        }
    }

    if !terminated {
        return Err(polygon_error(path, "file does not end with END"));
    }
    if outer.is_empty() {
        return Err(polygon_error(path, "no outer rings"));
    }

    let outer = union_all(outer);
    let shape = if inner.is_empty() {
        outer
    } else {
        outer.difference(&union_all(inner))
    };
    PolygonRegion::new(shape).ok_or_else(|| polygon_error(path, "polygon has no area"))
}

fn parse_coordinate(line: &str) -> Option<Coord<f64>> {
    let mut parts = line.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    Some(Coord { x, y })
}

/// Read an Osmosis `.poly` file.
pub fn read_poly_file<P: AsRef<Path>>(path: P) -> Result<PolygonRegion> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let region = parse_poly(&text, path)?;
    info!(
        path = path.display().to_string().as_str(),
        parts = region.shape().0.len();
        "Loaded polygon file"
    );
    Ok(region)
}

/// Signed `id`/`ref` attribute of a boundary file element.
fn signed_attr(e: &BytesStart<'_>, key: &[u8], path: &Path) -> Result<Option<i64>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return parse_i64_fast(&attr.value).map(Some).ok_or_else(|| {
                polygon_error(
                    path,
                    format!("invalid id '{}'", String::from_utf8_lossy(&attr.value)),
                )
            });
        }
    }
    Ok(None)
}

/// `(id, location)` of a node element; location is `None` for deleted nodes.
fn boundary_node(e: &BytesStart<'_>, path: &Path) -> Result<Option<(i64, Option<Coord<f64>>)>> {
    let Some(id) = signed_attr(e, b"id", path)? else {
        return Ok(None);
    };
    let mut lon = None;
    let mut lat = None;
    for attr in e.attributes() {
        let attr = attr?;
        let target = match attr.key.as_ref() {
            b"lon" => &mut lon,
            b"lat" => &mut lat,
            _ => continue,
        };
        *target = Some(
            str::from_utf8(&attr.value)
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| polygon_error(path, format!("invalid coordinate on node {}", id)))?,
        );
    }
    Ok(Some((id, lon.zip(lat).map(|(x, y)| Coord { x, y }))))
}

/// Turn a finished way into an outer ring, if it is closed and resolvable.
fn boundary_ring(
    id: i64,
    refs: &[i64],
    locations: &FxHashMap<i64, Coord<f64>>,
) -> Option<Polygon<f64>> {
    if refs.len() < 4 || refs.first() != refs.last() {
        warn!(id = id; "open way in boundary file");
        return None;
    }
    let coords: Option<Vec<Coord<f64>>> = refs.iter().map(|r| locations.get(r).copied()).collect();
    match coords {
        Some(coords) => Some(Polygon::new(LineString::new(coords), Vec::new())),
        None => {
            warn!(id = id; "boundary way references missing points");
            None
        }
    }
}

/// Build a region from an OSM file: every closed way becomes an outer ring.
///
/// Boundary files are often drawn in an editor and never uploaded, so
/// negative ids are accepted here. Ways referencing points missing from the
/// file are skipped.
pub fn read_osm_boundary<P: AsRef<Path>>(path: P) -> Result<PolygonRegion> {
    let path = path.as_ref();
    let mut reader = Reader::from_reader(open_path(path)?);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut locations: FxHashMap<i64, Coord<f64>> = FxHashMap::default();
    // way currently open and its node refs
    let mut way: Option<(i64, Vec<i64>)> = None;
    let mut rings = Vec::new();

    loop {
        buf.clear();
        let (e, empty) = match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(e) => {
                if e.name().as_ref() == b"way" {
                    if let Some((id, refs)) = way.take() {
                        rings.extend(boundary_ring(id, &refs, &locations));
                    }
                }
                continue;
            }
            _ => continue,
        };

        match e.name().as_ref() {
            b"node" => match boundary_node(&e, path)? {
                Some((id, Some(coord))) => {
                    locations.insert(id, coord);
                }
                Some((id, None)) => {
                    locations.remove(&id);
                }
                None => {}
            },
            b"way" => {
                if let Some(id) = signed_attr(&e, b"id", path)? {
                    if empty {
                        rings.extend(boundary_ring(id, &[], &locations));
                    } else {
                        way = Some((id, Vec::new()));
                    }
                }
            }
            b"nd" => {
                if let Some((_, refs)) = way.as_mut() {
                    if let Some(r) = signed_attr(&e, b"ref", path)? {
                        refs.push(r);
                    }
                }
            }
            _ => {}
        }
    }

    if rings.is_empty() {
        return Err(polygon_error(path, "no closed ways"));
    }
    info!(
        path = path.display().to_string().as_str(),
        rings = rings.len();
        "Loaded OSM boundary"
    );
    PolygonRegion::new(union_all(rings)).ok_or_else(|| polygon_error(path, "polygon has no area"))
}
