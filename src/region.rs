//! Spatial selection predicates for extracts.

use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point as GeoPoint, Rect};
use std::fmt;

/// Axis-aligned lon/lat rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl From<Rect<f64>> for Envelope {
    fn from(rect: Rect<f64>) -> Self {
        let (Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 }) = (rect.min(), rect.max());
        Self::new(x0, y0, x1, y1)
    }
}

impl Envelope {
    /// Build an envelope, normalising swapped corners.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon: min_lon.min(max_lon),
            min_lat: min_lat.min(max_lat),
            max_lon: min_lon.max(max_lon),
            max_lat: min_lat.max(max_lat),
        }
    }

    /// Strict containment: points on the edge are outside.
    #[inline]
    pub fn contains_strict(&self, lon: f64, lat: f64) -> bool {
        lon > self.min_lon && lon < self.max_lon && lat > self.min_lat && lat < self.max_lat
    }

    /// Closed containment, used as a cheap pre-check.
    #[inline]
    pub fn covers(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Boolean "is this coordinate inside the region" capability.
///
/// Implementations must be pure: the same coordinate always gives the same
/// answer, which keeps extract output reproducible.
pub trait Containment: Send + Sync {
    /// True if (`lon`, `lat`) lies strictly inside the region.
    fn contains(&self, lon: f64, lat: f64) -> bool;

    /// Bounding envelope written to the extract's output header.
    fn envelope(&self) -> Envelope;
}

/// Rectangular region with strict edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    envelope: Envelope,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            envelope: Envelope::new(min_lon, min_lat, max_lon, max_lat),
        }
    }
}

impl Containment for BoundingBox {
    #[inline]
    fn contains(&self, lon: f64, lat: f64) -> bool {
        self.envelope.contains_strict(lon, lat)
    }

    fn envelope(&self) -> Envelope {
        self.envelope
    }
}

/// Polygon region (possibly with holes and several parts).
///
/// Boundary points are outside, mirroring [`BoundingBox`].
///
/// Each part keeps its own envelope, so a lookup only runs the exact
/// point-in-polygon test on parts whose box covers the point. Within a part
/// the test walks every edge; there is no edge index.
#[derive(Debug, Clone)]
pub struct PolygonRegion {
    shape: MultiPolygon<f64>,
    envelope: Envelope,
    /// `(envelope, index into shape)` for every part with coordinates.
    parts: Vec<(Envelope, usize)>,
}

impl PolygonRegion {
    /// Wrap a multipolygon. Returns `None` when it has no area to bound.
    pub fn new(shape: MultiPolygon<f64>) -> Option<Self> {
        let envelope = Envelope::from(shape.bounding_rect()?);
        let parts = shape
            .0
            .iter()
            .enumerate()
            .filter_map(|(i, part)| Some((Envelope::from(part.bounding_rect()?), i)))
            .collect();
        Some(Self {
            shape,
            envelope,
            parts,
        })
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }
}

impl Containment for PolygonRegion {
    fn contains(&self, lon: f64, lat: f64) -> bool {
        if !self.envelope.covers(lon, lat) {
            return false;
        }
        let point = GeoPoint::new(lon, lat);
        self.parts
            .iter()
            .filter(|(env, _)| env.covers(lon, lat))
            .any(|&(_, i)| self.shape.0[i].contains(&point))
    }

    fn envelope(&self) -> Envelope {
        self.envelope
    }
}
