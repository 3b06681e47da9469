//! OSM XML output for a single extract.
//!
//! Integers go through itoa and coordinates are written as fixed-point
//! decimals with seven fractional digits at most, so no allocation
//! happens per entity apart from escaped strings that need it.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::escape::escape;
use xz::write::XzEncoder;

use crate::entity::{EntityId, Metadata, Point, Relation, Way};
use crate::error::{Result, SplitError};
use crate::extract::Sink;
use crate::osm::{is_xz, DEFAULT_OUTPUT_BUFFER};
use crate::region::Envelope;

/// Value of the `generator` attribute on the root element.
pub const GENERATOR: &str = "osm-history-splitter";

/// Coordinates are written with this many fractional digits.
const COORDINATE_DIGITS: usize = 7;
const COORDINATE_SCALE: f64 = 10_000_000.0;

/// xz preset used for `.xz` outputs.
const XZ_LEVEL: u32 = 6;

/// A byte stream that needs an explicit end-of-stream step.
///
/// Plain files only flush; compressed streams also write their trailer.
pub trait OutputStream: Write + Send {
    fn finish(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl OutputStream for Vec<u8> {}

impl OutputStream for File {}

impl<W: OutputStream> OutputStream for BufWriter<W> {
    fn finish(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().finish()
    }
}

impl<W: OutputStream> OutputStream for XzEncoder<W> {
    fn finish(&mut self) -> io::Result<()> {
        self.try_finish()?;
        self.get_mut().finish()
    }
}

impl OutputStream for Box<dyn OutputStream> {
    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Writes one extract as an OSM XML document.
pub struct OsmXmlSink<W: OutputStream> {
    out: W,
    itoa_buf: itoa::Buffer,
    finished: bool,
}

impl OsmXmlSink<Box<dyn OutputStream>> {
    /// Create the output file at `path`, compressing when it ends in `.xz`.
    ///
    /// Missing parent directories are created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let out: Box<dyn OutputStream> = if is_xz(path) {
            Box::new(BufWriter::with_capacity(
                DEFAULT_OUTPUT_BUFFER,
                XzEncoder::new(BufWriter::new(file), XZ_LEVEL),
            ))
        } else {
            Box::new(BufWriter::with_capacity(DEFAULT_OUTPUT_BUFFER, file))
        };
        Ok(Self::new(out))
    }
}

impl<W: OutputStream> OsmXmlSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            itoa_buf: itoa::Buffer::new(),
            finished: false,
        }
    }

    /// Recover the underlying stream, e.g. the bytes of a `Vec<u8>` sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    #[inline]
    fn write_int<I: itoa::Integer>(&mut self, n: I) -> io::Result<()> {
        self.out.write_all(self.itoa_buf.format(n).as_bytes())
    }

    #[inline]
    fn write_coordinate(&mut self, value: f64) -> io::Result<()> {
        let fixed = (value * COORDINATE_SCALE).round() as i64;
        if fixed < 0 {
            self.out.write_all(b"-")?;
        }
        let abs = fixed.unsigned_abs();
        self.write_int(abs / COORDINATE_SCALE as u64)?;

        let mut frac = abs % COORDINATE_SCALE as u64;
        if frac == 0 {
            return Ok(());
        }
        let mut digits = [b'0'; COORDINATE_DIGITS];
        for slot in digits.iter_mut().rev() {
            *slot = b'0' + (frac % 10) as u8;
            frac /= 10;
        }
        let len = digits
            .iter()
            .rposition(|&d| d != b'0')
            .map_or(0, |i| i + 1);
        self.out.write_all(b".")?;
        self.out.write_all(&digits[..len])
    }

    fn write_attr_str(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.out.write_all(b" ")?;
        self.out.write_all(key.as_bytes())?;
        self.out.write_all(b"=\"")?;
        self.out.write_all(escape(value).as_bytes())?;
        self.out.write_all(b"\"")
    }

    fn write_attr_int<I: itoa::Integer>(&mut self, key: &str, value: I) -> io::Result<()> {
        self.out.write_all(b" ")?;
        self.out.write_all(key.as_bytes())?;
        self.out.write_all(b"=\"")?;
        self.write_int(value)?;
        self.out.write_all(b"\"")
    }

    fn write_attr_coordinate(&mut self, key: &str, value: f64) -> io::Result<()> {
        self.out.write_all(b" ")?;
        self.out.write_all(key.as_bytes())?;
        self.out.write_all(b"=\"")?;
        self.write_coordinate(value)?;
        self.out.write_all(b"\"")
    }

    /// Opening tag attributes shared by every entity kind.
    fn write_header(&mut self, id: EntityId, version: u32, meta: &Metadata) -> io::Result<()> {
        self.write_attr_int("id", id)?;
        if version > 0 {
            self.write_attr_int("version", version)?;
        }
        if let Some(timestamp) = &meta.timestamp {
            self.write_attr_str("timestamp", timestamp)?;
        }
        if let Some(uid) = meta.uid {
            self.write_attr_int("uid", uid)?;
        }
        if let Some(user) = &meta.user {
            self.write_attr_str("user", user)?;
        }
        if let Some(changeset) = meta.changeset {
            self.write_attr_int("changeset", changeset)?;
        }
        if let Some(visible) = meta.visible {
            self.write_attr_str("visible", if visible { "true" } else { "false" })?;
        }
        Ok(())
    }

    fn write_tags(&mut self, meta: &Metadata) -> io::Result<()> {
        for (k, v) in &meta.tags {
            self.out.write_all(b"    <tag")?;
            self.write_attr_str("k", k)?;
            self.write_attr_str("v", v)?;
            self.out.write_all(b"/>\n")?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(SplitError::State("write after finalize".to_string()));
        }
        Ok(())
    }
}

impl<W: OutputStream> Sink for OsmXmlSink<W> {
    fn init(&mut self, envelope: &Envelope) -> Result<()> {
        self.ensure_open()?;
        self.out
            .write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        self.out.write_all(b"<osm version=\"0.6\"")?;
        self.write_attr_str("generator", GENERATOR)?;
        self.out.write_all(b">\n  <bounds")?;
        self.write_attr_coordinate("minlat", envelope.min_lat)?;
        self.write_attr_coordinate("minlon", envelope.min_lon)?;
        self.write_attr_coordinate("maxlat", envelope.max_lat)?;
        self.write_attr_coordinate("maxlon", envelope.max_lon)?;
        self.out.write_all(b"/>\n")?;
        Ok(())
    }

    fn write_point(&mut self, point: &Point) -> Result<()> {
        self.ensure_open()?;
        self.out.write_all(b"  <node")?;
        self.write_header(point.id, point.version, &point.meta)?;
        if let Some(location) = point.location {
            self.write_attr_coordinate("lat", location.lat)?;
            self.write_attr_coordinate("lon", location.lon)?;
        }
        if point.meta.tags.is_empty() {
            self.out.write_all(b"/>\n")?;
        } else {
            self.out.write_all(b">\n")?;
            self.write_tags(&point.meta)?;
            self.out.write_all(b"  </node>\n")?;
        }
        Ok(())
    }

    fn write_way(&mut self, way: &Way) -> Result<()> {
        self.ensure_open()?;
        self.out.write_all(b"  <way")?;
        self.write_header(way.id, way.version, &way.meta)?;
        if way.refs.is_empty() && way.meta.tags.is_empty() {
            self.out.write_all(b"/>\n")?;
            return Ok(());
        }
        self.out.write_all(b">\n")?;
        for &node in &way.refs {
            self.out.write_all(b"    <nd")?;
            self.write_attr_int("ref", node)?;
            self.out.write_all(b"/>\n")?;
        }
        self.write_tags(&way.meta)?;
        self.out.write_all(b"  </way>\n")?;
        Ok(())
    }

    fn write_relation(&mut self, relation: &Relation) -> Result<()> {
        self.ensure_open()?;
        self.out.write_all(b"  <relation")?;
        self.write_header(relation.id, relation.version, &relation.meta)?;
        if relation.members.is_empty() && relation.meta.tags.is_empty() {
            self.out.write_all(b"/>\n")?;
            return Ok(());
        }
        self.out.write_all(b">\n")?;
        for member in &relation.members {
            self.out.write_all(b"    <member")?;
            self.write_attr_str("type", member.kind.xml_name())?;
            self.write_attr_int("ref", member.id)?;
            self.write_attr_str("role", &member.role)?;
            self.out.write_all(b"/>\n")?;
        }
        self.write_tags(&relation.meta)?;
        self.out.write_all(b"  </relation>\n")?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.out.write_all(b"</osm>\n")?;
        self.out.finish()?;
        self.finished = true;
        Ok(())
    }
}
