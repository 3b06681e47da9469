//! Streaming OSM XML parser.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use xz::bufread::XzDecoder;

use crate::entity::{Entity, EntityKind, Location, Member, Metadata, Point, Relation, Way};
use crate::error::{Result, SplitError};
use crate::osm::{is_xz, DEFAULT_INPUT_BUFFER};
use crate::source::EntitySource;

/// Fast u64 parsing straight from attribute bytes.
///
/// Returns None if the input is empty, contains non-digit characters or
/// overflows.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Signed variant of [`parse_u64_fast`] for files that use negative ids
/// (objects not yet uploaded, as saved by editors).
#[inline]
pub fn parse_i64_fast(bytes: &[u8]) -> Option<i64> {
    match bytes.split_first() {
        Some((b'-', digits)) => parse_u64_fast(digits).and_then(|n| 0i64.checked_sub_unsigned(n)),
        _ => parse_u64_fast(bytes).and_then(|n| i64::try_from(n).ok()),
    }
}

fn parse_u64_attr(value: &[u8], name: &str, pos: u64) -> Result<u64> {
    parse_u64_fast(value).ok_or_else(|| {
        SplitError::parse(
            format!("byte {}", pos),
            format!(
                "invalid {} '{}'",
                name,
                String::from_utf8_lossy(value)
            ),
        )
    })
}

fn parse_f64_attr(value: &[u8], name: &str, pos: u64) -> Result<f64> {
    str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            SplitError::parse(
                format!("byte {}", pos),
                format!(
                    "invalid {} '{}'",
                    name,
                    String::from_utf8_lossy(value)
                ),
            )
        })
}

/// Build an entity (without children) from its opening element.
fn parse_entity(e: &BytesStart<'_>, kind: EntityKind, pos: u64) -> Result<Entity> {
    let mut id = None;
    let mut version: u32 = 0;
    let mut meta = Metadata::default();
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"id" => id = Some(parse_u64_attr(&attr.value, "id", pos)?),
            b"version" => {
                let v = parse_u64_attr(&attr.value, "version", pos)?;
                version = u32::try_from(v).map_err(|_| {
                    SplitError::parse(format!("byte {}", pos), format!("version {} too large", v))
                })?;
            }
            b"changeset" => meta.changeset = Some(parse_u64_attr(&attr.value, "changeset", pos)?),
            b"uid" => meta.uid = Some(parse_u64_attr(&attr.value, "uid", pos)?),
            b"user" => meta.user = Some(attr.unescape_value()?.into_owned()),
            b"timestamp" => meta.timestamp = Some(attr.unescape_value()?.into_owned()),
            b"visible" => {
                meta.visible = match attr.value.as_ref() {
                    b"true" => Some(true),
                    b"false" => Some(false),
                    other => {
                        return Err(SplitError::parse(
                            format!("byte {}", pos),
                            format!("invalid visible '{}'", String::from_utf8_lossy(other)),
                        ))
                    }
                }
            }
            b"lat" => lat = Some(parse_f64_attr(&attr.value, "lat", pos)?),
            b"lon" => lon = Some(parse_f64_attr(&attr.value, "lon", pos)?),
            _ => {}
        }
    }

    let id = id.ok_or_else(|| {
        SplitError::parse(format!("byte {}", pos), format!("{} without id", kind))
    })?;

    Ok(match kind {
        EntityKind::Point => Entity::Point(Point {
            id,
            version,
            meta,
            location: match (lon, lat) {
                (Some(lon), Some(lat)) => Some(Location::new(lon, lat)),
                _ => None,
            },
        }),
        EntityKind::Way => Entity::Way(Way {
            id,
            version,
            meta,
            refs: Vec::new(),
        }),
        EntityKind::Relation => Entity::Relation(Relation {
            id,
            version,
            meta,
            members: Vec::new(),
        }),
    })
}

fn entity_kind(name: &[u8]) -> Option<EntityKind> {
    match name {
        b"node" => Some(EntityKind::Point),
        b"way" => Some(EntityKind::Way),
        b"relation" => Some(EntityKind::Relation),
        _ => None,
    }
}

fn metadata_mut(entity: &mut Entity) -> &mut Metadata {
    match entity {
        Entity::Point(p) => &mut p.meta,
        Entity::Way(w) => &mut w.meta,
        Entity::Relation(r) => &mut r.meta,
    }
}

/// Attach a `<tag>`, `<nd>` or `<member>` child to the open entity.
fn add_child(entity: &mut Entity, e: &BytesStart<'_>, pos: u64) -> Result<()> {
    match e.name().as_ref() {
        b"tag" => {
            let mut key = None;
            let mut value = None;
            for attr in e.attributes() {
                let attr = attr?;
                match attr.key.as_ref() {
                    b"k" => key = Some(attr.unescape_value()?.into_owned()),
                    b"v" => value = Some(attr.unescape_value()?.into_owned()),
                    _ => {}
                }
            }
            if let (Some(k), Some(v)) = (key, value) {
                metadata_mut(entity).tags.push((k, v));
            }
        }
        b"nd" => {
            if let Entity::Way(way) = entity {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"ref" {
                        way.refs.push(parse_u64_attr(&attr.value, "nd ref", pos)?);
                    }
                }
            }
        }
        b"member" => {
            if let Entity::Relation(relation) = entity {
                let mut kind = None;
                let mut id = None;
                let mut role = String::new();
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"type" => {
                            let name = attr.unescape_value()?;
                            kind = Some(EntityKind::from_xml_name(&name).ok_or_else(|| {
                                SplitError::parse(
                                    format!("byte {}", pos),
                                    format!("unknown member type '{}'", name),
                                )
                            })?);
                        }
                        b"ref" => id = Some(parse_u64_attr(&attr.value, "member ref", pos)?),
                        b"role" => role = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                match (kind, id) {
                    (Some(kind), Some(id)) => relation.members.push(Member { kind, id, role }),
                    _ => {
                        return Err(SplitError::parse(
                            format!("byte {}", pos),
                            "member without type or ref",
                        ))
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Streaming OSM XML reader yielding one entity at a time.
///
/// Memory use is bounded by the largest single entity.
pub struct OsmXmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Entity whose closing tag has not been seen yet.
    open: Option<Entity>,
    done: bool,
}

impl<R: BufRead> OsmXmlReader<R> {
    pub fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            open: None,
            done: false,
        }
    }

    /// Read the next entity, or `None` at end of input.
    pub fn read_entity(&mut self) -> Result<Option<Entity>> {
        loop {
            self.buf.clear();
            let pos = self.reader.buffer_position() as u64;
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Eof => {
                    if let Some(entity) = &self.open {
                        return Err(SplitError::parse(
                            format!("byte {}", pos),
                            format!("unexpected end of input inside {} {}", entity.kind(), entity.id()),
                        ));
                    }
                    return Ok(None);
                }
                Event::Start(e) => match entity_kind(e.name().as_ref()) {
                    Some(kind) => self.open = Some(parse_entity(&e, kind, pos)?),
                    None => {
                        if let Some(entity) = self.open.as_mut() {
                            add_child(entity, &e, pos)?;
                        }
                    }
                },
                Event::Empty(e) => match entity_kind(e.name().as_ref()) {
                    Some(kind) => return parse_entity(&e, kind, pos).map(Some),
                    None => {
                        if let Some(entity) = self.open.as_mut() {
                            add_child(entity, &e, pos)?;
                        }
                    }
                },
                Event::End(e) => {
                    if entity_kind(e.name().as_ref()).is_some() {
                        if let Some(entity) = self.open.take() {
                            return Ok(Some(entity));
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for OsmXmlReader<R> {
    type Item = Result<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_entity() {
            Ok(Some(entity)) => Some(Ok(entity)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open an OSM file for buffered reading, decompressing `.xz` files.
pub fn open_path(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = BufReader::with_capacity(DEFAULT_INPUT_BUFFER, File::open(path)?);
    Ok(if is_xz(path) {
        Box::new(BufReader::with_capacity(
            DEFAULT_INPUT_BUFFER,
            XzDecoder::new(file),
        ))
    } else {
        Box::new(file)
    })
}

#[derive(Debug, Clone)]
enum Input {
    Path(PathBuf),
    Stdin,
}

/// OSM XML file (plain or `.xz`) or stdin as an [`EntitySource`].
#[derive(Debug, Clone)]
pub struct OsmXmlSource {
    input: Input,
    opened: bool,
}

impl OsmXmlSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            input: Input::Path(path.as_ref().to_path_buf()),
            opened: false,
        }
    }

    /// Standard input; can only be read once.
    pub fn stdin() -> Self {
        Self {
            input: Input::Stdin,
            opened: false,
        }
    }

    /// `-` means stdin, anything else a path.
    pub fn from_arg<P: AsRef<Path>>(arg: P) -> Self {
        if arg.as_ref().to_string_lossy() == "-" {
            Self::stdin()
        } else {
            Self::from_path(arg)
        }
    }
}

impl EntitySource for OsmXmlSource {
    type Reader = OsmXmlReader<Box<dyn BufRead>>;

    fn open(&mut self) -> Result<Self::Reader> {
        let inner: Box<dyn BufRead> = match &self.input {
            Input::Path(path) => open_path(path)?,
            Input::Stdin => {
                if self.opened {
                    return Err(SplitError::NotRewindable("stdin".to_string()));
                }
                Box::new(io::stdin().lock())
            }
        };
        self.opened = true;
        Ok(OsmXmlReader::new(inner))
    }

    fn is_rewindable(&self) -> bool {
        matches!(self.input, Input::Path(_))
    }

    fn describe(&self) -> String {
        match &self.input {
            Input::Path(path) => path.display().to_string(),
            Input::Stdin => "stdin".to_string(),
        }
    }
}
