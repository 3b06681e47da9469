//! Versioned map entities as delivered by an input source.
//!
//! Entities are plain owned data. The cut algorithms only look at ids,
//! coordinates, way references and relation members; everything in
//! [`Metadata`] is carried through to the output untouched.

use std::fmt;

/// Identifier of a point, way or relation. Unique per kind only.
pub type EntityId = u64;

/// The three entity kinds, in input stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Point,
    Way,
    Relation,
}

impl EntityKind {
    /// Name used for this kind in OSM XML (`node`, `way`, `relation`).
    pub fn xml_name(self) -> &'static str {
        match self {
            EntityKind::Point => "node",
            EntityKind::Way => "way",
            EntityKind::Relation => "relation",
        }
    }

    /// Parse an OSM XML member type.
    pub fn from_xml_name(name: &str) -> Option<Self> {
        match name {
            "node" => Some(EntityKind::Point),
            "way" => Some(EntityKind::Way),
            "relation" => Some(EntityKind::Relation),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xml_name())
    }
}

/// Opaque per-version payload, copied verbatim to every output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub user: Option<String>,
    pub uid: Option<u64>,
    pub changeset: Option<u64>,
    /// Timestamp exactly as it appeared in the input.
    pub timestamp: Option<String>,
    /// `None` when the input carried no visibility flag.
    pub visible: Option<bool>,
    pub tags: Vec<(String, String)>,
}

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A point (OSM node) version.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: EntityId,
    pub version: u32,
    pub meta: Metadata,
    /// Deleted versions in history files have no location.
    pub location: Option<Location>,
}

impl Point {
    pub fn new(id: EntityId, version: u32, lon: f64, lat: f64) -> Self {
        Self {
            id,
            version,
            meta: Metadata::default(),
            location: Some(Location::new(lon, lat)),
        }
    }
}

/// A way version: an ordered list of point references.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: EntityId,
    pub version: u32,
    pub meta: Metadata,
    pub refs: Vec<EntityId>,
}

impl Way {
    pub fn new(id: EntityId, version: u32, refs: Vec<EntityId>) -> Self {
        Self {
            id,
            version,
            meta: Metadata::default(),
            refs,
        }
    }

    /// Copy of this way with metadata and tags but a different reference list.
    pub fn with_refs(&self, refs: Vec<EntityId>) -> Self {
        Self {
            id: self.id,
            version: self.version,
            meta: self.meta.clone(),
            refs,
        }
    }
}

/// One typed, role-labelled reference of a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub kind: EntityKind,
    pub id: EntityId,
    pub role: String,
}

impl Member {
    pub fn new(kind: EntityKind, id: EntityId, role: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            role: role.into(),
        }
    }
}

/// A relation version.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: EntityId,
    pub version: u32,
    pub meta: Metadata,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn new(id: EntityId, version: u32, members: Vec<Member>) -> Self {
        Self {
            id,
            version,
            meta: Metadata::default(),
            members,
        }
    }

    /// Copy of this relation with metadata and tags but a different member list.
    pub fn with_members(&self, members: Vec<Member>) -> Self {
        Self {
            id: self.id,
            version: self.version,
            meta: self.meta.clone(),
            members,
        }
    }
}

/// Any entity of the input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Point(Point),
    Way(Way),
    Relation(Relation),
}

impl Entity {
    #[inline]
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Point(_) => EntityKind::Point,
            Entity::Way(_) => EntityKind::Way,
            Entity::Relation(_) => EntityKind::Relation,
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Point(p) => p.id,
            Entity::Way(w) => w.id,
            Entity::Relation(r) => r.id,
        }
    }

    #[inline]
    pub fn version(&self) -> u32 {
        match self {
            Entity::Point(p) => p.version,
            Entity::Way(w) => w.version,
            Entity::Relation(r) => r.version,
        }
    }
}

impl From<Point> for Entity {
    fn from(p: Point) -> Self {
        Entity::Point(p)
    }
}

impl From<Way> for Entity {
    fn from(w: Way) -> Self {
        Entity::Way(w)
    }
}

impl From<Relation> for Entity {
    fn from(r: Relation) -> Self {
        Entity::Relation(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_matches_stream_order() {
        assert!(EntityKind::Point < EntityKind::Way);
        assert!(EntityKind::Way < EntityKind::Relation);
    }

    #[test]
    fn test_xml_names_round_trip() {
        for kind in [EntityKind::Point, EntityKind::Way, EntityKind::Relation] {
            assert_eq!(EntityKind::from_xml_name(kind.xml_name()), Some(kind));
        }
        assert_eq!(EntityKind::from_xml_name("area"), None);
    }

    #[test]
    fn test_with_refs_keeps_metadata() {
        let mut way = Way::new(7, 3, vec![1, 2, 3]);
        way.meta.tags.push(("highway".into(), "residential".into()));
        way.meta.changeset = Some(42);

        let cropped = way.with_refs(vec![2]);
        assert_eq!(cropped.id, 7);
        assert_eq!(cropped.version, 3);
        assert_eq!(cropped.meta, way.meta);
        assert_eq!(cropped.refs, vec![2]);
    }
}
