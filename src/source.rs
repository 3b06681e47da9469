//! Entity sources and the single-pass stream driver.
//!
//! Cut algorithms require the input in a fixed global order:
//! 1. All point versions, ascending by id then version
//! 2. All way versions, same order
//! 3. All relation versions, same order
//!
//! [`scan`] feeds one pass of a source to a [`Handler`], validating that
//! order inline and deriving the three end-of-group signals from kind
//! transitions so every handler sees each signal exactly once per pass.

use log::{debug, info};

use crate::entity::{Entity, EntityId, EntityKind, Point, Relation, Way};
use crate::error::{Result, SplitError};

/// Log a progress line every this many entities.
pub const PROGRESS_INTERVAL: u64 = 1_000_000;

/// A sequential, re-openable stream of entities.
pub trait EntitySource {
    type Reader: Iterator<Item = Result<Entity>>;

    /// Open the input from its beginning.
    fn open(&mut self) -> Result<Self::Reader>;

    /// Whether [`open`](EntitySource::open) may be called more than once.
    fn is_rewindable(&self) -> bool {
        true
    }

    /// Human readable description for log lines.
    fn describe(&self) -> String;
}

/// Receiver of one pass over the input.
///
/// Methods are called in stream order; the `after_*` signals are delivered
/// exactly once each, in order, even if a group is empty.
pub trait Handler {
    fn point(&mut self, point: &Point) -> Result<()>;
    fn after_points(&mut self) -> Result<()>;
    fn way(&mut self, way: &Way) -> Result<()>;
    fn after_ways(&mut self) -> Result<()>;
    fn relation(&mut self, relation: &Relation) -> Result<()>;
    fn after_relations(&mut self) -> Result<()>;
}

/// Counts of entities seen during one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub points: u64,
    pub ways: u64,
    pub relations: u64,
}

impl ScanStats {
    pub fn total(&self) -> u64 {
        self.points + self.ways + self.relations
    }

    fn record(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Point => self.points += 1,
            EntityKind::Way => self.ways += 1,
            EntityKind::Relation => self.relations += 1,
        }
    }
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Points: {}, Ways: {}, Relations: {}",
            self.points, self.ways, self.relations
        )
    }
}

/// Inline stream order validator for use within the scan loop.
///
/// Validates that:
/// 1. Kind groups appear in point, way, relation order and never interleave
/// 2. Within a kind, ids are non-decreasing
/// 3. Within an id, versions are strictly increasing
#[derive(Debug, Default)]
pub struct StreamOrderValidator {
    prev: Option<(EntityKind, EntityId, u32)>,
    entity_count: u64,
}

impl StreamOrderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that the given entity keeps stream order.
    #[inline]
    pub fn validate(&mut self, kind: EntityKind, id: EntityId, version: u32) -> Result<()> {
        self.entity_count += 1;

        if let Some((prev_kind, prev_id, prev_version)) = self.prev {
            if kind < prev_kind {
                return Err(SplitError::Order(format!(
                    "{} {} at entity {} comes after {} entities",
                    kind, id, self.entity_count, prev_kind
                )));
            }
            if kind == prev_kind {
                if id < prev_id {
                    return Err(SplitError::Order(format!(
                        "{} {} at entity {} comes after {} {}",
                        kind, id, self.entity_count, kind, prev_id
                    )));
                }
                if id == prev_id && version <= prev_version {
                    return Err(SplitError::Order(format!(
                        "{} {} version {} at entity {} does not follow version {}",
                        kind, id, version, self.entity_count, prev_version
                    )));
                }
            }
        }

        self.prev = Some((kind, id, version));
        Ok(())
    }

    /// Number of entities validated.
    pub fn entity_count(&self) -> u64 {
        self.entity_count
    }
}

/// Tracks which end-of-group signals have been delivered.
struct Boundaries {
    delivered: u8,
}

impl Boundaries {
    /// Deliver every signal that precedes entities of `kind`.
    fn advance_to<H: Handler>(&mut self, kind: EntityKind, handler: &mut H) -> Result<()> {
        let target = match kind {
            EntityKind::Point => 0,
            EntityKind::Way => 1,
            EntityKind::Relation => 2,
        };
        self.deliver_until(target, handler)
    }

    fn finish<H: Handler>(&mut self, handler: &mut H) -> Result<()> {
        self.deliver_until(3, handler)
    }

    fn deliver_until<H: Handler>(&mut self, target: u8, handler: &mut H) -> Result<()> {
        while self.delivered < target {
            match self.delivered {
                0 => handler.after_points()?,
                1 => handler.after_ways()?,
                _ => handler.after_relations()?,
            }
            self.delivered += 1;
        }
        Ok(())
    }
}

/// Run one full pass of `source` through `handler`.
///
/// With `validate` set, out-of-order input aborts the pass with
/// [`SplitError::Order`] before the offending entity reaches the handler.
pub fn scan<S, H>(source: &mut S, handler: &mut H, validate: bool) -> Result<ScanStats>
where
    S: EntitySource + ?Sized,
    H: Handler,
{
    info!(source = source.describe().as_str(); "Scanning input");

    let mut stats = ScanStats::default();
    let mut validator = StreamOrderValidator::new();
    let mut boundaries = Boundaries { delivered: 0 };

    for result in source.open()? {
        let entity = result?;
        let kind = entity.kind();

        if validate {
            validator.validate(kind, entity.id(), entity.version())?;
        }
        boundaries.advance_to(kind, handler)?;

        match &entity {
            Entity::Point(p) => handler.point(p)?,
            Entity::Way(w) => handler.way(w)?,
            Entity::Relation(r) => handler.relation(r)?,
        }

        stats.record(kind);
        if stats.total() % PROGRESS_INTERVAL == 0 {
            info!(entities = stats.total(), kind = kind.xml_name(); "Scan progress");
        }
    }

    boundaries.finish(handler)?;
    debug!(points = stats.points, ways = stats.ways, relations = stats.relations; "Scan finished");
    Ok(stats)
}

/// In-memory, rewindable source.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    entities: Vec<Entity>,
}

impl VecSource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

impl FromIterator<Entity> for VecSource {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl EntitySource for VecSource {
    type Reader = std::vec::IntoIter<Result<Entity>>;

    fn open(&mut self) -> Result<Self::Reader> {
        let entities: Vec<Result<Entity>> = self.entities.iter().cloned().map(Ok).collect();
        Ok(entities.into_iter())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} entities)", self.entities.len())
    }
}
