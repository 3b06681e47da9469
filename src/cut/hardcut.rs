//! Single-pass hard cut.
//!
//! # Algorithm
//!
//! For every extract independently:
//! 1. A point inside the region is written and its id recorded
//! 2. A way is cropped to the recorded points it references, in original
//!    order; if at least 2 remain the cropped way is written and its id
//!    recorded, otherwise it is dropped
//! 3. A relation is cropped to its point and way members that were
//!    recorded; if any remain the cropped relation is written
//!
//! # Limitations
//!
//! - Ways with only one point inside are missing
//! - Relation members of kind relation are never kept, so relations that
//!   only reference other relations are missing
//!
//! # Memory Complexity
//!
//! Two sparse id sets per extract (points, ways).

use log::{debug, info};

use crate::cut::{CutMode, CutReport};
use crate::entity::{EntityId, EntityKind, Member, Point, Relation, Way};
use crate::error::{Result, SplitError};
use crate::extract::{ExtractSet, Sink};
use crate::id_set::SparseIdSet;
use crate::source::{scan, EntitySource, Handler};

/// Ids written to one extract so far.
#[derive(Debug, Default)]
pub struct HardCutTrackers {
    pub points: SparseIdSet,
    pub ways: SparseIdSet,
}

impl HardCutTrackers {
    /// Segments touched across both sets.
    pub fn segments_allocated(&self) -> usize {
        self.points.segments_allocated() + self.ways.segments_allocated()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.points.allocated_bytes() + self.ways.allocated_bytes()
    }
}

/// Position of the hard cut in the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardCutState {
    BeforePoints,
    BetweenPointsAndWays,
    BetweenWaysAndRelations,
    Done,
}

/// Single-pass cut that writes cropped entities immediately.
pub struct HardCut<S> {
    extracts: ExtractSet<S, HardCutTrackers>,
    state: HardCutState,
}

impl<S: Sink> HardCut<S> {
    pub fn new(extracts: ExtractSet<S>) -> Self {
        Self {
            extracts: extracts.with_trackers(),
            state: HardCutState::BeforePoints,
        }
    }

    pub fn state(&self) -> HardCutState {
        self.state
    }

    pub fn extracts(&self) -> &ExtractSet<S, HardCutTrackers> {
        &self.extracts
    }

    /// Run the single pass and finalize every sink.
    pub fn run<Src>(mut self, source: &mut Src, validate: bool) -> Result<CutReport<S>>
    where
        Src: EntitySource + ?Sized,
    {
        info!(extracts = self.extracts.len(); "Hard cut started");
        let stats = scan(source, &mut self, validate)?;
        info!(points = stats.points, ways = stats.ways, relations = stats.relations; "Hard cut finished");

        for extract in self.extracts.iter() {
            let t = extract.trackers();
            info!(
                extract = extract.name(),
                segments = t.segments_allocated(),
                tracker_bytes = t.allocated_bytes();
                "Tracker memory"
            );
        }

        Ok(CutReport {
            mode: CutMode::Hard,
            passes: vec![stats],
            extracts: self.extracts.finish()?,
        })
    }

    fn expect_state(&self, expected: HardCutState, what: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SplitError::State(format!(
                "{} while hard cut is in state {:?}",
                what, self.state
            )))
        }
    }

    fn advance(&mut self, from: HardCutState, to: HardCutState, signal: &str) -> Result<()> {
        self.expect_state(from, signal)?;
        debug!(from = format!("{:?}", from).as_str(), to = format!("{:?}", to).as_str(); "Hard cut state change");
        self.state = to;
        Ok(())
    }
}

/// Referenced point ids of `way` that are recorded in `points`, in order.
fn crop_refs(way: &Way, points: &SparseIdSet) -> Vec<EntityId> {
    way.refs
        .iter()
        .copied()
        .filter(|&id| points.get(id))
        .collect()
}

/// Members of `relation` whose point or way target is recorded.
fn crop_members(relation: &Relation, trackers: &HardCutTrackers) -> Vec<Member> {
    relation
        .members
        .iter()
        .filter(|m| match m.kind {
            EntityKind::Point => trackers.points.get(m.id),
            EntityKind::Way => trackers.ways.get(m.id),
            EntityKind::Relation => false,
        })
        .cloned()
        .collect()
}

impl<S: Sink> Handler for HardCut<S> {
    fn point(&mut self, point: &Point) -> Result<()> {
        self.expect_state(HardCutState::BeforePoints, "point")?;
        let Some(location) = point.location else {
            return Ok(());
        };

        self.extracts.try_for_each(|extract| {
            if extract.region.contains(location.lon, location.lat) {
                debug!(extract = extract.name(), id = point.id, version = point.version; "point inside");
                extract.write_point(point)?;
                extract.trackers.points.set(point.id);
            }
            Ok(())
        })
    }

    fn after_points(&mut self) -> Result<()> {
        self.advance(
            HardCutState::BeforePoints,
            HardCutState::BetweenPointsAndWays,
            "end of points",
        )
    }

    fn way(&mut self, way: &Way) -> Result<()> {
        self.expect_state(HardCutState::BetweenPointsAndWays, "way")?;

        self.extracts.try_for_each(|extract| {
            let refs = crop_refs(way, &extract.trackers.points);
            if refs.len() < 2 {
                if !refs.is_empty() {
                    debug!(extract = extract.name(), id = way.id, version = way.version; "way would only be 1 point long, skipping");
                }
                return Ok(());
            }

            debug!(extract = extract.name(), id = way.id, version = way.version, refs = refs.len(); "writing cropped way");
            extract.write_way(&way.with_refs(refs))?;
            extract.trackers.ways.set(way.id);
            Ok(())
        })
    }

    fn after_ways(&mut self) -> Result<()> {
        self.advance(
            HardCutState::BetweenPointsAndWays,
            HardCutState::BetweenWaysAndRelations,
            "end of ways",
        )
    }

    fn relation(&mut self, relation: &Relation) -> Result<()> {
        self.expect_state(HardCutState::BetweenWaysAndRelations, "relation")?;

        self.extracts.try_for_each(|extract| {
            let members = crop_members(relation, &extract.trackers);
            if members.is_empty() {
                return Ok(());
            }

            debug!(extract = extract.name(), id = relation.id, version = relation.version, members = members.len(); "writing cropped relation");
            extract.write_relation(&relation.with_members(members))
        })
    }

    fn after_relations(&mut self) -> Result<()> {
        self.advance(
            HardCutState::BetweenWaysAndRelations,
            HardCutState::Done,
            "end of relations",
        )
    }
}
