//! Two-pass soft cut with transitive relation closure.
//!
//! # Algorithm
//!
//! Pass one ("scan") only fills trackers, per extract:
//! 1. A point inside the region is recorded in `points`
//! 2. A way referencing any recorded point is recorded in `ways`, and every
//!    point referenced by any version of that way in `extra_points`
//! 3. A relation with a recorded point, way or relation member is recorded
//!    in `relations`, then every earlier relation that referenced it is
//!    recorded too, transitively
//!
//! Pass two ("copy") re-reads the input and writes every entity unmodified
//! to each extract whose tracker holds its id.
//!
//! # Relation closure
//!
//! While scanning, every relation member of kind relation adds a pending
//! edge `member -> referencing relation` (once per run, shared by all
//! extracts). A reference to a relation that was already recorded is a
//! direct hit. A reference to a relation recorded later is resolved when
//! that relation is recorded, by walking its pending edges with an explicit
//! stack. Already recorded ids are not pushed again, so cycles terminate.
//!
//! # Memory Complexity
//!
//! Four sparse id sets per extract plus one pending edge per
//! relation-to-relation membership.

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::cut::{CutMode, CutReport};
use crate::entity::{EntityId, EntityKind, Point, Relation, Way};
use crate::error::{Result, SplitError};
use crate::extract::{ExtractSet, Sink};
use crate::id_set::SparseIdSet;
use crate::source::{scan, EntitySource, Handler, ScanStats};

/// Ids selected for one extract.
#[derive(Debug, Default)]
pub struct SoftCutTrackers {
    /// Points inside the region.
    pub points: SparseIdSet,
    /// Points outside the region referenced by a selected way.
    pub extra_points: SparseIdSet,
    pub ways: SparseIdSet,
    pub relations: SparseIdSet,
}

impl SoftCutTrackers {
    /// Segments touched across all four sets.
    pub fn segments_allocated(&self) -> usize {
        self.points.segments_allocated()
            + self.extra_points.segments_allocated()
            + self.ways.segments_allocated()
            + self.relations.segments_allocated()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.points.allocated_bytes()
            + self.extra_points.allocated_bytes()
            + self.ways.allocated_bytes()
            + self.relations.allocated_bytes()
    }

    /// True if a member reference is already selected.
    #[inline]
    fn has_member(&self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Point => self.points.get(id),
            EntityKind::Way => self.ways.get(id),
            EntityKind::Relation => self.relations.get(id),
        }
    }
}

/// Relation-to-relation references whose target was not yet selected,
/// keyed by the referenced relation.
#[derive(Debug, Default)]
pub struct PendingRelations {
    edges: FxHashMap<EntityId, Vec<EntityId>>,
    len: usize,
}

impl PendingRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `referencing` has `referenced` as a member.
    pub fn record(&mut self, referenced: EntityId, referencing: EntityId) {
        let referrers = self.edges.entry(referenced).or_default();
        // versions of one relation arrive consecutively
        if referrers.last() != Some(&referencing) {
            referrers.push(referencing);
            self.len += 1;
        }
    }

    /// Relations recorded as referencing `id`.
    pub fn referrers(&self, id: EntityId) -> &[EntityId] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Record every relation that transitively references `root` in
/// `relations`. `root` itself must already be recorded.
///
/// Returns the number of newly recorded relations.
fn cascade(relations: &mut SparseIdSet, pending: &PendingRelations, root: EntityId) -> usize {
    let mut stack = vec![root];
    let mut added = 0;
    while let Some(id) = stack.pop() {
        for &referrer in pending.referrers(id) {
            if !relations.get(referrer) {
                relations.set(referrer);
                stack.push(referrer);
                added += 1;
            }
        }
    }
    added
}

/// Which of the two passes the soft cut is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftCutPass {
    Scan,
    Copy,
}

/// Two-pass, reference-complete cut.
pub struct SoftCut<S> {
    extracts: ExtractSet<S, SoftCutTrackers>,
    pending: PendingRelations,
    pass: SoftCutPass,
    /// Way currently accumulating referenced points across its versions.
    current_way: Option<EntityId>,
    current_way_refs: Vec<EntityId>,
}

impl<S: Sink> SoftCut<S> {
    pub fn new(extracts: ExtractSet<S>) -> Self {
        Self {
            extracts: extracts.with_trackers(),
            pending: PendingRelations::new(),
            pass: SoftCutPass::Scan,
            current_way: None,
            current_way_refs: Vec::new(),
        }
    }

    pub fn pass(&self) -> SoftCutPass {
        self.pass
    }

    pub fn extracts(&self) -> &ExtractSet<S, SoftCutTrackers> {
        &self.extracts
    }

    pub fn pending(&self) -> &PendingRelations {
        &self.pending
    }

    /// Run both passes and finalize every sink.
    ///
    /// The source must be rewindable; this is checked before anything is read.
    pub fn run<Src>(mut self, source: &mut Src, validate: bool) -> Result<CutReport<S>>
    where
        Src: EntitySource + ?Sized,
    {
        if !source.is_rewindable() {
            return Err(SplitError::NotRewindable(source.describe()));
        }

        let first = self.run_scan_pass(source, validate)?;
        let second = self.run_copy_pass(source, validate)?;

        Ok(CutReport {
            mode: CutMode::Soft,
            passes: vec![first, second],
            extracts: self.extracts.finish()?,
        })
    }

    /// Pass one: fill trackers without writing anything.
    pub fn run_scan_pass<Src>(&mut self, source: &mut Src, validate: bool) -> Result<ScanStats>
    where
        Src: EntitySource + ?Sized,
    {
        self.pass = SoftCutPass::Scan;
        info!(extracts = self.extracts.len(); "Soft cut first pass started");
        let stats = scan(source, self, validate)?;
        info!(pending_relations = self.pending.len(); "Soft cut first pass finished");

        for extract in self.extracts.iter() {
            let t = extract.trackers();
            info!(
                extract = extract.name(),
                points = t.points.count(),
                extra_points = t.extra_points.count(),
                ways = t.ways.count(),
                relations = t.relations.count();
                "Selected ids"
            );
            info!(
                extract = extract.name(),
                segments = t.segments_allocated(),
                tracker_bytes = t.allocated_bytes();
                "Tracker memory"
            );
        }
        Ok(stats)
    }

    /// Pass two: copy selected entities to their extracts.
    pub fn run_copy_pass<Src>(&mut self, source: &mut Src, validate: bool) -> Result<ScanStats>
    where
        Src: EntitySource + ?Sized,
    {
        self.pass = SoftCutPass::Copy;
        info!("Soft cut second pass started");
        let stats = scan(source, self, validate)?;
        info!("Soft cut second pass finished");
        Ok(stats)
    }

    /// Pull every point of the finished way into `extra_points` of each
    /// extract that selected it.
    fn flush_way_refs(&mut self) -> Result<()> {
        let Some(way_id) = self.current_way.take() else {
            return Ok(());
        };

        let mut refs = std::mem::take(&mut self.current_way_refs);
        refs.sort_unstable();
        refs.dedup();

        let result = self.extracts.try_for_each(|extract| {
            if extract.trackers.ways.get(way_id) {
                debug!(extract = extract.name(), id = way_id, points = refs.len(); "recording extra points");
                for &id in &refs {
                    extract.trackers.extra_points.set(id);
                }
            }
            Ok(())
        });

        refs.clear();
        self.current_way_refs = refs;
        result
    }

    fn scan_point(&mut self, point: &Point) -> Result<()> {
        let Some(location) = point.location else {
            return Ok(());
        };
        self.extracts.try_for_each(|extract| {
            if extract.region.contains(location.lon, location.lat) {
                debug!(extract = extract.name(), id = point.id, version = point.version; "point inside");
                extract.trackers.points.set(point.id);
            }
            Ok(())
        })
    }

    fn scan_way(&mut self, way: &Way) -> Result<()> {
        if self.current_way != Some(way.id) {
            self.flush_way_refs()?;
            self.current_way = Some(way.id);
        }
        self.current_way_refs.extend_from_slice(&way.refs);

        self.extracts.try_for_each(|extract| {
            let t = &mut extract.trackers;
            if let Some(&hit) = way.refs.iter().find(|&&id| t.points.get(id)) {
                debug!(extract = extract.name.as_str(), id = way.id, point = hit; "way has a point inside");
                t.ways.set(way.id);
            }
            Ok(())
        })
    }

    fn scan_relation(&mut self, relation: &Relation) -> Result<()> {
        for member in &relation.members {
            if member.kind == EntityKind::Relation {
                self.pending.record(member.id, relation.id);
            }
        }

        let pending = &self.pending;
        self.extracts.try_for_each(|extract| {
            let t = &mut extract.trackers;
            if t.relations.get(relation.id) {
                return Ok(());
            }

            let hit = relation.members.iter().find(|m| t.has_member(m.kind, m.id));
            if let Some(member) = hit {
                t.relations.set(relation.id);
                let cascaded = cascade(&mut t.relations, pending, relation.id);
                debug!(
                    extract = extract.name.as_str(),
                    id = relation.id,
                    member_kind = member.kind.xml_name(),
                    member = member.id,
                    cascaded = cascaded;
                    "relation has a member inside"
                );
            }
            Ok(())
        })
    }

    fn copy_point(&mut self, point: &Point) -> Result<()> {
        self.extracts.try_for_each(|extract| {
            let t = &extract.trackers;
            if t.points.get(point.id) || t.extra_points.get(point.id) {
                extract.write_point(point)?;
            }
            Ok(())
        })
    }

    fn copy_way(&mut self, way: &Way) -> Result<()> {
        self.extracts.try_for_each(|extract| {
            if extract.trackers.ways.get(way.id) {
                extract.write_way(way)?;
            }
            Ok(())
        })
    }

    fn copy_relation(&mut self, relation: &Relation) -> Result<()> {
        self.extracts.try_for_each(|extract| {
            if extract.trackers.relations.get(relation.id) {
                extract.write_relation(relation)?;
            }
            Ok(())
        })
    }
}

impl<S: Sink> Handler for SoftCut<S> {
    fn point(&mut self, point: &Point) -> Result<()> {
        match self.pass {
            SoftCutPass::Scan => self.scan_point(point),
            SoftCutPass::Copy => self.copy_point(point),
        }
    }

    fn after_points(&mut self) -> Result<()> {
        debug!(pass = format!("{:?}", self.pass).as_str(); "after points");
        Ok(())
    }

    fn way(&mut self, way: &Way) -> Result<()> {
        match self.pass {
            SoftCutPass::Scan => self.scan_way(way),
            SoftCutPass::Copy => self.copy_way(way),
        }
    }

    fn after_ways(&mut self) -> Result<()> {
        debug!(pass = format!("{:?}", self.pass).as_str(); "after ways");
        match self.pass {
            SoftCutPass::Scan => self.flush_way_refs(),
            SoftCutPass::Copy => Ok(()),
        }
    }

    fn relation(&mut self, relation: &Relation) -> Result<()> {
        match self.pass {
            SoftCutPass::Scan => self.scan_relation(relation),
            SoftCutPass::Copy => self.copy_relation(relation),
        }
    }

    fn after_relations(&mut self) -> Result<()> {
        debug!(pass = format!("{:?}", self.pass).as_str(); "after relations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Member};
    use crate::extract::MemorySink;
    use crate::region::BoundingBox;
    use crate::source::VecSource;

    fn single_extract() -> ExtractSet<MemorySink> {
        let mut set = ExtractSet::new();
        set.add_extract(
            "test",
            Box::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            MemorySink::new(),
        )
        .unwrap();
        set
    }

    fn inside(id: u64) -> Entity {
        Point::new(id, 1, 5.0, 5.0).into()
    }

    fn outside(id: u64) -> Entity {
        Point::new(id, 1, 50.0, 50.0).into()
    }

    fn rel(id: u64, members: &[(EntityKind, u64)]) -> Entity {
        Relation::new(
            id,
            1,
            members
                .iter()
                .map(|&(kind, target)| Member::new(kind, target, ""))
                .collect(),
        )
        .into()
    }

    /// Run pass one only and return the cut for tracker inspection.
    fn scan_only(entities: Vec<Entity>) -> SoftCut<MemorySink> {
        let mut source = VecSource::new(entities);
        let mut cut = SoftCut::new(single_extract());
        cut.run_scan_pass(&mut source, true).unwrap();
        cut
    }

    fn run(entities: Vec<Entity>) -> MemorySink {
        let mut source = VecSource::new(entities);
        let report = SoftCut::new(single_extract())
            .run(&mut source, true)
            .unwrap();
        report.extracts.into_iter().next().unwrap().sink
    }

    fn relations_of(cut: &SoftCut<MemorySink>) -> &SparseIdSet {
        &cut.extracts().iter().next().unwrap().trackers().relations
    }

    #[test]
    fn test_scan_pass_writes_nothing() {
        let cut = scan_only(vec![inside(1), Way::new(1, 1, vec![1]).into()]);
        let extract = cut.extracts().iter().next().unwrap();
        assert_eq!(extract.written().points, 0);
        assert_eq!(extract.written().ways, 0);
    }

    #[test]
    fn test_way_pulls_in_outside_points() {
        let entities = vec![
            outside(1),
            inside(2),
            outside(3),
            outside(4),
            Way::new(10, 1, vec![1, 2, 3]).into(),
        ];

        let cut = scan_only(entities.clone());
        let t = cut.extracts().iter().next().unwrap().trackers();
        assert!(t.ways.get(10));
        assert!(t.points.get(2));
        assert!(!t.points.get(1));
        for id in [1, 2, 3] {
            assert!(t.extra_points.get(id));
        }
        assert!(!t.extra_points.get(4));

        let sink = run(entities);
        assert_eq!(sink.point_ids(), vec![1, 2, 3]);
        assert_eq!(sink.ways.len(), 1);
        assert_eq!(sink.ways[0].refs, vec![1, 2, 3]);
    }

    #[test]
    fn test_tracker_memory_counts_touched_segments() {
        let cut = scan_only(vec![
            inside(1),
            outside(2),
            Way::new(10, 1, vec![1, 2]).into(),
        ]);
        let t = cut.extracts().iter().next().unwrap().trackers();
        // points, extra_points and ways hold one segment each; relations none
        assert_eq!(t.segments_allocated(), 3);
        assert_eq!(t.relations.segments_allocated(), 0);
        assert_eq!(t.allocated_bytes(), 3 * t.points.allocated_bytes());
    }

    #[test]
    fn test_extra_points_cover_all_way_versions() {
        let sink = run(vec![
            outside(1),
            inside(2),
            outside(3),
            Way::new(10, 1, vec![1, 3]).into(),
            Way::new(10, 2, vec![2, 3]).into(),
        ]);
        assert_eq!(sink.point_ids(), vec![1, 2, 3]);
        let versions: Vec<_> = sink.ways.iter().map(|w| w.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_unselected_way_pulls_nothing() {
        let cut = scan_only(vec![
            outside(1),
            outside(2),
            inside(3),
            Way::new(10, 1, vec![1, 2]).into(),
        ]);
        let t = cut.extracts().iter().next().unwrap().trackers();
        assert!(!t.ways.get(10));
        assert!(!t.extra_points.get(1));
    }

    #[test]
    fn test_forward_relation_reference() {
        let cut = scan_only(vec![
            inside(1),
            rel(1, &[(EntityKind::Point, 1)]),
            rel(2, &[(EntityKind::Relation, 1)]),
        ]);
        let relations = relations_of(&cut);
        assert!(relations.get(1));
        assert!(relations.get(2));
    }

    #[test]
    fn test_backward_relation_reference() {
        let cut = scan_only(vec![
            inside(1),
            rel(1, &[(EntityKind::Relation, 2)]),
            rel(2, &[(EntityKind::Point, 1)]),
        ]);
        let relations = relations_of(&cut);
        assert!(relations.get(2));
        assert!(relations.get(1));
    }

    #[test]
    fn test_backward_chain_cascades() {
        // 1 -> 2 -> 3 -> point, scanned 1, 2, 3
        let cut = scan_only(vec![
            inside(1),
            rel(1, &[(EntityKind::Relation, 2)]),
            rel(2, &[(EntityKind::Relation, 3)]),
            rel(3, &[(EntityKind::Point, 1)]),
            rel(4, &[(EntityKind::Relation, 99)]),
        ]);
        let relations = relations_of(&cut);
        for id in [1, 2, 3] {
            assert!(relations.get(id), "relation {} not selected", id);
        }
        assert!(!relations.get(4));
    }

    #[test]
    fn test_mixed_forward_and_backward() {
        // 2 references 3 (backward); 4 references 2 (forward, after 2 is marked)
        let cut = scan_only(vec![
            inside(1),
            rel(2, &[(EntityKind::Relation, 3)]),
            rel(3, &[(EntityKind::Point, 1)]),
            rel(4, &[(EntityKind::Relation, 2)]),
        ]);
        let relations = relations_of(&cut);
        assert!(relations.get(2) && relations.get(3) && relations.get(4));
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let cut = scan_only(vec![
            inside(1),
            rel(1, &[(EntityKind::Relation, 2)]),
            rel(2, &[(EntityKind::Relation, 1), (EntityKind::Relation, 3)]),
            rel(3, &[(EntityKind::Relation, 3), (EntityKind::Point, 1)]),
        ]);
        let relations = relations_of(&cut);
        assert!(relations.get(1) && relations.get(2) && relations.get(3));
    }

    #[test]
    fn test_cycle_without_hit_stays_unselected() {
        let cut = scan_only(vec![
            outside(1),
            rel(1, &[(EntityKind::Relation, 2)]),
            rel(2, &[(EntityKind::Relation, 1), (EntityKind::Point, 1)]),
        ]);
        let relations = relations_of(&cut);
        assert!(!relations.get(1) && !relations.get(2));
    }

    #[test]
    fn test_missing_relation_reference_is_not_an_error() {
        let sink = run(vec![
            inside(1),
            rel(5, &[(EntityKind::Relation, 12345), (EntityKind::Point, 1)]),
        ]);
        assert_eq!(sink.relation_ids(), vec![5]);
        assert_eq!(sink.relations[0].members.len(), 2);
    }

    #[test]
    fn test_copy_pass_writes_unmodified_entities() {
        let mut relation = Relation::new(
            7,
            3,
            vec![
                Member::new(EntityKind::Way, 10, "outer"),
                Member::new(EntityKind::Way, 999, "inner"),
            ],
        );
        relation.meta.tags.push(("type".into(), "multipolygon".into()));

        let sink = run(vec![
            inside(1),
            outside(2),
            Way::new(10, 1, vec![1, 2]).into(),
            relation.clone().into(),
        ]);
        assert_eq!(sink.relations, vec![relation]);
    }

    #[test]
    fn test_pending_edges_deduplicated_across_versions() {
        let mut pending = PendingRelations::new();
        pending.record(1, 5);
        pending.record(1, 5);
        pending.record(1, 6);
        pending.record(2, 6);
        assert_eq!(pending.referrers(1), &[5, 6]);
        assert_eq!(pending.referrers(2), &[6]);
        assert!(pending.referrers(3).is_empty());
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn test_pending_edges_shared_by_extracts() {
        let mut set = single_extract();
        set.add_extract(
            "other",
            Box::new(BoundingBox::new(20.0, 20.0, 30.0, 30.0)),
            MemorySink::new(),
        )
        .unwrap();

        let mut source = VecSource::new(vec![
            inside(1),
            rel(1, &[(EntityKind::Relation, 2)]),
            rel(2, &[(EntityKind::Relation, 3)]),
        ]);
        let mut cut = SoftCut::new(set);
        cut.run_scan_pass(&mut source, true).unwrap();
        assert_eq!(cut.pending().len(), 2);
    }

    #[test]
    fn test_extracts_do_not_share_trackers() {
        let mut set = single_extract();
        set.add_extract(
            "east",
            Box::new(BoundingBox::new(20.0, 0.0, 30.0, 10.0)),
            MemorySink::new(),
        )
        .unwrap();

        let mut source = VecSource::new(vec![
            inside(1),
            Point::new(2, 1, 25.0, 5.0).into(),
            rel(1, &[(EntityKind::Point, 1)]),
        ]);
        let report = SoftCut::new(set).run(&mut source, true).unwrap();

        let west = &report.extracts[0].sink;
        let east = &report.extracts[1].sink;
        assert_eq!(west.point_ids(), vec![1]);
        assert_eq!(east.point_ids(), vec![2]);
        assert_eq!(west.relation_ids(), vec![1]);
        assert!(east.relations.is_empty());
    }

    #[test]
    fn test_all_versions_of_selected_ids_are_copied() {
        let sink = run(vec![
            Point::new(1, 1, 50.0, 50.0).into(),
            Point::new(1, 2, 5.0, 5.0).into(),
        ]);
        let versions: Vec<_> = sink.points.iter().map(|p| p.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_rejects_one_shot_source() {
        struct OneShot(VecSource);
        impl EntitySource for OneShot {
            type Reader = <VecSource as EntitySource>::Reader;
            fn open(&mut self) -> Result<Self::Reader> {
                self.0.open()
            }
            fn is_rewindable(&self) -> bool {
                false
            }
            fn describe(&self) -> String {
                "one-shot".into()
            }
        }

        let mut source = OneShot(VecSource::new(vec![inside(1)]));
        let err = SoftCut::new(single_extract())
            .run(&mut source, true)
            .unwrap_err();
        assert!(matches!(err, SplitError::NotRewindable(_)));
    }

    const FAN_OUT: u64 = 12;

    /// Twelve side-by-side columns (k*10, 0)-(k*10+10, 10).
    fn column_extracts() -> ExtractSet<MemorySink> {
        let mut set = ExtractSet::new();
        for k in 0..FAN_OUT {
            let x = k as f64 * 10.0;
            set.add_extract(
                format!("column-{}", k),
                Box::new(BoundingBox::new(x, 0.0, x + 10.0, 10.0)),
                MemorySink::new(),
            )
            .unwrap();
        }
        set
    }

    /// Point in the middle of column `id % FAN_OUT`.
    fn column_point(id: u64, lat: f64) -> Entity {
        Point::new(id, 1, (id % FAN_OUT) as f64 * 10.0 + 5.0, lat).into()
    }

    fn column_points() -> Vec<Entity> {
        (0..600)
            .map(|id| column_point(id, 1.0 + (id / FAN_OUT) as f64 * 0.1))
            .collect()
    }

    fn column_ids(k: u64) -> Vec<u64> {
        (0..600).filter(|id| id % FAN_OUT == k).collect()
    }

    #[test]
    fn test_parallel_fan_out_keeps_order_and_isolation() {
        assert!(FAN_OUT as usize >= crate::parallel::PARALLEL_THRESHOLD);
        let mut entities = column_points();
        // one point per column outside every region
        for k in 0..FAN_OUT {
            entities.push(column_point(600 + k, 50.0));
        }
        for k in 0..FAN_OUT {
            entities.push(Way::new(1000 + k, 1, vec![k, 600 + k]).into());
        }
        entities.push(Way::new(1100, 1, vec![600, 601]).into());
        // backward references: 2000+k is scanned before the relation it contains
        for k in 0..FAN_OUT {
            entities.push(rel(2000 + k, &[(EntityKind::Relation, 3000 + k)]));
        }
        for k in 0..FAN_OUT {
            entities.push(rel(3000 + k, &[(EntityKind::Way, 1000 + k)]));
        }

        let mut source = VecSource::new(entities);
        let report = SoftCut::new(column_extracts())
            .run(&mut source, true)
            .unwrap();

        assert_eq!(report.extracts.len(), FAN_OUT as usize);
        for (k, extract) in report.extracts.iter().enumerate() {
            let k = k as u64;
            let mut points = column_ids(k);
            points.push(600 + k);
            assert_eq!(extract.sink.point_ids(), points);
            assert_eq!(extract.sink.way_ids(), vec![1000 + k]);
            assert_eq!(extract.sink.relation_ids(), vec![2000 + k, 3000 + k]);
            assert_eq!(extract.sink.finalized, 1);
        }
    }
}
