//! Extracts: named output targets sharing one scan.
//!
//! An [`Extract`] binds a [`Containment`] predicate to a [`Sink`]. The cut
//! algorithm that drives the scan attaches its own tracking bundle `T`
//! (one sparse id set per tracked id space) via
//! [`ExtractSet::with_trackers`]; extracts never share tracker state.

use log::info;

use crate::entity::{Point, Relation, Way};
use crate::error::Result;
use crate::parallel;
use crate::region::{Containment, Envelope};

/// Write-only, append-ordered output destination of one extract.
pub trait Sink: Send {
    /// Called once before any entity, with the extract's envelope.
    fn init(&mut self, envelope: &Envelope) -> Result<()>;
    fn write_point(&mut self, point: &Point) -> Result<()>;
    fn write_way(&mut self, way: &Way) -> Result<()>;
    fn write_relation(&mut self, relation: &Relation) -> Result<()>;
    /// Called exactly once after the last pass.
    fn finalize(&mut self) -> Result<()>;
}

/// Per-extract counts of written entities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub points: u64,
    pub ways: u64,
    pub relations: u64,
}

impl std::fmt::Display for WriteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Points: {}, Ways: {}, Relations: {}",
            self.points, self.ways, self.relations
        )
    }
}

/// One configured output target.
pub struct Extract<S, T = ()> {
    pub(crate) name: String,
    pub(crate) region: Box<dyn Containment>,
    pub(crate) sink: S,
    pub(crate) trackers: T,
    pub(crate) written: WriteStats,
}

impl<S: Sink, T> Extract<S, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trackers(&self) -> &T {
        &self.trackers
    }

    pub fn written(&self) -> WriteStats {
        self.written
    }

    #[inline]
    pub(crate) fn write_point(&mut self, point: &Point) -> Result<()> {
        self.sink.write_point(point)?;
        self.written.points += 1;
        Ok(())
    }

    #[inline]
    pub(crate) fn write_way(&mut self, way: &Way) -> Result<()> {
        self.sink.write_way(way)?;
        self.written.ways += 1;
        Ok(())
    }

    #[inline]
    pub(crate) fn write_relation(&mut self, relation: &Relation) -> Result<()> {
        self.sink.write_relation(relation)?;
        self.written.relations += 1;
        Ok(())
    }
}

/// A finished extract: its name, final sink and write counts.
#[derive(Debug)]
pub struct FinishedExtract<S> {
    pub name: String,
    pub sink: S,
    pub written: WriteStats,
}

/// Ordered collection of extracts observed by one scan.
pub struct ExtractSet<S, T = ()> {
    extracts: Vec<Extract<S, T>>,
}

impl<S: Sink> Default for ExtractSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sink> ExtractSet<S> {
    pub fn new() -> Self {
        Self {
            extracts: Vec::new(),
        }
    }

    /// Open `sink` with the region's envelope and append the extract.
    ///
    /// Must be called before the first entity of the scan.
    pub fn add_extract(
        &mut self,
        name: impl Into<String>,
        region: Box<dyn Containment>,
        mut sink: S,
    ) -> Result<()> {
        let name = name.into();
        let envelope = region.envelope();
        info!(
            extract = name.as_str(),
            min_lon = envelope.min_lon,
            min_lat = envelope.min_lat,
            max_lon = envelope.max_lon,
            max_lat = envelope.max_lat;
            "Opening extract"
        );
        sink.init(&envelope)?;
        self.extracts.push(Extract {
            name,
            region,
            sink,
            trackers: (),
            written: WriteStats::default(),
        });
        Ok(())
    }

    /// Attach a fresh tracking bundle to every extract.
    pub fn with_trackers<T: Default>(self) -> ExtractSet<S, T> {
        ExtractSet {
            extracts: self
                .extracts
                .into_iter()
                .map(|e| Extract {
                    name: e.name,
                    region: e.region,
                    sink: e.sink,
                    trackers: T::default(),
                    written: e.written,
                })
                .collect(),
        }
    }
}

impl<S: Sink, T: Send> ExtractSet<S, T> {
    pub fn len(&self) -> usize {
        self.extracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extracts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extract<S, T>> {
        self.extracts.iter()
    }

    /// Run `f` for every extract. Extracts are independent, so they may be
    /// visited concurrently; each one sees entities in stream order.
    pub(crate) fn try_for_each<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut Extract<S, T>) -> Result<()> + Sync + Send,
    {
        parallel::try_for_each(&mut self.extracts, f)
    }

    /// Finalize every sink exactly once and hand them back in order.
    pub fn finish(self) -> Result<Vec<FinishedExtract<S>>> {
        let mut finished = Vec::with_capacity(self.extracts.len());
        for mut extract in self.extracts {
            extract.sink.finalize()?;
            info!(
                extract = extract.name.as_str(),
                points = extract.written.points,
                ways = extract.written.ways,
                relations = extract.written.relations;
                "Extract finished"
            );
            finished.push(FinishedExtract {
                name: extract.name,
                sink: extract.sink,
                written: extract.written,
            });
        }
        Ok(finished)
    }
}

/// Sink that keeps everything in memory. Useful for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub envelope: Option<Envelope>,
    pub points: Vec<Point>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
    pub finalized: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_ids(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.id).collect()
    }

    pub fn way_ids(&self) -> Vec<u64> {
        self.ways.iter().map(|w| w.id).collect()
    }

    pub fn relation_ids(&self) -> Vec<u64> {
        self.relations.iter().map(|r| r.id).collect()
    }
}

impl Sink for MemorySink {
    fn init(&mut self, envelope: &Envelope) -> Result<()> {
        self.envelope = Some(*envelope);
        Ok(())
    }

    fn write_point(&mut self, point: &Point) -> Result<()> {
        self.points.push(point.clone());
        Ok(())
    }

    fn write_way(&mut self, way: &Way) -> Result<()> {
        self.ways.push(way.clone());
        Ok(())
    }

    fn write_relation(&mut self, relation: &Relation) -> Result<()> {
        self.relations.push(relation.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.finalized += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::BoundingBox;

    #[test]
    fn test_add_extract_initialises_sink() {
        let mut set = ExtractSet::new();
        set.add_extract(
            "a",
            Box::new(BoundingBox::new(1.0, 2.0, 3.0, 4.0)),
            MemorySink::new(),
        )
        .unwrap();

        assert_eq!(set.len(), 1);
        let extract = set.iter().next().unwrap();
        assert_eq!(extract.name(), "a");
        assert_eq!(
            extract.sink.envelope,
            Some(Envelope::new(1.0, 2.0, 3.0, 4.0))
        );
    }

    #[test]
    fn test_finish_finalizes_each_sink_once() {
        let mut set = ExtractSet::new();
        for name in ["a", "b", "c"] {
            set.add_extract(
                name,
                Box::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
                MemorySink::new(),
            )
            .unwrap();
        }

        let finished = set.with_trackers::<()>().finish().unwrap();
        let names: Vec<_> = finished.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(finished.iter().all(|f| f.sink.finalized == 1));
        assert!(finished.iter().all(|f| f.written == WriteStats::default()));
    }

    #[test]
    fn test_write_counts() {
        let mut set = ExtractSet::new();
        set.add_extract(
            "a",
            Box::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            MemorySink::new(),
        )
        .unwrap();

        set.try_for_each(|e| {
            e.write_point(&Point::new(1, 1, 0.5, 0.5))?;
            e.write_way(&Way::new(2, 1, vec![1, 1]))
        })
        .unwrap();

        let finished = set.finish().unwrap();
        assert_eq!(finished[0].written.points, 1);
        assert_eq!(finished[0].written.ways, 1);
        assert_eq!(finished[0].sink.point_ids(), vec![1]);
    }
}
