//! Geographic splitter for OpenStreetMap full-history files.
//!
//! A single ordered scan of an OSM file (points, then ways, then relations;
//! ascending ids; ascending versions) is fanned out to any number of
//! extracts, each bounded by a box or a polygon.
//!
//! # Features
//!
//! - **Hard cut**: one pass; ways and relations are cropped to the members
//!   already known to be inside
//! - **Soft cut**: two passes; entities are copied unmodified and relation
//!   references are closed transitively
//! - **Sparse id tracking**: per-extract bitmaps that allocate only the id
//!   ranges actually touched
//! - **Parallel fan-out**: extracts are served concurrently with Rayon
//!
//! # Example
//!
//! ```rust,no_run
//! use osm_history_splitter::{split, CutMode, SplitOptions};
//!
//! let options = SplitOptions::new().with_mode(CutMode::Soft);
//! let report = split("history.osh.xz", "extracts.conf", &options).unwrap();
//! println!("{}", report);
//! ```

pub mod config;
pub mod cut;
pub mod entity;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod id_set;
pub mod logging;
pub mod osm;
pub mod parallel;
pub mod region;
pub mod source;
pub mod splitter;

// Re-export commonly used types
pub use cut::{run_cut, CutMode, CutReport, HardCut, SoftCut};
pub use entity::{Entity, EntityId, EntityKind, Member, Point, Relation, Way};
pub use error::{Result, SplitError};
pub use extract::{ExtractSet, MemorySink, Sink};
pub use id_set::SparseIdSet;
pub use region::{BoundingBox, Containment, Envelope, PolygonRegion};
pub use splitter::{split, split_source, SplitOptions, SplitReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{load_config, parse_config, ExtractSpec, RegionSource};
    pub use crate::cut::{run_cut, CutMode, HardCut, SoftCut};
    pub use crate::entity::{Entity, EntityKind, Member, Metadata, Point, Relation, Way};
    pub use crate::extract::{ExtractSet, MemorySink, Sink};
    pub use crate::osm::{OsmXmlReader, OsmXmlSink, OsmXmlSource};
    pub use crate::region::{BoundingBox, Containment, PolygonRegion};
    pub use crate::source::{EntitySource, VecSource};
    pub use crate::splitter::{split, SplitOptions};
}
