//! OSM XML input and output.
//!
//! - [`OsmXmlReader`] streams entities out of an `.osm`/`.osh` file
//! - [`OsmXmlSource`] re-opens a path for every pass (stdin only once)
//! - [`OsmXmlSink`] writes one extract, optionally xz-compressed

pub mod reader;
pub mod writer;

pub use reader::{OsmXmlReader, OsmXmlSource};
pub use writer::{OsmXmlSink, OutputStream};

use std::path::Path;

/// Default input buffer size (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Default output buffer size per extract (2 MB).
/// Kept moderate because one buffer is held per extract.
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Whether `path` names an xz-compressed file.
pub fn is_xz(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "xz")
}
