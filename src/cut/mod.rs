//! Extraction algorithms.
//!
//! - [`HardCut`]: one pass, ways and relations are cropped to what is
//!   already known to be inside each extract.
//! - [`SoftCut`]: two passes, entities are copied unmodified and relation
//!   references are closed transitively.

pub mod hardcut;
pub mod softcut;

pub use hardcut::{HardCut, HardCutState, HardCutTrackers};
pub use softcut::{PendingRelations, SoftCut, SoftCutPass, SoftCutTrackers};

use std::fmt;

use crate::error::Result;
use crate::extract::{ExtractSet, FinishedExtract, Sink};
use crate::source::{EntitySource, ScanStats};

/// Which algorithm drives the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutMode {
    #[default]
    Hard,
    Soft,
}

impl fmt::Display for CutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutMode::Hard => f.write_str("hardcut"),
            CutMode::Soft => f.write_str("softcut"),
        }
    }
}

/// Result of a completed cut: scan counts per pass and finalized extracts.
#[derive(Debug)]
pub struct CutReport<S> {
    pub mode: CutMode,
    pub passes: Vec<ScanStats>,
    pub extracts: Vec<FinishedExtract<S>>,
}

impl<S> fmt::Display for CutReport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mode: {}", self.mode)?;
        for (i, pass) in self.passes.iter().enumerate() {
            writeln!(f, "Pass {}: {}", i + 1, pass)?;
        }
        for extract in &self.extracts {
            writeln!(f, "{}: {}", extract.name, extract.written)?;
        }
        Ok(())
    }
}

/// Run the algorithm selected by `mode` over `source`, finalizing every sink.
pub fn run_cut<S, Src>(
    mode: CutMode,
    extracts: ExtractSet<S>,
    source: &mut Src,
    validate: bool,
) -> Result<CutReport<S>>
where
    S: Sink,
    Src: EntitySource + ?Sized,
{
    match mode {
        CutMode::Hard => HardCut::new(extracts).run(source, validate),
        CutMode::Soft => SoftCut::new(extracts).run(source, validate),
    }
}
