//! End-to-end split runs: configuration file in, extract files out.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::{load_config, ExtractSpec};
use crate::cut::{run_cut, CutMode, CutReport};
use crate::error::{Result, SplitError};
use crate::extract::{ExtractSet, Sink, WriteStats};
use crate::osm::{OsmXmlSink, OsmXmlSource};
use crate::region::Containment;
use crate::source::{EntitySource, ScanStats};

/// Options for a split run.
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub mode: CutMode,
    /// Skip stream order validation.
    pub assume_ordered: bool,
}

impl SplitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: CutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_assume_ordered(mut self, assume_ordered: bool) -> Self {
        self.assume_ordered = assume_ordered;
        self
    }
}

/// Counts written to one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub output: PathBuf,
    pub written: WriteStats,
}

/// Outcome of a split run.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub mode: CutMode,
    pub passes: Vec<ScanStats>,
    pub extracts: Vec<ExtractSummary>,
}

impl<S> From<CutReport<S>> for SplitReport {
    fn from(report: CutReport<S>) -> Self {
        Self {
            mode: report.mode,
            passes: report.passes,
            extracts: report
                .extracts
                .into_iter()
                .map(|e| ExtractSummary {
                    output: PathBuf::from(e.name),
                    written: e.written,
                })
                .collect(),
        }
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mode: {}", self.mode)?;
        for (i, pass) in self.passes.iter().enumerate() {
            writeln!(f, "Pass {}: {}", i + 1, pass)?;
        }
        for extract in &self.extracts {
            writeln!(f, "{}: {}", extract.output.display(), extract.written)?;
        }
        Ok(())
    }
}

/// Build all regions, then open one sink per extract.
///
/// Regions are loaded first so that a bad polygon file fails the run
/// before any output file is created.
pub fn build_extracts<S, F>(specs: &[ExtractSpec], mut open_sink: F) -> Result<ExtractSet<S>>
where
    S: Sink,
    F: FnMut(&ExtractSpec) -> Result<S>,
{
    let regions: Vec<Box<dyn Containment>> = specs
        .iter()
        .map(|spec| spec.region.load())
        .collect::<Result<_>>()?;

    let mut extracts = ExtractSet::new();
    for (spec, region) in specs.iter().zip(regions) {
        let sink = open_sink(spec)?;
        extracts.add_extract(spec.output.display().to_string(), region, sink)?;
    }
    Ok(extracts)
}

/// Split `source` into the OSM XML files described by `specs`.
pub fn split_source<Src>(
    source: &mut Src,
    specs: &[ExtractSpec],
    options: &SplitOptions,
) -> Result<SplitReport>
where
    Src: EntitySource + ?Sized,
{
    if specs.is_empty() {
        return Err(SplitError::NoExtracts);
    }
    if options.mode == CutMode::Soft && !source.is_rewindable() {
        return Err(SplitError::NotRewindable(format!(
            "{} (softcut reads the input twice)",
            source.describe()
        )));
    }

    let extracts = build_extracts(specs, |spec| OsmXmlSink::create(&spec.output))?;
    info!(
        mode = options.mode.to_string().as_str(),
        extracts = extracts.len(),
        source = source.describe().as_str();
        "Split started"
    );
    let report = run_cut(options.mode, extracts, source, !options.assume_ordered)?;
    Ok(SplitReport::from(report))
}

/// Split the OSM file at `input` (`-` for stdin) according to `config`.
pub fn split<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    config: Q,
    options: &SplitOptions,
) -> Result<SplitReport> {
    let specs = load_config(config)?;
    let mut source = OsmXmlSource::from_arg(input);
    split_source(&mut source, &specs, options)
}
