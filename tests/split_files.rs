//! End-to-end split runs over OSM XML files on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use osm_history_splitter::osm::OsmXmlSource;
use osm_history_splitter::source::EntitySource;
use osm_history_splitter::{split, CutMode, Entity, SplitError, SplitOptions};
use tempfile::TempDir;

const HISTORY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="fixture">
  <node id="1" version="1" lat="1" lon="1"/>
  <node id="1" version="2" lat="1.5" lon="1.5">
    <tag k="name" v="moved"/>
  </node>
  <node id="2" version="1" lat="20" lon="20"/>
  <node id="3" version="1" lat="2" lon="2"/>
  <node id="4" version="1" lat="31" lon="31"/>
  <node id="5" version="1" lat="32" lon="32"/>
  <way id="10" version="1">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
  </way>
  <way id="11" version="1">
    <nd ref="2"/>
    <nd ref="4"/>
    <nd ref="5"/>
  </way>
  <relation id="100" version="1">
    <member type="relation" ref="101" role="sub"/>
  </relation>
  <relation id="101" version="1">
    <member type="node" ref="1" role="label"/>
  </relation>
  <relation id="102" version="1">
    <member type="way" ref="11" role=""/>
  </relation>
</osm>
"#;

const SQUARE_POLY: &str = "square\n1\n30 30\n40 30\n40 40\n30 40\nEND\nEND\n";

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    config: PathBuf,
}

impl Fixture {
    fn new(history: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("history.osh");
        fs::write(&input, history).unwrap();

        let poly = dir.path().join("b.poly");
        fs::write(&poly, SQUARE_POLY).unwrap();

        let config = dir.path().join("extracts.conf");
        let mut file = fs::File::create(&config).unwrap();
        writeln!(file, "# two extracts").unwrap();
        writeln!(file, "{}\tBBOX\t0,0,10,10", dir.path().join("out/a.osm").display()).unwrap();
        writeln!(file, "{}\tPOLY\t{}", dir.path().join("out/b.osm.xz").display(), poly.display())
            .unwrap();

        Self { dir, input, config }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join("out").join(name)
    }
}

#[derive(Debug, Default, PartialEq)]
struct Ids {
    points: Vec<u64>,
    ways: Vec<u64>,
    relations: Vec<u64>,
}

fn read_ids(path: &Path) -> Ids {
    let mut ids = Ids::default();
    for entity in OsmXmlSource::from_path(path).open().unwrap() {
        match entity.unwrap() {
            Entity::Point(p) => ids.points.push(p.id),
            Entity::Way(w) => ids.ways.push(w.id),
            Entity::Relation(r) => ids.relations.push(r.id),
        }
    }
    ids
}

fn read_entities(path: &Path) -> Vec<Entity> {
    OsmXmlSource::from_path(path)
        .open()
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
}

// =============================================================================
// Hard cut
// =============================================================================

#[test]
fn test_hardcut_bbox_and_poly() {
    let fx = Fixture::new(HISTORY);
    let report = split(&fx.input, &fx.config, &SplitOptions::new()).unwrap();
    assert_eq!(report.mode, CutMode::Hard);
    assert_eq!(report.passes.len(), 1);
    assert_eq!(report.passes[0].points, 6);

    assert_eq!(
        read_ids(&fx.output("a.osm")),
        Ids {
            points: vec![1, 1, 3],
            ways: vec![10],
            relations: vec![101],
        }
    );
    assert_eq!(
        read_ids(&fx.output("b.osm.xz")),
        Ids {
            points: vec![4, 5],
            ways: vec![11],
            relations: vec![102],
        }
    );
}

#[test]
fn test_hardcut_crops_way_refs() {
    let fx = Fixture::new(HISTORY);
    split(&fx.input, &fx.config, &SplitOptions::new()).unwrap();

    let ways: Vec<_> = read_entities(&fx.output("a.osm"))
        .into_iter()
        .filter_map(|e| match e {
            Entity::Way(w) => Some(w),
            _ => None,
        })
        .collect();
    assert_eq!(ways.len(), 1);
    assert_eq!(ways[0].refs, vec![1, 3]);
}

// =============================================================================
// Soft cut
// =============================================================================

#[test]
fn test_softcut_completes_ways_and_relations() {
    let fx = Fixture::new(HISTORY);
    let options = SplitOptions::new().with_mode(CutMode::Soft);
    let report = split(&fx.input, &fx.config, &options).unwrap();
    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.passes[0], report.passes[1]);

    assert_eq!(
        read_ids(&fx.output("a.osm")),
        Ids {
            points: vec![1, 1, 2, 3],
            ways: vec![10],
            relations: vec![100, 101],
        }
    );
    assert_eq!(
        read_ids(&fx.output("b.osm.xz")),
        Ids {
            points: vec![2, 4, 5],
            ways: vec![11],
            relations: vec![102],
        }
    );
}

#[test]
fn test_softcut_copies_unmodified() {
    let fx = Fixture::new(HISTORY);
    split(
        &fx.input,
        &fx.config,
        &SplitOptions::new().with_mode(CutMode::Soft),
    )
    .unwrap();

    let input = read_entities(&fx.input);
    for entity in read_entities(&fx.output("a.osm")) {
        assert!(input.contains(&entity), "modified entity: {:?}", entity);
    }
}

#[test]
fn test_softcut_rejects_stdin() {
    let fx = Fixture::new(HISTORY);
    let options = SplitOptions::new().with_mode(CutMode::Soft);
    let err = split("-", &fx.config, &options).unwrap_err();
    assert!(matches!(err, SplitError::NotRewindable(_)));
    assert!(!fx.output("a.osm").exists());
}

// =============================================================================
// Determinism and input handling
// =============================================================================

#[test]
fn test_repeated_runs_are_byte_identical() {
    for mode in [CutMode::Hard, CutMode::Soft] {
        let fx = Fixture::new(HISTORY);
        let options = SplitOptions::new().with_mode(mode);

        split(&fx.input, &fx.config, &options).unwrap();
        let first: Vec<Vec<u8>> = ["a.osm", "b.osm.xz"]
            .iter()
            .map(|name| fs::read(fx.output(name)).unwrap())
            .collect();

        split(&fx.input, &fx.config, &options).unwrap();
        for (name, expected) in ["a.osm", "b.osm.xz"].iter().zip(&first) {
            let second = fs::read(fx.output(name)).unwrap();
            assert_eq!(&second, expected, "{} differs between {} runs", name, mode);
        }
    }
}

#[test]
fn test_xz_input() {
    let fx = Fixture::new(HISTORY);
    let compressed = fx.dir.path().join("history.osh.xz");
    let mut encoder = xz::write::XzEncoder::new(fs::File::create(&compressed).unwrap(), 6);
    encoder.write_all(HISTORY.as_bytes()).unwrap();
    encoder.finish().unwrap();

    split(&compressed, &fx.config, &SplitOptions::new()).unwrap();
    assert_eq!(read_ids(&fx.output("a.osm")).points, vec![1, 1, 3]);
}

#[test]
fn test_unordered_input_fails() {
    let unordered = HISTORY.replace(
        r#"<node id="3" version="1" lat="2" lon="2"/>"#,
        "",
    )
    .replace(
        "</osm>",
        r#"<node id="3" version="1" lat="2" lon="2"/></osm>"#,
    );
    let fx = Fixture::new(&unordered);
    let err = split(&fx.input, &fx.config, &SplitOptions::new()).unwrap_err();
    assert!(matches!(err, SplitError::Order(_)), "got {}", err);
}

#[test]
fn test_bad_config_line_is_reported() {
    let fx = Fixture::new(HISTORY);
    fs::write(&fx.config, "a.osm BBOX 0,0,10,10\nb.osm SHAPE x\n").unwrap();
    let err = split(&fx.input, &fx.config, &SplitOptions::new()).unwrap_err();
    assert!(matches!(err, SplitError::Config { line: 2, .. }));
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_missing_poly_opens_no_outputs() {
    let fx = Fixture::new(HISTORY);
    let config = format!(
        "{} BBOX 0,0,10,10\n{} POLY {}\n",
        fx.output("a.osm").display(),
        fx.output("c.osm").display(),
        fx.dir.path().join("missing.poly").display()
    );
    fs::write(&fx.config, config).unwrap();
    assert!(split(&fx.input, &fx.config, &SplitOptions::new()).is_err());
    assert!(!fx.output("a.osm").exists());
}
