//! Index files on a virtual file system through to published units.

use serialgen_common::context::StagedContext;
use serialgen_common::loader::load_index;
use serialgen_common::sinks::SinkKind;
use serialgen_common::vfs::{MemoryVfs, Vfs};
use serialgen_core::Generator;
use std::path::{Path, PathBuf};

const SHAPES: &str = r#"
[[types]]
name = "geo.Shape"
kind = "interface"
serializable = true

[[types]]
name = "geo.Circle"
serializable = true
interfaces = ["geo.Shape"]

[[types.fields]]
name = "radius"
type = "double"

[[types]]
name = "geo.Square"
serializable = true
interfaces = ["geo.Shape"]

[[types.fields]]
name = "side"
type = "double"
"#;

const STREAMS: &str = r#"{
  "types": [
    {
      "name": "geo.ShapeStream",
      "serial_types": { "mode": "DE_RPC", "roots": ["geo.Shape"] }
    },
    {
      "name": "geo.Dangling",
      "serial_types": { "roots": ["geo.Hexagon"] }
    }
  ]
}"#;

fn vfs() -> MemoryVfs {
    MemoryVfs::new()
        .with_file("project/types/shapes.toml", SHAPES)
        .with_file("project/types/streams.json", STREAMS)
}

fn patterns() -> Vec<String> {
    vec![
        "project/types/**/*.toml".to_string(),
        "project/types/**/*.json".to_string(),
    ]
}

#[test]
fn test_generates_and_publishes_owner() {
    let vfs = vfs();
    let loaded = load_index(&vfs, &patterns()).unwrap();
    let sink = SinkKind::Rust.create();
    let generator = Generator::new(&loaded.index, sink.as_ref());

    let mut ctx = StagedContext::new(&vfs, Path::new("project/out"), Path::new("project/private"));
    let unit = generator.generate(&mut ctx, "geo.ShapeStream").unwrap();
    assert_eq!(unit, "comet.geo_ShapeStreamImpl");

    let published = ctx.finish().unwrap();
    assert_eq!(
        published,
        vec![
            PathBuf::from("project/out/comet/geo_ShapeStreamImpl.rs"),
            PathBuf::from("project/out/geo.ShapeStream.rpcdata.json"),
        ]
    );

    let manifest = vfs
        .read_to_string(Path::new("project/out/geo.ShapeStream.rpcdata.json"))
        .unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(manifest["fields"]["geo.Circle"], serde_json::json!(["radius"]));
    assert_eq!(manifest["fields"]["geo.Square"], serde_json::json!(["side"]));

    assert!(vfs.exists(Path::new("project/private/geo.ShapeStream.rpc.log")));
}

#[test]
fn test_failed_owner_publishes_nothing() {
    let vfs = vfs();
    let loaded = load_index(&vfs, &patterns()).unwrap();
    let sink = SinkKind::Json.create();
    let generator = Generator::new(&loaded.index, sink.as_ref());

    let mut ctx = StagedContext::new(&vfs, Path::new("project/out"), Path::new("project/private"));
    let err = generator.generate(&mut ctx, "geo.Dangling").unwrap_err();
    assert_eq!(err.missing_type_name(), Some("geo.Hexagon"));

    assert!(ctx.finish().unwrap().is_empty());
    let written: Vec<PathBuf> = vfs
        .paths()
        .into_iter()
        .filter(|p| !p.starts_with("project/types"))
        .collect();
    assert_eq!(written, vec![PathBuf::from("project/private/geo.Dangling.rpc.log")]);
}

#[test]
fn test_json_and_rust_sinks_share_the_fingerprint() {
    let vfs = vfs();
    let loaded = load_index(&vfs, &patterns()).unwrap();

    let mut fingerprints = Vec::new();
    for kind in [SinkKind::Rust, SinkKind::Json] {
        let sink = kind.create();
        let generator = Generator::new(&loaded.index, sink.as_ref());
        let artifact = generator
            .build_artifact(
                &"geo.ShapeStream".parse().unwrap(),
                &mut serialgen_core::DiagnosticLog::new(),
            )
            .unwrap();
        assert!(artifact.unit.contents.contains(&artifact.table.fingerprint));
        fingerprints.push(artifact.table.fingerprint);
    }
    assert_eq!(fingerprints[0], fingerprints[1]);
}
