use std::fs;

use pretty_assertions::assert_eq;
use tempo_cli::{expand_inputs, run, BatchConfig, EmitKind};
use tempo_core::Modifiers;
use tempo_syntax::{build, BinaryOp, TypeRef};

fn counter_unit_json() -> String {
    let decl = build::class(
        "Counter",
        vec![
            build::field(Modifiers::private(), build::int_ty(), "count", Some(build::int(0))),
            build::method(
                "increment",
                TypeRef::primitive("void"),
                vec![],
                build::block(vec![build::expr_stmt(build::assign(
                    build::name("count"),
                    build::binary(BinaryOp::Add, build::name("count"), build::int(1)),
                ))]),
            ),
        ],
    );
    let unit = build::unit(Some("demo"), vec![decl]);
    serde_json::to_string_pretty(&unit).expect("serialize")
}

fn config(inputs: Vec<String>, out: &std::path::Path) -> BatchConfig {
    BatchConfig {
        inputs,
        symbol_tables: vec![],
        prefix: None,
        output_root: Some(out.to_path_buf()),
        overwrite: true,
        config_out: None,
        emit: EmitKind::Java,
        rewrite_static_fields: false,
    }
}

#[test]
fn rewrites_a_directory_of_trees_into_package_structure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input_dir = dir.path().join("in");
    let out_dir = dir.path().join("out");
    fs::create_dir_all(&input_dir).expect("mkdir");
    fs::write(input_dir.join("Counter.json"), counter_unit_json()).expect("write input");

    let mut cfg = config(
        vec![input_dir.to_string_lossy().into_owned()],
        &out_dir,
    );
    cfg.config_out = Some(dir.path().join("rewritten.json"));

    let report = run(&cfg).expect("batch runs");
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let out_file = out_dir.join("demo").join("Counter.java");
    let source = fs::read_to_string(&out_file).expect("output exists");
    assert!(source.contains("class Counter implements Rollbackable"));
    assert!(source.contains("$ASSIGN$count"));
    assert!(source.contains("import tempo.rollback.Checkpoint;"));

    let recorded = fs::read_to_string(dir.path().join("rewritten.json")).expect("config");
    let classes: Vec<String> = serde_json::from_str(&recorded).expect("json");
    assert_eq!(classes, vec!["demo.Counter".to_string()]);
}

#[test]
fn malformed_trees_are_skipped_and_nothing_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("Broken.json");
    fs::write(&input, "{ not json").expect("write input");
    let out_dir = dir.path().join("out");

    let cfg = config(vec![input.to_string_lossy().into_owned()], &out_dir);
    let report = run(&cfg).expect("batch continues past bad files");
    assert_eq!(report.processed, 0);
    assert_eq!(report.failed, 1);
    assert!(!out_dir.exists());
}

#[test]
fn list_files_expand_relative_to_their_location() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("trees");
    fs::create_dir_all(&nested).expect("mkdir");
    fs::write(nested.join("Counter.json"), counter_unit_json()).expect("write input");
    let list = dir.path().join("batch.list");
    fs::write(&list, "trees/Counter.json\n").expect("write list");

    let files = expand_inputs(&[format!("@{}", list.display())]).expect("expand");
    assert_eq!(files, vec![dir.path().join("trees/Counter.json")]);
}

#[test]
fn prefix_and_json_emission() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("Counter.json");
    fs::write(&input, counter_unit_json()).expect("write input");
    let out_dir = dir.path().join("out");

    let mut cfg = config(vec![input.to_string_lossy().into_owned()], &out_dir);
    cfg.prefix = Some("rollback".to_string());
    cfg.emit = EmitKind::Json;

    let report = run(&cfg).expect("batch runs");
    assert_eq!(report.processed, 1);

    let out_file = out_dir.join("rollback").join("demo").join("Counter.json");
    let json = fs::read_to_string(&out_file).expect("output exists");
    let unit: tempo_syntax::CompilationUnit = serde_json::from_str(&json).expect("tree");
    assert_eq!(
        unit.package.as_ref().map(|p| p.to_dotted()),
        Some("rollback.demo".to_string())
    );
}
