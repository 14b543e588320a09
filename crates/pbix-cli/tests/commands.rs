//! End-to-end tests for the command runners over real report archives.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::{Value, json};
use zip::write::SimpleFileOptions;

use pbix_cli::cli::{FieldsArgs, KindArg, RenameArgs, RenameDirArgs, ResetSlicersArgs};
use pbix_cli::commands::{run_fields, run_rename, run_rename_dir, run_reset_slicers};
use pbix_container::{LayoutDocument, ReportArchive};

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Stringify a subtree the way layouts store embedded documents.
fn embed(value: &Value) -> Value {
    Value::String(serde_json::to_string(value).expect("embed"))
}

fn card_config(table: &str, field: &str) -> Value {
    json!({
        "singleVisual": {
            "visualType": "card",
            "projections": {"Values": [{"queryRef": format!("{table}.{field}")}]},
            "prototypeQuery": {
                "Version": 2,
                "From": [{"Name": "t", "Entity": table, "Type": 0}],
                "Select": [{
                    "Measure": {
                        "Expression": {"SourceRef": {"Source": "t"}},
                        "Property": field
                    },
                    "Name": format!("{table}.{field}")
                }]
            }
        }
    })
}

fn slicer_config() -> Value {
    json!({
        "singleVisual": {
            "visualType": "slicer",
            "objects": {
                "data": [{
                    "properties": {
                        "isInvertedSelectionMode": {"expr": {"Literal": {"Value": "true"}}}
                    }
                }],
                "general": [{"properties": {"outlineColor": {}}}]
            }
        }
    })
}

fn layout_json() -> String {
    let layout = json!({
        "id": 0,
        "sections": [{
            "name": "ReportSection",
            "displayName": "Page 1",
            "visualContainers": [
                {"x": 0.0, "config": embed(&card_config("Sales", "Revenue"))},
                {"x": 100.0, "config": embed(&card_config("Sales", "Region"))},
                {"x": 200.0, "config": embed(&slicer_config())}
            ],
            "filters": "[]"
        }]
    });
    serde_json::to_string(&layout).expect("layout")
}

fn build_report(path: &Path) {
    let file = File::create(path).expect("create test archive");
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    writer.start_file("Version", options).unwrap();
    writer.write_all(b"1.28").unwrap();
    writer.start_file("Report/Layout", options).unwrap();
    writer.write_all(&utf16(&layout_json())).unwrap();
    writer.start_file("DataModel", options).unwrap();
    writer.write_all(b"model bytes").unwrap();
    writer.finish().unwrap();
}

fn read_layout_tree(path: &Path) -> Value {
    let archive = ReportArchive::open(path).expect("open archive");
    let document = LayoutDocument::parse(&archive.read_layout().expect("read layout"))
        .expect("parse layout");
    document.tree().clone()
}

fn rename_args(report: &Path, spec: &str, output: Option<&Path>, dry_run: bool) -> RenameArgs {
    RenameArgs {
        report: report.to_path_buf(),
        renames: vec![spec.to_string()],
        kind: KindArg::Auto,
        output: output.map(Path::to_path_buf),
        dry_run,
    }
}

#[test]
fn rename_rewrites_report_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pbix");
    let output = dir.path().join("out.pbix");
    build_report(&report);

    let outcome = run_rename(&rename_args(
        &report,
        "Sales.Revenue=Sales.NetRevenue",
        Some(&output),
        false,
    ))
    .unwrap();
    // Projection queryRef, select record, select Name.
    assert_eq!(outcome.changes.len(), 3);
    assert!(outcome.warnings.is_empty());
    assert!(outcome.written);

    let tree = read_layout_tree(&output);
    let revenue = &tree["sections"][0]["visualContainers"][0]["config"]["singleVisual"];
    assert_eq!(
        revenue["projections"]["Values"][0]["queryRef"],
        json!("Sales.NetRevenue")
    );
    let select = &revenue["prototypeQuery"]["Select"][0];
    assert_eq!(select["Measure"]["Property"], json!("NetRevenue"));
    assert_eq!(select["Name"], json!("Sales.NetRevenue"));
    // The Region visual is untouched.
    let region = &tree["sections"][0]["visualContainers"][1]["config"]["singleVisual"];
    assert_eq!(
        region["projections"]["Values"][0]["queryRef"],
        json!("Sales.Region")
    );
    // The source report is untouched.
    let source = read_layout_tree(&report);
    assert_eq!(
        source["sections"][0]["visualContainers"][0]["config"]["singleVisual"]["projections"]
            ["Values"][0]["queryRef"],
        json!("Sales.Revenue")
    );
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pbix");
    build_report(&report);
    let before = std::fs::read(&report).unwrap();

    let outcome = run_rename(&rename_args(
        &report,
        "Sales.Revenue=Sales.NetRevenue",
        None,
        true,
    ))
    .unwrap();
    assert_eq!(outcome.changes.len(), 3);
    assert!(!outcome.written);
    assert_eq!(std::fs::read(&report).unwrap(), before);
}

#[test]
fn in_place_rename_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pbix");
    build_report(&report);

    let args = rename_args(&report, "Sales.Revenue=Sales.NetRevenue", None, false);
    let first = run_rename(&args).unwrap();
    assert_eq!(first.changes.len(), 3);
    assert!(first.written);

    let second = run_rename(&args).unwrap();
    assert!(second.changes.is_empty());
    assert!(!second.written);
}

#[test]
fn missing_report_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("absent.pbix");
    assert!(run_rename(&rename_args(&absent, "A.B=C.D", None, false)).is_err());
}

#[test]
fn fields_inventory_and_contains_queries() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pbix");
    build_report(&report);

    let outcome = run_fields(&FieldsArgs {
        report: report.clone(),
        contains: vec!["Revenue".to_string(), "Margin".to_string()],
    })
    .unwrap();
    assert_eq!(outcome.fields.len(), 1);
    assert_eq!(outcome.fields[0].name, "Sales.Revenue");
    assert_eq!(outcome.fields[0].occurrences, 3);
    assert_eq!(
        outcome.queries,
        vec![("Revenue".to_string(), true), ("Margin".to_string(), false)]
    );
}

#[test]
fn reset_slicers_clears_marker() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.pbix");
    let output = dir.path().join("out.pbix");
    build_report(&report);

    let outcome = run_reset_slicers(&ResetSlicersArgs {
        report: report.clone(),
        output: Some(output.clone()),
        dry_run: false,
    })
    .unwrap();
    assert_eq!(outcome.cleared.len(), 1);
    assert!(outcome.written);

    let tree = read_layout_tree(&output);
    let properties =
        &tree["sections"][0]["visualContainers"][2]["config"]["singleVisual"]["objects"]["data"]
            [0]["properties"];
    assert!(properties.get("isInvertedSelectionMode").is_none());
    // The rename-bearing visual is untouched.
    assert_eq!(
        tree["sections"][0]["visualContainers"][0]["config"]["singleVisual"]["projections"]
            ["Values"][0]["queryRef"],
        json!("Sales.Revenue")
    );
}

#[test]
fn rename_dir_processes_reports_and_skips_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("region-a");
    std::fs::create_dir(&nested).unwrap();
    let first = dir.path().join("first.pbix");
    let second = nested.join("second.pbix");
    let model = dir.path().join("model.pbix");
    build_report(&first);
    build_report(&second);
    build_report(&model);

    let batch = run_rename_dir(&RenameDirArgs {
        directory: dir.path().to_path_buf(),
        renames: vec!["Sales.Revenue=Sales.NetRevenue".to_string()],
        kind: KindArg::Auto,
        model: Some("model.pbix".to_string()),
        dry_run: false,
    })
    .unwrap();
    assert_eq!(batch.outcomes.len(), 2);
    assert!(!batch.has_errors());
    assert_eq!(batch.total_changes(), 6);

    for path in [&first, &second] {
        let tree = read_layout_tree(path);
        assert_eq!(
            tree["sections"][0]["visualContainers"][0]["config"]["singleVisual"]["projections"]
                ["Values"][0]["queryRef"],
            json!("Sales.NetRevenue")
        );
    }
    let untouched = read_layout_tree(&model);
    assert_eq!(
        untouched["sections"][0]["visualContainers"][0]["config"]["singleVisual"]["projections"]
            ["Values"][0]["queryRef"],
        json!("Sales.Revenue")
    );
}
