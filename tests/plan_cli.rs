//! `cpplayout plan`: table and JSON views of the computed order.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

mod util;
use util::{SOURCE, make_widget_fixture};

#[test]
fn json_plan_lists_placements_and_warnings()
{
    let tmp = make_widget_fixture();

    let out = Command::cargo_bin("cpplayout")
        .expect("bin")
        .current_dir(tmp.path())
        .args(["plan", "widget.h", "--json"])
        .output()
        .expect("run plan");
    assert!(out.status.success());

    let v: Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(v["source"], "widget.cpp");
    assert_eq!(v["changed"], true);

    let summary: Vec<String> = v["placements"]
        .as_array()
        .expect("placements array")
        .iter()
        .map(|p| {
            format!(
                "{} {} {}{} p={} h={} {}-{}",
                p["position"],
                p["name"].as_str().unwrap_or_default(),
                p["access"].as_str().unwrap_or_default(),
                if p["is_static"] == true { " static" } else { "" },
                p["priority"],
                p["header_index"],
                p["original"]["start"].as_u64().unwrap_or_default() + 1,
                p["original"]["end"].as_u64().unwrap_or_default() + 1,
            )
        })
        .collect();

    insta::assert_snapshot!(summary.join("\n"), @r"
    1 ui::Widget::Widget public p=10 h=0 26-28
    2 ui::Widget::~Widget public p=10 h=1 32-34
    3 ui::Widget::create public static p=11 h=2 19-22
    4 ui::Widget::draw public p=12 h=3 12-18
    5 ui::Widget::onResize protected p=22 h=4 29-31
    6 ui::Widget::layout private p=32 h=5 8-11
    7 ui::clamp none p=41 h=6 4-7
    ");

    assert_eq!(
        v["warnings"],
        serde_json::json!([
            { "kind": "unmatched_definition", "name": "ui::debugDump", "line": 23 }
        ])
    );

    // plan never writes
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("widget.cpp")).unwrap(),
        SOURCE
    );
}

#[test]
fn table_plan_is_human_readable()
{
    let tmp = make_widget_fixture();

    Command::cargo_bin("cpplayout")
        .expect("bin")
        .current_dir(tmp.path())
        .args(["plan", "widget.h", "widget.cpp", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Priority"))
        .stdout(predicate::str::contains("ui::Widget::onResize"))
        .stdout(predicate::str::contains("warning: ui::debugDump (line 24) has no header declaration"))
        .stdout(predicate::str::contains("widget.cpp: would be reordered"));
}
