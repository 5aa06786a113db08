//! `cpplayout init` and `cpplayout completions`.

use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;

mod util;
use util::{SOURCE, make_widget_fixture};

#[test]
fn init_writes_config_once_unless_forced()
{
    let tmp = assert_fs::TempDir::new().unwrap();

    Command::cargo_bin("cpplayout")
        .unwrap()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    tmp.child("cpplayout.toml")
        .assert(predicate::str::contains("[layout]").and(predicate::str::contains("[reorder]")));

    Command::cargo_bin("cpplayout")
        .unwrap()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("already exists"));

    Command::cargo_bin("cpplayout")
        .unwrap()
        .current_dir(tmp.path())
        .args(["init", ".", "--force"])
        .assert()
        .success();
}

#[test]
fn project_config_selects_gap_policy()
{
    let tmp = make_widget_fixture();
    tmp.child("cpplayout.toml")
        .write_str("[layout]\ngap_policy = \"in_place\"\n")
        .unwrap();

    let out = Command::cargo_bin("cpplayout")
        .unwrap()
        .current_dir(tmp.path())
        .args(["--dry-run", "--quiet", "reorder", "widget.h"])
        .output()
        .unwrap();
    assert!(out.status.success());

    // In-place: the unmatched helper stays between the 4th and 5th slots
    let text = String::from_utf8(out.stdout).unwrap();
    let dump = text.find("debugDump").unwrap();
    assert!(dump < text.find("void Widget::onResize").unwrap());
    assert_ne!(text, SOURCE);
}

#[test]
fn broken_project_config_is_an_error()
{
    let tmp = make_widget_fixture();
    tmp.child("cpplayout.toml")
        .write_str("[[layout.rules]]\npriority = 1\ncriteria = { acess = \"private\" }\n")
        .unwrap();

    for command in ["reorder", "plan"]
    {
        Command::cargo_bin("cpplayout")
            .unwrap()
            .current_dir(tmp.path())
            .args([command, "widget.h"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("invalid layout configuration"))
            .stderr(predicate::str::contains("acess"));
    }

    tmp.child("widget.cpp")
        .assert(SOURCE);
}

#[test]
fn completions_to_stdout_and_dir()
{
    Command::cargo_bin("cpplayout")
        .unwrap()
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cpplayout"));

    let tmp = assert_fs::TempDir::new().unwrap();
    Command::cargo_bin("cpplayout")
        .unwrap()
        .args(["completions", "zsh", "--out-dir"])
        .arg(tmp.path())
        .assert()
        .success();
    tmp.child("_cpplayout")
        .assert(predicate::path::exists());

    Command::cargo_bin("cpplayout")
        .unwrap()
        .args(["completions", "fish"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("--out-dir is required"));
}
