mod common;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_match};

fn csv_mapper() -> Command {
    Command::cargo_bin("csv-mapper").expect("binary exists")
}

#[test]
fn policies_lists_candidates_for_a_name() {
    csv_mapper()
        .args(["policies", "--name", "TimeOfDay"])
        .assert()
        .success()
        .stdout(is_match(r"pascal-to-snake\s+time_of_day").expect("valid regex"))
        .stdout(contains("kebab").and(contains("time-of-day")));
}

#[test]
fn policies_rejects_unknown_policy() {
    csv_mapper()
        .args(["policies", "--name", "Name", "--policy", "loud"])
        .assert()
        .failure()
        .stderr(contains("Unknown naming policy 'loud'"));
}

#[test]
fn resolve_prints_bound_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.tsv", "full_name\ttime_of_day\tName\n");
    csv_mapper()
        .args([
            "resolve",
            "-i",
            input.to_str().expect("utf8 path"),
            "--fields",
            "Name,TimeOfDay",
            "--policy",
            "pascal-to-snake",
        ])
        .assert()
        .success()
        .stdout(contains("Name       2       Name"))
        .stdout(contains("TimeOfDay  1       time_of_day"));
}

#[test]
fn resolve_fails_for_unknown_column() {
    let input = fixture_path("people.csv");
    csv_mapper()
        .args([
            "resolve",
            "-i",
            input.to_str().expect("utf8 path"),
            "--fields",
            "Name",
        ])
        .assert()
        .failure()
        .stderr(contains("no column found for field 'Name'"));
}

#[test]
fn resolve_reads_header_from_stdin() {
    csv_mapper()
        .args(["resolve", "-i", "-", "--fields", "Age", "--indices", "1"])
        .write_stdin("name,age\nJohn,25\n")
        .assert()
        .success()
        .stdout(contains("Age    1       age"));
}

#[test]
fn parse_renders_mapped_records_as_table() {
    let input = fixture_path("orders.csv");
    let mapping = fixture_path("orders.yaml");
    csv_mapper()
        .args([
            "parse",
            "-i",
            input.to_str().expect("utf8 path"),
            "-m",
            mapping.to_str().expect("utf8 path"),
        ])
        .assert()
        .success()
        .stdout(contains("OrderNumber"))
        .stdout(contains("AmericanoWithMilk"))
        .stdout(contains("2024-01-02"))
        .stdout(contains("00:01:45"));
}

#[test]
fn parse_emits_json_with_limit() {
    let input = fixture_path("orders.csv");
    let mapping = fixture_path("orders.yaml");
    let output = csv_mapper()
        .args([
            "parse",
            "-i",
            input.to_str().expect("utf8 path"),
            "-m",
            mapping.to_str().expect("utf8 path"),
            "--format",
            "json",
            "--limit",
            "2",
        ])
        .output()
        .expect("run parse");
    assert!(output.status.success());
    let records: Vec<serde_json::Value> =
        serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["OrderNumber"], 1001);
    assert_eq!(records[0]["Coffee"], "Espresso");
    assert_eq!(records[1]["PlacedOn"], "2024-01-01");
    assert_eq!(records[1]["Brewing"], "00:04:00");
    let id = records[0]["Id"].as_str().expect("generated id");
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[test]
fn parse_reports_the_failing_line() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "orders.csv",
        "OrderNumber;Coffee;PlacedOn;Brewing\n1001;Espresso;31.12.2023;00:02:30\nabc;Espresso;31.12.2023;00:02:30\n",
    );
    let mapping = fixture_path("orders.yaml");
    csv_mapper()
        .args([
            "parse",
            "-i",
            input.to_str().expect("utf8 path"),
            "-m",
            mapping.to_str().expect("utf8 path"),
        ])
        .assert()
        .failure()
        .stderr(contains("cannot convert 'abc' to integer for field 'OrderNumber' on line 3"));
}

#[test]
fn parse_rejects_conflicting_mapping() {
    let workspace = TestWorkspace::new();
    let mapping = workspace.write(
        "broken.yaml",
        "write_id: Name\nfields:\n  - name: Name\n    type: text\n",
    );
    let input = workspace.write("input.csv", "Name\nAda\n");
    csv_mapper()
        .args([
            "parse",
            "-i",
            input.to_str().expect("utf8 path"),
            "-m",
            mapping.to_str().expect("utf8 path"),
        ])
        .assert()
        .failure()
        .stderr(contains("must be an integer or GUID"));
}
