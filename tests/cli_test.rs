#[path = "common/mod.rs"]
mod common;

use common::{FILES_TABLE, GridTest, numbered_table};
use std::fs;

fn names(json: &serde_json::Value) -> Vec<String> {
    json["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Page command tests
// ============================================================================

#[test]
fn test_page_shows_visible_columns() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let output = grid.run_success(&["page", &table]);
    assert!(output.contains("files"));
    assert!(output.contains("Name"));
    assert!(output.contains("Size"));
    assert!(output.contains("alpha.txt"));
    assert!(output.contains("epsilon"));
    assert!(!output.contains("checksum"));
    assert!(!output.contains("a1"));
    assert!(output.contains("Rows 1-5 of 5"));
}

#[test]
fn test_page_sorted_window_json() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let json = grid.run_json(&[
        "page", &table, "--sort", "size", "--dir", "desc", "--offset", "2", "--limit", "2",
        "--json",
    ]);
    assert_eq!(json["total_length"], 5);
    assert_eq!(json["offset"], 2);
    assert_eq!(json["limit"], 2);
    assert_eq!(names(&json), vec!["gamma.rs", "alpha.txt"]);
    assert!(json["cache_key"].is_string());
    assert_eq!(
        json["columns"],
        serde_json::json!(["name", "size", "kind"])
    );
}

#[test]
fn test_page_sort_column_is_case_insensitive() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let json = grid.run_json(&["page", &table, "--sort", "SIZE", "--json"]);
    assert_eq!(
        names(&json),
        vec!["delta.txt", "alpha.txt", "gamma.rs", "beta", "epsilon"]
    );
}

#[test]
fn test_page_filters_and_choices() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let json = grid.run_json(&[
        "page",
        &table,
        "--filter",
        "name=.txt$",
        "--select",
        "kind=file",
        "--json",
    ]);
    assert_eq!(json["total_length"], 2);
    assert_eq!(names(&json), vec!["alpha.txt", "delta.txt"]);

    let kinds = json["filter_choices"]["kind"].as_array().unwrap();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&serde_json::json!("file")));
    assert!(kinds.contains(&serde_json::json!("dir")));
}

#[test]
fn test_page_numeric_filter() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let json = grid.run_json(&["page", &table, "--filter", "size=>=7", "--json"]);
    assert_eq!(names(&json), vec!["beta", "gamma.rs", "epsilon"]);
}

#[test]
fn test_page_selected_columns() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let json = grid.run_json(&["page", &table, "--columns", "kind,name", "--json"]);
    assert_eq!(json["columns"], serde_json::json!(["name", "kind"]));
    let first = json["rows"][0].as_object().unwrap();
    assert!(first.contains_key("name"));
    assert!(!first.contains_key("size"));
}

#[test]
fn test_page_offset_past_end_shows_last_row() {
    let grid = GridTest::new();
    let table = grid.write_table("numbers.json", &numbered_table(20));

    let json = grid.run_json(&["page", &table, "--offset", "25", "--limit", "5", "--json"]);
    assert_eq!(json["total_length"], 20);
    assert_eq!(json["offset"], 19);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["index"], 19);
}

#[test]
fn test_page_no_matches() {
    let grid = GridTest::new();
    let table = grid.write_table("numbers.json", &numbered_table(20));

    let output = grid.run_success(&["page", &table, "--filter", "id=zzz"]);
    assert!(output.contains("No rows found."));
    assert!(output.contains("Rows 0-0 of 0"));
}

#[test]
fn test_page_uses_configured_page_size() {
    let grid = GridTest::new();
    let table = grid.write_table("numbers.json", &numbered_table(20));
    grid.write_config("grid:\n  page_size: 4\n");

    let json = grid.run_json(&["page", &table, "--json"]);
    assert_eq!(json["limit"], 4);
    assert_eq!(json["rows"].as_array().unwrap().len(), 4);

    let output = grid.run_with_env(
        &["page", &table, "--json"],
        &[("GRIDCACHE_PAGE_SIZE", "6")],
    );
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 6);
}

#[test]
fn test_page_unknown_sort_column_fails() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let stderr = grid.run_failure(&["page", &table, "--sort", "owner"]);
    assert!(stderr.contains("owner"));
}

#[test]
fn test_page_unknown_filter_column_fails() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let stderr = grid.run_failure(&["page", &table, "--filter", "owner=me"]);
    assert!(stderr.contains("owner"));
}

#[test]
fn test_page_invalid_numeric_filter_fails() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let stderr = grid.run_failure(&["page", &table, "--filter", "size=>big"]);
    assert!(stderr.contains("expects a number"));
}

#[test]
fn test_page_zero_limit_fails() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let stderr = grid.run_failure(&["page", &table, "--limit", "0"]);
    assert!(stderr.contains("greater than zero"));
}

#[test]
fn test_page_missing_table_fails() {
    let grid = GridTest::new();

    let stderr = grid.run_failure(&["page", "missing.json"]);
    assert!(stderr.contains("missing.json"));
}

#[test]
fn test_page_duplicate_columns_fail() {
    let grid = GridTest::new();
    let table = grid.write_table(
        "dup.json",
        r#"{"columns": [{"id": "a"}, {"id": "A"}], "rows": []}"#,
    );

    let stderr = grid.run_failure(&["page", &table]);
    assert!(stderr.contains("defined more than once"));
}

// ============================================================================
// Export command tests
// ============================================================================

#[test]
fn test_export_to_stdout() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let output = grid.run_success(&[
        "export", &table, "--sort", "name", "--select", "kind=dir",
    ]);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["name\tsize\tkind", "beta\t10\tdir", "epsilon\t12\tdir"]);
}

#[test]
fn test_export_ignores_paging() {
    let grid = GridTest::new();
    let table = grid.write_table("numbers.json", &numbered_table(20));

    let json = grid.run_json(&[
        "export", &table, "--offset", "5", "--limit", "3", "--json",
    ]);
    assert_eq!(json["action"], "export");
    assert_eq!(json["rows"], 20);
    assert!(json["token"].is_string());
}

#[test]
fn test_export_to_file() {
    let grid = GridTest::new();
    let table = grid.write_table("files.json", FILES_TABLE);

    let output = grid.run_success(&[
        "export",
        &table,
        "--columns",
        "name",
        "--filter",
        "name=!.txt",
        "-o",
        "out.tsv",
    ]);
    assert!(output.contains("Exported 3 row(s)"));

    let content = fs::read_to_string(grid.path("out.tsv")).unwrap();
    assert_eq!(content, "name\nbeta\ngamma.rs\nepsilon\n");
}

// ============================================================================
// Config command tests
// ============================================================================

#[test]
fn test_config_show_defaults() {
    let grid = GridTest::new();

    let output = grid.run_success(&["config", "show"]);
    assert!(output.contains("Configuration"));
    assert!(output.contains("page_size: 50"));
    assert!(output.contains("filter_debounce_ms: 500"));
    assert!(output.contains("max_distinct_values: 50"));
}

#[test]
fn test_config_set_and_get() {
    let grid = GridTest::new();

    grid.run_success(&["config", "set", "grid.page_size", "25"]);
    assert!(grid.config_exists());

    let value = grid.run_success(&["config", "get", "grid.page_size"]);
    assert_eq!(value.trim(), "25");

    let json = grid.run_json(&["config", "get", "grid.page_size", "--json"]);
    assert_eq!(json["key"], "grid.page_size");
    assert_eq!(json["value"], "25");
}

#[test]
fn test_config_set_json() {
    let grid = GridTest::new();

    let json = grid.run_json(&[
        "config",
        "set",
        "store.max_distinct_values",
        "10",
        "--json",
    ]);
    assert_eq!(json["action"], "config_set");
    assert_eq!(json["success"], true);
    assert_eq!(json["value"], "10");
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let grid = GridTest::new();

    let stderr = grid.run_failure(&["config", "set", "grid.page_size", "0"]);
    assert!(stderr.contains("greater than zero"));
    assert!(!grid.config_exists());
}

#[test]
fn test_config_unknown_key() {
    let grid = GridTest::new();

    let stderr = grid.run_failure(&["config", "get", "grid.colour"]);
    assert!(stderr.contains("unknown config key"));

    let stderr = grid.run_failure(&["config", "get", "grid_page_size"]);
    assert!(stderr.contains("grid.page_size"));
}

#[test]
fn test_config_show_json() {
    let grid = GridTest::new();
    grid.write_config("grid:\n  filter_debounce_ms: 250\n");

    let json = grid.run_json(&["config", "show", "--json"]);
    assert_eq!(json["grid"]["page_size"], 50);
    assert_eq!(json["grid"]["filter_debounce_ms"], 250);
    assert_eq!(json["store"]["max_distinct_values"], 50);
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let grid = GridTest::new();

    let output = grid.run_success(&["completions", "bash"]);
    assert!(output.contains("gridcache"));
}
