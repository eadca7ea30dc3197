#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper struct to run gridcache commands in an isolated temp directory
pub struct GridTest {
    pub temp_dir: TempDir,
    binary_path: &'static str,
}

impl GridTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        GridTest {
            temp_dir,
            binary_path: env!("CARGO_BIN_EXE_gridcache"),
        }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut command = Command::new(self.binary_path);
        command
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("GRIDCACHE_ROOT")
            .env_remove("GRIDCACHE_PAGE_SIZE")
            .env_remove("GRIDCACHE_LOG")
            .env("NO_COLOR", "1");
        for (key, value) in envs {
            command.env(key, value);
        }
        command.output().expect("Failed to execute gridcache command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let stdout = self.run_success(args);
        serde_json::from_str(&stdout).expect("Failed to parse JSON output")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Write a table file and return its name relative to the temp dir.
    pub fn write_table(&self, name: &str, content: &str) -> String {
        fs::write(self.path(name), content).expect("Failed to write table file");
        name.to_string()
    }

    pub fn write_config(&self, content: &str) {
        let dir = self.temp_dir.path().join(".gridcache");
        fs::create_dir_all(&dir).expect("Failed to create .gridcache directory");
        fs::write(dir.join("config.yaml"), content).expect("Failed to write config file");
    }

    pub fn config_exists(&self) -> bool {
        self.temp_dir
            .path()
            .join(".gridcache")
            .join("config.yaml")
            .exists()
    }
}

/// A table of files with a numeric size column and a hidden checksum column.
pub const FILES_TABLE: &str = r#"{
    "columns": [
        {"id": "name", "header": "Name"},
        {"id": "size", "header": "Size", "numeric": true},
        {"id": "kind", "header": "Kind"},
        {"id": "checksum", "hidden": true}
    ],
    "rows": [
        {"name": "alpha.txt", "size": 3, "kind": "file", "checksum": "a1"},
        {"name": "beta", "size": 10, "kind": "dir", "checksum": "b2"},
        {"name": "gamma.rs", "size": 7, "kind": "file", "checksum": "c3"},
        {"name": "delta.txt", "size": 1, "kind": "file", "checksum": "d4"},
        {"name": "epsilon", "size": 12, "kind": "dir", "checksum": "e5"}
    ]
}"#;

/// A table of `count` rows named `i-a0`, `i-a1`, `i-a0`, ... with an index column.
pub fn numbered_table(count: usize) -> String {
    let rows: Vec<serde_json::Value> = (0..count)
        .map(|i| serde_json::json!({"id": format!("i-a{}", i % 2), "index": i}))
        .collect();
    serde_json::json!({
        "columns": [
            {"id": "id"},
            {"id": "index", "numeric": true}
        ],
        "rows": rows,
    })
    .to_string()
}
