// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tempfile::TempDir;

pub const ACCEPTED: &str = "succeeded_validation.csv";
pub const REJECTED: &str = "failed_validation.csv";
pub const MALFORMED: &str = "malformed_records.csv";

/// Path of the binary built for this test run
pub fn rulesplit_binary() -> &'static str {
    env!("CARGO_BIN_EXE_rulesplit")
}

/// A scratch directory holding inputs, outputs and an empty home, so runs
/// never pick up the developer's own config files.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("home")).expect("Failed to create home dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` to `name` and return its path as a string argument
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> String {
        let path = self.file(name);
        fs::write(&path, content).expect("Failed to write test file");
        path.to_string_lossy().to_string()
    }

    /// Read an output file, `None` if it was never written
    pub fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.file(name)).ok()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.file(name).exists()
    }

    /// Command with `--output-dir` pointing into the workspace
    pub fn command(&self, args: &[&str]) -> Command {
        let home = self.file("home");
        let mut cmd = Command::new(rulesplit_binary());
        cmd.args(args)
            .arg("--output-dir")
            .arg(self.path())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", &home)
            .env("NO_EMOJI", "1")
            .current_dir(self.path());
        cmd
    }

    /// Run with the given arguments and no stdin
    pub fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .expect("Failed to execute rulesplit");

        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    /// Run with `input` piped to stdin
    pub fn run_with_input(&self, args: &[&str], input: &str) -> (String, String, i32) {
        let mut child = self.spawn(args);

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .expect("Failed to write to stdin");
        }

        let output = child.wait_with_output().expect("Failed to read output");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    /// Start rulesplit with piped stdio and leave it running
    pub fn spawn(&self, args: &[&str]) -> Child {
        self.command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to start rulesplit")
    }
}

/// Identifiers of the data rows of an output file (header skipped)
pub fn ids(content: &str) -> Vec<u32> {
    content
        .lines()
        .skip(1)
        .map(|line| {
            line.split(',')
                .next()
                .and_then(|id| id.parse().ok())
                .expect("output row should start with an identifier")
        })
        .collect()
}

/// The five-row postcode sample used across the tests
pub fn postcode_sample() -> &'static str {
    "row_id,postcode\n1,EC1A 1BB\n2,FY10 4PL\n3,SO1 4QQ\n4,GIR 0AA\n5,ZZ99 9ZZ\n"
}
