//! CSV output for the ordered groups.
//!
//! Each group goes to its own file. Files are only created when the
//! pipeline dispatches, so a run that fails or is cancelled leaves nothing
//! behind.

use anyhow::{anyhow, Context, Result};
use csv::WriterBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::parallel::{GroupKind, GroupSink};
use crate::record::{MalformedRecord, Record};
use crate::source::InputHeader;

pub const ACCEPTED_FILE: &str = "succeeded_validation.csv";
pub const REJECTED_FILE: &str = "failed_validation.csv";
pub const MALFORMED_FILE: &str = "malformed_records.csv";

const DEFAULT_HEADER: [&str; 2] = ["id", "value"];
const REASON_COLUMN: &str = "reason";

/// Where each group is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub accepted: PathBuf,
    pub rejected: PathBuf,
    pub malformed: PathBuf,
}

impl OutputPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            accepted: dir.join(ACCEPTED_FILE),
            rejected: dir.join(REJECTED_FILE),
            malformed: dir.join(MALFORMED_FILE),
        }
    }

    fn for_kind(&self, kind: GroupKind) -> &Path {
        match kind {
            GroupKind::Accepted => &self.accepted,
            GroupKind::Rejected => &self.rejected,
        }
    }
}

/// Writes accepted, rejected and malformed groups as CSV files.
#[derive(Debug)]
pub struct CsvGroupWriter {
    paths: OutputPaths,
    input_header: InputHeader,
    written: Vec<PathBuf>,
}

impl CsvGroupWriter {
    /// `input_header` is read when the groups are written, by which time
    /// the source has filled it in. Its first two column names are reused;
    /// an input without a header gets `id,value`.
    pub fn new(paths: OutputPaths, input_header: InputHeader) -> Self {
        Self {
            paths,
            input_header,
            written: Vec::new(),
        }
    }

    fn header(&self) -> [String; 2] {
        match self.input_header.get() {
            Some([id, value, ..]) => [id.clone(), value.clone()],
            _ => DEFAULT_HEADER.map(str::to_string),
        }
    }

    /// Files written so far, in the order they were finished.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn create_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory '{}'", parent.display())
            })?;
        }

        let file = fs::File::create(path)
            .map_err(|e| anyhow!(create_helpful_error_message(path, &e)))?;

        Ok(WriterBuilder::new().flexible(true).from_writer(file))
    }
}

/// Error text for a failed file creation, with a hint where one helps
fn create_helpful_error_message(path: &Path, error: &io::Error) -> String {
    let base_msg = format!("Cannot create output file '{}': {}", path.display(), error);

    let suggestion = match error.kind() {
        io::ErrorKind::PermissionDenied => {
            "Suggestion: Check file permissions or choose a writable --output-dir"
        }
        io::ErrorKind::NotFound => "Suggestion: Parent directory does not exist, create it first",
        _ if path.is_dir() => "Suggestion: Path points to a directory, specify a filename instead",
        io::ErrorKind::InvalidInput => "Suggestion: Check for invalid characters in filename",
        _ => return base_msg,
    };

    format!("{}\n{}", base_msg, suggestion)
}

impl GroupSink for CsvGroupWriter {
    fn emit(&mut self, kind: GroupKind, records: Vec<Record>) -> Result<()> {
        let path = self.paths.for_kind(kind).to_path_buf();
        let mut writer = Self::create_writer(&path)?;

        writer.write_record(&self.header())?;
        for record in &records {
            let id = record.id.to_string();
            writer.write_record([id.as_str(), record.value.as_str()])?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {} records to '{}'", kind, path.display()))?;

        self.written.push(path);
        Ok(())
    }

    fn emit_malformed(&mut self, records: Vec<MalformedRecord>) -> Result<()> {
        let path = self.paths.malformed.clone();
        let mut writer = Self::create_writer(&path)?;

        let [id_column, value_column] = self.header();
        writer.write_record([id_column.as_str(), value_column.as_str(), REASON_COLUMN])?;
        for record in &records {
            let reason = record.reason.to_string();
            let row = record
                .fields
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(reason.as_str()));
            writer.write_record(row)?;
        }
        writer.flush().with_context(|| {
            format!("Failed to write malformed records to '{}'", path.display())
        })?;

        self.written.push(path);
        Ok(())
    }
}
