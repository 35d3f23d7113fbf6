//! CSV input layer: turns a byte stream into raw field tuples.
//!
//! The reader is deliberately lenient about field counts. Deciding whether a
//! row has the right shape is the record builder's job, so rows of any width
//! are passed through untouched.
//!
//! Nothing is read until the first row is pulled. Compression detection and
//! the header row happen on that first pull, inside the ingest stage, so an
//! idle stdin blocks where the pipeline can still abandon it.

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use once_cell::sync::OnceCell;
use std::io::{self, Read};
use std::sync::Arc;

use crate::decompression;
use crate::record::RawFields;

type Rows = StringRecordsIntoIter<Box<dyn Read + Send>>;

/// Header row of the input, shared between the source and the writer.
/// Empty until the source has read it.
#[derive(Debug, Clone, Default)]
pub struct InputHeader(Arc<OnceCell<Vec<String>>>);

impl InputHeader {
    /// A header that is known up front.
    pub fn fixed(columns: Vec<String>) -> Self {
        let header = Self::default();
        header.set(columns);
        header
    }

    pub fn get(&self) -> Option<&[String]> {
        self.0.get().map(Vec::as_slice)
    }

    fn set(&self, columns: Vec<String>) {
        // First header wins
        let _ = self.0.set(columns);
    }
}

enum Progress {
    NotStarted(Box<dyn Read + Send>),
    Reading(Rows),
    Finished,
}

/// Lazy sequence of raw rows read from CSV.
pub struct CsvRecordSource {
    progress: Progress,
    has_header: bool,
    header: InputHeader,
}

impl CsvRecordSource {
    /// Read CSV from any reader. When `has_header` is set the first row is
    /// taken as column names and not yielded as data.
    pub fn from_reader<R: Read + Send + 'static>(reader: R, has_header: bool) -> Self {
        Self {
            progress: Progress::NotStarted(Box::new(reader)),
            has_header,
            header: InputHeader::default(),
        }
    }

    /// Open a file path (or `-` for stdin). Decompression is applied on the
    /// first read.
    pub fn open(path: &str, has_header: bool) -> Result<Self> {
        let reader = decompression::open_input(path)?;
        Ok(Self::from_reader(reader, has_header))
    }

    /// Column names from the header row, once it has been read.
    /// An empty input with `has_header` yields an empty header.
    pub fn header(&self) -> Option<&[String]> {
        self.header.get()
    }

    /// Handle that sees the header after the source reads it on another thread.
    pub fn input_header(&self) -> InputHeader {
        self.header.clone()
    }

    fn start(&mut self, input: Box<dyn Read + Send>) -> io::Result<Rows> {
        let (decoded, _compression) = decompression::maybe_decompress(input)?;
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .from_reader(decoded);

        if self.has_header {
            self.header.set(string_record_fields(csv_reader.headers()?));
        }
        Ok(csv_reader.into_records())
    }
}

impl Iterator for CsvRecordSource {
    type Item = io::Result<RawFields>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.progress, Progress::Finished) {
                Progress::NotStarted(input) => match self.start(input) {
                    Ok(rows) => self.progress = Progress::Reading(rows),
                    Err(e) => return Some(Err(e)),
                },
                Progress::Reading(mut rows) => {
                    let row = rows.next()?;
                    self.progress = Progress::Reading(rows);
                    return Some(
                        row.map(|record| string_record_fields(&record))
                            .map_err(io::Error::from),
                    );
                }
                Progress::Finished => return None,
            }
        }
    }
}

fn string_record_fields(record: &StringRecord) -> RawFields {
    record.iter().map(|field| field.to_string()).collect()
}
