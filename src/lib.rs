// Core library for rulesplit, the rule-driven CSV record splitter

pub mod debug;
pub mod decompression;
pub mod error;
pub mod output;
pub mod parallel;
pub mod presets;
pub mod record;
pub mod rules;
pub mod source;
pub mod stats;
pub mod tty;

pub use error::{MalformedReason, PipelineError, RuleError};
pub use output::{CsvGroupWriter, OutputPaths};
pub use parallel::{
    CancelToken, GroupKind, GroupSink, MalformedPolicy, MemorySink, PipelineConfig, PipelineState,
    ValidationPipeline,
};
pub use record::{build_record, MalformedRecord, RawFields, Record};
pub use rules::{MatchSemantics, Matcher, Rule, RuleEngine, RuleSpec};
pub use source::{CsvRecordSource, InputHeader};
pub use stats::CompletionReport;
