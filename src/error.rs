//! Error types for statemap ingest, rendered as a single human-readable
//! message with a source line where one is meaningful.

use std::path::PathBuf;

use snafu::Snafu;

pub type Result<T, E = StatemapError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StatemapError {
    #[snafu(display("failed to stat {}", path.display()))]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to open {}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to map {}", path.display()))]
    Mmap {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("line {line}: illegal JSON delimiter (\"{found}\")"))]
    IllegalDelimiter { line: u64, found: char },

    #[snafu(display("JSON payload starting at line {line} is not terminated"))]
    UnterminatedBlob { line: u64 },

    #[snafu(display("missing metadata payload"))]
    MissingMetadata,

    #[snafu(display(
        "size of metadata ({size} bytes) exceeds maximum ({max} bytes)"
    ))]
    MetadataTooLarge { size: usize, max: usize },

    #[snafu(display("malformed metadata: {reason}"))]
    MalformedMetadata { reason: String },

    #[snafu(display("missing \"states\" in metadata"))]
    MissingStates,

    #[snafu(display("invalid metadata: \"states\" must be an object"))]
    StatesNotObject,

    #[snafu(display("state \"{state}\" is missing a \"value\" field"))]
    MissingValue { state: String },

    #[snafu(display(
        "\"value\" member for state \"{state}\" is not a non-negative integer"
    ))]
    ValueNotInteger { state: String },

    #[snafu(display(
        "\"value\" member for state \"{state}\" ({value}) exceeds maximum ({max})"
    ))]
    ValueOutOfRange { state: String, value: i64, max: u32 },

    #[snafu(display(
        "\"value\" for state \"{state}\" ({value}) conflicts with that of state \"{other}\""
    ))]
    DuplicateValue {
        state: String,
        other: String,
        value: u32,
    },

    #[snafu(display("line {line}: malformed JSON datum: {reason}"))]
    MalformedDatum { line: u64, reason: String },

    #[snafu(display("line {line}: datum contains duplicate \"{field}\""))]
    DuplicateField { line: u64, field: &'static str },

    #[snafu(display("line {line}: illegal datum: missing \"entity\" field"))]
    MissingEntity { line: u64 },

    #[snafu(display(
        "line {line}: illegal datum: missing \"time\" or \"description\""
    ))]
    MissingTimeOrDescription { line: u64 },

    #[snafu(display("line {line}: \"time\" is not a non-negative integer"))]
    NonIntegerTime { line: u64 },

    #[snafu(display("line {line}: missing \"state\" field"))]
    MissingState { line: u64 },

    #[snafu(display("line {line}: illegal state value"))]
    IllegalStateValue { line: u64 },

    #[snafu(display(
        "line {line}: time {time} is out of order with respect to prior time {open_start}"
    ))]
    TimeOutOfOrder {
        line: u64,
        time: u64,
        open_start: u64,
    },
}
