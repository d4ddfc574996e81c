//! Error types for MDM parsing and document queries.

use thiserror::Error;

/// Errors raised while reading, parsing or querying an MDM document.
///
/// Every parse-time variant aborts the whole parse: no partially populated
/// [`Document`](crate::data::model::Document) is ever returned.
#[derive(Debug, Error)]
pub enum MdmError {
    /// An error originating from reading the source file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural markers are missing, duplicated, out of order or unterminated.
    #[error("Malformed MDM file at line {line}: {message}")]
    MalformedFile { line: usize, message: String },

    /// A data line does not carry one token per declared column.
    #[error(
        "Row shape mismatch in block {block} at line {line}: expected {expected} values, found {found}"
    )]
    RowShape {
        block: usize,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A token in a numeric column is not a number.
    #[error("Invalid value in block {block} at line {line}, column '{column}': '{token}' is not a number")]
    RowValue {
        block: usize,
        line: usize,
        column: String,
        token: String,
    },

    /// A block index outside `[0, block_count)` was requested.
    #[error("Block index {index} out of range. File has {count} blocks.")]
    IndexOutOfRange { index: usize, count: usize },

    /// The input exceeds the configured size guard.
    #[error("Input too large: {what} is {actual}, limit is {limit}")]
    FileTooLarge {
        what: &'static str,
        actual: u64,
        limit: u64,
    },
}

impl MdmError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        MdmError::MalformedFile {
            line,
            message: message.into(),
        }
    }
}

/// A convenience `Result` type alias using [`MdmError`].
pub type Result<T> = std::result::Result<T, MdmError>;
