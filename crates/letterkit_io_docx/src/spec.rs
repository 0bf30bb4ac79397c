//! DOCX kernel option models and error types.

use std::fmt;

use crate::conf::{
    C_TOKEN_CLOSE, C_TOKEN_OPEN, N_NCOLS_TABLE_EXPECTED, TUP_TABLE_HEADERS_EXPECTED,
};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Which four-column table wins when no header matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTableFallback {
    /// Last table with the expected column count (default).
    #[default]
    Last,
    /// First table with the expected column count.
    First,
    /// No fallback; only header-matching tables qualify.
    None,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Target table discovery options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTableLocateOptions {
    /// Accepted header phrases per expected column (compared after normalization).
    pub headers_expected: Vec<Vec<String>>,
    /// Column count a table needs to be a fallback or preferred candidate.
    pub n_cols_expected: usize,
    /// Tie-break when no header matches.
    pub rule_fallback: EnumTableFallback,
}

impl Default for SpecTableLocateOptions {
    fn default() -> Self {
        Self {
            headers_expected: TUP_TABLE_HEADERS_EXPECTED
                .iter()
                .map(|l_phrases| l_phrases.iter().map(|c| c.to_string()).collect())
                .collect(),
            n_cols_expected: N_NCOLS_TABLE_EXPECTED,
            rule_fallback: EnumTableFallback::Last,
        }
    }
}

/// Placeholder substitution options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPlaceholderOptions {
    /// Opening token delimiter.
    pub token_open: String,
    /// Closing token delimiter.
    pub token_close: String,
    /// Also substitute inside header and footer parts.
    pub if_include_headers_footers: bool,
}

impl Default for SpecPlaceholderOptions {
    fn default() -> Self {
        Self {
            token_open: C_TOKEN_OPEN.to_string(),
            token_close: C_TOKEN_CLOSE.to_string(),
            if_include_headers_footers: true,
        }
    }
}

/// Counters from one substitution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecPlaceholderReport {
    /// Paragraphs visited.
    pub cnt_paragraphs: usize,
    /// Paragraphs rewritten because at least one token resolved.
    pub cnt_paragraphs_changed: usize,
    /// Token occurrences replaced.
    pub cnt_replacements: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// DOCX package load/save failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocxError {
    /// Bytes are not a readable ZIP package.
    InvalidPackage(String),
    /// A required package part is absent.
    MissingPart(String),
    /// XML part failed to parse or serialize.
    Xml {
        /// Package part name.
        part: String,
        /// Parser/writer message.
        message: String,
    },
    /// Package IO failure while reading or writing entries.
    Io(String),
    /// Placeholder delimiters produced an unusable pattern.
    InvalidPattern(String),
    /// Table index does not exist in the document body.
    TableIndexOutOfRange {
        /// Requested index.
        n_idx: usize,
        /// Number of body tables.
        n_tables: usize,
    },
}

impl fmt::Display for DocxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPackage(msg) => write!(f, "Invalid DOCX package: {msg}"),
            Self::MissingPart(part) => write!(f, "DOCX package has no part `{part}`"),
            Self::Xml { part, message } => write!(f, "XML error in `{part}`: {message}"),
            Self::Io(msg) => write!(f, "DOCX package IO error: {msg}"),
            Self::InvalidPattern(msg) => write!(f, "Invalid placeholder pattern: {msg}"),
            Self::TableIndexOutOfRange { n_idx, n_tables } => write!(
                f,
                "Table index {n_idx} out of range (document has {n_tables} tables)"
            ),
        }
    }
}

impl std::error::Error for DocxError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
