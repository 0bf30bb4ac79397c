//! `letterkit_io_docx` v1: DOCX template kernel.
//!
//! Modules:
//! - `conf`: package part names, table header presets, token delimiters.
//! - `spec`: locate/substitution options, report model, `DocxError`.
//! - `xml`: owned XML tree parsed and written with `quick-xml`.
//! - `wordml`: run/paragraph/table text helpers.
//! - `package`: `DocxDocument` load/save over `zip`.
//! - `table`: target table discovery and row population.
//! - `placeholder`: run-safe `{{KEY}}` substitution.

pub mod conf;
pub mod package;
pub mod placeholder;
pub mod spec;
pub mod table;
pub mod wordml;
pub mod xml;

pub use package::DocxDocument;
pub use placeholder::{derive_token_pattern, substitute_placeholders, substitute_text};
pub use spec::{
    DocxError, EnumTableFallback, SpecPlaceholderOptions, SpecPlaceholderReport,
    SpecTableLocateOptions,
};
pub use table::{
    clear_table_keep_header, is_header_match, list_candidate_tables, locate_target_table,
    populate_table,
};
pub use wordml::{derive_cell_text, derive_paragraph_text, derive_row_texts, derive_table_rows};
