//! DOCX constants and default presets.

/// Fallback main document part when package relationships do not name one.
pub const C_PART_DOCUMENT_DEFAULT: &str = "word/document.xml";
/// Package-level relationships part.
pub const C_PART_PACKAGE_RELS: &str = "_rels/.rels";
/// Relationship type suffix of the main document part.
pub const C_REL_TYPE_OFFICE_DOCUMENT_SUFFIX: &str = "/officeDocument";
/// Prefixes of header/footer parts (`word/header1.xml`, `word/footer2.xml`...).
pub const TUP_PART_PREFIXES_HEADER_FOOTER: [&str; 2] = ["word/header", "word/footer"];

/// Column count of the letter body table.
pub const N_NCOLS_TABLE_EXPECTED: usize = 4;

/// Accepted header phrases per column of the letter body table.
///
/// Order is subject, level, date, description; matching is position-free.
pub const TUP_TABLE_HEADERS_EXPECTED: [&[&str]; 4] = [
    &["nombre de la mesa", "subject"],
    &["nivel", "level"],
    &["fecha", "date"],
    &["dato transformador", "description"],
];

/// Opening placeholder delimiter.
pub const C_TOKEN_OPEN: &str = "{{";
/// Closing placeholder delimiter.
pub const C_TOKEN_CLOSE: &str = "}}";

/// `w:br` types that do not read as a line break.
pub const TUP_BREAK_TYPES_SILENT: [&str; 2] = ["page", "column"];
