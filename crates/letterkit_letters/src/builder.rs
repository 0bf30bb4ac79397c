//! One letter: template copy, table population, placeholder substitution.

use letterkit_io_docx::{
    DocxDocument, SpecPlaceholderOptions, SpecTableLocateOptions, locate_target_table,
    populate_table, substitute_placeholders,
};

use crate::conf::N_VALUES_ROW_MAX;
use crate::spec::{DictPlaceholders, LetterError};

/// Build a letter from raw template bytes.
///
/// The template bytes are only read; every call parses its own copy.
pub fn build_letter_bytes(
    v_template: &[u8],
    rows: &[Vec<String>],
    placeholders: Option<&DictPlaceholders>,
    n_table_idx: Option<usize>,
) -> Result<Vec<u8>, LetterError> {
    let template = DocxDocument::from_bytes(v_template)?;
    build_letter_from_template(
        &template,
        rows,
        placeholders,
        n_table_idx,
        &SpecTableLocateOptions::default(),
        &SpecPlaceholderOptions::default(),
    )
}

/// Build a letter from a parsed template.
///
/// Works on a private clone: locates the target table, replaces its body rows
/// with `rows`, substitutes placeholders when a map is given, and serializes.
pub fn build_letter_from_template(
    template: &DocxDocument,
    rows: &[Vec<String>],
    placeholders: Option<&DictPlaceholders>,
    n_table_idx: Option<usize>,
    locate_options: &SpecTableLocateOptions,
    placeholder_options: &SpecPlaceholderOptions,
) -> Result<Vec<u8>, LetterError> {
    let mut document = template.clone();

    let n_idx = locate_target_table(&document, n_table_idx, locate_options).ok_or_else(|| {
        LetterError::NoTargetTable {
            n_tables: document.body_tables().len(),
        }
    })?;
    populate_table(document.body_table_mut(n_idx)?, rows, N_VALUES_ROW_MAX);

    if let Some(dict_tokens) = placeholders {
        let report = substitute_placeholders(&mut document, dict_tokens, placeholder_options)?;
        tracing::debug!(
            paragraphs_changed = report.cnt_paragraphs_changed,
            replacements = report.cnt_replacements,
            "applied placeholders"
        );
    }

    Ok(document.to_bytes()?)
}
