//! Per-group placeholder values from the auxiliary `Placeholders` sheet.
//!
//! Every failure mode (unreadable workbook, missing sheet, missing columns)
//! degrades to an empty set with a warning.

use letterkit_io_xlsx::{EnumRawCell, SpecRawTable, list_sheet_names, read_dataset, resolve_sheet_name};
use letterkit_text::normalize_header_text;

use crate::conf::{
    C_SHEET_PLACEHOLDERS, TUP_PLACEHOLDER_HEADERS_GROUP, TUP_PLACEHOLDER_HEADERS_KEY,
    TUP_PLACEHOLDER_HEADERS_VALUE,
};
use crate::dataset::derive_cell_text;
use crate::spec::DictPlaceholdersByGroup;

fn find_column(table: &SpecRawTable, l_accepted: &[&str]) -> Option<usize> {
    table
        .headers
        .iter()
        .position(|c_header| l_accepted.contains(&normalize_header_text(c_header).as_str()))
}

/// Read the placeholder sheet of a workbook.
pub fn read_placeholders(v_xlsx: &[u8]) -> DictPlaceholdersByGroup {
    let l_sheets = match list_sheet_names(v_xlsx) {
        Ok(l_sheets) => l_sheets,
        Err(err) => {
            tracing::warn!(error = %err, "placeholder workbook unreadable; continuing without placeholders");
            return DictPlaceholdersByGroup::new();
        }
    };
    let Some(c_sheet) = resolve_sheet_name(&l_sheets, C_SHEET_PLACEHOLDERS) else {
        tracing::debug!(sheet = C_SHEET_PLACEHOLDERS, "no placeholder sheet");
        return DictPlaceholdersByGroup::new();
    };

    match read_dataset(v_xlsx, Some(&c_sheet)) {
        Ok(table) => derive_placeholders_from_table(&table),
        Err(err) => {
            tracing::warn!(sheet = %c_sheet, error = %err, "placeholder sheet unreadable");
            DictPlaceholdersByGroup::new()
        }
    }
}

/// Build the group -> key -> value map from a `(group, key, value)` table.
///
/// Rows with a blank group or key are skipped; later duplicates override
/// earlier ones. Group and key are trimmed, values are kept as written.
pub fn derive_placeholders_from_table(table: &SpecRawTable) -> DictPlaceholdersByGroup {
    let (Some(n_col_group), Some(n_col_key), Some(n_col_value)) = (
        find_column(table, &TUP_PLACEHOLDER_HEADERS_GROUP),
        find_column(table, &TUP_PLACEHOLDER_HEADERS_KEY),
        find_column(table, &TUP_PLACEHOLDER_HEADERS_VALUE),
    ) else {
        tracing::warn!(
            sheet = %table.sheet_name,
            headers = ?table.headers,
            "placeholder sheet lacks group/key/value columns; ignoring it"
        );
        return DictPlaceholdersByGroup::new();
    };

    let mut dict_by_group = DictPlaceholdersByGroup::new();
    for n_row in 0..table.height() {
        let c_group = derive_cell_text(table.cell(n_row, n_col_group));
        let c_key = derive_cell_text(table.cell(n_row, n_col_key));
        if c_group.is_empty() || c_key.is_empty() {
            continue;
        }
        let c_value = match table.cell(n_row, n_col_value) {
            EnumRawCell::Text(c) => c.clone(),
            cell => derive_cell_text(cell),
        };
        dict_by_group
            .entry(c_group)
            .or_default()
            .insert(c_key, c_value);
    }
    tracing::debug!(groups = dict_by_group.len(), "loaded placeholders");
    dict_by_group
}
