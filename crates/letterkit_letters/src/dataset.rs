//! Dataset projection onto [`SpecNormalizedRow`] and row filters.

use std::collections::HashSet;

use letterkit_io_xlsx::{EnumRawCell, SpecRawTable};

use crate::date::{format_display, format_iso, parse_date};
use crate::spec::{
    EnumFieldRole, MappingError, SpecFieldMapping, SpecNormalizedRow, SpecRowFilterOptions,
};

/// Text of a cell as it appears in a letter; date/time cells render as ISO dates.
pub fn derive_cell_text(cell: &EnumRawCell) -> String {
    match cell {
        EnumRawCell::DateTime(_) => parse_date(cell).map(format_iso).unwrap_or_default(),
        EnumRawCell::Text(c) => c.trim().to_string(),
        _ => cell.to_text(),
    }
}

fn resolve_column(
    table: &SpecRawTable,
    mapping: &SpecFieldMapping,
    role: EnumFieldRole,
) -> Result<usize, MappingError> {
    let c_col = mapping.get(role).ok_or_else(|| MappingError::MappingIncomplete {
        roles: vec![role],
    })?;
    table
        .column_index(c_col)
        .ok_or_else(|| MappingError::MissingColumn {
            role,
            column: c_col.to_string(),
        })
}

/// Project every dataset row through the mapping.
///
/// Unresolved required roles fail with `MappingIncomplete`; a mapped column
/// absent from the header set fails with `MissingColumn`. A mapped group
/// column must exist too. Dates never fail: unparseable values keep an
/// empty display and are counted in a warning.
pub fn normalize_dataset(
    table: &SpecRawTable,
    mapping: &SpecFieldMapping,
) -> Result<Vec<SpecNormalizedRow>, MappingError> {
    let roles = mapping.missing_required();
    if !roles.is_empty() {
        return Err(MappingError::MappingIncomplete { roles });
    }

    let n_col_actor = resolve_column(table, mapping, EnumFieldRole::Actor)?;
    let n_col_subject = resolve_column(table, mapping, EnumFieldRole::Subject)?;
    let n_col_level = resolve_column(table, mapping, EnumFieldRole::Level)?;
    let n_col_date = resolve_column(table, mapping, EnumFieldRole::Date)?;
    let n_col_description = resolve_column(table, mapping, EnumFieldRole::Description)?;
    let n_col_group = match mapping.get(EnumFieldRole::Group) {
        Some(_) => Some(resolve_column(table, mapping, EnumFieldRole::Group)?),
        None => None,
    };

    let mut n_dates_unparsed = 0usize;
    let mut l_rows = Vec::with_capacity(table.height());
    for n_row in 0..table.height() {
        let date_raw = table.cell(n_row, n_col_date).clone();
        let date_ts = parse_date(&date_raw);
        if date_ts.is_none() && !date_raw.is_empty() {
            n_dates_unparsed += 1;
        }
        let group = n_col_group
            .map(|n_col| derive_cell_text(table.cell(n_row, n_col)))
            .filter(|c| !c.is_empty());

        l_rows.push(SpecNormalizedRow {
            actor: derive_cell_text(table.cell(n_row, n_col_actor)),
            group,
            subject: derive_cell_text(table.cell(n_row, n_col_subject)),
            level: derive_cell_text(table.cell(n_row, n_col_level)),
            date_display: format_display(date_ts),
            date_ts,
            date_raw,
            description: derive_cell_text(table.cell(n_row, n_col_description)),
        });
    }

    if n_dates_unparsed > 0 {
        tracing::warn!(
            rows = n_dates_unparsed,
            column = mapping.get(EnumFieldRole::Date).unwrap_or_default(),
            "dates could not be parsed and were left empty"
        );
    }
    tracing::debug!(rows = l_rows.len(), "normalized dataset");
    Ok(l_rows)
}

/// Apply the actor allow-list, the empty-subject filter and de-duplication, in that order.
///
/// Row order is preserved; duplicates keep their first occurrence.
pub fn filter_rows(
    rows: Vec<SpecNormalizedRow>,
    options: &SpecRowFilterOptions,
) -> Vec<SpecNormalizedRow> {
    let n_rows_in = rows.len();
    let mut set_seen: HashSet<(String, String, String, String, String)> = HashSet::new();

    let l_kept: Vec<SpecNormalizedRow> = rows
        .into_iter()
        .filter(|row| match &options.actors_allowed {
            Some(set_actors) => set_actors.contains(&row.actor),
            None => true,
        })
        .filter(|row| !options.if_drop_empty_subject || !row.subject.trim().is_empty())
        .filter(|row| {
            !options.if_drop_duplicates
                || set_seen.insert((
                    row.actor.clone(),
                    row.subject.clone(),
                    row.level.clone(),
                    row.date_raw.to_text(),
                    row.description.clone(),
                ))
        })
        .collect();

    if l_kept.len() != n_rows_in {
        tracing::debug!(rows_in = n_rows_in, rows_out = l_kept.len(), "filtered rows");
    }
    l_kept
}
