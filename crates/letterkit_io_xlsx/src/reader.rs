//! Worksheet reader producing [`SpecRawTable`] values with `calamine`.

use std::io::Cursor;

use calamine::{Data, Reader, Sheets, open_workbook_auto_from_rs};
use letterkit_text::normalize_header_text;

use crate::spec::{EnumRawCell, ReadXlsxError, SpecRawTable};
use crate::util::derive_unique_headers;

type WorkbookInMemory = Sheets<Cursor<Vec<u8>>>;

fn open_workbook(v_bytes: &[u8]) -> Result<WorkbookInMemory, ReadXlsxError> {
    open_workbook_auto_from_rs(Cursor::new(v_bytes.to_vec()))
        .map_err(|err| ReadXlsxError::Open(err.to_string()))
}

/// Sheet names in workbook order.
pub fn list_sheet_names(v_bytes: &[u8]) -> Result<Vec<String>, ReadXlsxError> {
    Ok(open_workbook(v_bytes)?.sheet_names())
}

/// Resolve a requested sheet name: exact match first, then normalized match.
pub fn resolve_sheet_name(l_sheet_names: &[String], name: &str) -> Option<String> {
    if let Some(c) = l_sheet_names.iter().find(|c| c.as_str() == name) {
        return Some(c.clone());
    }
    let c_target = normalize_header_text(name);
    l_sheet_names
        .iter()
        .find(|c| normalize_header_text(c) == c_target)
        .cloned()
}

/// Read one worksheet as a header row plus body rows.
///
/// `sheet = None` reads the first worksheet. The first used row is the header;
/// trailing rows with only blank cells are dropped.
pub fn read_dataset(v_bytes: &[u8], sheet: Option<&str>) -> Result<SpecRawTable, ReadXlsxError> {
    let mut workbook = open_workbook(v_bytes)?;
    let l_sheet_names = workbook.sheet_names();

    let sheet_name = match sheet {
        Some(name) => resolve_sheet_name(&l_sheet_names, name).ok_or_else(|| {
            ReadXlsxError::SheetNotFound {
                sheet: name.to_string(),
                sheets_available: l_sheet_names.clone(),
            }
        })?,
        None => l_sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ReadXlsxError::Open("workbook has no worksheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| ReadXlsxError::Open(format!("{sheet_name}: {err}")))?;

    let mut iter_rows = range.rows();
    let Some(l_header_cells) = iter_rows.next() else {
        return Err(ReadXlsxError::EmptySheet(sheet_name));
    };
    let l_headers_raw: Vec<String> = l_header_cells
        .iter()
        .map(|cell| convert_data_to_raw_cell(cell).to_text().trim().to_string())
        .collect();
    let headers = derive_unique_headers(&l_headers_raw);

    let n_width = headers.len();
    let mut rows: Vec<Vec<EnumRawCell>> = iter_rows
        .map(|l_cells| {
            let mut l_row: Vec<EnumRawCell> = l_cells.iter().map(convert_data_to_raw_cell).collect();
            l_row.resize(n_width, EnumRawCell::Empty);
            l_row
        })
        .collect();
    while rows
        .last()
        .is_some_and(|l_row| l_row.iter().all(EnumRawCell::is_empty))
    {
        rows.pop();
    }

    tracing::debug!(
        sheet = %sheet_name,
        cols = n_width,
        rows = rows.len(),
        "read worksheet"
    );

    Ok(SpecRawTable {
        sheet_name,
        headers,
        rows,
    })
}

fn convert_data_to_raw_cell(cell: &Data) -> EnumRawCell {
    match cell {
        Data::Empty => EnumRawCell::Empty,
        Data::String(c) if c.is_empty() => EnumRawCell::Empty,
        Data::String(c) => EnumRawCell::Text(c.clone()),
        Data::Float(f) => EnumRawCell::Number(*f),
        Data::Int(i) => EnumRawCell::Number(*i as f64),
        Data::Bool(b) => EnumRawCell::Bool(*b),
        Data::DateTime(dt) => EnumRawCell::DateTime(dt.as_f64()),
        Data::DateTimeIso(c) | Data::DurationIso(c) => EnumRawCell::Text(c.clone()),
        Data::Error(_) => EnumRawCell::Empty,
    }
}
