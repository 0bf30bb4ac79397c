//! Index workbook: rows per generated letter, plus failures.

use letterkit_io_xlsx::{EnumCellValue, SpecXlsxWriteOptions, XlsxWriter};

use crate::conf::{C_SHEET_ERRORS, C_SHEET_SUMMARY, TUP_HEADERS_ERRORS, TUP_HEADERS_SUMMARY};
use crate::spec::ReportLetterBatch;

fn derive_headers(l: &[&str]) -> Vec<String> {
    l.iter().map(|c| c.to_string()).collect()
}

/// Serialize the batch index to XLSX bytes.
///
/// `Summary` lists `{group, rows}` for every output; `Errors` lists
/// `{group, message}` and is only written when a group failed.
pub fn build_index_workbook(
    report: &ReportLetterBatch,
    write_options: &SpecXlsxWriteOptions,
) -> Result<Vec<u8>, String> {
    let mut writer = XlsxWriter::new(write_options.clone());

    let l_rows_summary: Vec<Vec<EnumCellValue>> = report
        .index
        .iter()
        .map(|entry| vec![EnumCellValue::from(entry.group.as_str()), entry.n_rows.into()])
        .collect();
    writer.write_sheet(
        C_SHEET_SUMMARY,
        &derive_headers(&TUP_HEADERS_SUMMARY),
        &l_rows_summary,
    )?;

    if !report.errors.is_empty() {
        let l_rows_errors: Vec<Vec<EnumCellValue>> = report
            .errors
            .iter()
            .map(|err| {
                vec![
                    EnumCellValue::from(err.group.as_str()),
                    EnumCellValue::from(err.message.as_str()),
                ]
            })
            .collect();
        writer.write_sheet(
            C_SHEET_ERRORS,
            &derive_headers(&TUP_HEADERS_ERRORS),
            &l_rows_errors,
        )?;
    }

    for msg in writer.report().warnings {
        tracing::warn!("{msg}");
    }
    writer.save_to_buffer()
}
