//! In-memory workbook writer for header-plus-rows report sheets.

use std::collections::BTreeSet;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecXlsxReport, SpecXlsxWriteOptions, convert_number_to_text,
};
use crate::util::sanitize_sheet_name;

static CELL_BLANK: EnumCellValue = EnumCellValue::None;

/// Stateful workbook writer.
///
/// Sheets accumulate in memory; [`Self::save_to_buffer`] serializes them.
pub struct XlsxWriter {
    workbook: Workbook,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecXlsxReport,
}

impl XlsxWriter {
    /// Create a writer with format/layout presets.
    pub fn new(write_options: SpecXlsxWriteOptions) -> Self {
        Self {
            workbook: Workbook::new(),
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecXlsxReport::default(),
        }
    }

    /// Snapshot of the sheets written so far.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Serialize the workbook to XLSX bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, String> {
        self.workbook.save_to_buffer().map_err(derive_xlsx_error_text)
    }

    /// Write one sheet: a single header row followed by `rows`.
    ///
    /// Returns the sheet name actually used (sanitized, de-duplicated with a
    /// `__<n>` suffix). Rows shorter than the header are padded with blanks.
    pub fn write_sheet(
        &mut self,
        sheet_name: &str,
        l_headers: &[String],
        rows: &[Vec<EnumCellValue>],
    ) -> Result<String, String> {
        validate_policy_autofit(&self.write_options.policy_autofit)?;
        let n_width = l_headers.len();
        if n_width > N_NCOLS_EXCEL_MAX {
            return Err(format!(
                "sheet `{sheet_name}` has {n_width} columns (max {N_NCOLS_EXCEL_MAX})"
            ));
        }
        if rows.len() + 1 > N_NROWS_EXCEL_MAX {
            return Err(format!(
                "sheet `{sheet_name}` has {} rows (max {})",
                rows.len(),
                N_NROWS_EXCEL_MAX - 1
            ));
        }

        let sheet_name_unique = self.derive_unique_sheet_name(&sanitize_sheet_name(sheet_name, "_"));
        if sheet_name_unique != sheet_name {
            self.report.warn(format!(
                "sheet `{sheet_name}` written as `{sheet_name_unique}`"
            ));
        }

        let fmt_header = derive_rust_xlsx_format(&self.write_options.fmt_header);
        let fmt_text = derive_rust_xlsx_format(&self.write_options.fmt_text);
        let fmt_integer = derive_rust_xlsx_format(&self.write_options.fmt_integer);
        let policy_autofit = &self.write_options.policy_autofit;

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&sheet_name_unique)
            .map_err(derive_xlsx_error_text)?;

        let mut l_width_by_col_header = vec![0usize; n_width];
        for (n_idx_col, c_header) in l_headers.iter().enumerate() {
            l_width_by_col_header[n_idx_col] = estimate_unicode_string_width(c_header);
            write_cell_with_format(
                worksheet,
                0,
                n_idx_col,
                &EnumCellValue::String(c_header.clone()),
                &fmt_header,
            )?;
        }

        let n_rows_autofit = policy_autofit.height_body_inferred_max.unwrap_or(usize::MAX);
        let mut l_width_by_col_body = vec![0usize; n_width];
        for (n_idx_row, l_values) in rows.iter().enumerate() {
            for n_idx_col in 0..n_width {
                let value = l_values.get(n_idx_col).unwrap_or(&CELL_BLANK);
                let format = match value {
                    EnumCellValue::Number(n) if n.fract() == 0.0 => &fmt_integer,
                    _ => &fmt_text,
                };
                if n_idx_row < n_rows_autofit {
                    l_width_by_col_body[n_idx_col] =
                        usize::max(l_width_by_col_body[n_idx_col], estimate_width_len(value));
                }
                write_cell_with_format(worksheet, n_idx_row + 1, n_idx_col, value, format)?;
            }
        }

        if policy_autofit.rule_columns != EnumAutofitColumnsRule::None {
            let n_min = usize::max(1, policy_autofit.width_cell_min);
            let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
            let n_pad = policy_autofit.width_cell_padding;

            for n_idx_col in 0..n_width {
                let n_width_recorded = match policy_autofit.rule_columns {
                    EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => {
                        l_width_by_col_header[n_idx_col]
                    }
                    EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                    EnumAutofitColumnsRule::All => usize::max(
                        l_width_by_col_header[n_idx_col],
                        l_width_by_col_body[n_idx_col],
                    ),
                };
                let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                worksheet
                    .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
                    .map_err(derive_xlsx_error_text)?;
            }
        }

        if self.write_options.if_freeze_header {
            worksheet
                .set_freeze_panes(1, 0)
                .map_err(derive_xlsx_error_text)?;
        }

        tracing::debug!(sheet = %sheet_name_unique, rows = rows.len(), cols = n_width, "wrote sheet");
        self.report.sheets.push(sheet_name_unique.clone());
        Ok(sheet_name_unique)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Estimate displayed width units for one cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => s
            .lines()
            .map(estimate_unicode_string_width)
            .max()
            .unwrap_or(0),
        EnumCellValue::Number(n) => convert_number_to_text(*n).len(),
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min > policy_autofit.width_cell_max {
        return Err(format!(
            "autofit width_cell_min ({}) exceeds width_cell_max ({})",
            policy_autofit.width_cell_min, policy_autofit.width_cell_max
        ));
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    *val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(fmt_spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();
    if let Some(c_font) = &fmt_spec.font_name {
        format = format.set_font_name(c_font.as_str());
    }
    if let Some(n_size) = fmt_spec.font_size {
        format = format.set_font_size(n_size as f64);
    }
    if fmt_spec.bold == Some(true) {
        format = format.set_bold();
    }
    if let Some(align) = fmt_spec.align.as_deref().and_then(derive_format_align) {
        format = format.set_align(align);
    }
    if let Some(align) = fmt_spec.valign.as_deref().and_then(derive_format_align) {
        format = format.set_align(align);
    }
    if let Some(c_num_format) = &fmt_spec.num_format {
        format = format.set_num_format(c_num_format.as_str());
    }
    if fmt_spec.if_border == Some(true) {
        format = format.set_border(FormatBorder::Thin);
    }
    format
}

/// Alignment keyword -> `FormatAlign`; horizontal and vertical share one namespace.
fn derive_format_align(c_align: &str) -> Option<FormatAlign> {
    match c_align.trim().to_ascii_lowercase().as_str() {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "vcenter" => Some(FormatAlign::VerticalCenter),
        "bottom" => Some(FormatAlign::Bottom),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}
