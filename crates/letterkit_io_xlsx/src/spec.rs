//! Shared XLSX models: raw tables read from workbooks, write formats, errors.

use std::fmt;

use crate::conf::{
    derive_default_format_header, derive_default_format_integer, derive_default_format_text,
};

////////////////////////////////////////////////////////////////////////////////
// #region RawTable

/// One cell as read from a dataset worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumRawCell {
    /// Blank cell.
    #[default]
    Empty,
    /// Text cell.
    Text(String),
    /// Numeric cell (integers are widened to `f64`).
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Date/time cell as its spreadsheet serial value.
    DateTime(f64),
}

impl EnumRawCell {
    /// Whether the cell is blank or whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(c) => c.trim().is_empty(),
            _ => false,
        }
    }

    /// Plain text rendering.
    ///
    /// Integral numbers print without a fractional part; date/time cells
    /// print their serial value.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(c) => c.clone(),
            Self::Number(n) | Self::DateTime(n) => convert_number_to_text(*n),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
        }
    }
}

/// Render a number the way a person typed it: `3` not `3.0`.
pub fn convert_number_to_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Header row plus body rows of one worksheet.
///
/// Headers are unique and non-empty; every row has exactly `headers.len()`
/// cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRawTable {
    /// Sheet the table was read from.
    pub sheet_name: String,
    /// Column names in sheet order.
    pub headers: Vec<String>,
    /// Body rows in sheet order.
    pub rows: Vec<Vec<EnumRawCell>>,
}

impl SpecRawTable {
    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|c| c == name)
    }

    /// Cell at `(row, col)`; out-of-range reads as empty.
    pub fn cell(&self, n_row: usize, n_col: usize) -> &EnumRawCell {
        static CELL_EMPTY: EnumRawCell = EnumRawCell::Empty;
        self.rows
            .get(n_row)
            .and_then(|l_row| l_row.get(n_col))
            .unwrap_or(&CELL_EMPTY)
    }

    /// Number of body rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format of the index workbook; `None` fields inherit on merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment: `left`, `center`, `right`.
    pub align: Option<String>,
    /// Vertical alignment: `top`, `vcenter`, `bottom`.
    pub valign: Option<String>,
    /// Thin border on all sides.
    pub if_border: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Overlay `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Field-wise merge; set fields of `other` win.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            if_border: other.if_border.or(self.if_border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Value written to an output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Blank cell.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<usize> for EnumCellValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for per-sheet write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide formats and layout defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    /// Body text format.
    pub fmt_text: SpecCellFormat,
    /// Body integer format.
    pub fmt_integer: SpecCellFormat,
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Freeze the header row.
    pub if_freeze_header: bool,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            fmt_text: derive_default_format_text(),
            fmt_integer: derive_default_format_integer(),
            fmt_header: derive_default_format_header(),
            policy_autofit: SpecAutofitCellsPolicy::default(),
            if_freeze_header: true,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-workbook write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheet names actually written, in order.
    pub sheets: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Dataset workbook read failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadXlsxError {
    /// Bytes are not a readable workbook.
    Open(String),
    /// Requested sheet does not exist.
    SheetNotFound {
        /// Requested sheet name.
        sheet: String,
        /// Sheet names present in the workbook.
        sheets_available: Vec<String>,
    },
    /// Sheet has no header row.
    EmptySheet(String),
}

impl fmt::Display for ReadXlsxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "Cannot open workbook: {msg}"),
            Self::SheetNotFound {
                sheet,
                sheets_available,
            } => write!(
                f,
                "Sheet `{sheet}` not found (available: {})",
                sheets_available.join(", ")
            ),
            Self::EmptySheet(sheet) => write!(f, "Sheet `{sheet}` is empty"),
        }
    }
}

impl std::error::Error for ReadXlsxError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
