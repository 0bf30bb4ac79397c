//! XLSX constants and default preset factories.

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Header name given to columns whose header cell is empty (`Unnamed: 3`).
pub const C_HEADER_UNNAMED_PREFIX: &str = "Unnamed: ";

/// Base format shared by every index workbook cell.
pub fn derive_default_format_text() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some("Times New Roman".to_string()),
        font_size: Some(11),
        if_border: Some(true),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    }
}

/// Header format: base plus bold, centered.
pub fn derive_default_format_header() -> SpecCellFormat {
    derive_default_format_text().with_(SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        ..Default::default()
    })
}

/// Integer format: base with `0` number format, right aligned.
pub fn derive_default_format_integer() -> SpecCellFormat {
    derive_default_format_text().with_(SpecCellFormat {
        num_format: Some("0".to_string()),
        align: Some("right".to_string()),
        ..Default::default()
    })
}
