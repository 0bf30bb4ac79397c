//! `letterkit_io_xlsx` v1:
//! Spreadsheet IO kernel.
//!
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : raw table/cell models, write options, errors
//! - `util`   : header and sheet-name normalization helpers
//! - `reader` : worksheet reader (`calamine`)
//! - `writer` : in-memory report workbook writer (`rust_xlsxwriter`)
pub mod conf;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
pub use reader::{list_sheet_names, read_dataset, resolve_sheet_name};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumRawCell, ReadXlsxError, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecRawTable, SpecXlsxReport, SpecXlsxWriteOptions, convert_number_to_text,
};
pub use util::{derive_unique_headers, sanitize_sheet_name};
pub use writer::{XlsxWriter, estimate_width_len};
