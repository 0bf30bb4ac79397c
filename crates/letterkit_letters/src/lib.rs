//! `letterkit_letters` v1:
//! Per-group letter generation from a tabular dataset and a DOCX template.
//!
//! - `conf`         : role synonyms, file naming, date formats, sheet names
//! - `spec`         : role/mapping models, batch options, report, errors
//! - `mapping`      : header -> role resolution (exact, then partial)
//! - `date`         : serial/text date resolution and display
//! - `dataset`      : row projection and row filters
//! - `placeholders` : per-group token values from the `Placeholders` sheet
//! - `builder`      : one letter from a template copy
//! - `batch`        : sort, partition and parallel per-group build
//! - `bundle`       : ZIP archive of the outputs
//! - `index`        : index workbook (`Summary` / `Errors`)
pub mod batch;
pub mod builder;
pub mod bundle;
pub mod conf;
pub mod dataset;
pub mod date;
pub mod index;
pub mod mapping;
pub mod placeholders;
pub mod spec;

pub use batch::{
    DocxLetterRender, GroupLetterRender, calculate_worker_limit, derive_file_names,
    derive_row_values, generate_letters_per_group, generate_letters_with, plan_groups,
    plan_sorted_rows,
};
pub use builder::{build_letter_bytes, build_letter_from_template};
pub use bundle::bundle_letters_zip;
pub use conf::{C_FILE_BUNDLE, C_FILE_INDEX, C_GROUP_SENTINEL};
pub use dataset::{derive_cell_text, filter_rows, normalize_dataset};
pub use date::{format_display, parse_date, parse_date_text};
pub use index::build_index_workbook;
pub use mapping::{auto_detect_group_fields, map_columns, validate_mapping};
pub use placeholders::{derive_placeholders_from_table, read_placeholders};
pub use spec::{
    DictPlaceholders, DictPlaceholdersByGroup, EnumFieldRole, EnumGroupField, LetterError,
    MappingError, ReportLetterBatch, SpecColumnMapperOptions, SpecFieldMapping, SpecGroupError,
    SpecIndexEntry, SpecLetterBatchOptions, SpecLetterOutput, SpecNormalizedRow,
    SpecRowFilterOptions,
};
