//! Letter generation option models, data records, reports and errors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDateTime;
use letterkit_io_docx::{DocxError, SpecPlaceholderOptions, SpecTableLocateOptions};
use letterkit_io_xlsx::EnumRawCell;

use crate::conf::{
    C_FILE_EXT, C_FILE_PREFIX, C_GROUP_SENTINEL, TUP_GROUP_FALLBACK_KEYWORDS, TUP_ROLE_SYNONYMS,
};

/// Token key -> replacement text for one group.
pub type DictPlaceholders = BTreeMap<String, String>;
/// Group name -> placeholder map.
pub type DictPlaceholdersByGroup = BTreeMap<String, DictPlaceholders>;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Semantic field a dataset column can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumFieldRole {
    /// Owner of the row; default grouping key.
    Actor,
    /// Optional institutional grouping key.
    Group,
    /// Letter table column 1.
    Subject,
    /// Letter table column 2.
    Level,
    /// Letter table column 3 (resolved to a date).
    Date,
    /// Letter table column 4.
    Description,
}

impl EnumFieldRole {
    /// Every role, in mapping order.
    pub const ALL: [EnumFieldRole; 6] = [
        Self::Actor,
        Self::Group,
        Self::Subject,
        Self::Level,
        Self::Date,
        Self::Description,
    ];

    /// Roles that must resolve for a dataset to be usable.
    pub const REQUIRED: [EnumFieldRole; 5] = [
        Self::Actor,
        Self::Subject,
        Self::Level,
        Self::Date,
        Self::Description,
    ];

    /// Lowercase role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Group => "group",
            Self::Subject => "subject",
            Self::Level => "level",
            Self::Date => "date",
            Self::Description => "description",
        }
    }
}

impl fmt::Display for EnumFieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which normalized field partitions rows into letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumGroupField {
    /// Group by `ACTOR` (default).
    #[default]
    Actor,
    /// Group by `GROUP`; rows without one go to the sentinel group.
    Group,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Models

/// Resolved column per role; `None` when unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecFieldMapping {
    dict_columns: BTreeMap<EnumFieldRole, String>,
}

impl SpecFieldMapping {
    /// Source column of `role`.
    pub fn get(&self, role: EnumFieldRole) -> Option<&str> {
        self.dict_columns.get(&role).map(String::as_str)
    }

    /// Copy of this mapping with `role` bound to `column` (or unbound).
    pub fn with_role(&self, role: EnumFieldRole, column: Option<&str>) -> Self {
        let mut dict_columns = self.dict_columns.clone();
        match column {
            Some(c) => dict_columns.insert(role, c.to_string()),
            None => dict_columns.remove(&role),
        };
        Self { dict_columns }
    }

    /// Required roles without a column.
    pub fn missing_required(&self) -> Vec<EnumFieldRole> {
        EnumFieldRole::REQUIRED
            .into_iter()
            .filter(|role| !self.dict_columns.contains_key(role))
            .collect()
    }
}

impl FromIterator<(EnumFieldRole, String)> for SpecFieldMapping {
    fn from_iter<T: IntoIterator<Item = (EnumFieldRole, String)>>(iter: T) -> Self {
        Self {
            dict_columns: iter.into_iter().collect(),
        }
    }
}

/// Canonical projection of one dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecNormalizedRow {
    /// Actor text; empty when the cell was blank.
    pub actor: String,
    /// Group text; `None` when the dataset has no group column or the cell was blank.
    pub group: Option<String>,
    /// Subject text.
    pub subject: String,
    /// Level text.
    pub level: String,
    /// Date cell as read.
    pub date_raw: EnumRawCell,
    /// Resolved timestamp; `None` when the date could not be parsed.
    pub date_ts: Option<NaiveDateTime>,
    /// `DD/MM/YYYY`, or empty when unresolved.
    pub date_display: String,
    /// Description text.
    pub description: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Column mapper rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnMapperOptions {
    /// Ordered `(role, synonyms)` rules; synonyms are normalized on use.
    pub rules: Vec<(EnumFieldRole, Vec<String>)>,
    /// Substrings scanned for the group role when no rule matched it.
    pub group_fallback_keywords: Vec<String>,
}

impl Default for SpecColumnMapperOptions {
    fn default() -> Self {
        Self {
            rules: TUP_ROLE_SYNONYMS
                .iter()
                .map(|(role, l_synonyms)| {
                    (*role, l_synonyms.iter().map(|c| c.to_string()).collect())
                })
                .collect(),
            group_fallback_keywords: TUP_GROUP_FALLBACK_KEYWORDS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// Row filters applied after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecRowFilterOptions {
    /// Keep only rows whose actor is in this set; `None` keeps all.
    pub actors_allowed: Option<BTreeSet<String>>,
    /// Drop rows with a blank subject.
    pub if_drop_empty_subject: bool,
    /// Drop repeated (actor, subject, level, raw date, description) rows.
    pub if_drop_duplicates: bool,
}

/// Batch generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLetterBatchOptions {
    /// Partition field.
    pub rule_group_field: EnumGroupField,
    /// Sort rows newest date first (missing dates stay last).
    pub if_newest_first: bool,
    /// Preferred template table index.
    pub n_table_idx_preferred: Option<usize>,
    /// Maximum worker threads; `Some(1)` forces serial execution.
    pub num_workers_max: Option<usize>,
    /// Output file name prefix.
    pub file_prefix: String,
    /// Output file name extension (with dot).
    pub file_ext: String,
    /// Group name for rows with a missing key.
    pub group_sentinel: String,
    /// Target table discovery.
    pub table_locate: SpecTableLocateOptions,
    /// Placeholder substitution.
    pub placeholder: SpecPlaceholderOptions,
}

impl Default for SpecLetterBatchOptions {
    fn default() -> Self {
        Self {
            rule_group_field: EnumGroupField::Actor,
            if_newest_first: false,
            n_table_idx_preferred: None,
            num_workers_max: None,
            file_prefix: C_FILE_PREFIX.to_string(),
            file_ext: C_FILE_EXT.to_string(),
            group_sentinel: C_GROUP_SENTINEL.to_string(),
            table_locate: SpecTableLocateOptions::default(),
            placeholder: SpecPlaceholderOptions::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Report

/// One generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLetterOutput {
    /// Group name as found in the data.
    pub group: String,
    /// File name (`LETTER_<slug>.docx`).
    pub file_name: String,
    /// Rows written to the letter table.
    pub n_rows: usize,
    /// Serialized document.
    pub v_bytes: Vec<u8>,
}

/// One failed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecGroupError {
    /// Group name as found in the data.
    pub group: String,
    /// Failure text.
    pub message: String,
}

/// Index entry of a successful group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecIndexEntry {
    /// Group name.
    pub group: String,
    /// Row count.
    pub n_rows: usize,
}

/// Batch result: outputs, per-group failures and the index, all ordered by group name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportLetterBatch {
    /// Generated documents.
    pub outputs: Vec<SpecLetterOutput>,
    /// Groups that failed to build.
    pub errors: Vec<SpecGroupError>,
    /// `{group, row count}` for every output.
    pub index: Vec<SpecIndexEntry>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl ReportLetterBatch {
    /// Number of generated documents.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Number of failed groups.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} groups={} generated={} errors={} warnings={}",
            self.outputs.len() + self.errors.len(),
            self.outputs.len(),
            self.errors.len(),
            self.warnings.len()
        )
    }
}

impl fmt::Display for ReportLetterBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[LETTERS]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Dataset cannot be projected with the given mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Required roles have no column.
    MappingIncomplete {
        /// Unresolved roles, in role order.
        roles: Vec<EnumFieldRole>,
    },
    /// Mapping names a column the dataset does not have.
    MissingColumn {
        /// Role bound to the column.
        role: EnumFieldRole,
        /// Column name from the mapping.
        column: String,
    },
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MappingIncomplete { roles } => {
                let l_names: Vec<&str> = roles.iter().map(EnumFieldRole::as_str).collect();
                write!(
                    f,
                    "Required columns not detected: {}. Rename the headers or map them explicitly.",
                    l_names.join(", ")
                )
            }
            Self::MissingColumn { role, column } => {
                write!(f, "Column `{column}` mapped to `{role}` is not in the dataset")
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// One letter could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LetterError {
    /// The template has no qualifying table.
    NoTargetTable {
        /// Number of body tables in the template.
        n_tables: usize,
    },
    /// Template load, edit or save failed.
    Docx(DocxError),
}

impl fmt::Display for LetterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTargetTable { n_tables } => write!(
                f,
                "No valid 4-column table found in the template ({n_tables} tables inspected)"
            ),
            Self::Docx(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LetterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Docx(err) => Some(err),
            Self::NoTargetTable { .. } => None,
        }
    }
}

impl From<DocxError> for LetterError {
    fn from(err: DocxError) -> Self {
        Self::Docx(err)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
