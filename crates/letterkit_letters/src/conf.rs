//! Letter generation constants and default presets.

use crate::spec::EnumFieldRole;

/// Synonym phrases per role, already in normalized form.
///
/// Evaluated in this order; Spanish phrases come from the source datasets,
/// English ones cover translated exports.
pub const TUP_ROLE_SYNONYMS: [(EnumFieldRole, &[&str]); 6] = [
    (
        EnumFieldRole::Actor,
        &[
            "actor",
            "columna a",
            "interesado",
            "responsable",
            "nombre del actor",
            "owner",
            "stakeholder",
            "actor name",
        ],
    ),
    (
        EnumFieldRole::Group,
        &[
            "dependencia",
            "secretaria",
            "secretaria de",
            "entidad",
            "despacho",
            "direccion",
            "institucion",
            "dependencia/entidad",
            "institucional",
            "grupo",
            "responsable",
            "group",
            "entity",
            "department",
            "agency",
        ],
    ),
    (
        EnumFieldRole::Subject,
        &[
            "nombre de la mesa",
            "nombre mesa",
            "mesa",
            "tema",
            "asunto",
            "nombre mesa/tema",
            "nombre",
            "actividad",
            "subject",
            "topic",
            "activity",
        ],
    ),
    (
        EnumFieldRole::Level,
        &[
            "nivel",
            "nivel de la mesa",
            "compromiso",
            "tipo",
            "categoria",
            "level",
            "category",
            "tier",
        ],
    ),
    (
        EnumFieldRole::Date,
        &[
            "fecha",
            "fecha mesa",
            "fecha programada",
            "dia",
            "dia mesa",
            "fecha de realizacion",
            "fecha programada mesa",
            "date",
            "scheduled date",
        ],
    ),
    (
        EnumFieldRole::Description,
        &[
            "dato transformador",
            "dato",
            "transformador",
            "descripcion dato",
            "datos transformadores",
            "resultado esperado",
            "description",
            "expected result",
        ],
    ),
];

/// Substrings that mark an institutional-entity column when no group synonym matched.
pub const TUP_GROUP_FALLBACK_KEYWORDS: [&str; 9] = [
    "entidad",
    "secretaria",
    "dependencia",
    "despacho",
    "grupo",
    "entity",
    "department",
    "office",
    "group",
];

/// Group name for rows whose grouping value is missing.
pub const C_GROUP_SENTINEL: &str = "(no group)";
/// Output document file name prefix.
pub const C_FILE_PREFIX: &str = "LETTER_";
/// Output document file extension.
pub const C_FILE_EXT: &str = ".docx";
/// Index workbook file name written by surfaces.
pub const C_FILE_INDEX: &str = "letters_index.xlsx";
/// Bundle archive file name written by surfaces.
pub const C_FILE_BUNDLE: &str = "letters.zip";

/// Values written per letter table row: subject, level, date, description.
pub const N_VALUES_ROW_MAX: usize = 4;
/// Worker ceiling when the caller does not set one.
pub const N_WORKERS_DEFAULT_MAX: usize = 8;

/// Spreadsheet serial-date epoch (day 0).
pub const TUP_SERIAL_EPOCH_YMD: (i32, u32, u32) = (1899, 12, 30);
/// Explicit date formats, tried in order before lenient parsing.
pub const TUP_DATE_FORMATS_EXPLICIT: [&str; 6] = [
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y",
];
/// Day-first date-time formats for the lenient pass.
pub const TUP_DATETIME_FORMATS_LENIENT: [&str; 9] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M",
];
/// Day-first date formats for the lenient pass.
pub const TUP_DATE_FORMATS_LENIENT: [&str; 11] = [
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%y",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B, %Y",
];
/// Display format for resolved dates.
pub const C_DATE_DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Auxiliary sheet holding per-group placeholder values.
pub const C_SHEET_PLACEHOLDERS: &str = "Placeholders";
/// Accepted headers of the placeholder group column.
pub const TUP_PLACEHOLDER_HEADERS_GROUP: [&str; 2] = ["grupo", "group"];
/// Accepted headers of the placeholder key column.
pub const TUP_PLACEHOLDER_HEADERS_KEY: [&str; 3] = ["llave", "clave", "key"];
/// Accepted headers of the placeholder value column.
pub const TUP_PLACEHOLDER_HEADERS_VALUE: [&str; 2] = ["valor", "value"];

/// Index workbook summary sheet.
pub const C_SHEET_SUMMARY: &str = "Summary";
/// Index workbook failures sheet.
pub const C_SHEET_ERRORS: &str = "Errors";
/// Summary sheet headers.
pub const TUP_HEADERS_SUMMARY: [&str; 2] = ["Group", "Rows"];
/// Errors sheet headers.
pub const TUP_HEADERS_ERRORS: [&str; 2] = ["Group", "Error"];
