//! Pure helpers shared by the reader and the writer.

use std::collections::BTreeSet;

use crate::conf::{C_HEADER_UNNAMED_PREFIX, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};

////////////////////////////////////////////////////////////////////////////////
// #region HeaderNormalization

/// Make raw header cells usable as column names.
///
/// Empty headers become `Unnamed: <i>`; repeated names get `.1`, `.2`...
/// suffixes in order of appearance, skipping any suffix already taken.
pub fn derive_unique_headers(l_raw: &[String]) -> Vec<String> {
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut l_out = Vec::with_capacity(l_raw.len());
    for (n_idx, c_raw) in l_raw.iter().enumerate() {
        let c_base = if c_raw.trim().is_empty() {
            format!("{C_HEADER_UNNAMED_PREFIX}{n_idx}")
        } else {
            c_raw.clone()
        };
        let mut c_name = c_base.clone();
        let mut n_dup = 1usize;
        while set_seen.contains(&c_name) {
            c_name = format!("{c_base}.{n_dup}");
            n_dup += 1;
        }
        set_seen.insert(c_name.clone());
        l_out.push(c_name);
    }
    l_out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
