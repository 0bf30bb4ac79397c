//! Accent, case and whitespace folding.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::conf::{C_SLUG_SENTINEL, DICT_TRANSLITERATION};

static RE_WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace regex"));
static RE_SLUG_ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\- ]+").expect("static slug regex"));

/// Strip diacritics and transliterate to the base alphabet, preserving case.
///
/// Characters are decomposed (NFKD), combining marks dropped, and the few
/// letters without a decomposition are replaced through [`DICT_TRANSLITERATION`].
pub fn fold_to_ascii(text: &str) -> String {
    let mut c_out = String::with_capacity(text.len());
    for chr in text.nfkd() {
        if is_combining_mark(chr) {
            continue;
        }
        match DICT_TRANSLITERATION.iter().find(|(c_src, _)| *c_src == chr) {
            Some((_, c_dst)) => c_out.push_str(c_dst),
            None => c_out.push(chr),
        }
    }
    c_out
}

/// Canonical form used whenever header text is compared.
///
/// Folds accents, lowercases, collapses whitespace runs to one space and trims.
pub fn normalize_header_text(text: &str) -> String {
    let c_folded = fold_to_ascii(text.trim()).to_lowercase();
    RE_WHITESPACE_RUN
        .replace_all(&c_folded, " ")
        .trim()
        .to_string()
}

/// Filesystem-safe slug; blank results become [`C_SLUG_SENTINEL`].
pub fn slugify(text: &str) -> String {
    slugify_or(text, C_SLUG_SENTINEL)
}

/// Filesystem-safe slug with a caller-chosen sentinel for blank results.
///
/// Keeps ASCII alphanumerics, `_`, `-` and spaces after accent folding,
/// then turns each space into `_`.
pub fn slugify_or(text: &str, sentinel: &str) -> String {
    let c_folded = fold_to_ascii(text.trim());
    let c_kept = RE_SLUG_ILLEGAL.replace_all(&c_folded, "");
    let c_slug = c_kept.trim().replace(' ', "_");
    if c_slug.is_empty() {
        return sentinel.to_string();
    }
    c_slug
}
