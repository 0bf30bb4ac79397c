//! `letterkit_text` v1:
//! Text folding helpers shared by the letterkit kernels.
//!
//! - `conf` : sentinels and transliteration table
//! - `fold` : accent/case/whitespace folding and filename slugs
pub mod conf;
pub mod fold;

pub use conf::{C_SLUG_SENTINEL, DICT_TRANSLITERATION};
pub use fold::{fold_to_ascii, normalize_header_text, slugify, slugify_or};
