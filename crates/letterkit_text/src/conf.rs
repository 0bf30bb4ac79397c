//! Text folding constants.

/// Slug used when a display string folds to nothing.
pub const C_SLUG_SENTINEL: &str = "NO_GROUP";

/// Letters with no canonical decomposition, mapped to their base-alphabet spelling.
pub const DICT_TRANSLITERATION: [(char, &str); 16] = [
    ('ß', "ss"),
    ('ẞ', "SS"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('ø', "o"),
    ('Ø', "O"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ł', "l"),
    ('Ł', "L"),
    ('þ', "th"),
    ('Þ', "TH"),
    ('ı', "i"),
    ('\u{a0}', " "),
];
